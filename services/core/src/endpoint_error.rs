use std::error::Error;
use std::fmt::Display;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use strum::AsRefStr;

use crate::operation_error::OperationError;

/// Error returned by every service operation.
///
/// `Validation` and `Internal` are shared by all operations, while `Operation` carries the
/// operation specific failure.
#[derive(Debug, AsRefStr)]
pub enum EndpointError<E: OperationError> {
    Validation(String),
    Internal,
    Operation(E),
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody<'a> {
    error_kind: &'a str,
    message: String,
}

impl<E: OperationError> EndpointError<E> {
    pub fn validation(msg: impl Into<String>) -> Self {
        EndpointError::Validation(msg.into())
    }

    pub fn internal() -> Self {
        EndpointError::Internal
    }

    pub fn operation(err: E) -> Self {
        EndpointError::Operation(err)
    }

    /// Name reported to clients as `ErrorKind`.
    pub fn error_kind(&self) -> &str {
        match self {
            EndpointError::Operation(e) => e.kind(),
            _ => self.as_ref(),
        }
    }

    fn message(&self) -> String {
        match self {
            EndpointError::Validation(msg) => msg.clone(),
            EndpointError::Internal => String::from("Internal server error."),
            EndpointError::Operation(err) => err.to_string(),
        }
    }
}

impl<E: OperationError> OperationError for EndpointError<E> {
    fn status_code(&self) -> StatusCode {
        match self {
            EndpointError::Validation(_) => StatusCode::BAD_REQUEST,
            EndpointError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            EndpointError::Operation(e) => e.status_code(),
        }
    }

    fn kind(&self) -> &str {
        self.error_kind()
    }
}

impl<E: OperationError> Error for EndpointError<E> {}

impl<E: OperationError> Display for EndpointError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind: &str = self.as_ref();
        write!(f, "{}: {}", kind, self.message())
    }
}

impl<E: OperationError> ResponseError for EndpointError<E> {
    fn status_code(&self) -> StatusCode {
        OperationError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(OperationError::status_code(self)).json(ErrorBody {
            error_kind: self.error_kind(),
            message: self.message(),
        })
    }
}
