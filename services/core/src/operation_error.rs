use std::convert::Infallible;
use std::error::Error;

use actix_web::http::StatusCode;

/// Trait to be implemented by errors returned by the different operations of services.
pub trait OperationError: Error {
    /// HTTP status corresponding to this error.
    fn status_code(&self) -> StatusCode;

    /// Short machine readable name of the error, reported as `ErrorKind`.
    fn kind(&self) -> &str;
}

impl OperationError for Infallible {
    fn status_code(&self) -> StatusCode {
        match *self {}
    }

    fn kind(&self) -> &str {
        match *self {}
    }
}
