use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest};
use service_core::auth::jwt::decode_access_token;
use service_core::{EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;

use crate::operations::Caller;
use crate::Context;

#[derive(Debug, Error, AsRefStr)]
pub enum AuthError {
    #[error("Missing bearer token.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,
}

impl OperationError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Caller identified by a valid bearer token. Rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

/// Caller identified by a bearer token, if the request carries one. An invalid token is still
/// rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthenticated(pub Option<Caller>);

fn caller_from_request(req: &HttpRequest) -> Result<Option<Caller>, EndpointError<AuthError>> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => return Ok(None),
        Some(header) => header,
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| EndpointError::operation(AuthError::InvalidToken))?;

    let ctx = req.app_data::<web::Data<Context>>().ok_or_else(|| {
        tracing::error!("Context not registered as app data.");
        EndpointError::internal()
    })?;
    let claims = decode_access_token(token.trim(), &ctx.access_token_secret).map_err(|e| {
        tracing::debug!(error = ?e, "Failed decoding token.");
        EndpointError::operation(AuthError::InvalidToken)
    })?;

    Caller::from_claims(&claims)
        .map(Some)
        .ok_or_else(|| EndpointError::operation(AuthError::InvalidToken))
}

impl FromRequest for Authenticated {
    type Error = EndpointError<AuthError>;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from_request(req).and_then(|caller| {
            caller
                .map(Authenticated)
                .ok_or_else(|| EndpointError::operation(AuthError::MissingToken))
        }))
    }
}

impl FromRequest for MaybeAuthenticated {
    type Error = EndpointError<AuthError>;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from_request(req).map(MaybeAuthenticated))
    }
}
