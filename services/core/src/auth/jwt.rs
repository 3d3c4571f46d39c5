use std::fmt::{Display, Formatter};

use jsonwebtoken::errors::Result as JwtResult;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the account the access token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Learner,
    Creator,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    /// Account ID of the token owner, if the subject is a valid UUID.
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Signs the claims with the base64 encoded HS256 secret.
pub fn encode_access_token(claims: &Claims, secret: &str) -> JwtResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_base64_secret(secret)?,
    )
}

/// Verifies the signature and expiration of an access token and returns its claims.
pub fn decode_access_token(token: &str, secret: &str) -> JwtResult<Claims> {
    let key = DecodingKey::from_base64_secret(secret)?;
    let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))?;

    Ok(data.claims)
}
