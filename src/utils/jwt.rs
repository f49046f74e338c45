// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::Actor};

/// Claims issued by the host application's login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Commenting user's id, as a string.
    pub sub: String,
    /// Unix seconds.
    pub exp: i64,
}

/// Signs a token for `user_id`. Session management lives in the host
/// application; this exists so it (and the tests) can mint tokens we accept.
pub fn sign_jwt(user_id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    let ttl = i64::try_from(expiration_seconds)
        .map_err(|_| AppError::InternalServerError("token lifetime out of range".to_string()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::seconds(ttl)).timestamp(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks signature and expiry.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::AuthError("Invalid token".to_string())
        })
}

/// Resolves the `Authorization` header into an `Actor`.
///
/// * No header: `Actor::Guest`.
/// * `Bearer <valid token>`: `Actor::User(sub)`.
/// * Anything else: `AuthError`.
pub fn actor_from_header(value: Option<&str>, secret: &str) -> Result<Actor, AppError> {
    let Some(value) = value else {
        return Ok(Actor::Guest);
    };

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthError("Unsupported authorization scheme".to_string()))?;

    let claims = verify_jwt(token, secret)?;
    let id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

    Ok(Actor::User(id))
}

/// Axum Middleware: Identity.
///
/// Every request gets an `Actor` extension. Guests pass through; the
/// controllers decide which operations need an authenticated actor.
/// A malformed or expired token is rejected with 401.
pub async fn identity_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let actor = actor_from_header(auth_header, &config.jwt_secret)?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}
