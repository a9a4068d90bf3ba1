//! Bearer token issuing and the authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use tracking::{
    TrackingError,
    models::{Role, User},
};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Role at the time the token was issued
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Authenticated user information
///
/// The role is re-read from the store on every request, so role changes and
/// blocking apply to tokens already handed out.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// HS256 token service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_seconds,
        }
    }

    /// Issue a token for a successfully logged-in user
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign token: {}", e);
            ApiError::InternalServerError
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                ApiError::Unauthorized
            })
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let claims = state.tokens.validate(bearer.token())?;

    let user = match state.engine.identify_by_id(claims.sub).await {
        Ok(user) => user,
        Err(TrackingError::UnknownOrBlockedUser) => {
            warn!("Token of unknown or blocked user {} rejected", claims.sub);
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(req).await)
}
