//! Authentication middleware
//!
//! Verifies the bearer JWT issued by the identity provider and exposes the
//! caller as [`AuthUser`]

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorDetail, ErrorResponse};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

/// Authentication middleware that validates JWT tokens
/// The secret is read from the environment so the layer needs no state.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let jwt_secret = std::env::var("IU__JWT__SECRET")
        .or_else(|_| std::env::var("IU_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let auth_user = match authenticate(token, &jwt_secret) {
        Ok(user) => user,
        Err(msg) => return unauthorized_response(&msg),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Decode a token and turn its claims into the caller identity
pub fn authenticate(token: &str, secret: &str) -> Result<AuthUser, String> {
    let claims = decode_jwt(token, secret)?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;

    Ok(AuthUser {
        user_id,
        role: claims.role,
    })
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_pt: "Não autorizado".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_pt: "É necessário autenticar-se".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: "evaluator".to_string(),
            exp,
            iat: chrono::Utc::now().timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let user = authenticate(&token(&user_id.to_string(), "s3cret", in_one_hour()), "s3cret")
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, "evaluator");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let t = token(&Uuid::new_v4().to_string(), "s3cret", in_one_hour());
        assert!(authenticate(&t, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let t = token(&Uuid::new_v4().to_string(), "s3cret", 1_000);
        assert!(authenticate(&t, "s3cret").is_err());
    }

    #[test]
    fn subject_must_be_a_uuid() {
        let t = token("not-a-uuid", "s3cret", in_one_hour());
        assert_eq!(
            authenticate(&t, "s3cret").unwrap_err(),
            "Invalid user ID in token"
        );
    }
}
