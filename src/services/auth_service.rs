use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::web::error::AppError;
use crate::web::models::Claims;

/// Token lifetime. There is no server-side revocation; a token stays valid
/// until natural expiry even after the client "logs out".
pub const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Single shared-secret login: the submitted password is compared directly
/// against the operator-configured admin password. No per-user accounts.
pub fn verify_password(submitted: &str, admin_password: &str) -> bool {
    submitted == admin_password
}

pub fn login(password: &str, admin_password: &str, jwt_secret: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::InvalidInput("Password required".to_string()));
    }
    if !verify_password(password, admin_password) {
        return Err(AppError::InvalidCredentials);
    }
    create_token(jwt_secret)
}

/// Issues a capability token carrying only an "authenticated" claim — this
/// is a shared-secret system, not multi-tenant auth, so there is no subject.
pub fn create_token(jwt_secret: &str) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp() as usize;
    let claims = Claims {
        authenticated: true,
        exp: expiration,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))
}

/// Fails closed: any decode error (bad signature, expired, malformed) means
/// "not authenticated".
pub fn verify_token(token: &str, jwt_secret: &str) -> bool {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims.authenticated)
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn password_check_is_direct_comparison() {
        assert!(verify_password("hunter2", "hunter2"));
        assert!(!verify_password("hunter2", "hunter3"));
        assert!(!verify_password("", "hunter2"));
    }

    #[test]
    fn login_round_trips_through_verification() {
        let token = login("hunter2", "hunter2", SECRET).unwrap();
        assert!(verify_token(&token, SECRET));
    }

    #[test]
    fn login_rejects_empty_and_wrong_passwords() {
        assert!(matches!(
            login("", "hunter2", SECRET),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            login("wrong", "hunter2", SECRET),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn verification_fails_closed() {
        let token = create_token(SECRET).unwrap();
        assert!(!verify_token(&token, "other-secret"));
        assert!(!verify_token("not-a-jwt", SECRET));
        assert!(!verify_token("", SECRET));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let expired = Claims {
            authenticated: true,
            exp: (Utc::now() - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap();
        assert!(!verify_token(&token, SECRET));
    }
}
