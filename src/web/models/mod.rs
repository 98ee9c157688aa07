use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// JWT claims. The token is a bare capability: it carries no subject,
/// only the fact that the shared password was presented.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub authenticated: bool,
    pub exp: usize, // Expiration time (timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_tolerates_missing_password_field() {
        // The handler turns the empty default into a 400 rather than letting
        // axum reject the body with an opaque deserialization error.
        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.password.is_empty());

        let req: LoginRequest = serde_json::from_str(r#"{"password":"pw"}"#).unwrap();
        assert_eq!(req.password, "pw");
    }
}
