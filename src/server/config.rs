use std::env;

#[derive(Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// The single operator-configured secret every staff member shares.
    pub admin_password: String,
    /// Whether the auth cookie carries the `Secure` attribute. On by
    /// default; set `COOKIE_SECURE=false` for plain-HTTP deployments,
    /// otherwise browsers drop the cookie and only the bearer path works.
    pub cookie_secure: bool,
}

/// "false"/"0"/"no" (any case) disable a flag; anything else enables it.
fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(raw) => !matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no"
        ),
        None => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let listen_addr =
            env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let admin_password =
            env::var("ADMIN_PASSWORD").map_err(|_| "ADMIN_PASSWORD must be set".to_string())?;

        let cookie_secure = parse_flag(env::var("COOKIE_SECURE").ok().as_deref(), true);

        Ok(ServerConfig {
            listen_addr,
            database_url,
            jwt_secret,
            admin_password,
            cookie_secure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_secure_defaults_on_and_accepts_common_spellings() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("false"), true));
        assert!(!parse_flag(Some("FALSE"), true));
        assert!(!parse_flag(Some("0"), true));
        assert!(!parse_flag(Some("no"), true));
        assert!(parse_flag(Some("true"), true));
        assert!(parse_flag(Some("1"), true));
    }
}
