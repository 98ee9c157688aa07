use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Unique-constraint violation on a human-assigned identifier. Kept
    /// distinct from `InvalidInput` so the dashboard can show a specific
    /// message.
    #[error("{0}")]
    DuplicateId(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DuplicateId(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid password".to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            // 500s keep the detail in the logs; the client only ever sees a
            // generic message.
            AppError::TokenCreationError(msg)
            | AppError::DatabaseError(msg)
            | AppError::InternalServerError(msg) => {
                error!(detail = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}

/// Maps a `DbErr` to `DuplicateId` when the underlying driver reports a
/// unique-constraint violation, otherwise to `DatabaseError`.
pub fn map_unique_violation(db_err: sea_orm::DbErr, duplicate_message: &str) -> AppError {
    match &db_err {
        sea_orm::DbErr::Query(sea_orm::RuntimeErr::SqlxError(sqlx_error_value)) => {
            if let sqlx::Error::Database(database_error) = sqlx_error_value {
                if database_error.is_unique_violation() {
                    return AppError::DuplicateId(duplicate_message.to_string());
                }
            }
            AppError::DatabaseError(sqlx_error_value.to_string())
        }
        sea_orm::DbErr::Exec(sea_orm::RuntimeErr::SqlxError(sqlx_error_value)) => {
            if let sqlx::Error::Database(database_error) = sqlx_error_value {
                if database_error.is_unique_violation() {
                    return AppError::DuplicateId(duplicate_message.to_string());
                }
            }
            AppError::DatabaseError(sqlx_error_value.to_string())
        }
        _ => AppError::DatabaseError(db_err.to_string()),
    }
}

/// Like `map_unique_violation`, but for unique indexes that guard a state
/// transition (tag linking) rather than a human-assigned identifier: two
/// concurrent writers racing past the pre-check is a 409, not a 400.
pub fn map_conflict_violation(db_err: sea_orm::DbErr, conflict_message: &str) -> AppError {
    match map_unique_violation(db_err, conflict_message) {
        AppError::DuplicateId(msg) => AppError::Conflict(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for the driver error Postgres raises on a unique index hit.
    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn unique_violation() -> sea_orm::DbErr {
        sea_orm::DbErr::Exec(sea_orm::RuntimeErr::SqlxError(sqlx::Error::Database(
            Box::new(DuplicateKey),
        )))
    }

    #[test]
    fn error_variants_map_to_expected_status_codes() {
        let cases = vec![
            (
                AppError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::DuplicateId("Machine ID already exists".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NotFound("Machine not found".into()),
                StatusCode::NOT_FOUND,
            ),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::Conflict("Tag is already linked".into()),
                StatusCode::CONFLICT,
            ),
            (
                AppError::DatabaseError("connection reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn unique_violations_map_by_context() {
        // human-assigned identifier collision: 400
        assert!(matches!(
            map_unique_violation(unique_violation(), "Machine ID already exists"),
            AppError::DuplicateId(msg) if msg == "Machine ID already exists"
        ));
        // raced state transition: 409
        assert!(matches!(
            map_conflict_violation(unique_violation(), "Machine already has a linked tag"),
            AppError::Conflict(msg) if msg == "Machine already has a linked tag"
        ));
        // anything else stays an internal error
        assert!(matches!(
            map_conflict_violation(sea_orm::DbErr::Custom("boom".to_string()), "unused"),
            AppError::DatabaseError(_)
        ));
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response =
            AppError::DatabaseError("password=hunter2 in connection string".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
