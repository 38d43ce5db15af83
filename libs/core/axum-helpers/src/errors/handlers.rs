use super::{AppError, ErrorCode};

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound(ErrorCode::NotFound.default_message().to_string())
}
