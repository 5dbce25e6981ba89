pub mod conversations;
pub mod feedback;
pub mod health;
pub mod insights;
pub mod messages;

use uuid::Uuid;

use super::error::ApiError;

/// Parse a path parameter as a UUID, rejecting malformed IDs early.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid ID format".into()))
}
