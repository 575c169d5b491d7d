//! Domain records and their request payloads

mod motorcycle;
mod portal;
mod user;

pub use motorcycle::{Motorcycle, MotorcyclePayload};
pub use portal::{Portal, PortalPayload, PortalType};
pub use user::{Role, User, UserPayload};

use std::borrow::Cow;

use validator::ValidationError;

/// Build a validation error with a readable message
pub(crate) fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Reject strings that are empty once trimmed
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}
