use evreg_database::DatabaseError;
use std::borrow::Cow;

pub(crate) const MISSING_FIELDS: &str = "Please provide all required fields";
pub(crate) const PHONE_FORMAT: &str = "Phone number must be 10 digits";
pub(crate) const FIRST_NAME_LENGTH: &str = "First name must be between 2 and 50 characters";
pub(crate) const LAST_NAME_LENGTH: &str = "Last name must be between 2 and 50 characters";
pub(crate) const SEATS_NOT_POSITIVE: &str = "Total seats must be greater than 0";
pub(crate) const SEATS_NOT_INTEGER: &str = "Total seats must be an integer";

/// Failures of the registration slice.
///
/// Client-facing variants display exactly the message sent to the caller.
#[evreg_derive::evreg_error]
pub enum RegistrationError {
    /// Malformed or missing input.
    #[error("{message}{}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Phone number already registered{}", format_context(.context))]
    DuplicatePhone { context: Option<Cow<'static, str>> },

    #[error("No seats available{}", format_context(.context))]
    CapacityExceeded { context: Option<Cow<'static, str>> },

    #[error(
        "Invalid sort field. Allowed fields are: firstName, lastName, registeredAt{}",
        format_context(.context)
    )]
    InvalidSortField { context: Option<Cow<'static, str>> },

    /// Rejected seat limit.
    #[error("{message}{}", format_context(.context))]
    InvalidValue { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The seat configuration has not been created yet.
    #[error("Event configuration not found{}", format_context(.context))]
    ConfigNotFound { context: Option<Cow<'static, str>> },

    /// Connection or migration failure.
    #[error("Registration database error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    /// A query failed or returned an unexpected shape.
    #[error("Registration store error{}: {source}", format_context(.context))]
    Store { source: surrealdb::Error, context: Option<Cow<'static, str>> },

    #[error("Internal registration error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl RegistrationError {
    pub(crate) fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation { message: message.into(), context: None }
    }

    pub(crate) fn invalid_value(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidValue { message: message.into(), context: None }
    }

    /// `true` for errors caused by the caller rather than the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database { .. } | Self::Store { .. } | Self::Internal { .. })
    }

    /// `true` when the store rejected the statement because of a concurrent writer.
    /// Running it again may succeed or produce a regular business outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => is_write_race(&source.to_string()),
            _ => false,
        }
    }
}

/// Transaction conflicts and unique-index collisions between racing admissions.
pub(crate) fn is_write_race(message: &str) -> bool {
    message.contains("can be retried")
        || message.contains("Transaction conflict")
        || (message.contains("registration_phone_number") && message.contains("already contains"))
        || (message.contains("event_config:current") && message.contains("already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_verbatim() {
        assert_eq!(
            RegistrationError::DuplicatePhone { context: None }.to_string(),
            "Phone number already registered"
        );
        assert_eq!(RegistrationError::validation(PHONE_FORMAT).to_string(), PHONE_FORMAT);
        assert_eq!(
            RegistrationError::InvalidSortField { context: None }.to_string(),
            "Invalid sort field. Allowed fields are: firstName, lastName, registeredAt"
        );
    }

    #[test]
    fn codes_follow_variant_names() {
        assert_eq!(RegistrationError::CapacityExceeded { context: None }.code(), "CAPACITY_EXCEEDED");
        assert_eq!(RegistrationError::invalid_value(SEATS_NOT_INTEGER).code(), "INVALID_VALUE");
        assert_eq!(RegistrationError::ConfigNotFound { context: None }.code(), "CONFIG_NOT_FOUND");
    }

    #[test]
    fn store_failures_are_not_client_errors() {
        assert!(RegistrationError::validation(MISSING_FIELDS).is_client_error());
        assert!(!RegistrationError::from("unexpected admission outcome").is_client_error());
    }

    #[test]
    fn write_races_are_recognized() {
        assert!(is_write_race(
            "Transaction conflict: Write conflict, retry the transaction. This transaction can be retried"
        ));
        assert!(is_write_race(
            "Database index `registration_phone_number` already contains '5550000001', with record `registration:abc`"
        ));
        assert!(!is_write_race("Found 'abc' for field `total_seats`, but expected a int"));
        assert!(!RegistrationError::from("Transaction conflict").is_retryable());
        assert!(!RegistrationError::CapacityExceeded { context: None }.is_retryable());
    }
}
