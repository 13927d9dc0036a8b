//! Registration feature slice.
//!
//! Attendees register with a name and a phone number until the seat limit is
//! reached; administrators search the registrant list and adjust the limit.
//! Admission is a single store-side transaction, so concurrent requests can
//! never push the registration count past the limit.

#[cfg(feature = "server")]
mod api;
mod error;
mod model;
mod query;
mod repository;
mod service;
mod validation;

pub use error::{RegistrationError, RegistrationErrorExt};
pub use model::{
    EventConfig, Pagination, Registration, RegistrationPage, RegistrationRequest, SearchParams,
    SeatsInfo, SeatsRequest,
};
pub use query::{DEFAULT_LIMIT, DEFAULT_PAGE, SearchQuery, SortField, SortOrder};
pub use service::RegistrationService;
pub use validation::{NewRegistration, TotalSeats};

use evreg_database::{Database, Migration};
use evreg_domain::config::EventSettings;
use evreg_domain::constants::REGISTRATION;
use evreg_kernel::domain::registry::InitializedSlice;

/// Registration feature state.
#[evreg_derive::evreg_slice]
pub struct Registrations {
    pub service: RegistrationService,
}

/// Store schema and functions of this slice, in execution order.
#[must_use]
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        REGISTRATION,
        "0001-registration",
        include_str!("../migrations/0001-registration.surql"),
    )]
}

/// Initialize the registration feature on a migrated database.
///
/// # Errors
/// Returns [`RegistrationError::InvalidValue`] if the configured default seat limit is zero.
pub fn init(db: &Database, event: &EventSettings) -> Result<InitializedSlice, RegistrationError> {
    if event.default_total_seats == 0 {
        return Err(RegistrationError::InvalidValue {
            message: "Total seats must be greater than 0".into(),
            context: Some("event.default_total_seats".into()),
        });
    }

    let service = RegistrationService::new(db.clone(), event.default_total_seats);
    tracing::info!(default_total_seats = event.default_total_seats, "Registration slice initialized");

    Ok(InitializedSlice::new(Registrations::new(RegistrationsInner { service })))
}

/// HTTP routes of this slice.
#[cfg(feature = "server")]
#[must_use]
pub fn router() -> utoipa_axum::router::OpenApiRouter<evreg_kernel::server::ApiState> {
    api::router()
}
