use crate::error::RegistrationError;
use crate::model::{
    EventConfig, Pagination, Registration, RegistrationPage, RegistrationRequest, SearchParams,
    SeatsInfo,
};
use crate::query::{SearchQuery, total_pages};
use crate::repository::{Admission, RegistrationRepository};
use crate::validation::{NewRegistration, TotalSeats};
use chrono::Utc;
use evreg_database::Database;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Registration, search and seat configuration operations.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    repository: RegistrationRepository,
    default_total_seats: u32,
}

impl RegistrationService {
    /// `default_total_seats` is used when the first registration creates the seat configuration.
    #[must_use]
    pub const fn new(db: Database, default_total_seats: u32) -> Self {
        Self { repository: RegistrationRepository::new(db), default_total_seats }
    }

    /// Validates and admits an attendee.
    ///
    /// # Errors
    /// * [`RegistrationError::Validation`] when a field rule fails.
    /// * [`RegistrationError::DuplicatePhone`] when the phone number is already registered.
    /// * [`RegistrationError::CapacityExceeded`] when every seat is taken.
    /// * [`RegistrationError::Store`] on store failures, or when admission keeps losing write races.
    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, RegistrationError> {
        let registration = NewRegistration::parse(request)?;

        match self.repository.admit(&registration, Utc::now(), self.default_total_seats).await? {
            Admission::Created(created) => {
                info!(registration_id = %created.id, "Registration admitted");
                Ok(created)
            },
            Admission::DuplicatePhone => {
                debug!("Rejected duplicate phone number");
                Err(RegistrationError::DuplicatePhone { context: None })
            },
            Admission::CapacityExceeded => {
                warn!("Rejected registration: no seats available");
                Err(RegistrationError::CapacityExceeded { context: None })
            },
        }
    }

    /// Filtered, sorted and paginated registrant list.
    ///
    /// # Errors
    /// * [`RegistrationError::InvalidSortField`] for an unknown `sortBy`.
    /// * [`RegistrationError::Validation`] for a bad `order`, `page` or `limit`.
    pub async fn search(&self, params: &SearchParams) -> Result<RegistrationPage, RegistrationError> {
        let query = SearchQuery::parse(params)?;
        let (data, total) = self.repository.search(&query).await?;

        Ok(RegistrationPage {
            data,
            pagination: Pagination {
                total,
                page: query.page,
                total_pages: total_pages(total, query.limit),
            },
        })
    }

    /// Seat limit and what is left of it. Does not create the configuration.
    ///
    /// # Errors
    /// [`RegistrationError::ConfigNotFound`] before the configuration exists.
    pub async fn seats(&self) -> Result<SeatsInfo, RegistrationError> {
        let (total_seats, registered) = self.repository.seats().await?;
        let total_seats = total_seats.ok_or(RegistrationError::ConfigNotFound { context: None })?;

        Ok(SeatsInfo {
            remaining_seats: i64::from(total_seats)
                - i64::try_from(registered).unwrap_or(i64::MAX),
            total_seats,
        })
    }

    /// Replaces the seat limit. Existing registrations are kept even above the new limit.
    ///
    /// # Errors
    /// * [`RegistrationError::InvalidValue`] unless `total_seats` is a positive integer.
    /// * [`RegistrationError::ConfigNotFound`] before the configuration exists.
    pub async fn set_seats(&self, total_seats: &Value) -> Result<EventConfig, RegistrationError> {
        let seats = TotalSeats::parse(total_seats)?;
        let total_seats = self
            .repository
            .update_total_seats(seats)
            .await?
            .ok_or(RegistrationError::ConfigNotFound { context: None })?;

        info!(total_seats, "Seat limit updated");
        Ok(EventConfig { total_seats })
    }

    /// The seat configuration, created with the default limit if missing.
    ///
    /// # Errors
    /// [`RegistrationError::Store`] on store failures.
    pub async fn event_config(&self) -> Result<EventConfig, RegistrationError> {
        let total_seats = self.repository.ensure_config(self.default_total_seats).await?;
        Ok(EventConfig { total_seats })
    }
}
