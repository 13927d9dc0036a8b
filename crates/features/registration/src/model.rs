use chrono::{DateTime, Utc};
use evreg_derive::api_model;

#[api_model]
#[derive(Clone, PartialEq, Eq)]
/// A confirmed attendee
pub struct Registration {
    /// Store-generated key
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Exactly ten ASCII digits, unique across registrations
    pub phone_number: String,
    /// Assigned by the server at admission
    pub registered_at: DateTime<Utc>,
}

#[api_model(deny_unknown_fields = false)]
#[derive(Clone, Default)]
/// Registration form payload. Fields are optional so that missing ones surface as validation errors.
pub struct RegistrationRequest {
    #[cfg_attr(feature = "server", schema(example = "Ada"))]
    pub first_name: Option<String>,
    #[cfg_attr(feature = "server", schema(example = "Lovelace"))]
    pub last_name: Option<String>,
    #[cfg_attr(feature = "server", schema(example = "5551234567"))]
    pub phone_number: Option<String>,
}

impl RegistrationRequest {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            phone_number: Some(phone_number.into()),
        }
    }
}

#[api_model(deny_unknown_fields = false)]
#[derive(Clone, Default)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams), into_params(parameter_in = Query))]
/// Search, sort and pagination parameters of the registrant list
pub struct SearchParams {
    /// Case-insensitive substring of the first or last name
    pub search: Option<String>,
    /// One of `firstName`, `lastName`, `registeredAt`
    pub sort_by: Option<String>,
    /// `asc` or `desc`; ignored without `sortBy`
    pub order: Option<String>,
    /// 1-based page number, defaults to 1
    pub page: Option<i64>,
    /// Page size, defaults to 10
    pub limit: Option<i64>,
}

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq)]
/// Pagination summary of a search
pub struct Pagination {
    /// Registrations matching the filter
    pub total: u64,
    pub page: u32,
    /// `ceil(total / limit)`
    pub total_pages: u64,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
/// One page of registrations
pub struct RegistrationPage {
    pub data: Vec<Registration>,
    pub pagination: Pagination,
}

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq)]
/// Seat availability
pub struct SeatsInfo {
    /// `totalSeats` minus registrations; negative after the limit is lowered below the count
    pub remaining_seats: i64,
    pub total_seats: u32,
}

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq)]
/// The event seat configuration
pub struct EventConfig {
    pub total_seats: u32,
}

#[api_model(deny_unknown_fields = false)]
#[derive(Clone, Default)]
/// New seat limit. Any JSON value is accepted and checked by the service.
pub struct SeatsRequest {
    #[serde(default)]
    #[cfg_attr(feature = "server", schema(value_type = i64, example = 150))]
    pub total_seats: serde_json::Value,
}
