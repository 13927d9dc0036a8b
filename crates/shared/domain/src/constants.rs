//! Shared string constants: `OpenAPI` tags, slice names and defaults.

/// `OpenAPI` tag for system endpoints (health, docs).
pub const SYSTEM_TAG: &str = "System";
/// `OpenAPI` tag for the registration slice.
pub const REGISTRATION_TAG: &str = "Registrations";

/// Registration slice name, used as its migration ledger key.
pub const REGISTRATION: &str = "registration";

/// Seat limit used when the event configuration is created lazily.
pub const DEFAULT_TOTAL_SEATS: u32 = 100;
