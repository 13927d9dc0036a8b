//! Facade crate for the event registration features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Pass [`migrations`] to the database builder.
//! - Call [`init`] to build the feature slices and [`server::api_router`] to mount their routes.

use evreg_database::{Database, Migration};
pub use evreg_domain as domain;
use evreg_domain::config::ApiConfig;
use evreg_domain::registry::InitializedSlice;
pub use evreg_kernel as kernel;
use std::borrow::Cow;

/// Feature registry for runtime introspection.
pub mod features {
    pub use evreg_registration as registration;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        "registration",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[cfg(feature = "server")]
pub mod server {
    use evreg_kernel::server::{ApiState, system_router};
    use utoipa_axum::router::OpenApiRouter;

    /// System routes plus the routes of every enabled slice.
    #[must_use]
    pub fn api_router() -> OpenApiRouter<ApiState> {
        system_router().merge(super::features::registration::router())
    }
}

/// Failure while initializing a feature slice.
#[evreg_derive::evreg_error]
pub enum FeatureError {
    #[error("Registration slice error{}: {source}", format_context(.context))]
    Registration {
        source: evreg_registration::RegistrationError,
        context: Option<Cow<'static, str>>,
    },
}

/// Store migrations of every enabled slice, in execution order.
#[must_use]
pub fn migrations() -> Vec<Migration> {
    features::registration::migrations()
}

/// Initialize all enabled features on a migrated database.
///
/// # Errors
/// Returns an error if any feature initialization fails.
pub fn init(config: &ApiConfig, database: &Database) -> Result<Vec<InitializedSlice>, FeatureError> {
    let mut slices = Vec::new();

    // Registration
    slices.push(features::registration::init(database, &config.event).context("registration")?);

    Ok(slices)
}
