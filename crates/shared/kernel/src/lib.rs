//! Kernel utilities shared across slices.
//! Keep this crate lightweight: config loading, the API state container, and the
//! HTTP plumbing (health endpoint, JSON error responses) behind the `server` feature.
//!
//! ## Config loading
//! ```rust,ignore
//! use evreg_kernel::config::load_config;
//! use evreg_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server.toml"))?;
//! ```
pub mod config;
pub mod prelude;
#[cfg(feature = "server")]
pub mod server;

pub use evreg_domain as domain;
