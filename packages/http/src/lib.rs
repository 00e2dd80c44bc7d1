//! # prefsync-http
//!
//! HTTP transport for the remote preference API.
//!
//! [`PreferencesApi`] maps the three remote operations (list everything, set
//! one key, remove one key) onto HTTP requests. Requests go through an
//! [`HttpExecutor`], so the network can be swapped for a mock in tests.
//!
//! ```ignore
//! use std::time::Duration;
//! use prefsync_http::PreferencesApi;
//!
//! let api = PreferencesApi::connect("https://api.example.com/user/", Duration::from_secs(30))?
//!     .with_token("s3cret");
//!
//! api.put("app-theme", "dark")?;
//! let all = api.fetch_all()?;
//! api.delete("app-theme")?;
//! ```
//!
//! With the `test-utils` feature, [`mock::MockExecutor`] records requests and
//! can play the part of a preference server.

pub mod api;
pub mod error;
pub mod executor;
pub mod types;

// Re-export main types
pub use api::PreferencesApi;
pub use error::Error;
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use types::{HttpRequest, HttpResponse, Method};

#[cfg(any(test, feature = "test-utils"))]
pub use executor::mock;
