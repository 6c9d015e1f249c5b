//! Bearer-token authentication for protected routes.
//!
//! `require_auth` validates the access token on each request and places the
//! verified [`Identity`] into request extensions. Handlers read it back with
//! the [`CurrentUser`] extractor.

mod bearer;
mod errors;
mod extractors;
mod ip;
mod types;

pub use bearer::bearer_token;
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{CurrentUser, require_auth};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use types::Identity;
