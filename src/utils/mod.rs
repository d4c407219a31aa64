//! Utility modules shared by the providers and the CLI.
//!
//! - [`HttpClient`]: reqwest client with the user agent and timeouts applied
//! - [`endpoint`]: join a provider base URL with an API path
//! - [`truncate_chars`]: cut text on a character boundary for previews

mod http;
mod text;

pub use http::{endpoint, with_bearer, HttpClient};
pub use text::{preview, truncate_chars};
