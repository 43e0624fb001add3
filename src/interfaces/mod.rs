//! User-facing interfaces outside the HTTP server

#[cfg(feature = "cli")]
pub mod cli;
