//! Common utilities and shared types for the dashboard notification client.
//!
//! This crate provides foundational components used across all dashboard crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Token storage**: Bearer token persistence via [`TokenStore`]
//!
//! # Example
//!
//! ```no_run
//! use dashboard_common::{AppResult, Config, MemoryTokenStore, resolve_bearer};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let tokens = MemoryTokenStore::from_config(&config.auth);
//!     println!("Authenticated: {}", resolve_bearer(&tokens).is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod token;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use token::{FileTokenStore, MemoryTokenStore, TokenKind, TokenStore, resolve_bearer};
