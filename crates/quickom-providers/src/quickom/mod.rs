//! Quickom conferencing provider.
//!
//! # Example
//!
//! ```ignore
//! use quickom_providers::quickom::{QuickomConfig, QuickomProvider};
//!
//! let config = QuickomConfig::production()?.with_api_key(api_key);
//! let provider = QuickomProvider::new(config)?;
//! let lookup = provider.get_meeting_or_webinar_info("857", false).await?;
//! ```

mod client;
mod config;
mod provider;

pub use client::{Listing, QuickomClient};
pub use config::QuickomConfig;
pub use provider::{NewUser, QuickomProvider};
