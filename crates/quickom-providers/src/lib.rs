//! MeetingProvider trait and the Quickom REST client.
//!
//! - [`MeetingProvider`] - the operations the sync job needs from a backend
//! - [`ProviderError`] - typed errors with upstream code and status
//! - [`MeetingPayload`] - request bodies built from records
//! - [`apply_provider_meeting`] - pure response to record mapping
//! - [`CallBudget`] - shared allowance for report endpoints
//!
//! # Architecture
//!
//! ```text
//!   MeetingRecord ──► MeetingPayload ──► QuickomClient ──► Quickom API
//!                                             │
//!   MeetingRecord ◄── apply_provider_meeting ◄┘ ProviderMeeting
//! ```

pub mod budget;
pub mod error;
pub mod mapping;
pub mod payload;
pub mod provider;
#[cfg(feature = "quickom")]
pub mod quickom;
pub mod schema;

pub use budget::CallBudget;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use mapping::apply_provider_meeting;
pub use payload::{MeetingPayload, PayloadSettings};
pub use provider::{BoxFuture, MeetingLookup, MeetingProvider};
pub use schema::{
    ErrorBody, MeetingSettings, ParticipantReport, ProviderMeeting, ProviderUser, Registrant,
    ReportMeeting,
};
