//! MeetingProvider trait definition.
//!
//! The reconciliation job and the instance lifecycle only need four
//! operations from the conferencing backend. They are expressed as an
//! object-safe trait so the job can run against the HTTP client or a test
//! double.

use std::future::Future;
use std::pin::Pin;

use quickom_core::MeetingRecord;

use crate::error::ProviderResult;
use crate::schema::ProviderMeeting;

/// Boxed future used by [`MeetingProvider`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single meeting lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum MeetingLookup {
    /// The provider returned the meeting.
    Found(ProviderMeeting),
    /// The meeting does not exist or has expired.
    NotFound,
}

impl MeetingLookup {
    /// Returns the meeting, if found.
    pub fn found(self) -> Option<ProviderMeeting> {
        match self {
            Self::Found(meeting) => Some(meeting),
            Self::NotFound => None,
        }
    }
}

/// Meeting operations against the conferencing backend.
pub trait MeetingProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &str;

    /// Creates a meeting from `record` and returns the provider's view of it.
    fn create_meeting<'a>(
        &'a self,
        record: &'a MeetingRecord,
    ) -> BoxFuture<'a, ProviderResult<ProviderMeeting>>;

    /// Pushes `record` to the meeting identified by its alias.
    fn update_meeting<'a>(&'a self, record: &'a MeetingRecord) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes the meeting. A meeting already gone is not an error.
    fn delete_meeting<'a>(&'a self, record: &'a MeetingRecord) -> BoxFuture<'a, ProviderResult<()>>;

    /// Fetches one meeting or webinar.
    fn get_meeting_or_webinar_info<'a>(
        &'a self,
        meeting_id: &'a str,
        webinar: bool,
    ) -> BoxFuture<'a, ProviderResult<MeetingLookup>>;
}
