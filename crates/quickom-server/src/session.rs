//! Recorded sessions and their participants.

use serde::{Deserialize, Serialize};

/// One past occurrence of a meeting instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDetails {
    pub id: i64,
    /// Local meeting record the session belongs to.
    pub instance_id: i64,
    /// Provider meeting id.
    pub meeting_id: String,
    /// Provider occurrence id.
    pub uuid: String,
    pub topic: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Seconds.
    pub duration: i64,
    pub participants_count: i64,
}

/// One attendee row of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub id: i64,
    pub details_id: i64,
    /// Local user, when the email matched one.
    pub user_id: Option<i64>,
    pub name: String,
    pub user_email: Option<String>,
    pub join_time: i64,
    pub leave_time: i64,
    /// Seconds.
    pub duration: i64,
    pub attentiveness_score: Option<String>,
}
