//! Personal data held about meeting participants.
//!
//! Participant rows are the only personal data stored. This module answers
//! which meetings hold data for a user, exports it, and erases it per
//! meeting or per user.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::StoreResult;
use crate::session::SessionDetails;
use crate::store::SessionStore;

/// A stored table and the personal fields it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub table: &'static str,
    pub fields: &'static [&'static str],
}

/// Describes the personal data this plugin stores.
pub fn metadata() -> Vec<TableMetadata> {
    vec![
        TableMetadata {
            table: "quickom_meeting_participants",
            fields: &[
                "name",
                "user_email",
                "join_time",
                "leave_time",
                "duration",
                "attentiveness_score",
            ],
        },
        TableMetadata {
            table: "quickom_meeting_details",
            fields: &["topic"],
        },
    ]
}

/// One exported participation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedParticipation {
    pub instance_id: i64,
    pub topic: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub join_time: String,
    pub leave_time: String,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attentiveness_score: Option<String>,
}

fn rfc3339(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Export and erasure over the session store.
#[derive(Clone)]
pub struct PrivacyProvider {
    sessions: Arc<dyn SessionStore>,
}

impl PrivacyProvider {
    /// Creates a provider over `sessions`.
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    fn sessions_by_id(&self) -> StoreResult<HashMap<i64, SessionDetails>> {
        Ok(self
            .sessions
            .sessions()?
            .into_iter()
            .map(|s| (s.id, s))
            .collect())
    }

    /// Instances holding participant rows for `user_id`.
    pub fn contexts_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let sessions = self.sessions_by_id()?;
        let instances: BTreeSet<i64> = self
            .sessions
            .participants()?
            .iter()
            .filter(|p| p.user_id == Some(user_id))
            .filter_map(|p| sessions.get(&p.details_id).map(|s| s.instance_id))
            .collect();
        Ok(instances.into_iter().collect())
    }

    /// Distinct users with participant rows in an instance.
    pub fn users_in_meeting(&self, instance_id: i64) -> StoreResult<Vec<i64>> {
        let sessions = self.sessions_by_id()?;
        let users: BTreeSet<i64> = self
            .sessions
            .participants()?
            .iter()
            .filter(|p| {
                sessions
                    .get(&p.details_id)
                    .is_some_and(|s| s.instance_id == instance_id)
            })
            .filter_map(|p| p.user_id)
            .collect();
        Ok(users.into_iter().collect())
    }

    /// Everything stored about `user_id` in the given instances.
    pub fn export_user_data(
        &self,
        user_id: i64,
        instances: &[i64],
    ) -> StoreResult<Vec<ExportedParticipation>> {
        let sessions = self.sessions_by_id()?;
        let mut rows: Vec<ExportedParticipation> = self
            .sessions
            .participants()?
            .into_iter()
            .filter(|p| p.user_id == Some(user_id))
            .filter_map(|p| {
                let session = sessions.get(&p.details_id)?;
                if !instances.contains(&session.instance_id) {
                    return None;
                }
                Some(ExportedParticipation {
                    instance_id: session.instance_id,
                    topic: session.topic.clone(),
                    name: p.name,
                    user_email: p.user_email,
                    join_time: rfc3339(p.join_time),
                    leave_time: rfc3339(p.leave_time),
                    duration: p.duration,
                    attentiveness_score: p.attentiveness_score,
                })
            })
            .collect();
        rows.sort_by(|a, b| (a.instance_id, &a.join_time).cmp(&(b.instance_id, &b.join_time)));
        Ok(rows)
    }

    /// Erases every participant of an instance.
    pub fn delete_for_meeting(&self, instance_id: i64) -> StoreResult<usize> {
        let ids = self.session_ids(&[instance_id])?;
        let removed = self
            .sessions
            .delete_participants(&|p| ids.contains(&p.details_id))?;
        info!(instance_id, removed, "erased meeting participants");
        Ok(removed)
    }

    /// Erases one user's rows in the given instances.
    pub fn delete_for_user(&self, user_id: i64, instances: &[i64]) -> StoreResult<usize> {
        let ids = self.session_ids(instances)?;
        let removed = self.sessions.delete_participants(&|p| {
            p.user_id == Some(user_id) && ids.contains(&p.details_id)
        })?;
        info!(user_id, removed, "erased user participation");
        Ok(removed)
    }

    /// Erases the rows of several users in one instance.
    pub fn delete_users_in_meeting(&self, instance_id: i64, users: &[i64]) -> StoreResult<usize> {
        let ids = self.session_ids(&[instance_id])?;
        let removed = self.sessions.delete_participants(&|p| {
            ids.contains(&p.details_id) && p.user_id.is_some_and(|u| users.contains(&u))
        })?;
        info!(instance_id, users = users.len(), removed, "erased users in meeting");
        Ok(removed)
    }

    fn session_ids(&self, instances: &[i64]) -> StoreResult<BTreeSet<i64>> {
        Ok(self
            .sessions
            .sessions()?
            .into_iter()
            .filter(|s| instances.contains(&s.instance_id))
            .map(|s| s.id)
            .collect())
    }
}
