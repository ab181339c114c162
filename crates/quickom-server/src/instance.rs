//! Activity instance lifecycle.
//!
//! Adding, editing, deleting and recreating a meeting instance keeps three
//! places in step: the provider, the local store, and the host calendar and
//! gradebook.

use std::sync::Arc;

use tracing::{info, warn};

use quickom_core::{MeetingRecord, host_launch_url, participant_launch_url};
use quickom_providers::{MeetingProvider, apply_provider_meeting};

use crate::collaborators::{CalendarEvent, CalendarSink, GradeBook, GradeItem};
use crate::error::{StoreError, SyncError, SyncResult};
use crate::store::{MeetingStore, SessionStore};

/// Who is opening a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joiner {
    pub user_id: i64,
    pub full_name: String,
    /// Hosts start the meeting; everyone else joins it.
    pub is_host: bool,
}

/// Drives instance changes through the provider and the host.
#[derive(Clone)]
pub struct InstanceManager {
    provider: Arc<dyn MeetingProvider>,
    store: Arc<dyn MeetingStore>,
    sessions: Arc<dyn SessionStore>,
    calendar: Arc<dyn CalendarSink>,
    grades: Arc<dyn GradeBook>,
}

impl InstanceManager {
    /// Creates a manager over the given collaborators.
    pub fn new(
        provider: Arc<dyn MeetingProvider>,
        store: Arc<dyn MeetingStore>,
        sessions: Arc<dyn SessionStore>,
        calendar: Arc<dyn CalendarSink>,
        grades: Arc<dyn GradeBook>,
    ) -> Self {
        Self {
            provider,
            store,
            sessions,
            calendar,
            grades,
        }
    }

    fn load(&self, id: i64) -> SyncResult<MeetingRecord> {
        self.store
            .get(id)?
            .ok_or(SyncError::Store(StoreError::NotFound { id }))
    }

    fn refresh_host(&self, record: &MeetingRecord) -> SyncResult<()> {
        self.calendar.upsert_event(&CalendarEvent::from_record(record))?;
        self.grades.upsert_item(&GradeItem::from_record(record))?;
        Ok(())
    }

    /// Creates the meeting on the provider and stores it.
    pub async fn add_instance(&self, new: MeetingRecord) -> SyncResult<MeetingRecord> {
        let created = self.provider.create_meeting(&new).await?;
        let mut record = apply_provider_meeting(&new, &created);
        record.exists_on_provider = true;

        let record = self.store.insert(record)?;
        self.refresh_host(&record)?;
        info!(id = record.id, course = record.course, meeting_id = %record.meeting_id, "instance added");
        Ok(record)
    }

    /// Pushes an edited record to the provider and stores it.
    ///
    /// Returns false when the stored record has no alias, or the provider
    /// rejects the update; local state is left untouched in both cases.
    pub async fn update_instance(&self, edited: MeetingRecord) -> SyncResult<bool> {
        let stored = self.load(edited.id)?;
        let Some(alias) = stored.alias.clone().filter(|a| !a.is_empty()) else {
            warn!(id = stored.id, "instance has no alias, not updating");
            return Ok(false);
        };

        let mut record = edited;
        record.alias = Some(alias);
        record.webinar = stored.webinar;
        record.meeting_id = stored.meeting_id.clone();

        if let Err(e) = self.provider.update_meeting(&record).await {
            warn!(id = record.id, error = %e, "provider rejected update");
            return Ok(false);
        }

        let record = self.store.update(record)?;
        self.refresh_host(&record)?;
        info!(id = record.id, "instance updated");
        Ok(true)
    }

    /// Deletes the meeting everywhere. Returns false for an unknown id.
    pub async fn delete_instance(&self, id: i64) -> SyncResult<bool> {
        let Some(record) = self.store.get(id)? else {
            return Ok(false);
        };

        if record.exists_on_provider {
            self.provider.delete_meeting(&record).await?;
        }

        self.sessions.delete_sessions_for(id)?;
        self.store.delete(id)?;
        self.calendar.delete_event(id)?;
        self.grades.delete_item(record.course, id)?;
        info!(id, course = record.course, "instance deleted");
        Ok(true)
    }

    /// Creates a fresh provider meeting for a record the provider lost.
    pub async fn recreate_instance(&self, id: i64, host_id: &str) -> SyncResult<MeetingRecord> {
        let mut record = self.load(id)?;
        record.host_id = Some(host_id.to_string());

        let created = self.provider.create_meeting(&record).await?;
        let mut record = apply_provider_meeting(&record, &created);
        record.exists_on_provider = true;

        let record = self.store.update(record)?;
        self.calendar.upsert_event(&CalendarEvent::from_record(&record))?;
        info!(id, meeting_id = %record.meeting_id, "instance recreated");
        Ok(record)
    }

    /// Returns the URL `joiner` should open.
    ///
    /// Participants joining a graded meeting receive the full grade.
    pub fn launch(&self, id: i64, joiner: &Joiner) -> SyncResult<String> {
        let record = self.load(id)?;
        if !record.exists_on_provider {
            return Err(SyncError::Unavailable { id });
        }

        if joiner.is_host {
            return Ok(host_launch_url(&record)?);
        }

        let url = participant_launch_url(&record, &joiner.full_name)?;
        if record.grade > 0 {
            self.grades
                .set_grade(record.course, record.id, joiner.user_id, record.grade)?;
        }
        Ok(url)
    }
}
