//! Import of past sessions and participants from the usage reports.
//!
//! Report endpoints draw from the client's call budget, so a run over a long
//! window may stop early. A session is only stored once its participant list
//! was read in full, and sessions are keyed by occurrence uuid, so the next
//! run picks up where the budget ran out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use quickom_core::{MeetingRecord, parse_provider_time};
use quickom_providers::quickom::QuickomProvider;
use quickom_providers::{ParticipantReport, ProviderError, ProviderErrorCode, ReportMeeting};

use crate::collaborators::UserDirectory;
use crate::error::SyncResult;
use crate::session::{Participant, SessionDetails};
use crate::store::{MeetingStore, SessionStore};

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Hosts whose reports were read.
    pub hosts: usize,
    /// Sessions stored.
    pub sessions: usize,
    /// Participant rows stored.
    pub participants: usize,
    /// Report entries for meetings not known locally.
    pub unknown: usize,
    /// Sessions already imported earlier.
    pub skipped: usize,
    /// Hosts or sessions whose report could not be read.
    pub failures: usize,
    /// The report call budget ran out before the window was covered.
    pub budget_exhausted: bool,
}

/// Pulls session reports into the session store.
pub struct ReportImporter {
    provider: Arc<QuickomProvider>,
    store: Arc<dyn MeetingStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
}

impl ReportImporter {
    /// Creates an importer.
    pub fn new(
        provider: Arc<QuickomProvider>,
        store: Arc<dyn MeetingStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            provider,
            store,
            sessions,
            users,
        }
    }

    /// Imports every session held between `from` and `to`, both inclusive.
    pub async fn import(&self, from: NaiveDate, to: NaiveDate) -> SyncResult<ImportReport> {
        let mut report = ImportReport::default();

        let by_meeting_id: HashMap<String, MeetingRecord> = self
            .store
            .all()?
            .into_iter()
            .filter(|r| !r.meeting_id.is_empty())
            .map(|r| (r.meeting_id.clone(), r))
            .collect();
        let mut seen: HashSet<String> = self
            .sessions
            .sessions()?
            .into_iter()
            .map(|s| s.uuid)
            .collect();

        let hosts = self.provider.get_active_hosts_uuids(from, to).await?;
        info!(hosts = hosts.len(), %from, %to, "importing session reports");

        'hosts: for host in hosts {
            if self.provider.client().budget().remaining() == 0 {
                report.budget_exhausted = true;
                break;
            }
            report.hosts += 1;
            let meetings = match self.provider.get_user_report(&host, from, to).await {
                Ok(meetings) => meetings,
                Err(e) if is_budget_exhausted(&e) => {
                    warn!(host = %host, "report call budget exhausted, stopping import");
                    report.budget_exhausted = true;
                    break;
                }
                Err(e) => {
                    warn!(host = %host, error = %e, "cannot read host report");
                    report.failures += 1;
                    continue;
                }
            };

            for meeting in meetings {
                let (Some(id), Some(uuid)) = (meeting.id.clone(), meeting.uuid.clone()) else {
                    continue;
                };
                let Some(record) = by_meeting_id.get(&id) else {
                    debug!(meeting_id = %id, "report for unknown meeting");
                    report.unknown += 1;
                    continue;
                };
                if seen.contains(&uuid) {
                    report.skipped += 1;
                    continue;
                }

                let rows = match self
                    .provider
                    .get_meeting_participants(&uuid, record.webinar)
                    .await
                {
                    Ok(rows) => rows,
                    Err(e) if is_budget_exhausted(&e) => {
                        warn!(uuid = %uuid, "report call budget exhausted, stopping import");
                        report.budget_exhausted = true;
                        break 'hosts;
                    }
                    Err(e) => {
                        warn!(uuid = %uuid, error = %e, "cannot read participants");
                        report.failures += 1;
                        continue;
                    }
                };

                let session = self
                    .sessions
                    .insert_session(session_from_report(record, &meeting, &uuid))?;
                for row in rows {
                    self.sessions
                        .insert_participant(self.participant_from_report(session.id, row))?;
                    report.participants += 1;
                }
                seen.insert(uuid);
                report.sessions += 1;
            }
        }

        info!(
            sessions = report.sessions,
            participants = report.participants,
            failures = report.failures,
            budget_exhausted = report.budget_exhausted,
            "session import finished"
        );
        Ok(report)
    }

    fn participant_from_report(&self, details_id: i64, row: ParticipantReport) -> Participant {
        let user_id = row
            .user_email
            .as_deref()
            .and_then(|email| self.users.find_by_email(email));
        Participant {
            id: 0,
            details_id,
            user_id,
            name: row.name.unwrap_or_default(),
            user_email: row.user_email.filter(|e| !e.is_empty()),
            join_time: row.join_time.as_deref().and_then(parse_provider_time).unwrap_or(0),
            leave_time: row.leave_time.as_deref().and_then(parse_provider_time).unwrap_or(0),
            duration: row.duration.unwrap_or(0),
            attentiveness_score: row.attentiveness_score.filter(|s| !s.is_empty()),
        }
    }
}

fn is_budget_exhausted(error: &ProviderError) -> bool {
    error.code() == ProviderErrorCode::RateLimited
}

fn session_from_report(record: &MeetingRecord, meeting: &ReportMeeting, uuid: &str) -> SessionDetails {
    let start_time = meeting
        .start_time
        .as_deref()
        .and_then(parse_provider_time)
        .unwrap_or(0);
    let end_time = meeting
        .end_time
        .as_deref()
        .and_then(parse_provider_time)
        .unwrap_or(0);
    SessionDetails {
        id: 0,
        instance_id: record.id,
        meeting_id: record.meeting_id.clone(),
        uuid: uuid.to_string(),
        topic: meeting.topic.clone().unwrap_or_else(|| record.name.clone()),
        start_time,
        end_time,
        // Report durations are minutes.
        duration: meeting.duration.unwrap_or(0) * 60,
        participants_count: meeting.participants_count.unwrap_or(0),
    }
}
