//! Meeting reconciliation.
//!
//! Walks every record still believed to exist on the provider, fetches its
//! current state and writes back whatever changed. Records are independent:
//! a failure on one is logged and the pass moves on. Course cache
//! invalidations are collected and issued once per course at the end.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use quickom_core::MeetingRecord;
use quickom_providers::{MeetingLookup, MeetingProvider, ProviderResult, apply_provider_meeting};

use crate::collaborators::{CalendarEvent, CalendarSink, CourseCache};
use crate::error::{StoreError, SyncResult};
use crate::store::MeetingStore;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Records fetched from the provider.
    pub checked: usize,
    /// Records written back with provider changes.
    pub updated: usize,
    /// Records that matched the provider.
    pub unchanged: usize,
    /// Records newly marked as gone from the provider.
    pub missing: usize,
    /// Writes skipped because the record was edited meanwhile.
    pub conflicts: usize,
    /// Local writes that failed for another reason.
    pub failures: usize,
    /// Calendar events refreshed.
    pub calendar_updates: usize,
    /// Courses whose module cache was invalidated.
    pub invalidated_courses: Vec<i64>,
    /// The pass stopped early on cancellation or deadline.
    pub cancelled: bool,
}

enum Fetch {
    Done(ProviderResult<MeetingLookup>),
    Interrupted,
}

/// Reconciles stored meetings against the provider.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn MeetingProvider>,
    store: Arc<dyn MeetingStore>,
    calendar: Arc<dyn CalendarSink>,
    courses: Arc<dyn CourseCache>,
}

impl Reconciler {
    /// Creates a reconciler over the given collaborators.
    pub fn new(
        provider: Arc<dyn MeetingProvider>,
        store: Arc<dyn MeetingStore>,
        calendar: Arc<dyn CalendarSink>,
        courses: Arc<dyn CourseCache>,
    ) -> Self {
        Self {
            provider,
            store,
            calendar,
            courses,
        }
    }

    /// Runs one pass.
    ///
    /// Fails only if the store cannot be listed. Stops before the next
    /// record once `cancel` fires or `deadline` passes; invalidations
    /// collected so far are still applied.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> SyncResult<ReconcileReport> {
        let span = info_span!("reconcile", provider = self.provider.name());
        self.run_inner(cancel, deadline).instrument(span).await
    }

    async fn run_inner(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> SyncResult<ReconcileReport> {
        let records = self.store.existing()?;
        info!(records = records.len(), "starting reconciliation");

        let mut report = ReconcileReport::default();
        let mut stale_courses = BTreeSet::new();

        for record in records {
            if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                report.cancelled = true;
                break;
            }

            let lookup = match self.fetch(&record, cancel, deadline).await {
                Fetch::Done(result) => result,
                Fetch::Interrupted => {
                    report.cancelled = true;
                    break;
                }
            };
            report.checked += 1;

            match lookup {
                Ok(MeetingLookup::Found(meeting)) => {
                    let candidate = apply_provider_meeting(&record, &meeting);
                    self.apply(&record, candidate, &mut report, &mut stale_courses);
                }
                Ok(MeetingLookup::NotFound) => {
                    warn!(id = record.id, meeting_id = %record.meeting_id, "meeting not found on provider");
                    self.mark_missing(&record, &mut report);
                }
                Err(e) => {
                    warn!(id = record.id, meeting_id = %record.meeting_id, error = %e, "fetch failed, marking meeting missing");
                    self.mark_missing(&record, &mut report);
                }
            }
        }

        for course in &stale_courses {
            self.courses.invalidate(*course);
        }
        report.invalidated_courses = stale_courses.into_iter().collect();

        info!(
            checked = report.checked,
            updated = report.updated,
            missing = report.missing,
            conflicts = report.conflicts,
            cancelled = report.cancelled,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn fetch(
        &self,
        record: &MeetingRecord,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Fetch {
        let call = self
            .provider
            .get_meeting_or_webinar_info(&record.meeting_id, record.webinar);
        let expiry = async {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Fetch::Interrupted,
            _ = expiry => Fetch::Interrupted,
            result = call => Fetch::Done(result),
        }
    }

    fn apply(
        &self,
        record: &MeetingRecord,
        candidate: MeetingRecord,
        report: &mut ReconcileReport,
        stale_courses: &mut BTreeSet<i64>,
    ) {
        if record.same_ignoring_start_url(&candidate) {
            report.unchanged += 1;
            return;
        }

        let renamed = record.name != candidate.name;
        let calendar_changed = record.calendar_fields_differ(&candidate);

        let saved = match self.store.update_if_unchanged(candidate, record.time_modified) {
            Ok(saved) => saved,
            Err(e) => {
                self.record_write_failure(record, e, report);
                return;
            }
        };
        report.updated += 1;
        debug!(id = saved.id, renamed, calendar_changed, "meeting updated from provider");

        if renamed {
            stale_courses.insert(saved.course);
        }
        if calendar_changed {
            match self.calendar.upsert_event(&CalendarEvent::from_record(&saved)) {
                Ok(()) => report.calendar_updates += 1,
                Err(e) => warn!(id = saved.id, error = %e, "calendar update failed"),
            }
        }
    }

    fn mark_missing(&self, record: &MeetingRecord, report: &mut ReconcileReport) {
        let mut gone = record.clone();
        gone.exists_on_provider = false;
        match self.store.update_if_unchanged(gone, record.time_modified) {
            Ok(_) => report.missing += 1,
            Err(e) => self.record_write_failure(record, e, report),
        }
    }

    fn record_write_failure(&self, record: &MeetingRecord, err: StoreError, report: &mut ReconcileReport) {
        if err.is_conflict() {
            info!(id = record.id, "meeting edited during sync, skipping");
            report.conflicts += 1;
        } else {
            warn!(id = record.id, error = %err, "failed to save meeting");
            report.failures += 1;
        }
    }
}
