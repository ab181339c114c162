//! Quickom sync daemon.
//!
//! Keeps locally stored meeting records in step with the provider. The
//! pieces are:
//!
//! - [`store`]: meeting and session persistence
//! - [`reconcile`]: the reconciliation pass over every known meeting
//! - [`instance`]: add, edit, delete and recreate meeting instances
//! - [`reports`]: import of past sessions from the usage reports
//! - [`privacy`]: export and erasure of participant data
//! - [`scheduler`]: periodic passes with jitter and backoff
//!
//! The host LMS is reached only through the traits in [`collaborators`].

pub mod collaborators;
pub mod config;
pub mod error;
pub mod instance;
pub mod privacy;
pub mod reconcile;
pub mod reports;
pub mod scheduler;
pub mod session;
pub mod store;

pub use collaborators::{
    CalendarEvent, CalendarSink, CourseCache, GradeBook, GradeItem, GradeType, MemoryCalendar,
    MemoryCourseCache, MemoryGradeBook, MemoryUserDirectory, UserDirectory,
};
pub use config::SyncConfig;
pub use error::{CollaboratorError, StoreError, StoreResult, SyncError, SyncResult};
pub use instance::{InstanceManager, Joiner};
pub use privacy::{ExportedParticipation, PrivacyProvider, TableMetadata};
pub use reconcile::{ReconcileReport, Reconciler};
pub use reports::{ImportReport, ReportImporter};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle, SchedulerState};
pub use session::{Participant, SessionDetails};
pub use store::{LocalStore, MeetingStore, SessionStore};
