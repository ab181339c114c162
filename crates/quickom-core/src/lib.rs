//! Core types: meeting records, time conversion, meeting state, launch links

pub mod links;
pub mod meeting;
pub mod state;
pub mod time;
pub mod tracing;

pub use links::{LinkError, host_launch_url, participant_launch_url};
pub use meeting::{AudioMode, MeetingOptions, MeetingRecord, MeetingType, strip_markup};
pub use state::{MeetingState, MeetingStatus, MeetingSummary};
pub use time::{format_provider_time, minutes_to_seconds, parse_provider_time, seconds_to_minutes_ceil};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
