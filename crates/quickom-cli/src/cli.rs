//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// quickom - keep LMS meeting records in step with Quickom
#[derive(Debug, Parser)]
#[command(name = "quickom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the JSON store, overriding the configuration
    #[arg(long, env = "QUICKOM_STORE")]
    pub store: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one reconciliation pass and print its report
    Sync {
        /// Stop after this many seconds, overriding the configuration
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Run reconciliation passes periodically until interrupted
    Watch {
        /// Seconds between passes, overriding the configuration
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Fetch one meeting from the provider and print it
    Check {
        /// Provider meeting id
        meeting_id: String,

        /// Look the id up among webinars
        #[arg(long)]
        webinar: bool,
    },

    /// Manage stored meetings
    Meetings {
        #[command(subcommand)]
        action: MeetingsAction,
    },

    /// Import past sessions from the usage reports
    Import {
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,

        /// Last day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Map a participant email to a local user, as EMAIL=ID (can be repeated)
        #[arg(long = "user", value_parser = parse_user_mapping, action = clap::ArgAction::Append)]
        users: Vec<(String, i64)>,
    },

    /// Export or erase participant data
    Privacy {
        #[command(subcommand)]
        action: PrivacyAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn parse_user_mapping(value: &str) -> Result<(String, i64), String> {
    let (email, id) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected EMAIL=ID, got `{}`", value))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid user id in `{}`", value))?;
    Ok((email.trim().to_string(), id))
}

/// Meeting management actions.
#[derive(Debug, Subcommand)]
pub enum MeetingsAction {
    /// List stored meetings with their current status
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create a meeting on the provider and store it
    Add {
        /// Owning course id
        #[arg(long)]
        course: i64,

        /// Meeting name
        #[arg(long)]
        name: String,

        /// Description
        #[arg(long)]
        intro: Option<String>,

        /// Start time, RFC 3339 (ignored for recurring meetings)
        #[arg(long)]
        start: Option<String>,

        /// Duration in minutes
        #[arg(long, default_value = "60")]
        duration_minutes: i64,

        /// Recurring meeting without a fixed time
        #[arg(long)]
        recurring: bool,

        /// Create a webinar instead of a meeting
        #[arg(long)]
        webinar: bool,

        /// Meeting passcode
        #[arg(long)]
        password: Option<String>,

        /// Grade: >0 max points, <0 negated scale id
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        grade: i64,
    },

    /// Delete a stored meeting and its provider meeting
    Delete {
        /// Local meeting id
        id: i64,
    },

    /// Create a new provider meeting for a record missing on the provider
    Recreate {
        /// Local meeting id
        id: i64,

        /// Provider user that will host the meeting
        #[arg(long)]
        host_id: String,
    },

    /// Print the launch URL for a user
    Launch {
        /// Local meeting id
        id: i64,

        /// Local user id
        #[arg(long)]
        user_id: i64,

        /// Display name passed to the provider
        #[arg(long)]
        name: String,

        /// Start the meeting as host
        #[arg(long)]
        host: bool,
    },
}

/// Privacy actions.
#[derive(Debug, Subcommand)]
pub enum PrivacyAction {
    /// Describe the personal data stored
    Metadata,

    /// List meetings holding data about a user
    Contexts {
        /// Local user id
        user_id: i64,
    },

    /// Export a user's data as JSON
    Export {
        /// Local user id
        user_id: i64,

        /// Limit to these meeting ids (default: all of the user's meetings)
        #[arg(long, value_delimiter = ',')]
        meetings: Vec<i64>,
    },

    /// Erase participant data
    Delete {
        /// Meeting to erase from
        #[arg(long)]
        meeting: Option<i64>,

        /// Users to erase (default: everyone in the meeting)
        #[arg(long, value_delimiter = ',')]
        users: Vec<i64>,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
