use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Track your time from the command line, offline first")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage time slots
    Slot {
        #[command(subcommand)]
        command: SlotCommands,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Manage domains
    Domain {
        #[command(subcommand)]
        command: DomainCommands,
    },
    /// Manage daily logs
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Sync with the remote store
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect the outbox queue
    Outbox {
        /// Only events that exhausted their retries
        #[arg(long)]
        failed: bool,
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in and migrate local data to the account
    Login {
        /// Account identifier
        owner_id: String,
    },
    /// Sign out; local data stays put
    Logout,
}

#[derive(Subcommand)]
pub enum SlotCommands {
    /// Record a time slot
    #[command(alias = "new")]
    Add {
        /// Start time (RFC 3339, e.g. 2026-08-28T09:00:00Z)
        #[arg(long)]
        start: String,
        /// End time (RFC 3339)
        #[arg(long)]
        end: String,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Tag names to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Energy level (1-5)
        #[arg(long)]
        energy: Option<i32>,
        /// Mood level (1-5)
        #[arg(long)]
        mood: Option<i32>,
    },
    /// List recent slots
    List {
        /// Number of slots to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing slot
    Edit {
        /// Slot ID or unique ID prefix
        id: String,
        /// New start time (RFC 3339)
        #[arg(long)]
        start: Option<String>,
        /// New end time (RFC 3339)
        #[arg(long)]
        end: Option<String>,
        /// New note
        #[arg(long)]
        note: Option<String>,
        /// Replace attached tags (repeatable)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        /// New energy level (1-5)
        #[arg(long)]
        energy: Option<i32>,
        /// New mood level (1-5)
        #[arg(long)]
        mood: Option<i32>,
    },
    /// Delete a slot
    Delete {
        /// Slot ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Create a tag
    #[command(alias = "new")]
    Add {
        /// Tag name
        name: String,
        /// Display color
        #[arg(long, default_value = "#4A90D9")]
        color: String,
        /// Domain name to file the tag under
        #[arg(long)]
        domain: Option<String>,
    },
    /// List tags
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a tag, detaching it from all slots
    Delete {
        /// Tag name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum DomainCommands {
    /// Create a domain
    #[command(alias = "new")]
    Add {
        /// Domain name
        name: String,
        /// Display color
        #[arg(long, default_value = "#7B6CC4")]
        color: String,
    },
    /// List domains
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a domain with no live tags
    Delete {
        /// Domain name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Write (or overwrite) the log for a date
    Write {
        /// Calendar date (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<String>,
        /// Reflection text
        reflection: String,
        /// Highlights (repeatable)
        #[arg(long = "highlight")]
        highlights: Vec<String>,
    },
    /// Show the log for a date
    Show {
        /// Calendar date (YYYY-MM-DD); today when omitted
        date: Option<String>,
    },
    /// List recent logs
    List {
        /// Number of logs to show
        #[arg(short, long, default_value = "14")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Run one sync cycle now
    Now,
    /// Show queue depth and last cycle outcome
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded pull conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
