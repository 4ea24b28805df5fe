//! CLI argument parsing for pivot

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pv")]
#[command(author, version, about = "Mood/budget/location plan composer", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new event and print its path
    New {
        /// Owner handle, e.g. your first name
        #[arg(required = true)]
        owner: String,

        /// Display name of the event
        #[arg(required = true)]
        name: String,
    },

    /// Show an event's plan, alternates and details
    Show {
        /// Event path (`/<owner>/<slug>`) or share link
        #[arg(required = true)]
        event: String,
    },

    /// Compose a fresh plan
    Build {
        #[arg(required = true)]
        event: String,
    },

    /// Re-roll the plan, keeping pinned venues
    Pivot {
        #[arg(required = true)]
        event: String,
    },

    /// Toggle the keep pin on a plan venue
    Keep {
        #[arg(required = true)]
        event: String,

        /// Venue id
        #[arg(required = true)]
        id: String,
    },

    /// Swap an alternate into the plan
    Replace {
        #[arg(required = true)]
        event: String,

        /// Alternate venue id
        #[arg(required = true)]
        alternate: String,

        /// Plan slot (1-based); required when several slots are open
        #[arg(short, long)]
        slot: Option<usize>,
    },

    /// Change vibes, price cap or start point
    Prefs {
        #[arg(required = true)]
        event: String,

        /// Vibes to select (replaces the current set)
        #[arg(short, long, value_delimiter = ',')]
        vibes: Option<Vec<String>>,

        /// Price cap, 1-3
        #[arg(short, long)]
        price: Option<i64>,

        /// Start preset label, or a place to geocode
        #[arg(short, long)]
        start: Option<String>,
    },

    /// Print a share link
    Share {
        #[arg(required = true)]
        event: String,

        /// Embed the plan's venues so the link works without a search
        #[arg(long)]
        live: bool,
    },

    /// Manage the checklist
    Check {
        #[arg(required = true)]
        event: String,

        #[command(subcommand)]
        action: CheckAction,
    },

    /// Replace the notes
    Note {
        #[arg(required = true)]
        event: String,

        #[arg(required = true)]
        text: String,
    },

    /// Set or clear an external link (e.g. tickets, reservation)
    Link {
        #[arg(required = true)]
        event: String,

        #[arg(required = true)]
        name: String,

        /// URL; omit to clear the link
        url: Option<String>,
    },

    /// Post a comment to an event's thread
    Comment {
        #[arg(required = true)]
        event: String,

        #[arg(required = true)]
        text: String,

        /// Display name when not signed in
        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// List an event's comments
    Comments {
        #[arg(required = true)]
        event: String,
    },

    /// Look up a start location
    Geocode {
        #[arg(required = true)]
        query: String,
    },

    /// Sign in with an ID token, or show the current account
    SignIn {
        /// ID token; omit to show the current account
        token: Option<String>,
    },

    /// Forget the signed-in account
    SignOut,
}

#[derive(Subcommand, Debug)]
pub enum CheckAction {
    /// Add an item
    Add {
        #[arg(required = true)]
        text: String,
    },

    /// Toggle an item's done flag
    Toggle {
        #[arg(required = true)]
        id: String,
    },

    /// Remove an item
    Remove {
        #[arg(required = true)]
        id: String,
    },
}
