use clap::{Parser, Subcommand};

/// access-gate — hand out a protected script once an admin approves the requester
#[derive(Parser)]
#[command(name = "access-gate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gate server
    Serve {
        /// Port to bind (overrides GATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Poll the gate until approved, then run the released script
    Poll {
        /// Email to request access for; prompted on stdin when omitted
        #[arg(short, long)]
        email: Option<String>,
        /// Gate base URL (overrides GATE_URL)
        #[arg(long)]
        url: Option<String>,
        /// Seconds between polls (overrides GATE_POLL_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
        /// Total seconds to wait (overrides GATE_POLL_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
        /// Program the script is piped into (overrides GATE_INTERPRETER)
        #[arg(long)]
        interpreter: Option<String>,
    },

    /// Inspect and decide access records without the web panel
    Access {
        #[command(subcommand)]
        command: AccessCommands,
    },
}

#[derive(Subcommand)]
pub enum AccessCommands {
    /// List all access records
    List,
    /// Approve an email that has already requested access
    Approve { email: String },
    /// Reject an email that has already requested access
    Reject { email: String },
}
