use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sessionlock",
    version,
    about = "Contention harness for session-owned fair locks",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock random keys from many sessions and verify mutual exclusion
    Stress {
        /// Concurrent sessions, one thread each
        #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
        sessions: u32,

        /// Size of the shared key pool
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
        keys: u32,

        /// Acquisitions attempted per session
        #[arg(long, default_value_t = 100)]
        rounds: u32,

        /// Upper bound on how long each acquisition is held (e.g. "2ms")
        #[arg(long, value_name = "DURATION", default_value = "2ms")]
        hold: String,

        /// Give up on a key after this long ("inf" waits forever)
        #[arg(short = 't', long, value_name = "DURATION")]
        timeout: Option<String>,

        /// Reentrant acquisitions stacked on each successful lock
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        depth: u32,
    },

    /// Queue waiters behind a holder and verify they acquire in arrival order
    Fifo {
        /// Number of queued sessions
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
        waiters: u32,

        /// How long each waiter keeps the lock once it gets it
        #[arg(long, value_name = "DURATION", default_value = "5ms")]
        hold: String,
    },
}
