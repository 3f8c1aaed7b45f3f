mod args;
mod fifo_command;
mod stress_command;

use sessionlock::Result;
pub use args::{Args, Command};

pub fn run(args: Args) -> Result<()> {
    let quiet = args.quiet;
    match args.command {
        cmd @ Command::Stress { .. } => stress_command::execute_stress(cmd, quiet),
        cmd @ Command::Fifo { .. } => fifo_command::execute_fifo(cmd, quiet),
    }
}
