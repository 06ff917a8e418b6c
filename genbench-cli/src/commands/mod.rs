//! Command handlers behind the `genbench` subcommands

pub mod benchmark;
pub mod config;
pub mod report;

pub use benchmark::{handle_run, handle_run_one, RunOverrides};
pub use config::{handle_config_generate, handle_config_show, handle_config_validate, load_config};
pub use report::{handle_collect, handle_report};

/// How a command ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    /// Stopped by an operator interrupt
    Interrupted,
}

impl Completion {
    /// Process exit status: 0, or 130 after an interrupt
    pub fn exit_code(self) -> u8 {
        match self {
            Completion::Done => 0,
            Completion::Interrupted => 130,
        }
    }
}
