//! Fetch execution.
//!
//! A fetch runs the external downloader for one entry and reports how it
//! ended. The trait seam lets the service layer and tests swap the real
//! subprocess out for a scripted double.

use std::path::PathBuf;
use std::process::Command;

use tracing::{info, warn};

use crate::entry_store::EntryKind;

/// What a fetch should retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// Fetch everything for a provider id of the given kind.
    ById { kind: EntryKind, id: String },
    /// Fetch the best match for a free-text query of the given kind.
    BySearch { kind: EntryKind, query: String },
}

impl FetchTarget {
    pub fn kind(&self) -> EntryKind {
        match self {
            FetchTarget::ById { kind, .. } => *kind,
            FetchTarget::BySearch { kind, .. } => *kind,
        }
    }
}

/// Why a fetch did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The command ran and exited non-zero (or was killed by a signal).
    ExitCode(Option<i32>),
    /// The command could not be launched at all.
    Launch(String),
}

/// Terminal outcome of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failure(FailureReason),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success)
    }
}

/// Runs one fetch to completion. Implementations block until the underlying
/// work finishes; the job queue provides the serialization.
pub trait FetchExecutor: Send + Sync {
    fn run(&self, target: &FetchTarget) -> FetchOutcome;
}

/// Executes fetches by invoking the downloader program as a subprocess.
///
/// Id fetches become `<program> download <source> <kind> <id>`, search
/// fetches become `<program> luckysearch <source> <kind> <query>`.
pub struct CommandFetchExecutor {
    program: PathBuf,
    workdir: PathBuf,
    source: String,
}

impl CommandFetchExecutor {
    pub fn new(program: PathBuf, workdir: PathBuf, source: impl Into<String>) -> Self {
        Self {
            program,
            workdir,
            source: source.into(),
        }
    }

    fn build_command(&self, target: &FetchTarget) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.workdir);
        match target {
            FetchTarget::ById { kind, id } => {
                cmd.args(["download", &self.source, kind.as_str(), id]);
            }
            FetchTarget::BySearch { kind, query } => {
                cmd.args(["luckysearch", &self.source, kind.as_str(), query]);
            }
        }
        cmd
    }
}

impl FetchExecutor for CommandFetchExecutor {
    fn run(&self, target: &FetchTarget) -> FetchOutcome {
        let mut cmd = self.build_command(target);
        info!("Launching fetch: {:?}", cmd);
        match cmd.status() {
            Ok(status) if status.success() => FetchOutcome::Success,
            Ok(status) => {
                warn!("Fetch exited with {}", status);
                FetchOutcome::Failure(FailureReason::ExitCode(status.code()))
            }
            Err(e) => {
                warn!("Failed to launch fetch: {}", e);
                FetchOutcome::Failure(FailureReason::Launch(e.to_string()))
            }
        }
    }
}
