//! Child process launching for the shell: blocking foreground runs,
//! fire-and-forget background runs, and a tracker that reaps background
//! children once they exit.

use std::io;
use std::process::{Child, Command, ExitStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command not found: {0}")]
    CommandNotFound(String),
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("empty command line")]
    EmptyCommandLine,
}

fn spawn(argv: &[String]) -> Result<Child, LaunchError> {
    let program = argv.first().ok_or(LaunchError::EmptyCommandLine)?;
    match Command::new(program).args(&argv[1..]).spawn() {
        Ok(child) => Ok(child),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(LaunchError::CommandNotFound(program.clone()))
        }
        Err(err) => Err(LaunchError::Spawn {
            command: program.clone(),
            source: err,
        }),
    }
}

/// Run `argv[0]` with the remaining arguments and wait for it to exit.
/// Stdio is inherited, so the child owns the terminal until it finishes.
pub fn launch_foreground(argv: &[String]) -> Result<ExitStatus, LaunchError> {
    let mut child = spawn(argv)?;
    child.wait().map_err(|source| LaunchError::Spawn {
        command: argv[0].clone(),
        source,
    })
}

/// Spawn `argv[0]` without waiting. The caller owns the returned handle
/// and is expected to hand it to a [`BackgroundTracker`] so the child is
/// reaped after it exits.
pub fn launch_background(argv: &[String]) -> Result<Child, LaunchError> {
    spawn(argv)
}

/// Holds handles of background children and collects the ones that have
/// exited. `reap` is non-blocking and safe to call every dispatch cycle.
#[derive(Debug, Default)]
pub struct BackgroundTracker {
    children: Vec<Child>,
}

impl BackgroundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, child: Child) {
        self.children.push(child);
    }

    /// Number of children not yet observed to have exited.
    pub fn active(&self) -> usize {
        self.children.len()
    }

    /// Collect exit statuses of finished children; returns how many were
    /// reaped. Children still running (or whose status probe failed) stay
    /// tracked.
    pub fn reap(&mut self) -> usize {
        let before = self.children.len();
        self.children
            .retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
        before - self.children.len()
    }
}
