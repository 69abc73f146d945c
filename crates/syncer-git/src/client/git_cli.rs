//! Git client backed by the system `git` binary.
//!
//! gitoxide does not support push yet, so clone, reference edits, remote
//! registration and push go through the `git` CLI. Reading references uses
//! gix directly, which understands loose and packed refs without spawning a
//! process.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{GitClient, MirrorRepo, PushOutcome, parse_porcelain};
use crate::error::SyncError;

/// How often a running git process is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// [`GitClient`] implementation that shells out to `git`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

/// Why a git process produced no output.
enum RunError {
    Io(std::io::Error),
    Cancelled,
}

impl RunError {
    fn into_sync_error(self, wrap: impl FnOnce(String) -> SyncError) -> SyncError {
        match self {
            Self::Io(e) => wrap(e.to_string()),
            Self::Cancelled => SyncError::Cancelled,
        }
    }
}

impl GitCli {
    /// Creates a client using `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Creates a client using a specific git executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the git executable in use.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs git to completion, killing it as soon as `cancel` fires.
    fn run<I, S>(
        &self,
        cwd: Option<&Path>,
        args: I,
        cancel: &CancellationToken,
    ) -> Result<Output, RunError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(RunError::Io)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        loop {
            if let Some(status) = child.try_wait().map_err(RunError::Io)? {
                return Ok(Output {
                    status,
                    stdout: collect(stdout),
                    stderr: collect(stderr),
                });
            }

            if cancel.is_cancelled() {
                debug!("Killing git process {} after cancellation", child.id());
                let _ = child.kill();
                let _ = child.wait();
                // The pipe readers end on their own once the pipes close.
                return Err(RunError::Cancelled);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a child pipe to the end on its own thread, so a chatty process never
/// blocks on a full pipe while it is being polled.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader.and_then(|r| r.join().ok()).unwrap_or_default()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl GitClient for GitCli {
    fn clone_mirror(
        &self,
        source: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MirrorRepo, SyncError> {
        debug!("git clone --mirror into {:?}", path);

        let output = self
            .run(
                None,
                [
                    OsStr::new("clone"),
                    OsStr::new("--mirror"),
                    OsStr::new("--quiet"),
                    OsStr::new(source),
                    path.as_os_str(),
                ],
                cancel,
            )
            .map_err(|e| e.into_sync_error(|m| SyncError::clone_failed(source, m)))?;

        if !output.status.success() {
            return Err(SyncError::clone_failed(source, stderr_of(&output)));
        }

        Ok(MirrorRepo::new(path))
    }

    fn list_references(&self, repo: &MirrorRepo) -> Result<Vec<String>, SyncError> {
        let git_repo = gix::open(repo.path())
            .map_err(|e| SyncError::list_references(format!("Failed to open repo: {}", e)))?;

        let platform = git_repo
            .references()
            .map_err(|e| SyncError::list_references(format!("Failed to get refs: {}", e)))?;

        let mut refs = Vec::new();
        for reference in platform
            .all()
            .map_err(|e| SyncError::list_references(format!("Failed to iterate refs: {}", e)))?
        {
            let reference = reference
                .map_err(|e| SyncError::list_references(format!("Failed to read ref: {}", e)))?;
            refs.push(reference.name().as_bstr().to_string());
        }

        Ok(refs)
    }

    fn delete_reference(
        &self,
        repo: &MirrorRepo,
        ref_path: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let delete_error = |message: String| SyncError::DeleteReference {
            reference: ref_path.to_string(),
            message,
        };

        let output = self
            .run(Some(repo.path()), ["update-ref", "-d", ref_path], cancel)
            .map_err(|e| e.into_sync_error(delete_error))?;

        if !output.status.success() {
            return Err(delete_error(stderr_of(&output)));
        }

        Ok(())
    }

    fn add_remote(
        &self,
        repo: &MirrorRepo,
        name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let add_remote_error = |message: String| SyncError::AddRemote {
            name: name.to_string(),
            url: url.to_string(),
            message,
        };

        let output = self
            .run(Some(repo.path()), ["remote", "add", name, url], cancel)
            .map_err(|e| e.into_sync_error(add_remote_error))?;

        if !output.status.success() {
            return Err(add_remote_error(stderr_of(&output)));
        }

        Ok(())
    }

    fn push_mirror(
        &self,
        repo: &MirrorRepo,
        remote: &str,
        cancel: &CancellationToken,
    ) -> Result<PushOutcome, SyncError> {
        let output = self
            .run(
                Some(repo.path()),
                ["push", "--mirror", "--porcelain", remote],
                cancel,
            )
            .map_err(|e| e.into_sync_error(|m| SyncError::push(remote, m)))?;

        let outcome = parse_porcelain(&String::from_utf8_lossy(&output.stdout));

        // A rejected reference makes git exit non-zero too; that case is
        // reported through the outcome's failures. Any other non-zero exit is
        // a failed push, whatever reference lines were printed.
        if !output.status.success() && outcome.is_success() {
            return Err(SyncError::push(remote, stderr_of(&output)));
        }

        Ok(outcome)
    }
}
