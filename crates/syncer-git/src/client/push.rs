//! Push results.

use std::fmt;

use crate::error::SyncError;

/// Per-reference status reported by `git push --porcelain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFlag {
    /// ` ` successfully pushed fast-forward.
    FastForward,
    /// `+` successful forced update.
    Forced,
    /// `-` successfully deleted.
    Deleted,
    /// `*` successfully pushed new reference.
    New,
    /// `!` rejected or failed to push.
    Rejected,
    /// `=` reference was up to date.
    UpToDate,
}

impl PushFlag {
    /// Parses the flag character of a porcelain line.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::FastForward),
            '+' => Some(Self::Forced),
            '-' => Some(Self::Deleted),
            '*' => Some(Self::New),
            '!' => Some(Self::Rejected),
            '=' => Some(Self::UpToDate),
            _ => None,
        }
    }

    /// Returns true if the reference was not pushed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// The outcome for one pushed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedRef {
    pub flag: PushFlag,
    /// Local side of the refspec. `None` for deletions.
    pub local_ref: Option<String>,
    pub remote_ref: String,
    /// Human-readable summary, e.g. `[new branch]` or `abc123..def456`.
    pub summary: String,
}

impl PushedRef {
    /// Returns true if this reference failed to push.
    pub fn is_failure(&self) -> bool {
        self.flag.is_failure()
    }
}

impl fmt::Display for PushedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.remote_ref, self.summary)
    }
}

/// Result of one mirror push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    refs: Vec<PushedRef>,
}

impl PushOutcome {
    /// Creates an outcome from per-reference results.
    pub fn new(refs: Vec<PushedRef>) -> Self {
        Self { refs }
    }

    /// Returns every reported reference.
    pub fn refs(&self) -> &[PushedRef] {
        &self.refs
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Returns true if no reference failed.
    pub fn is_success(&self) -> bool {
        !self.refs.iter().any(PushedRef::is_failure)
    }

    /// Returns the references that failed to push.
    pub fn failures(&self) -> Vec<PushedRef> {
        self.refs.iter().filter(|r| r.is_failure()).cloned().collect()
    }

    /// Turns a partially failed push into an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PushRejected`] listing every failed reference.
    pub fn into_result(self, target: &str) -> Result<Self, SyncError> {
        if self.is_success() {
            return Ok(self);
        }

        Err(SyncError::PushRejected {
            target: target.to_string(),
            failures: self.failures(),
        })
    }
}

/// Parses the standard output of `git push --porcelain`.
///
/// Reference lines have the shape `<flag>\t<from>:<to>\t<summary>`. The
/// `To <url>` header and the trailing `Done` are skipped, as is anything else
/// that does not look like a reference line.
pub fn parse_porcelain(stdout: &str) -> PushOutcome {
    let refs = stdout.lines().filter_map(parse_line).collect();
    PushOutcome::new(refs)
}

fn parse_line(line: &str) -> Option<PushedRef> {
    let mut parts = line.splitn(3, '\t');
    let flag_part = parts.next()?;
    let refspec = parts.next()?;
    let summary = parts.next().unwrap_or_default();

    let mut flag_chars = flag_part.chars();
    let flag = PushFlag::from_char(flag_chars.next()?)?;
    if flag_chars.next().is_some() {
        return None;
    }

    let (from, to) = refspec.split_once(':')?;
    if to.is_empty() {
        return None;
    }

    Some(PushedRef {
        flag,
        local_ref: (!from.is_empty()).then(|| from.to_string()),
        remote_ref: to.to_string(),
        summary: summary.trim_end_matches('\n').to_string(),
    })
}
