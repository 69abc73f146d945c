//! Sync task descriptors.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::error::{Result, TaskError};

/// A compiled reference pattern.
///
/// Patterns are anchored at the start of the reference path but not at the
/// end, so `refs/heads/tmp` matches `refs/heads/tmp1` while `heads/tmp` does
/// not match anything under `refs/`.
#[derive(Clone)]
pub struct RefPattern {
    source: String,
    regex: Regex,
}

impl RefPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidPattern`] if the pattern is not a valid
    /// regular expression.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        let regex = Regex::new(&format!("^(?:{})", source))
            .map_err(|e| TaskError::invalid_pattern(source.clone(), e))?;

        Ok(Self { source, regex })
    }

    /// Returns the pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if the reference path matches this pattern.
    pub fn matches(&self, ref_path: &str) -> bool {
        self.regex.is_match(ref_path)
    }
}

impl fmt::Debug for RefPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefPattern").field(&self.source).finish()
    }
}

impl fmt::Display for RefPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for RefPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RefPattern {}

/// One mirroring unit: where to read from, where to write to, and which
/// references survive the trip.
///
/// Tasks are immutable once built. If no inclusion rule is configured, every
/// reference that is not excluded is mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRepoTask {
    /// Address of the repository to read from.
    source: String,

    /// Address of the repository to write to.
    target: String,

    /// Exact reference paths always kept (unless excluded).
    include_ref: HashSet<String>,

    /// A reference matching any of these is kept (unless excluded).
    include_ref_patterns: Vec<RefPattern>,

    /// Exact reference paths always dropped.
    exclude_ref: HashSet<String>,

    /// A reference matching any of these is dropped.
    exclude_ref_patterns: Vec<RefPattern>,
}

impl SyncRepoTask {
    /// Creates a new builder for SyncRepoTask.
    pub fn builder() -> SyncRepoTaskBuilder {
        SyncRepoTaskBuilder::default()
    }

    /// Returns the source repository address.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the target repository address.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the exact references always included.
    pub fn include_ref(&self) -> &HashSet<String> {
        &self.include_ref
    }

    /// Returns the inclusion patterns, in configuration order.
    pub fn include_ref_patterns(&self) -> &[RefPattern] {
        &self.include_ref_patterns
    }

    /// Returns the exact references always excluded.
    pub fn exclude_ref(&self) -> &HashSet<String> {
        &self.exclude_ref
    }

    /// Returns the exclusion patterns, in configuration order.
    pub fn exclude_ref_patterns(&self) -> &[RefPattern] {
        &self.exclude_ref_patterns
    }

    /// Returns true if no inclusion rule is configured.
    pub fn includes_everything(&self) -> bool {
        self.include_ref.is_empty() && self.include_ref_patterns.is_empty()
    }

    /// Returns true if the reference should be mirrored.
    ///
    /// Shorthand for [`is_ref_included`](crate::is_ref_included).
    pub fn includes(&self, ref_path: &str) -> bool {
        crate::filter::is_ref_included(ref_path, self)
    }
}

/// Builder for SyncRepoTask.
///
/// Patterns are collected as strings and compiled in [`build`](Self::build),
/// so a bad pattern is reported once, together with the text that caused it.
#[derive(Debug, Default)]
pub struct SyncRepoTaskBuilder {
    source: Option<String>,
    target: Option<String>,
    include_ref: HashSet<String>,
    include_ref_patterns: Vec<String>,
    exclude_ref: HashSet<String>,
    exclude_ref_patterns: Vec<String>,
}

impl SyncRepoTaskBuilder {
    /// Sets the source repository address.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the target repository address.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Adds an exact reference to always include.
    pub fn include_ref(mut self, ref_path: impl Into<String>) -> Self {
        self.include_ref.insert(ref_path.into());
        self
    }

    /// Adds several exact references to always include.
    pub fn include_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_ref.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Adds an inclusion pattern.
    pub fn include_ref_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.include_ref_patterns.push(pattern.into());
        self
    }

    /// Adds several inclusion patterns.
    pub fn include_ref_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_ref_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds an exact reference to always exclude.
    pub fn exclude_ref(mut self, ref_path: impl Into<String>) -> Self {
        self.exclude_ref.insert(ref_path.into());
        self
    }

    /// Adds several exact references to always exclude.
    pub fn exclude_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ref.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Adds an exclusion pattern.
    pub fn exclude_ref_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_ref_patterns.push(pattern.into());
        self
    }

    /// Adds several exclusion patterns.
    pub fn exclude_ref_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ref_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Builds the task.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` or `target` is missing, or if any pattern
    /// fails to compile.
    pub fn build(self) -> Result<SyncRepoTask> {
        let source = self.source.ok_or(TaskError::MissingField("source"))?;
        let target = self.target.ok_or(TaskError::MissingField("target"))?;

        Ok(SyncRepoTask {
            source,
            target,
            include_ref: self.include_ref,
            include_ref_patterns: compile_all(self.include_ref_patterns)?,
            exclude_ref: self.exclude_ref,
            exclude_ref_patterns: compile_all(self.exclude_ref_patterns)?,
        })
    }
}

fn compile_all(patterns: Vec<String>) -> Result<Vec<RefPattern>> {
    patterns.into_iter().map(RefPattern::new).collect()
}
