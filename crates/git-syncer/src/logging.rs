//! Logging initialization and secret redaction.

use std::io::{self, Write};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::expand::Secrets;
use crate::settings::{LogFormat, LogSettings};

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `settings.level`. Every line is passed through `secrets` before it is
/// written to stdout.
///
/// # Errors
///
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
pub fn init(settings: &LogSettings, secrets: Secrets) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)?,
    };
    let writer = RedactingMakeWriter::new(io::stdout, secrets);
    let registry = tracing_subscriber::registry().with(filter);

    match settings.format {
        LogFormat::Full => registry
            .with(fmt::layer().with_target(true).with_writer(writer))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(writer))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_writer(writer))
            .try_init()?,
    }

    Ok(())
}

/// A writer that buffers output line by line and redacts secrets before
/// handing each line to the inner writer.
pub struct RedactingWriter<W: Write> {
    inner: W,
    secrets: Secrets,
    buffer: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, secrets: Secrets) -> Self {
        Self {
            inner,
            secrets,
            buffer: Vec::new(),
        }
    }

    fn write_redacted(&mut self, end: usize) -> io::Result<()> {
        let line = String::from_utf8_lossy(&self.buffer[..end]);
        let redacted = self.secrets.redact(&line);
        self.inner.write_all(redacted.as_bytes())?;
        self.buffer.drain(..end);
        Ok(())
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            self.write_redacted(newline + 1)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.write_redacted(self.buffer.len())?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Wraps a [`MakeWriter`] so that everything written is redacted.
pub struct RedactingMakeWriter<M> {
    inner: M,
    secrets: Secrets,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, secrets: Secrets) -> Self {
        Self { inner, secrets }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(self.inner.make_writer(), self.secrets.clone())
    }
}
