//! Logger factory mapping a verbosity level to a minimum severity.

use std::fmt::Display;

use tracing::level_filters::LevelFilter;
use tracing::Level;

/// How chatty the program should be.
///
/// | verbosity | emitted from |
/// |-----------|--------------|
/// | 0         | WARN         |
/// | 1         | INFO         |
/// | 2         | DEBUG        |
/// | 3+        | TRACE        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Verbosity(pub u8);

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self.0 {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Whether progress bars should be drawn
    pub fn shows_progress(self) -> bool {
        self.0 >= 2
    }
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        Verbosity(level)
    }
}

impl From<bool> for Verbosity {
    fn from(verbose: bool) -> Self {
        Verbosity(verbose as u8)
    }
}

/// A named logger with its own severity threshold.
///
/// Events are forwarded to `tracing` with the logger name attached, but only
/// when they pass the threshold, so two loggers sharing a subscriber can run
/// at different verbosities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: String,
    threshold: LevelFilter,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> LevelFilter {
        self.threshold
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.threshold >= level
    }

    pub fn log(&self, level: Level, message: impl Display) {
        if !self.enabled(level) {
            return;
        }
        let logger = self.name.as_str();
        match level {
            Level::ERROR => tracing::error!(logger, "{}", message),
            Level::WARN => tracing::warn!(logger, "{}", message),
            Level::INFO => tracing::info!(logger, "{}", message),
            Level::DEBUG => tracing::debug!(logger, "{}", message),
            _ => tracing::trace!(logger, "{}", message),
        }
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::ERROR, message)
    }

    pub fn warn(&self, message: impl Display) {
        self.log(Level::WARN, message)
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::INFO, message)
    }

    pub fn debug(&self, message: impl Display) {
        self.log(Level::DEBUG, message)
    }

    pub fn trace(&self, message: impl Display) {
        self.log(Level::TRACE, message)
    }
}

/// Create a logger for `name` that emits according to `verbosity`
pub fn get_logger(name: impl Into<String>, verbosity: impl Into<Verbosity>) -> Logger {
    let verbosity: Verbosity = verbosity.into();
    Logger {
        name: name.into(),
        threshold: verbosity.level_filter(),
    }
}

/// Install the global fmt subscriber. `verbosity` sets the level for this
/// crate, `RUST_LOG` everything else; repeated calls are no-ops.
pub fn init_tracing(verbosity: impl Into<Verbosity>) -> anyhow::Result<()> {
    let verbosity: Verbosity = verbosity.into();
    let level = verbosity.level_filter();
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
        .add_directive(format!("rs_deepnog={}", level).parse()?)
        .add_directive(format!("deepnog={}", level).parse()?);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}
