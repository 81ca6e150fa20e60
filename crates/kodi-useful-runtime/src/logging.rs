//! Logging setup for add-ons.
//!
//! Kodi does not forward the stdout of a plugin process to its own log, so an
//! installed add-on usually logs to a file. With `output = "file"` and no
//! explicit `file_path`, the log goes to the add-on's data directory inside
//! Kodi's profile:
//!
//! ```text
//! <userdata>/addon_data/<addon id>/<addon id>.log
//! ```
//!
//! where `<userdata>` is `$KODI_USERDATA` if set, otherwise the platform
//! default (`~/.kodi/userdata`, `%APPDATA%\Kodi\userdata`,
//! `~/Library/Application Support/Kodi/userdata`).
//!
//! ```rust,ignore
//! use kodi_useful_runtime::config::LogOutput;
//! use kodi_useful_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .addon("plugin.video.vk")
//!     .output(LogOutput::File)
//!     .directive("kodi_useful_router=debug")
//!     .init();
//! ```

use std::path::PathBuf;

use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Environment variable overriding the Kodi userdata directory.
pub const USERDATA_ENV: &str = "KODI_USERDATA";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Which span events are logged.
///
/// Every invocation runs inside an `addon` span and every dispatch inside a
/// `dispatch` span, so close events give the time spent per plugin call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Span creation and close, with busy/idle timings.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

// =============================================================================
// Kodi Paths
// =============================================================================

/// Kodi's userdata directory for the current user.
pub fn kodi_userdata_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(USERDATA_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        dirs::data_dir().map(|dir| dir.join("Kodi").join("userdata"))
    } else {
        dirs::home_dir().map(|dir| dir.join(".kodi").join("userdata"))
    }
}

/// Default log file of an add-on, inside its `addon_data` directory.
pub fn addon_log_path(addon_id: &str) -> Option<PathBuf> {
    if addon_id.is_empty() {
        return None;
    }
    kodi_userdata_dir().map(|dir| {
        dir.join("addon_data")
            .join(addon_id)
            .join(format!("{addon_id}.log"))
    })
}

/// Initializes logging for the add-on `addon_id` from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig, addon_id: &str) {
    let _ = LoggingBuilder::from_config(config).addon(addon_id).try_init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// Builds the subscriber for one add-on process.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    addon: Option<String>,
    level: Option<tracing::Level>,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    thread_ids: bool,
    file_location: bool,
}

impl LoggingBuilder {
    /// Compact lines on stdout at `INFO`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: Some(config.level.to_tracing_level()),
            directives: config
                .filters
                .iter()
                .map(|(module, level)| format!("{module}={}", level.as_str()))
                .collect(),
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            ..Self::new()
        }
    }

    /// Sets the add-on whose data directory receives the default log file.
    pub fn addon(mut self, addon_id: impl Into<String>) -> Self {
        self.addon = Some(addon_id.into()).filter(|id| !id.is_empty());
        self
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive, e.g. `kodi_useful_router=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Overrides the log file used by [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// The file [`LogOutput::File`] writes to: the explicit path, or the
    /// add-on's default log file.
    pub fn resolved_file_path(&self) -> Option<PathBuf> {
        self.file_path
            .clone()
            .or_else(|| self.addon.as_deref().and_then(addon_log_path))
    }

    /// `RUST_LOG` replaces the configured level; directives that fail to
    /// parse are returned instead of applied.
    fn build_filter(&self) -> (EnvFilter, Vec<&str>) {
        let level = self.level.unwrap_or(tracing::Level::INFO);
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

        let mut rejected = Vec::new();
        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => rejected.push(directive.as_str()),
            }
        }
        (filter, rejected)
    }

    fn file_writer(&self) -> Result<(BoxMakeWriter, PathBuf), String> {
        let path = self
            .resolved_file_path()
            .ok_or_else(|| "no log file and no add-on id configured".to_string())?;
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(format!("invalid log file path {}", path.display()));
        };
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(name.to_string_lossy())
            .build(dir)
            .map_err(|e| e.to_string())?;
        Ok((BoxMakeWriter::new(appender), path))
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let span_events = self.span_events.to_fmt_span();
        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location)
            .with_writer(writer);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Full => layer.boxed(),
        }
    }

    /// Installs the subscriber, ignoring an existing one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// A log file that cannot be opened falls back to stderr; the reason is
    /// logged once the subscriber is up.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.build_filter();

        let mut file_error = None;
        let mut log_file = None;
        let writer = match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => match self.file_writer() {
                Ok((writer, path)) => {
                    log_file = Some(path);
                    writer
                }
                Err(reason) => {
                    file_error = Some(reason);
                    BoxMakeWriter::new(std::io::stderr)
                }
            },
        };

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(filter)
            .try_init()?;

        if let Some(path) = log_file {
            debug!(addon = ?self.addon, path = %path.display(), "Logging to file");
        }
        if let Some(reason) = file_error {
            warn!(addon = ?self.addon, %reason, "Cannot open log file, logging to stderr");
        }
        for directive in rejected {
            warn!(directive, "Ignoring invalid log directive");
        }
        Ok(())
    }
}
