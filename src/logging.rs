//! Two-axis log filtering: criticality (the tracing level) and verbosity.
//!
//! Events opt into a verbosity with a `verbosity = "MIN" | "MED" | "FULL"`
//! field (default MED). An event is written when its level is at least the
//! minimum criticality and its verbosity is at most the maximum verbosity.
//! Lines look like `[09:00:01][INF_MIN][RUN][handle_pm_work_items]message`,
//! where the bracketed context is the innermost span, or `-`.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use chrono::Local;
use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// How much detail an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Min,
    Med,
    Full,
}

impl Verbosity {
    /// Unknown names fall back to MED.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "MIN" => Self::Min,
            "FULL" => Self::Full,
            _ => Self::Med,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Med => "MED",
            Self::Full => "FULL",
        }
    }
}

/// Minimum criticality by name; unknown names fall back to INFO.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "DEBUG" | "TRACE" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn crit_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERR",
        Level::WARN => "WRN",
        Level::INFO => "INF",
        _ => "DBG",
    }
}

/// Render one line, without the trailing newline.
pub fn format_line(
    time: &str,
    level: &Level,
    verbosity: Verbosity,
    source: &str,
    context: &str,
    message: &str,
) -> String {
    format!(
        "[{}][{}_{}][{}][{}]{}",
        time,
        crit_label(level),
        verbosity.as_str(),
        source,
        context,
        message
    )
}

#[derive(Default)]
struct EventFields {
    message: String,
    verbosity: Option<Verbosity>,
    extra: String,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "verbosity" => self.verbosity = Some(Verbosity::parse(value)),
            "message" => self.message.push_str(value),
            name => {
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{:?}", value);
            }
            "verbosity" => self.verbosity = Some(Verbosity::parse(&format!("{:?}", value))),
            name => {
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }
}

/// Writes events passing both thresholds to every sink.
pub struct TwoVectorLayer {
    min_crit: Level,
    max_verb: Verbosity,
    sinks: Vec<Mutex<Box<dyn Write + Send>>>,
}

impl TwoVectorLayer {
    pub fn new(min_crit: Level, max_verb: Verbosity) -> Self {
        Self {
            min_crit,
            max_verb,
            sinks: Vec::new(),
        }
    }

    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.sinks.push(Mutex::new(Box::new(writer)));
        self
    }

    pub fn passes(&self, level: &Level, verbosity: Verbosity) -> bool {
        *level <= self.min_crit && verbosity <= self.max_verb
    }
}

impl<S> Layer<S> for TwoVectorLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > self.min_crit {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);
        let verbosity = fields.verbosity.unwrap_or(Verbosity::Med);
        if !self.passes(meta.level(), verbosity) {
            return;
        }

        let context = ctx.event_span(event).map(|s| s.name()).unwrap_or("-");
        let message = fields.message + &fields.extra;
        let line = format_line(
            &Local::now().format("%H:%M:%S").to_string(),
            meta.level(),
            verbosity,
            meta.target(),
            context,
            &message,
        );

        for sink in &self.sinks {
            if let Ok(mut w) = sink.lock() {
                let _ = writeln!(w, "{}", line);
                let _ = w.flush();
            }
        }
    }
}

/// Thresholds chosen on the command line, overriding the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub min_crit: Option<Level>,
    pub max_verb: Option<Verbosity>,
}

impl Overrides {
    /// `-q` keeps errors only; `-v` adds debug events, `-vv` also full detail.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self {
                min_crit: Some(Level::ERROR),
                max_verb: None,
            };
        }
        match verbose {
            0 => Self::default(),
            1 => Self {
                min_crit: Some(Level::DEBUG),
                max_verb: None,
            },
            _ => Self {
                min_crit: Some(Level::DEBUG),
                max_verb: Some(Verbosity::Full),
            },
        }
    }
}

/// Install the global subscriber: stderr plus the configured log file.
///
/// `RUST_LOG`, when set, narrows what reaches the layer.
pub fn init(config: &LoggingConfig, overrides: Overrides) -> Result<()> {
    let level = overrides
        .min_crit
        .unwrap_or_else(|| parse_level(&config.min_crit));
    let verbosity = overrides
        .max_verb
        .unwrap_or_else(|| Verbosity::parse(&config.max_verb));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;
    writeln!(file, "=== Log Session Started: {} ===", Local::now().format("%Y-%m-%d"))?;

    let layer = TwoVectorLayer::new(level, verbosity)
        .with_writer(io::stderr())
        .with_writer(file);
    let env_filter =
        std::env::var_os("RUST_LOG").and_then(|_| EnvFilter::try_from_default_env().ok());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {}", e)))
}
