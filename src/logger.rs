//!
//! A colored, level-filtered logger suitable for tracing a simulation
//! run from the command line.
//!

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

static ACTIVE: AtomicBool = AtomicBool::new(true);

/// The logger installed by [`install`]/[`try_install`].
#[derive(Debug)]
pub struct SimLogger {
    max_level: LevelFilter,
}

impl SimLogger {
    fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    fn level_color(level: Level) -> Color {
        match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Magenta,
        }
    }
}

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && ACTIVE.load(Ordering::Relaxed)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stream = match record.level() {
            Level::Error => StandardStream::stderr(ColorChoice::Auto),
            _ => StandardStream::stdout(ColorChoice::Auto),
        };

        let muted = ColorSpec::new().set_fg(Some(Color::Rgb(0x7f, 0x8c, 0x8d))).clone();
        let level_color = ColorSpec::new().set_fg(Some(Self::level_color(record.level()))).clone();

        let _ = stream.set_color(&muted);
        let _ = write!(&mut stream, "[ ");
        let _ = stream.set_color(&level_color);
        let _ = write!(&mut stream, "{:5}", record.level());
        let _ = stream.set_color(&muted);
        let _ = write!(&mut stream, " {:>12} ] ", record.target());
        let _ = stream.reset();
        let _ = writeln!(&mut stream, "{}", record.args());
    }

    fn flush(&self) {}
}

/// Reads the maximum log level from `RUST_LOG`, defaulting to `Info`
/// if it is unset or unparseable.
fn env_max_level() -> LevelFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| LevelFilter::from_str(&v).ok())
        .unwrap_or(LevelFilter::Info)
}

///
/// Installs a colored logger reading its level from `RUST_LOG`,
/// panicking if a logger was already installed.
///
/// Call this once, near the start of a binary that uses this crate's
/// simulator. Library code should never call it.
///
pub fn install() {
    try_install().expect("a logger was already installed");
}

/// As [`install`], but returns the underlying [`SetLoggerError`]
/// instead of panicking if a logger is already installed.
pub fn try_install() -> Result<(), SetLoggerError> {
    let max_level = env_max_level();
    log::set_boxed_logger(Box::new(SimLogger::new(max_level)))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Temporarily silences (or re-enables) every logger installed through
/// this module, regardless of level. Useful around test assertions that
/// would otherwise be interleaved with trace output.
pub fn set_active(active: bool) {
    ACTIVE.store(active, Ordering::Relaxed);
}
