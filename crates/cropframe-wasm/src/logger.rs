//! `log` sink that forwards records to the browser console.
//!
//! Installed once by [`init`](crate::init). Levels map onto the matching
//! console methods (`console.error`, `console.warn`, `console.info`,
//! `console.debug`); `trace` also goes to `console.debug`.

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Forwards `log` records to `web_sys::console`.
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        emit(record.level(), &format_record(record));
    }

    fn flush(&self) {}
}

/// `[level target] message`
pub(crate) fn format_record(record: &Record) -> String {
    format!(
        "[{} {}] {}",
        record.level(),
        record.target(),
        record.args()
    )
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, message: &str) {
    let value = JsValue::from_str(message);
    match level {
        Level::Error => web_sys::console::error_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Info => web_sys::console::info_1(&value),
        Level::Debug | Level::Trace => web_sys::console::debug_1(&value),
    }
}

// Console imports only exist in a wasm host
#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, _message: &str) {}

/// Install the console logger. Safe to call more than once.
pub(crate) fn install(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Parse a level name (`"off"`, `"error"`, `"warn"`, `"info"`, `"debug"`,
/// `"trace"`), case-insensitively.
pub(crate) fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse::<LevelFilter>().ok()
}

/// Change the console log level.
///
/// # Example
///
/// ```typescript
/// set_log_level('debug');
/// ```
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter = parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {}", level)))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record() {
        let formatted = format_record(
            &Record::builder()
                .args(format_args!("opened {}x{}", 4, 3))
                .level(Level::Debug)
                .target("cropframe_core::session")
                .build(),
        );

        assert_eq!(formatted, "[DEBUG cropframe_core::session] opened 4x3");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_enabled_follows_max_level() {
        let metadata = Metadata::builder().level(Level::Error).build();
        log::set_max_level(LevelFilter::Warn);
        assert!(ConsoleLogger.enabled(&metadata));

        let metadata = Metadata::builder().level(Level::Trace).build();
        assert!(!ConsoleLogger.enabled(&metadata));
    }
}
