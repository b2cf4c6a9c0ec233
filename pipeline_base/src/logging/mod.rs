//! Logging module for the strategy pipeline
//!
//! Code-tagged events with structured context, emitted through the `log`
//! facade. The library never installs a logger; binaries choose one
//! (`env_logger` in the SDK CLI).

pub mod codes;
pub mod events;
pub mod macros;

use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

pub use codes::Code;
pub use events::{LogEvent, LogLevel};

/// Target used for every record emitted by this crate
pub const LOG_TARGET: &str = "pipeline_base";

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Install logging preferences once per process
pub fn init_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Logging preferences already initialized".to_string())
}

/// Environment defaults are captured on first use when nothing was installed
fn preferences() -> &'static LoggingPreferences {
    RUNTIME_PREFERENCES.get_or_init(LoggingPreferences::default)
}

/// Whether an event at `level` passes the configured minimum level
pub fn should_log(level: LogLevel) -> bool {
    level <= preferences().min_level
}

/// Emit an event through the `log` facade
pub fn log_event(event: LogEvent) {
    if !should_log(event.level) {
        return;
    }
    let line = if preferences().structured {
        event.render_structured()
    } else {
        event.render()
    };
    log::log!(target: LOG_TARGET, event.level.to_log_level(), "{}", line);
}

fn build_event(mut event: LogEvent, context: Vec<(&str, &str)>) -> LogEvent {
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    event
}

/// Used by `log_error!`
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    log_event(build_event(LogEvent::error(code, message), context));
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    log_event(build_event(LogEvent::success(code, message), context));
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    log_event(build_event(LogEvent::info(message), context));
}

/// Used by `log_warning!`
pub fn log_warning_with_context(message: &str, context: Vec<(&str, &str)>) {
    log_event(build_event(LogEvent::warning(message), context));
}

/// Used by `log_debug!`
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    log_event(build_event(LogEvent::debug(message), context));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preferences_filter_debug() {
        // No preferences installed in unit tests: defaults apply.
        assert!(should_log(LogLevel::Error));
        assert!(should_log(LogLevel::Info));
        assert!(!should_log(LogLevel::Debug));
    }

    #[test]
    fn preferences_are_resolved_once() {
        assert!(std::ptr::eq(preferences(), preferences()));
    }

    #[test]
    fn macros_expand_with_display_context() {
        crate::log_info!("registry loaded", "count" => 3, "kinds" => "filter");
        crate::log_error!(codes::system::INTERNAL_ERROR, "boom");
        crate::log_debug!("skipped duplicate", "value" => "filter/demo");
        crate::log_warning!("careful");
        crate::log_success!(codes::success::REGISTRY_LOADED, "ok", "count" => 1usize);
    }
}
