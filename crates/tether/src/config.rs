use std::sync::OnceLock;

/// Environment variable holding the activation markers.
pub const ENV_VAR: &str = "TETHER";

/// Marker that turns on fault reporting.
pub const FAULT_REPORT_MARKER: &str = "fault-report";

/// Marker that keeps signal reporting but leaves the panic hook alone.
pub const NO_PANIC_HOOK_MARKER: &str = "no-panic-hook";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Install fatal-signal handlers.
    pub fault_report: bool,
    /// Also report panics. Only meaningful with `fault_report`.
    pub panic_hook: bool,
}

impl Config {
    pub fn from_env() -> Self {
        match std::env::var_os(ENV_VAR) {
            Some(value) => Self::parse(&value.to_string_lossy()),
            None => Self::default(),
        }
    }

    /// Markers are matched as substrings, so they can ride along in a longer
    /// value such as `TETHER=fault-report,no-panic-hook`.
    pub fn parse(value: &str) -> Self {
        let fault_report = value.contains(FAULT_REPORT_MARKER);
        Self {
            fault_report,
            panic_hook: fault_report && !value.contains(NO_PANIC_HOOK_MARKER),
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// The process configuration, read from the environment on first call.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_empty_means_disabled() {
        assert_eq!(Config::parse(""), Config::default());
        assert!(!Config::parse("verbose").fault_report);
    }

    #[test]
    fn marker_enables_signals_and_panics() {
        let config = Config::parse("fault-report");
        assert!(config.fault_report);
        assert!(config.panic_hook);
    }

    #[test]
    fn marker_is_found_inside_a_longer_value() {
        assert!(Config::parse("log,fault-report,other").fault_report);
        assert!(Config::parse("/opt/hooks/fault-report.so").fault_report);
    }

    #[test]
    fn panic_hook_can_be_opted_out() {
        let config = Config::parse("fault-report,no-panic-hook");
        assert!(config.fault_report);
        assert!(!config.panic_hook);
    }

    #[test]
    fn opting_out_of_panics_alone_enables_nothing() {
        assert_eq!(Config::parse("no-panic-hook"), Config::default());
    }
}
