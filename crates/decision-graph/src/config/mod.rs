use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Multi-line output while developing, one line per event elsewhere.
    pub const fn default_log_format(self) -> LogFormat {
        match self {
            Self::Development => LogFormat::Pretty,
            Self::Test | Self::Production => LogFormat::Compact,
        }
    }
}

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub evaluation: EvaluationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("DECISION_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("DECISION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let format = match env::var("DECISION_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value).ok_or(SettingsError::InvalidLogFormat { value })?,
            Err(_) => environment.default_log_format(),
        };

        let evaluate_expressions = match env::var("DECISION_EVAL_EXPRESSIONS") {
            Ok(value) => parse_flag(&value).ok_or(SettingsError::InvalidFlag {
                name: "DECISION_EVAL_EXPRESSIONS",
                value,
            })?,
            Err(_) => true,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level, format },
            evaluation: EvaluationSettings {
                evaluate_expressions,
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Layout of log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvaluationSettings {
    /// Evaluate arithmetic such as `2*150` in text cells of the input table.
    pub evaluate_expressions: bool,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum SettingsError {
    InvalidFlag { name: &'static str, value: String },
    InvalidLogFormat { value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
            SettingsError::InvalidLogFormat { value } => {
                write!(f, "DECISION_LOG_FORMAT must be compact or pretty, got '{value}'")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("DECISION_ENV");
        env::remove_var("DECISION_LOG_LEVEL");
        env::remove_var("DECISION_EVAL_EXPRESSIONS");
        env::remove_var("DECISION_LOG_FORMAT");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Pretty);
        assert!(config.evaluation.evaluate_expressions);
    }

    #[test]
    fn reads_overrides_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DECISION_ENV", "ci");
        env::set_var("DECISION_LOG_LEVEL", "decision_graph=debug");
        env::set_var("DECISION_EVAL_EXPRESSIONS", "off");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.telemetry.log_level, "decision_graph=debug");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(!config.evaluation.evaluate_expressions);
        reset_env();
    }

    #[test]
    fn log_format_overrides_environment_default() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DECISION_ENV", "production");
        env::set_var("DECISION_LOG_FORMAT", " Pretty ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.format, LogFormat::Pretty);

        env::set_var("DECISION_LOG_FORMAT", "json");
        let error = AppConfig::load().expect_err("unknown format");
        assert_eq!(
            error.to_string(),
            "DECISION_LOG_FORMAT must be compact or pretty, got 'json'"
        );
        reset_env();
    }

    #[test]
    fn rejects_unparseable_flag() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DECISION_EVAL_EXPRESSIONS", "maybe");
        let error = AppConfig::load().expect_err("flag must be boolean");
        assert_eq!(
            error.to_string(),
            "DECISION_EVAL_EXPRESSIONS must be true or false, got 'maybe'"
        );
        reset_env();
    }
}
