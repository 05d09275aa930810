use decision_graph::config::SettingsError;
use decision_graph::error::{DecisionError, LoadError};
use decision_graph::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Settings(SettingsError),
    Telemetry(TelemetryError),
    Load(LoadError),
    Decision(DecisionError),
    Serialize(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Settings(err) => write!(f, "settings error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Load(err) => write!(f, "load error: {}", err),
            AppError::Decision(err) => write!(f, "{}", err),
            AppError::Serialize(err) => write!(f, "serialization error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Settings(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Load(err) => Some(err),
            AppError::Decision(err) => Some(err),
            AppError::Serialize(err) => Some(err),
            AppError::Io(err) => Some(err),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<LoadError> for AppError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<DecisionError> for AppError {
    fn from(value: DecisionError) -> Self {
        Self::Decision(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
