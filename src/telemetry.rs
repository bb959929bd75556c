use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// filter from `RUST_LOG`, falling back to `default_level`
pub fn env_filter(default_level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|source| TelemetryError::EnvFilter {
            value: default_level.to_string(),
            source,
        }),
    }
}

/// install a compact fmt subscriber for the process
pub fn init(default_level: &str) -> Result<(), TelemetryError> {
    let filter = env_filter(default_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_default_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = env_filter("info,[=").unwrap_err();
        assert!(err.to_string().contains("info,[="));
    }

    #[test]
    fn test_init_installs_once() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let _ = init("warn");
        assert!(matches!(init("warn"), Err(TelemetryError::Subscriber(_))));
    }

    #[test]
    fn test_valid_default_level() {
        assert!(env_filter("ride_hailing_rs=debug").is_ok());
    }
}
