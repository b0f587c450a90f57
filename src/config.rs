use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} not set")]
    MissingField(&'static str),
    #[error("invalid interval {value:?}: {reason}")]
    InvalidInterval { value: String, reason: String },
    #[error("unsupported auth context {0:?}, only \"header\" is supported")]
    UnsupportedAuthContext(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub datasource: Option<DataSourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub api_id: i32,
    pub api_hash: String,
    pub phone_number: String,
    pub contact_name: String,
    pub buy_button: Option<BuyButtonConfig>,
}

/// Optional inline-button press performed after the agent's first reply,
/// identified by its position in the reply keyboard. The button label must
/// contain `marker` before it is pressed.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyButtonConfig {
    pub row: usize,
    pub col: usize,
    pub marker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub host: String,
    pub port: u16,
    pub method: String,
    pub auth: AuthConfig,
    pub interval: String,
    pub params: HashMap<String, String>,
    pub token_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub context: String,
    pub name: String,
    pub value: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.telegram.validate()?;
        Ok(config)
    }

    /// Feed mode additionally requires a complete `[datasource]` section.
    /// Checked before any transport work, so a bad feed config never walks
    /// the user through login first.
    pub fn validate_feed(&self) -> Result<&DataSourceConfig, ConfigError> {
        let datasource = self
            .datasource
            .as_ref()
            .ok_or(ConfigError::MissingField("datasource"))?;
        datasource.validate()?;
        Ok(datasource)
    }
}

impl TelegramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_id == 0 {
            return Err(ConfigError::MissingField("telegram.api_id"));
        }
        if self.api_hash.is_empty() {
            return Err(ConfigError::MissingField("telegram.api_hash"));
        }
        if self.phone_number.is_empty() {
            return Err(ConfigError::MissingField("telegram.phone_number"));
        }
        if self.contact_name.is_empty() {
            return Err(ConfigError::MissingField("telegram.contact_name"));
        }
        Ok(())
    }
}

impl fmt::Display for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // api_hash and phone number are credentials, keep them out of the logs
        write!(
            f,
            "\nTelegram Config:\n  api_id: {}\n  contact_name: {}",
            self.api_id, self.contact_name
        )
    }
}

impl DataSourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingField("datasource.host"));
        }
        if self.port == 0 {
            return Err(ConfigError::MissingField("datasource.port"));
        }
        if self.method.is_empty() {
            return Err(ConfigError::MissingField("datasource.method"));
        }
        if self.auth.context.is_empty() {
            return Err(ConfigError::MissingField("datasource.auth.context"));
        }
        if self.auth.context != "header" {
            return Err(ConfigError::UnsupportedAuthContext(
                self.auth.context.clone(),
            ));
        }
        if self.auth.name.is_empty() {
            return Err(ConfigError::MissingField("datasource.auth.name"));
        }
        if self.auth.value.is_empty() {
            return Err(ConfigError::MissingField("datasource.auth.value"));
        }
        if self.params.is_empty() {
            return Err(ConfigError::MissingField("datasource.params"));
        }
        if self.token_path.is_empty() {
            return Err(ConfigError::MissingField("datasource.token_path"));
        }
        self.interval()?;
        Ok(())
    }

    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval).map_err(|reason| ConfigError::InvalidInterval {
            value: self.interval.clone(),
            reason,
        })
    }
}

impl fmt::Display for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\nDataSource Config:\n  host: {}\n  port: {}\n  method: {}\n  interval: {}\n  token_path: {}\n  auth header: {}",
            self.host, self.port, self.method, self.interval, self.token_path, self.auth.name
        )
    }
}

/// Parses durations written as a number plus unit, e.g. "500ms", "5s",
/// "1.5m", "2h".
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }

    let unit_start = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| "missing unit".to_string())?;
    let (number, unit) = value.split_at(unit_start);

    let number = number
        .parse::<f64>()
        .map_err(|e| format!("invalid number: {e}"))?;
    let seconds = match unit {
        "ms" => number / 1000.0,
        "s" => number,
        "m" => number * 60.0,
        "h" => number * 3600.0,
        other => return Err(format!("unknown unit {other:?}")),
    };

    if seconds <= 0.0 {
        return Err("duration must be positive".to_string());
    }

    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> &'static str {
        r#"
            [telegram]
            api_id = 12345
            api_hash = "abcdef"
            phone_number = "+1234567890"
            contact_name = "trojan"

            [datasource]
            host = "feed.example.com"
            port = 8080
            method = "tokens"
            interval = "5s"
            token_path = "address"

            [datasource.auth]
            context = "header"
            name = "X-Api-Key"
            value = "secret"

            [datasource.params]
            chain = "solana"
        "#
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        config.telegram.validate().unwrap();

        let datasource = config.datasource.unwrap();
        datasource.validate().unwrap();
        assert_eq!(datasource.interval().unwrap(), Duration::from_secs(5));
        assert_eq!(datasource.params["chain"], "solana");
    }

    #[test]
    fn rejects_empty_required_fields() {
        let mut config: Config = toml::from_str(sample_config()).unwrap();
        config.telegram.api_hash.clear();
        assert!(matches!(
            config.telegram.validate(),
            Err(ConfigError::MissingField("telegram.api_hash"))
        ));

        let mut datasource = config.datasource.unwrap();
        datasource.token_path.clear();
        assert!(matches!(
            datasource.validate(),
            Err(ConfigError::MissingField("datasource.token_path"))
        ));
    }

    #[test]
    fn feed_mode_requires_a_valid_datasource_section() {
        let mut config: Config = toml::from_str(sample_config()).unwrap();
        assert!(config.validate_feed().is_ok());

        config.datasource.as_mut().unwrap().interval = "banana".to_string();
        assert!(matches!(
            config.validate_feed(),
            Err(ConfigError::InvalidInterval { .. })
        ));

        config.datasource = None;
        assert!(matches!(
            config.validate_feed(),
            Err(ConfigError::MissingField("datasource"))
        ));
    }

    #[test]
    fn rejects_non_header_auth() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        let mut datasource = config.datasource.unwrap();
        datasource.auth.context = "query".to_string();
        assert!(matches!(
            datasource.validate(),
            Err(ConfigError::UnsupportedAuthContext(_))
        ));
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("0s").is_err());
    }
}
