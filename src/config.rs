use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FTX_API_URL: &str = "https://ftx.com/api";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub ftx_api_url: String,
    pub ftx_api_key: String,
    pub ftx_api_secret: String,
    pub ftx_subaccount: Option<String>,
    pub precision_file: Option<String>,
    pub fills_page_limit: usize,
    pub rate_limit_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let ftx_api_url = env_map
            .get("FTX_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_FTX_API_URL.to_string());

        let ftx_api_key = required(&env_map, "FTX_API_KEY")?;
        let ftx_api_secret = required(&env_map, "FTX_API_SECRET")?;
        let ftx_subaccount = optional(&env_map, "FTX_SUBACCOUNT");
        let precision_file = optional(&env_map, "PRECISION_FILE");

        let fills_page_limit = env_map
            .get("FILLS_PAGE_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("100")
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "FILLS_PAGE_LIMIT".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let rate_limit_ms = env_map
            .get("RATE_LIMIT_MS")
            .map(|s| s.as_str())
            .unwrap_or("35")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RATE_LIMIT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            ftx_api_url,
            ftx_api_key,
            ftx_api_secret,
            ftx_subaccount,
            precision_file,
            fills_page_limit,
            rate_limit_ms,
        })
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("ftx_api_url", &self.ftx_api_url)
            .field("ftx_api_key", &self.ftx_api_key)
            .field("ftx_api_secret", &"<redacted>")
            .field("ftx_subaccount", &self.ftx_subaccount)
            .field("precision_file", &self.precision_file)
            .field("fills_page_limit", &self.fills_page_limit)
            .field("rate_limit_ms", &self.rate_limit_ms)
            .finish()
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("FTX_API_KEY".to_string(), "key".to_string());
        map.insert("FTX_API_SECRET".to_string(), "secret".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ftx_api_url, DEFAULT_FTX_API_URL);
        assert_eq!(config.ftx_subaccount, None);
        assert_eq!(config.precision_file, None);
        assert_eq!(config.fills_page_limit, 100);
        assert_eq!(config.rate_limit(), Duration::from_millis(35));
    }

    #[test]
    fn test_missing_api_key() {
        let mut env_map = setup_required_env();
        env_map.remove("FTX_API_KEY");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "FTX_API_KEY"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_api_secret() {
        let mut env_map = setup_required_env();
        env_map.remove("FTX_API_SECRET");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "FTX_API_SECRET"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_empty_subaccount_means_none() {
        let mut env_map = setup_required_env();
        env_map.insert("FTX_SUBACCOUNT".to_string(), "".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.ftx_subaccount, None);
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("FILLS_PAGE_LIMIT".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "FILLS_PAGE_LIMIT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("<redacted>"));
    }
}
