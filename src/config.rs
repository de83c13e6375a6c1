use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub robokassa: RobokassaConfig,
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobokassaConfig {
    pub merchant_login: String,
    /// Password #1, used when signing outbound payment links.
    pub password1: String,
    /// Password #2, used when verifying inbound result notifications.
    pub password2: String,
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Subscription price in RUB.
    pub price: f64,
    pub duration_days: i64,
}

impl SubscriptionConfig {
    /// Canonical OutSum representation: fixed two decimals. The same string
    /// must appear in the payment link, the signature, and the ledger row.
    pub fn out_sum(&self) -> String {
        format!("{:.2}", self.price)
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build entirely from environment variables.
                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: get_env("DATABASE_URL")
                            .unwrap_or_else(|| "sqlite:bot_data.db".to_string()),
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    robokassa: RobokassaConfig {
                        merchant_login: get_env("ROBOKASSA_LOGIN").unwrap_or_default(),
                        password1: get_env("ROBOKASSA_PASSWORD1").unwrap_or_default(),
                        password2: get_env("ROBOKASSA_PASSWORD2").unwrap_or_default(),
                        test_mode: get_env("ROBOKASSA_TEST_MODE")
                            .map(|v| v.to_lowercase() == "true")
                            .unwrap_or(true),
                    },
                    subscription: SubscriptionConfig {
                        price: get_env_parse("SUBSCRIPTION_PRICE", 500.0f64),
                        duration_days: get_env_parse("SUBSCRIPTION_DAYS", 30i64),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables override the file when both are present.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Some(p) = get_env("SERVER_PORT").and_then(|v| v.parse().ok()) {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Some(mc) = get_env("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("ROBOKASSA_LOGIN") {
            config.robokassa.merchant_login = v;
        }
        if let Ok(v) = env::var("ROBOKASSA_PASSWORD1") {
            config.robokassa.password1 = v;
        }
        if let Ok(v) = env::var("ROBOKASSA_PASSWORD2") {
            config.robokassa.password2 = v;
        }
        if let Some(t) = get_env("ROBOKASSA_TEST_MODE").map(|v| v.to_lowercase() == "true") {
            config.robokassa.test_mode = t;
        }
        if let Some(p) = get_env("SUBSCRIPTION_PRICE").and_then(|v| v.parse().ok()) {
            config.subscription.price = p;
        }
        if let Some(d) = get_env("SUBSCRIPTION_DAYS").and_then(|v| v.parse().ok()) {
            config.subscription.duration_days = d;
        }

        Ok(config)
    }
}
