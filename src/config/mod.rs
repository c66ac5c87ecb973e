use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cinema_api: CinemaApiConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub checkout: CheckoutConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки REST API кинотеатра
#[derive(Debug, Clone, Deserialize)]
pub struct CinemaApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

// Настройки сценария оформления заказа
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Пауза перед переходом анонимного посетителя на экран входа.
    pub login_redirect_delay_ms: u64,
    /// Максимум живых сессий оформления в памяти.
    pub session_limit: usize,
    /// Сессия без запросов дольше этого срока закрывается фоновой очисткой.
    pub idle_ttl_seconds: u64,
}

impl CheckoutConfig {
    pub fn login_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.login_redirect_delay_ms)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_seconds.max(1))
    }

    /// Как часто запускается очистка: четверть TTL, но не реже раза в минуту.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs((self.idle_ttl_seconds / 4).clamp(1, 60))
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            login_redirect_delay_ms: 2000,
            session_limit: 10_000,
            idle_ttl_seconds: 900,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{key} has an invalid value {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

fn var_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value.parse().map_err(|_| ConfigError { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "cinema_checkout=debug,tower_http=debug"),
            },
            cinema_api: CinemaApiConfig {
                base_url: var_or("CINEMA_API_URL", "http://localhost:5000/api")
                    .trim_end_matches('/')
                    .to_string(),
                timeout_seconds: parse_var("CINEMA_API_TIMEOUT_SECONDS", "30")?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_var("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5")?,
                timeout_seconds: parse_var("CIRCUIT_BREAKER_TIMEOUT_SECONDS", "60")?,
            },
            checkout: CheckoutConfig {
                login_redirect_delay_ms: parse_var("LOGIN_REDIRECT_DELAY_MS", "2000")?,
                session_limit: parse_var("CHECKOUT_SESSION_LIMIT", "10000")?,
                idle_ttl_seconds: parse_var("CHECKOUT_IDLE_TTL_SECONDS", "900")?,
            },
        })
    }
}
