use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MERCHANT_ACCOUNT: &str = "sandbox-merchant";
pub const DEFAULT_PAYWALL_SECRET_KEY: &str = "sandbox-paywall-secret";
pub const DEFAULT_PAYWALL_URL: &str = "https://payment-sandbox.payzone.ma/pwthree/launch";
pub const DEFAULT_NOTIFICATION_KEY: &str = "sandbox-notification-key";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub payzone: PayzoneConfig,
    pub order_store: OrderStoreConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Clone)]
pub struct PayzoneConfig {
    pub merchant_account: String,
    pub paywall_secret_key: String,
    pub paywall_url: String,
    pub notification_key: String,
    pub skin: String,
    pub customer_country: String,
    pub customer_locale: String,
    pub default_currency: String,
}

#[derive(Clone)]
pub struct OrderStoreConfig {
    /// Base URL of the web app's order API; in-memory store when absent
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for PayzoneConfig {
    fn default() -> Self {
        Self {
            merchant_account: DEFAULT_MERCHANT_ACCOUNT.to_string(),
            paywall_secret_key: DEFAULT_PAYWALL_SECRET_KEY.to_string(),
            paywall_url: DEFAULT_PAYWALL_URL.to_string(),
            notification_key: DEFAULT_NOTIFICATION_KEY.to_string(),
            skin: "vps-1-vue".to_string(),
            customer_country: "MA".to_string(),
            customer_locale: "en_US".to_string(),
            default_currency: "MAD".to_string(),
        }
    }
}

impl PayzoneConfig {
    /// True when none of the provider credentials are the sandbox placeholders
    pub fn has_custom_credentials(&self) -> bool {
        self.merchant_account != DEFAULT_MERCHANT_ACCOUNT
            && self.paywall_secret_key != DEFAULT_PAYWALL_SECRET_KEY
            && self.paywall_url != DEFAULT_PAYWALL_URL
            && self.notification_key != DEFAULT_NOTIFICATION_KEY
    }
}

impl fmt::Debug for PayzoneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayzoneConfig")
            .field("merchant_account", &self.merchant_account)
            .field("paywall_secret_key", &"<redacted>")
            .field("paywall_url", &self.paywall_url)
            .field("notification_key", &"<redacted>")
            .field("skin", &self.skin)
            .field("customer_country", &self.customer_country)
            .field("customer_locale", &self.customer_locale)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

impl Default for OrderStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_millis(3000),
        }
    }
}

impl fmt::Debug for OrderStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderStoreConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: var_or("HOST", "0.0.0.0"),
            port: var_or("PORT", "4000")
                .parse()
                .context("PORT must be a valid number")?,
            environment: var_or("ENVIRONMENT", "development"),
        };

        let defaults = PayzoneConfig::default();
        let payzone = PayzoneConfig {
            merchant_account: var_or("PAYZONE_MERCHANT_ACCOUNT", &defaults.merchant_account),
            paywall_secret_key: var_or(
                "PAYZONE_PAYWALL_SECRET_KEY",
                &defaults.paywall_secret_key,
            ),
            paywall_url: var_or("PAYZONE_PAYWALL_URL", &defaults.paywall_url),
            notification_key: var_or("PAYZONE_NOTIFICATION_KEY", &defaults.notification_key),
            skin: var_or("PAYZONE_SKIN", &defaults.skin),
            customer_country: var_or("PAYZONE_CUSTOMER_COUNTRY", &defaults.customer_country),
            customer_locale: var_or("PAYZONE_CUSTOMER_LOCALE", &defaults.customer_locale),
            default_currency: var_or("PAYZONE_DEFAULT_CURRENCY", &defaults.default_currency),
        };

        let order_store = OrderStoreConfig {
            url: optional_var("ORDER_STORE_URL"),
            api_key: optional_var("ORDER_STORE_API_KEY"),
            timeout: Duration::from_millis(
                var_or("ORDER_STORE_TIMEOUT_MS", "3000")
                    .parse()
                    .context("ORDER_STORE_TIMEOUT_MS must be a valid number")?,
            ),
        };

        let config = Config {
            server,
            payzone,
            order_store,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        let required = [
            ("PAYZONE_MERCHANT_ACCOUNT", &self.payzone.merchant_account),
            ("PAYZONE_PAYWALL_SECRET_KEY", &self.payzone.paywall_secret_key),
            ("PAYZONE_PAYWALL_URL", &self.payzone.paywall_url),
            ("PAYZONE_NOTIFICATION_KEY", &self.payzone.notification_key),
            ("PAYZONE_SKIN", &self.payzone.skin),
            ("PAYZONE_DEFAULT_CURRENCY", &self.payzone.default_currency),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow!("{} cannot be empty", name));
            }
        }

        let paywall = url::Url::parse(&self.payzone.paywall_url)
            .context("PAYZONE_PAYWALL_URL must be an absolute URL")?;
        if !matches!(paywall.scheme(), "http" | "https") {
            return Err(anyhow!(
                "PAYZONE_PAYWALL_URL must use http or https, got {}",
                paywall.scheme()
            ));
        }

        if let Some(store_url) = &self.order_store.url {
            url::Url::parse(store_url).context("ORDER_STORE_URL must be an absolute URL")?;
        }

        if self.order_store.timeout.is_zero() {
            return Err(anyhow!("ORDER_STORE_TIMEOUT_MS must be greater than 0"));
        }

        if self.is_production() {
            let placeholders = [
                (
                    "PAYZONE_MERCHANT_ACCOUNT",
                    self.payzone.merchant_account == DEFAULT_MERCHANT_ACCOUNT,
                ),
                (
                    "PAYZONE_PAYWALL_SECRET_KEY",
                    self.payzone.paywall_secret_key == DEFAULT_PAYWALL_SECRET_KEY,
                ),
                (
                    "PAYZONE_PAYWALL_URL",
                    self.payzone.paywall_url == DEFAULT_PAYWALL_URL,
                ),
                (
                    "PAYZONE_NOTIFICATION_KEY",
                    self.payzone.notification_key == DEFAULT_NOTIFICATION_KEY,
                ),
            ];
            for (name, is_default) in placeholders {
                if is_default {
                    return Err(anyhow!(
                        "{} must be configured explicitly in production",
                        name
                    ));
                }
            }

            if self.order_store.url.is_none() {
                return Err(anyhow!("ORDER_STORE_URL must be set in production"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn development_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 4000,
                environment: "development".to_string(),
            },
            payzone: PayzoneConfig::default(),
            order_store: OrderStoreConfig::default(),
        }
    }

    #[test]
    fn test_sandbox_defaults_are_valid_outside_production() {
        assert!(development_config().validate().is_ok());
    }

    #[test]
    fn test_production_rejects_sandbox_defaults() {
        let mut config = development_config();
        config.server.environment = "production".to_string();
        config.order_store.url = Some("https://app.kaari.ma/api".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PAYZONE_MERCHANT_ACCOUNT"));
    }

    #[test]
    fn test_production_accepts_explicit_credentials() {
        let mut config = development_config();
        config.server.environment = "production".to_string();
        config.order_store.url = Some("https://app.kaari.ma/api".to_string());
        config.payzone.merchant_account = "kaari".to_string();
        config.payzone.paywall_secret_key = "live-secret".to_string();
        config.payzone.paywall_url = "https://payment.payzone.ma/pwthree/launch".to_string();
        config.payzone.notification_key = "live-notify".to_string();

        assert!(config.validate().is_ok());
        assert!(config.payzone.has_custom_credentials());
    }

    #[test]
    fn test_production_requires_order_store() {
        let mut config = development_config();
        config.server.environment = "production".to_string();
        config.payzone.merchant_account = "kaari".to_string();
        config.payzone.paywall_secret_key = "live-secret".to_string();
        config.payzone.paywall_url = "https://payment.payzone.ma/pwthree/launch".to_string();
        config.payzone.notification_key = "live-notify".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ORDER_STORE_URL"));
    }

    #[test]
    fn test_rejects_relative_paywall_url() {
        let mut config = development_config();
        config.payzone.paywall_url = "/pwthree/launch".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_environment() {
        let mut config = development_config();
        config.server.environment = "qa".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let rendered = format!("{:?}", PayzoneConfig::default());
        assert!(!rendered.contains(DEFAULT_PAYWALL_SECRET_KEY));
        assert!(!rendered.contains(DEFAULT_NOTIFICATION_KEY));
        assert!(rendered.contains("<redacted>"));
    }
}
