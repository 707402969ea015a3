use config::{Config, Environment};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use validator::Validate;

use crate::errors::ServiceError;

/// Application configuration, sourced from the environment.
///
/// Everything the engine treats as policy rather than logic lives here: the
/// document numbering format, the approval margin floor, and the fixed VAT
/// rate invoices are re-priced at.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Document numbering format
    #[serde(default)]
    #[validate]
    pub numbering: NumberingConfig,

    /// Approval gate policy
    #[serde(default)]
    pub approval: ApprovalPolicy,

    /// Fixed VAT rate applied when a quote is converted to an invoice.
    /// Invoices always re-derive tax at this rate rather than copying the
    /// quote's tax mode.
    #[serde(default = "default_invoice_vat_percent")]
    pub invoice_vat_percent: Decimal,
}

/// Prefix and zero-padding used to render minted sequence numbers.
/// Rendering is configuration; the integers come from the counter table.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NumberingConfig {
    #[serde(default = "default_quote_prefix")]
    pub quote_prefix: String,

    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    #[serde(default = "default_lead_prefix")]
    pub lead_prefix: String,

    #[validate(range(min = 1, max = 12))]
    #[serde(default = "default_pad_width")]
    pub pad_width: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            quote_prefix: default_quote_prefix(),
            invoice_prefix: default_invoice_prefix(),
            lead_prefix: default_lead_prefix(),
            pad_width: default_pad_width(),
        }
    }
}

/// Single unified approval policy: a quote needs managerial approval when any
/// line's margin falls below the floor and the creator is not privileged.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalPolicy {
    #[serde(default = "default_margin_floor")]
    pub margin_floor_percent: Decimal,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            margin_floor_percent: default_margin_floor(),
        }
    }
}

impl AppConfig {
    /// Creates a configuration with explicit values (used by tests).
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            auto_migrate: false,
            numbering: NumberingConfig::default(),
            approval: ApprovalPolicy::default(),
            invoice_vat_percent: default_invoice_vat_percent(),
        }
    }

    /// Loads configuration from `SALESDESK_*` environment variables.
    pub fn from_env() -> Result<Self, ServiceError> {
        let source = Config::builder()
            .add_source(Environment::with_prefix("SALESDESK").separator("__"))
            .build()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        let config: AppConfig = source
            .try_deserialize()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        Ok(config)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initializes tracing using the provided log level as the default filter.
/// `RUST_LOG` overrides it when set. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("salesdesk_api={}", level);
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .try_init();
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quote_prefix() -> String {
    "Q-".to_string()
}

fn default_invoice_prefix() -> String {
    "INV-".to_string()
}

fn default_lead_prefix() -> String {
    "L-".to_string()
}

fn default_pad_width() -> u32 {
    5
}

fn default_margin_floor() -> Decimal {
    dec!(8)
}

fn default_invoice_vat_percent() -> Decimal {
    dec!(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_numbering_and_policy() {
        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );
        assert_eq!(config.numbering.quote_prefix, "Q-");
        assert_eq!(config.numbering.invoice_prefix, "INV-");
        assert_eq!(config.numbering.pad_width, 5);
        assert_eq!(config.approval.margin_floor_percent, dec!(8));
        assert_eq!(config.invoice_vat_percent, dec!(5));
    }

    #[test]
    fn tracing_init_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
    }

    #[test]
    fn pad_width_is_bounded() {
        let mut config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );
        config.numbering.pad_width = 40;
        assert!(config.validate().is_err());
    }
}
