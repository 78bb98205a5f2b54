use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub salesforce: SalesforceConfig,
    pub render: RenderConfig,
}

/// Connection and topic settings for the CRM.
///
/// Env var names match what the deployment already provides
/// (SF_USERNAME, SF_PASSTOKEN, SF_INV_REQ, SF_INV_RES).
#[derive(Debug, Clone, Deserialize)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub username: String,
    pub password: String,
    /// Platform-event topic the service subscribes to.
    pub request_topic: String,
    /// Object the response record is created on.
    pub response_object: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub logo_path: String,
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Loads .env and APP__-prefixed values.
        let mut common = core_config::Config::load()?;

        // Legacy deployments set PORT directly.
        if let Ok(port) = env::var("PORT") {
            common.port = port
                .parse()
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!("invalid PORT: {}", e)))?;
        }

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(InvoiceConfig {
            common,
            salesforce: SalesforceConfig {
                login_url: get_env(
                    "SF_LOGIN_URL",
                    Some("https://login.salesforce.com"),
                    is_prod,
                )?,
                api_version: get_env("SF_API_VERSION", Some("58.0"), is_prod)?,
                username: get_env("SF_USERNAME", None, is_prod)?,
                password: get_env("SF_PASSTOKEN", None, is_prod)?,
                request_topic: get_env("SF_INV_REQ", None, is_prod)?,
                response_object: get_env("SF_INV_RES", None, is_prod)?,
            },
            render: RenderConfig {
                logo_path: get_env("LOGO_PATH", Some("assets/logo.png"), is_prod)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
