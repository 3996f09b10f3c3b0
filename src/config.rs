//! Configuration loaded from environment variables.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_MODEL, LlmConfig, gemini};
use crate::pipeline::queue::DEFAULT_QUEUE_CAPACITY;
use crate::store::ServiceAccountKey;
use crate::store::sheets::{self, SheetsConfig};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Shared secret for the webhook subscription handshake.
    pub verify_token: SecretString,
    pub llm: LlmConfig,
    pub sheets: SheetsConfig,
    /// Bound of the intake queue.
    pub queue_capacity: usize,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let port = parse_or(get("LEAD_QUALIFIER_PORT"), "LEAD_QUALIFIER_PORT", DEFAULT_PORT)?;
        let queue_capacity = parse_or(
            get("LEAD_QUALIFIER_QUEUE_CAPACITY"),
            "LEAD_QUALIFIER_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY,
        )?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LEAD_QUALIFIER_QUEUE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let verify_token = SecretString::from(require("WHATSAPP_VERIFY_TOKEN")?);

        let llm = LlmConfig {
            api_key: SecretString::from(require("GEMINI_API_KEY")?),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE").unwrap_or_else(|| gemini::DEFAULT_API_BASE.to_string()),
        };

        let credentials_json = match (get("SHEETS_PRIVATE_KEY"), get("SHEETS_SERVICE_ACCOUNT_FILE")) {
            (Some(json), _) => json,
            (None, Some(path)) => std::fs::read_to_string(&path)?,
            (None, None) => {
                return Err(ConfigError::MissingRequired {
                    key: "SHEETS_PRIVATE_KEY".to_string(),
                    hint: "Set it to the service-account JSON or point SHEETS_SERVICE_ACCOUNT_FILE at the key file".to_string(),
                });
            }
        };
        let credentials = ServiceAccountKey::from_json(&credentials_json)
            .map_err(|e| ConfigError::Credentials(e.to_string()))?;

        let sheets = SheetsConfig {
            spreadsheet_id: require("GOOGLE_SHEETS_ID")?,
            sheet_name: get("GOOGLE_SHEETS_TAB").unwrap_or_else(|| sheets::DEFAULT_SHEET_NAME.to_string()),
            api_base: get("GOOGLE_SHEETS_API_BASE")
                .unwrap_or_else(|| sheets::DEFAULT_API_BASE.to_string()),
            credentials,
        };

        Ok(Self {
            port,
            verify_token,
            llm,
            sheets,
            queue_capacity,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {value:?}"),
        }),
    }
}
