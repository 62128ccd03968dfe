use axum::http::HeaderValue;
use chrono::TimeDelta;
use clap::{Parser, ValueEnum};
use gcp_auth::CustomServiceAccount;
use std::time::Duration;

use crate::store::FirestoreAuth;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = [
    "https://iammusic-template.vercel.app",
    "https://iammusictemplate.xyz",
];

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required for the firestore backend")]
    MissingCredential(&'static str),

    #[error("FIREBASE_SERVICE_ACCOUNT is not a usable service account key: {0}")]
    InvalidServiceAccount(#[from] gcp_auth::Error),

    #[error("invalid allowed origin {0:?}")]
    InvalidOrigin(String),

    #[error("duplicate window of {0} seconds is out of range")]
    InvalidDuplicateWindow(u64),
}

// CLI argument structure, every knob can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "save-text-gateway")]
#[command(about = "Rate limited, de-duplicating write endpoint for short text entries")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    // Where entries are persisted
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Firestore)]
    pub store: StoreBackend,

    // Firestore REST base url, point at the emulator for local runs
    #[arg(long, env = "FIRESTORE_URL", default_value = "https://firestore.googleapis.com/v1")]
    pub firestore_url: String,

    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub firestore_project: Option<String>,

    // Fixed bearer token, overrides the service account (emulator, debugging)
    #[arg(long, env = "FIRESTORE_ACCESS_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,

    // Service account key JSON, mints and refreshes access tokens
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT", hide_env_values = true)]
    pub service_account: Option<String>,

    #[arg(long, env = "TEXTS_COLLECTION", default_value = "texts")]
    pub collection: String,

    // Store request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub store_timeout: u64,

    // Seconds between accepted submissions per client
    #[arg(long, default_value_t = 5)]
    pub cooldown: u64,

    // Seconds a repeat of the newest entry is suppressed for
    #[arg(long, default_value_t = 600)]
    pub duplicate_window: u64,

    // Seconds between rate limiter evictions
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Comma separated CORS allow-list
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ALLOWED_ORIGINS.map(String::from)
    )]
    pub allowed_origins: Vec<String>,

    // Take the client address from X-Forwarded-For / X-Real-IP
    #[arg(long, env = "TRUST_FORWARDED")]
    pub trust_forwarded: bool,
}

#[derive(Debug)]
pub struct FirestoreCredentials {
    pub project_id: String,
    pub auth: FirestoreAuth,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Args {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown)
    }

    pub fn duplicate_window(&self) -> Result<TimeDelta, ConfigError> {
        i64::try_from(self.duplicate_window)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(ConfigError::InvalidDuplicateWindow(self.duplicate_window))
    }

    pub fn sweep_interval(&self) -> Duration {
        // tokio's interval panics on zero
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout)
    }

    /// Project id and auth for the firestore backend.
    ///
    /// A fixed token wins over the service account. The project id comes
    /// from `--firestore-project`, else from the service account key.
    pub fn firestore_credentials(&self) -> Result<FirestoreCredentials, ConfigError> {
        let token = non_empty(&self.firestore_token);
        let service_account = non_empty(&self.service_account)
            .map(CustomServiceAccount::from_json)
            .transpose()?;

        let key_project = service_account
            .as_ref()
            .and_then(|sa| sa.project_id())
            .map(str::to_string);

        let auth = match (token, service_account) {
            (Some(token), _) => FirestoreAuth::Static(token.to_string()),
            (None, Some(sa)) => FirestoreAuth::ServiceAccount(sa),
            (None, None) => return Err(ConfigError::MissingCredential("FIREBASE_SERVICE_ACCOUNT")),
        };

        let project_id = non_empty(&self.firestore_project)
            .map(str::to_string)
            .or(key_project)
            .ok_or(ConfigError::MissingCredential("FIRESTORE_PROJECT_ID"))?;

        Ok(FirestoreCredentials { project_id, auth })
    }

    // `*` can't be combined with credentialed CORS
    pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>, ConfigError> {
        self.allowed_origins
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|origin| {
                if origin == "*" {
                    return Err(ConfigError::InvalidOrigin(origin.to_string()));
                }
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))
            })
            .collect()
    }
}
