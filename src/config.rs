use crate::tokens::TokenCodec;
use std::time::Duration;
use thiserror::Error;

/// Errors when loading or validating service configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreConfigError {
    /// Configuration failed validation checks.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// HTTP listen port (default: 8000)
    pub port: u16,

    // --- Store ---
    /// Store connection URI (default: "redis://127.0.0.1:6379/")
    pub store_uri: String,

    /// Database name, used as the key namespace (default: "PasulolCoreAPI")
    pub store_db_name: String,

    /// Collection holding result records (default: "results")
    pub store_collection: String,

    /// Store connection timeout (default: 10 seconds)
    pub store_timeout: Duration,

    // --- Links ---
    /// Public UI base URL, used in confirmation emails (default: "http://localhost:3000")
    pub ui_base_url: String,

    /// Public API base URL, used in verification links (default: "http://localhost:8000")
    pub api_base_url: String,

    // --- Mail relay ---
    /// SMTP relay host (default: "localhost")
    pub smtp_host: String,

    /// SMTP relay port (default: 587)
    pub smtp_port: u16,

    /// SMTP username (optional)
    pub smtp_user: Option<String>,

    /// SMTP password (optional)
    pub smtp_password: Option<String>,

    /// Sender address for outgoing mail (default: "no-reply@localhost")
    pub smtp_from: String,

    /// SMTP connect and command timeout (default: 30 seconds)
    pub smtp_timeout: Duration,

    /// Capacity of the background delivery queue (default: 256)
    pub mail_queue_capacity: usize,

    // --- Verification ---
    /// Base64 key for verification tokens. Generated per process when unset.
    pub encryption_key: Option<String>,

    /// Refuse to start without `encryption_key` (default: false)
    pub encryption_key_require: bool,

    /// Reject tokens that were issued for a different email than the one
    /// being confirmed (default: false)
    pub verification_email_strict: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            store_uri: "redis://127.0.0.1:6379/".to_string(),
            store_db_name: "PasulolCoreAPI".to_string(),
            store_collection: "results".to_string(),
            store_timeout: Duration::from_secs(10),
            ui_base_url: "http://localhost:3000".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            smtp_from: "no-reply@localhost".to_string(),
            smtp_timeout: Duration::from_secs(30),
            mail_queue_capacity: 256,
            encryption_key: None,
            encryption_key_require: false,
            verification_email_strict: false,
        }
    }
}

impl CoreConfig {
    /// Build config from environment variables.
    ///
    /// Every variable is optional and falls back to its `Default` value.
    pub fn from_env() -> Result<Self, CoreConfigError> {
        let mut cfg = Self::default();
        cfg.port = env_var_parse_or_default("PASULOL_PORT", cfg.port, "u16")?;
        cfg.store_timeout = Duration::from_secs(env_var_parse_or_default(
            "PASULOL_STORE_TIMEOUT_SECS",
            cfg.store_timeout.as_secs(),
            "u64",
        )?);
        cfg.smtp_port = env_var_parse_or_default("PASULOL_SMTP_PORT", cfg.smtp_port, "u16")?;
        cfg.smtp_timeout = Duration::from_secs(env_var_parse_or_default(
            "PASULOL_SMTP_TIMEOUT_SECS",
            cfg.smtp_timeout.as_secs(),
            "u64",
        )?);
        cfg.mail_queue_capacity = env_var_parse_or_default(
            "PASULOL_MAIL_QUEUE_CAPACITY",
            cfg.mail_queue_capacity,
            "usize",
        )?;
        cfg.encryption_key_require =
            env_var_bool_or_default("PASULOL_ENCRYPTION_KEY_REQUIRE", cfg.encryption_key_require)?;
        cfg.verification_email_strict = env_var_bool_or_default(
            "PASULOL_VERIFICATION_EMAIL_STRICT",
            cfg.verification_email_strict,
        )?;

        if let Some(v) = env_var_optional("PASULOL_STORE_URI") {
            cfg.store_uri = v;
        }
        if let Some(v) = env_var_optional("PASULOL_STORE_DB_NAME") {
            cfg.store_db_name = v;
        }
        if let Some(v) = env_var_optional("PASULOL_STORE_COLLECTION") {
            cfg.store_collection = v;
        }
        if let Some(v) = env_var_optional("PASULOL_UI_BASE_URL") {
            cfg.ui_base_url = v;
        }
        if let Some(v) = env_var_optional("PASULOL_API_BASE_URL") {
            cfg.api_base_url = v;
        }
        if let Some(v) = env_var_optional("PASULOL_SMTP_HOST") {
            cfg.smtp_host = v;
        }
        if let Some(v) = env_var_optional("PASULOL_SMTP_FROM") {
            cfg.smtp_from = v;
        }
        cfg.smtp_user = env_var_optional("PASULOL_SMTP_USER");
        cfg.smtp_password = env_var_optional("PASULOL_SMTP_PASSWORD");
        cfg.encryption_key = env_var_optional("PASULOL_ENCRYPTION_KEY");

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CoreConfigError> {
        if self.port == 0 {
            return Err(CoreConfigError::Invalid(
                "Port must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("Store URI", &self.store_uri),
            ("Store database name", &self.store_db_name),
            ("Store collection", &self.store_collection),
            ("UI base URL", &self.ui_base_url),
            ("API base URL", &self.api_base_url),
            ("SMTP host", &self.smtp_host),
        ] {
            if value.trim().is_empty() {
                return Err(CoreConfigError::Invalid(format!("{name} cannot be empty")));
            }
        }

        for (name, value) in [
            ("UI base URL", &self.ui_base_url),
            ("API base URL", &self.api_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| CoreConfigError::Invalid(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.smtp_port == 0 {
            return Err(CoreConfigError::Invalid(
                "SMTP port must be greater than 0".to_string(),
            ));
        }

        if self.store_timeout.as_secs() == 0 || self.smtp_timeout.as_secs() == 0 {
            return Err(CoreConfigError::Invalid(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.mail_queue_capacity == 0 {
            return Err(CoreConfigError::Invalid(
                "Mail queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.smtp_user.is_some() != self.smtp_password.is_some() {
            return Err(CoreConfigError::Invalid(
                "PASULOL_SMTP_USER and PASULOL_SMTP_PASSWORD must be set together".to_string(),
            ));
        }

        match self.encryption_key.as_deref() {
            Some(key) => {
                TokenCodec::from_base64(key)
                    .map_err(|e| CoreConfigError::Invalid(format!("PASULOL_ENCRYPTION_KEY: {e}")))?;
            }
            None if self.encryption_key_require => {
                return Err(CoreConfigError::Invalid(
                    "PASULOL_ENCRYPTION_KEY must be set when PASULOL_ENCRYPTION_KEY_REQUIRE=true"
                        .to_string(),
                ));
            }
            None => {}
        }

        Ok(())
    }
}

fn env_var_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_var_parse_or_default<T: std::str::FromStr>(
    key: &str,
    default: T,
    type_name: &str,
) -> Result<T, CoreConfigError> {
    match env_var_optional(key) {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| CoreConfigError::Invalid(format!("{key} must be a valid {type_name}"))),
        _ => Ok(default),
    }
}

fn env_var_bool_or_default(key: &str, default: bool) -> Result<bool, CoreConfigError> {
    match env_var_optional(key) {
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(CoreConfigError::Invalid(format!(
                "{key} must be a valid boolean"
            ))),
        },
        _ => Ok(default),
    }
}
