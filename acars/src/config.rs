//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! `ACARS_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, may be absent)
//! 2. **Environment variables** - Variables prefixed with `ACARS_` override YAML values
//! 3. **Conventional variables** - `PORT`, `EMAIL_USER` and `EMAIL_PASS`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `ACARS_EMAIL__SMTP__HOST=smtp.example.com` sets the `email.smtp.host` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Listen on another port
//! PORT=8080
//!
//! # Mail relay account
//! EMAIL_USER="acarsadvisor@gmail.com"
//! EMAIL_PASS="app-password"
//!
//! # Write emails to ./emails instead of using SMTP
//! ACARS_EMAIL__TRANSPORT=file
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use lettre::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "ACARS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults so an empty config (no file, no env) starts a server on port 3000
/// that relays through Gmail SMTP once credentials are provided.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Flat directory that receives uploaded media, also served under `/uploads`
    pub uploads_dir: PathBuf,
    /// Upload and form limits
    pub limits: LimitsConfig,
    /// Business identity used as email recipient and in email footers
    pub business: BusinessConfig,
    /// Outbound email configuration
    pub email: EmailConfig,
    /// CORS settings for the website frontend
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            uploads_dir: PathBuf::from("uploads"),
            limits: LimitsConfig::default(),
            business: BusinessConfig::default(),
            email: EmailConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size of a single uploaded file, in bytes
    pub max_file_size: u64,
    /// Maximum number of files in one sell-car submission
    pub max_files: usize,
    /// Maximum number of whitespace-delimited words in a car description
    pub max_description_words: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_files: 10,
            max_description_words: 250,
        }
    }
}

impl LimitsConfig {
    /// Body limit for the multipart route: every file at its maximum plus room for text fields
    /// and multipart framing.
    pub fn multipart_body_limit(&self) -> usize {
        let files = self.max_file_size.saturating_mul(self.max_files as u64);
        usize::try_from(files.saturating_add(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessConfig {
    pub name: String,
    /// Mailbox that receives every submission
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: "A Cars".to_string(),
            email: "acarsadvisor@gmail.com".to_string(),
            phone: "+91-8928983020".to_string(),
            address: "Panchratna, Ground Floor, Office No.2, Opera House, Mumbai 400004".to_string(),
        }
    }
}

/// Email transport method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransportKind {
    /// Send emails via SMTP server
    Smtp,
    /// Write emails to files (for development/testing)
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    pub transport: EmailTransportKind,
    pub smtp: SmtpConfig,
    pub file: FileTransportConfig,
    /// Sender email address. Defaults to the SMTP username.
    pub from_email: Option<String>,
    /// Sender display name
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportKind::Smtp,
            smtp: SmtpConfig::default(),
            file: FileTransportConfig::default(),
            from_email: None,
            from_name: "A Cars".to_string(),
        }
    }
}

impl EmailConfig {
    /// Address used in the `From` header of every outgoing email
    pub fn sender_address(&self) -> &str {
        match (&self.from_email, self.transport) {
            (Some(from), _) => from,
            (None, EmailTransportKind::Smtp) => &self.smtp.username,
            (None, EmailTransportKind::File) => "noreply@localhost",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// SMTP authentication username (`EMAIL_USER`)
    pub username: String,
    /// SMTP authentication password (`EMAIL_PASS`)
    #[serde(skip_serializing)]
    pub password: String,
    /// Use STARTTLS
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileTransportConfig {
    /// Directory path where email files will be written
    pub path: PathBuf,
}

impl Default for FileTransportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./emails"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin (incompatible with credentials)
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
            max_age: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("ACARS_").ignore(&["CONFIG"]).split("__"))
            // Conventional names used by hosting platforms and the old deployment
            .merge(Env::raw().only(&["PORT"]))
            .merge(Env::raw().only(&["EMAIL_USER"]).map(|_| "email.smtp.username".into()))
            .merge(Env::raw().only(&["EMAIL_PASS"]).map(|_| "email.smtp.password".into()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.limits.max_file_size == 0 || self.limits.max_files == 0 || self.limits.max_description_words == 0 {
            return Err("Config validation: limits must be greater than zero".to_string());
        }

        if self.business.email.parse::<Address>().is_err() {
            return Err(format!(
                "Config validation: business.email '{}' is not a valid email address",
                self.business.email
            ));
        }

        if self.email.transport == EmailTransportKind::Smtp && (self.email.smtp.username.is_empty() || self.email.smtp.password.is_empty())
        {
            return Err("Config validation: SMTP transport requires a username and password (EMAIL_USER / EMAIL_PASS)".to_string());
        }

        if self.email.sender_address().parse::<Address>().is_err() {
            return Err(format!(
                "Config validation: sender address '{}' is not a valid email address",
                self.email.sender_address()
            ));
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err("Config validation: wildcard CORS origin cannot be combined with allow_credentials".to_string());
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
