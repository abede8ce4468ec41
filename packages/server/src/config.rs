//! Process configuration shared by the coordinator and its workers.
//!
//! Values come from command-line flags with environment fallbacks (a `.env`
//! file is loaded by the binary before parsing). The coordinator forwards
//! its configuration to every worker it spawns.

use std::ffi::OsString;

use clap::Args;
use thiserror::Error;

use crate::domain::{AdmissionPolicy, DEFAULT_FORBIDDEN_WORDS};

/// Notice broadcast to clients when the operator shuts the cluster down
pub const DEFAULT_SHUTDOWN_REASON: &str = "the server is shutting down";

/// Environment variable the shared secret is handed to workers through
pub const CLIENT_TOKEN_ENV: &str = "CLIENT_TOKEN";

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number every worker binds to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Shared secret clients must present at handshake
    #[arg(long, env = CLIENT_TOKEN_ENV, hide_env_values = true)]
    pub client_token: String,

    /// Comma-separated list of allowed `Origin` values ("*" allows any)
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "http://localhost:3000")]
    pub allowed_origins: String,

    /// Comma-separated content denylist (case-sensitive substrings)
    #[arg(long, env = "FORBIDDEN_WORDS")]
    pub forbidden_words: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("client token must not be empty")]
    EmptyClientToken,

    #[error("allowed origins must list at least one origin")]
    NoAllowedOrigins,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub client_token: String,
    pub allowed_origins: Vec<String>,
    pub forbidden_words: Vec<String>,
}

impl TryFrom<ServerArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        let client_token = args.client_token.trim().to_string();
        if client_token.is_empty() {
            return Err(ConfigError::EmptyClientToken);
        }

        let allowed_origins = split_list(&args.allowed_origins);
        if allowed_origins.is_empty() {
            return Err(ConfigError::NoAllowedOrigins);
        }

        let forbidden_words = match args.forbidden_words.as_deref() {
            Some(list) => split_list(list),
            None => DEFAULT_FORBIDDEN_WORDS.iter().map(|w| w.to_string()).collect(),
        };

        Ok(Self {
            host: args.host,
            port: args.port,
            client_token,
            allowed_origins,
            forbidden_words,
        })
    }
}

impl ServerConfig {
    pub fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy::with_forbidden_words(self.forbidden_words.iter().cloned())
    }

    /// Flags reproducing this configuration on a worker command line.
    ///
    /// Values are attached with `=` so one starting with `-` is not read as a flag.
    /// The token is not included; it travels in [`CLIENT_TOKEN_ENV`].
    pub fn to_worker_args(&self) -> Vec<OsString> {
        vec![
            format!("--host={}", self.host).into(),
            format!("--port={}", self.port).into(),
            format!("--allowed-origins={}", self.allowed_origins.join(",")).into(),
            format!("--forbidden-words={}", self.forbidden_words.join(",")).into(),
        ]
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
