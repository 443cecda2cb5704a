//! escrowgate configuration file handling
//!
//! Operator configuration is TOML. Environment variables override file
//! values so container deployments can configure the service without a
//! file edit:
//!
//! | Variable               | Overrides                        |
//! |------------------------|----------------------------------|
//! | `PORT`                 | port of `server.bind`            |
//! | `TREASURY_ADDRESS`     | `treasury.address`               |
//! | `VERIFIER_ADDRESSES`   | `approvers.addresses` (commas)   |
//! | `REQUIRED_SIGNATURES`  | `approvers.required_signatures`  |
//! | `CHALLENGE_TTL_MS`     | `auth.challenge_ttl`             |
//! | `FINISH_AFTER_SECONDS` | `ledger.finish_after`            |

use escrowgate::identity::Identity;
use escrowgate::ledger::{is_valid_classic_address, Drops, RetryPolicy, SandboxConfig};
use escrowgate::ServiceSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUIRED_SIGNATURES: usize = 2;
const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_FINISH_AFTER: Duration = Duration::from_secs(60);
const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_INITIAL_BALANCE: Drops = Drops::from_xrp(100_000);

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// escrowgate operator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub treasury: TreasuryConfig,

    #[serde(default)]
    pub approvers: ApproverConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, `host:port`
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Treasury account; the only identity allowed to create and release
    #[serde(default)]
    pub address: String,

    /// Starting treasury balance in sandbox mode, in XRP
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Drops,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproverConfig {
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Authorizations needed before a release
    #[serde(default = "default_required_signatures")]
    pub required_signatures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_challenge_ttl", with = "duration")]
    pub challenge_ttl: Duration,

    /// Sessions never expire when unset
    #[serde(
        default,
        with = "optional_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_ttl: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// In-process ledger
    #[default]
    Sandbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub mode: LedgerMode,

    /// Delay between escrow creation and earliest release
    #[serde(default = "default_finish_after", with = "duration")]
    pub finish_after: Duration,

    /// Bound on each lock-up and release submission
    #[serde(default = "default_submit_timeout", with = "duration")]
    pub submit_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_initial_balance() -> Drops {
    DEFAULT_INITIAL_BALANCE
}

fn default_required_signatures() -> usize {
    DEFAULT_REQUIRED_SIGNATURES
}

fn default_challenge_ttl() -> Duration {
    DEFAULT_CHALLENGE_TTL
}

fn default_finish_after() -> Duration {
    DEFAULT_FINISH_AFTER
}

fn default_submit_timeout() -> Duration {
    DEFAULT_SUBMIT_TIMEOUT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }
}

impl Default for ApproverConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            required_signatures: DEFAULT_REQUIRED_SIGNATURES,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            session_ttl: None,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::Sandbox,
            finish_after: DEFAULT_FINISH_AFTER,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Durations as humantime strings ("5m", "30s").
mod duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod optional_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.collect_str(&humantime::format_duration(*value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}

impl EscrowConfig {
    /// Configuration for `treasury` with everything else defaulted.
    pub fn new(treasury: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            treasury: TreasuryConfig {
                address: treasury.to_string(),
                initial_balance: DEFAULT_INITIAL_BALANCE,
            },
            approvers: ApproverConfig::default(),
            auth: AuthConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port: u16 = parse_env("PORT", &port)?;
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "127.0.0.1".to_string());
            self.server.bind = format!("{}:{}", host, port);
        }
        if let Some(address) = lookup("TREASURY_ADDRESS") {
            self.treasury.address = address.trim().to_string();
        }
        if let Some(addresses) = lookup("VERIFIER_ADDRESSES") {
            self.approvers.addresses = addresses
                .split(',')
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(required) = lookup("REQUIRED_SIGNATURES") {
            self.approvers.required_signatures = parse_env("REQUIRED_SIGNATURES", &required)?;
        }
        if let Some(ttl) = lookup("CHALLENGE_TTL_MS") {
            self.auth.challenge_ttl = Duration::from_millis(parse_env("CHALLENGE_TTL_MS", &ttl)?);
        }
        if let Some(secs) = lookup("FINISH_AFTER_SECONDS") {
            self.ledger.finish_after =
                Duration::from_secs(parse_env("FINISH_AFTER_SECONDS", &secs)?);
        }
        Ok(())
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("bind {:?} is not host:port", self.server.bind)))?;

        let treasury = self.treasury.address.trim();
        if treasury.is_empty() {
            return Err(ConfigError::Invalid(
                "treasury.address is required".to_string(),
            ));
        }
        if !is_valid_classic_address(treasury) {
            return Err(ConfigError::Invalid(format!(
                "treasury.address {:?} is not a valid address",
                treasury
            )));
        }

        for address in &self.approvers.addresses {
            if !is_valid_classic_address(address.trim()) {
                return Err(ConfigError::Invalid(format!(
                    "approver {:?} is not a valid address",
                    address
                )));
            }
            if address.trim() == treasury {
                return Err(ConfigError::Invalid(
                    "treasury cannot also be an approver".to_string(),
                ));
            }
        }

        if self.approvers.required_signatures == 0 {
            return Err(ConfigError::Invalid(
                "approvers.required_signatures must be at least 1".to_string(),
            ));
        }
        if self.auth.challenge_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "auth.challenge_ttl must be positive".to_string(),
            ));
        }
        if self.ledger.submit_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "ledger.submit_timeout must be positive".to_string(),
            ));
        }

        if self.approvers.addresses.is_empty() {
            tracing::warn!("no approvers configured; proposals can never reach quorum");
        } else if self.approvers.required_signatures > self.approvers.addresses.len() {
            tracing::warn!(
                required = self.approvers.required_signatures,
                approvers = self.approvers.addresses.len(),
                "required signatures exceeds approver count"
            );
        }

        Ok(())
    }

    fn treasury_identity(&self) -> Identity {
        Identity::new(&self.treasury.address)
    }

    fn approver_identities(&self) -> Vec<Identity> {
        self.approvers.addresses.iter().map(Identity::new).collect()
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            treasury: self.treasury_identity(),
            approvers: self.approver_identities(),
            required_signatures: self.approvers.required_signatures,
            challenge_ttl: self.auth.challenge_ttl,
            session_ttl: self.auth.session_ttl,
            submit_timeout: self.ledger.submit_timeout,
            query_retry: RetryPolicy::default(),
        }
    }

    /// Sandbox ledger whose signer list mirrors the approver set.
    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            treasury: self.treasury_identity(),
            treasury_balance: self.treasury.initial_balance,
            signers: self.approver_identities(),
            quorum: self.approvers.required_signatures,
            finish_after: self.ledger.finish_after,
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(treasury: &str) -> String {
        format!(
            r#"# escrowgate configuration
#
# Environment variables override these values:
#   PORT, TREASURY_ADDRESS, VERIFIER_ADDRESSES (comma-separated),
#   REQUIRED_SIGNATURES, CHALLENGE_TTL_MS, FINISH_AFTER_SECONDS

[server]
# Listen address
bind = "{bind}"

[treasury]
# Treasury account. Creates proposals and submits releases.
address = "{treasury}"

# Starting treasury balance in XRP (sandbox ledger only)
initial_balance = "{initial_balance}"

[approvers]
# Accounts allowed to authorize releases
addresses = []

# Authorizations needed before a release
required_signatures = {required}

[auth]
# Lifetime of a login challenge
challenge_ttl = "{challenge_ttl}"

# Session lifetime (optional, sessions never expire if not specified)
# session_ttl = "12h"

[ledger]
# Ledger backend: "sandbox" (in-process)
mode = "sandbox"

# Delay between escrow creation and earliest release
finish_after = "{finish_after}"

# Bound on each lock-up and release submission
submit_timeout = "{submit_timeout}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/escrowgate/escrowgate.log"
"#,
            bind = DEFAULT_BIND,
            treasury = treasury,
            initial_balance = DEFAULT_INITIAL_BALANCE,
            required = DEFAULT_REQUIRED_SIGNATURES,
            challenge_ttl = humantime::format_duration(DEFAULT_CHALLENGE_TTL),
            finish_after = humantime::format_duration(DEFAULT_FINISH_AFTER),
            submit_timeout = humantime::format_duration(DEFAULT_SUBMIT_TIMEOUT),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, treasury: &str) -> Result<(), ConfigError> {
        write_file(config_path, &Self::generate_default_toml(treasury))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)
}

/// Default config file location: `<config dir>/escrowgate/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("escrowgate")
        .join("config.toml")
}
