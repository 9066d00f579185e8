//! Configuration system for the natprobe CLI.

use natprobe::ProbeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest per-attempt deadline accepted from configuration
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Largest attempt budget accepted from configuration
const MAX_ATTEMPTS: u32 = 10;

/// natprobe configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// STUN server and local binding
    #[serde(default)]
    pub stun: StunConfig,
    /// Probe timings
    #[serde(default)]
    pub probe: ProbeSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// STUN endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StunConfig {
    /// STUN server as host:port
    #[serde(default = "default_server")]
    pub server: String,
    /// Local address to bind the probe socket to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Probe timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Per-attempt deadline for the first Test I, in milliseconds
    #[serde(default = "default_initial_timeout_ms")]
    pub initial_timeout_ms: u64,
    /// Per-attempt deadline for every later transaction, in milliseconds
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
    /// Attempts per transaction
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_server() -> String {
    "stun.l.google.com:19302".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:0".to_string()
}

fn default_initial_timeout_ms() -> u64 {
    100
}

fn default_transaction_timeout_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            initial_timeout_ms: default_initial_timeout_ms(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProbeSettings {
    /// Convert to the library's timing configuration
    #[must_use]
    pub fn to_probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            initial_timeout: Duration::from_millis(self.initial_timeout_ms),
            transaction_timeout: Duration::from_millis(self.transaction_timeout_ms),
            max_attempts: self.max_attempts,
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("natprobe/config.toml")
    }

    /// Load config from default path, or create default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading or creating the config fails.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_host_port(&self.stun.server, "STUN server")?;

        if self.stun.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!(
                "Bind address '{}' must be ip:port (e.g. 0.0.0.0:0)",
                self.stun.bind_addr
            );
        }

        for (name, value) in [
            ("Initial timeout", self.probe.initial_timeout_ms),
            ("Transaction timeout", self.probe.transaction_timeout_ms),
        ] {
            if value == 0 || value > MAX_TIMEOUT_MS {
                anyhow::bail!("{name} must be between 1 and {MAX_TIMEOUT_MS} ms, got {value}");
            }
        }

        if self.probe.max_attempts == 0 || self.probe.max_attempts > MAX_ATTEMPTS {
            anyhow::bail!(
                "Max attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
                self.probe.max_attempts
            );
        }

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}

/// Validate host:port format
pub fn validate_host_port(addr: &str, name: &str) -> anyhow::Result<()> {
    let Some((host, port_str)) = addr.rsplit_once(':') else {
        anyhow::bail!("{name} '{addr}' missing port (expected format: host:port)");
    };

    let port: u16 = port_str
        .parse()
        .map_err(|_| anyhow::anyhow!("{name} '{addr}' has invalid port: {port_str}"))?;

    if port == 0 {
        anyhow::bail!("{name} '{addr}' has invalid port: 0");
    }

    if host.is_empty() {
        anyhow::bail!("{name} '{addr}' has empty hostname");
    }

    if host.contains('/') || host.contains('\\') || host.contains(char::is_whitespace) {
        anyhow::bail!("{name} '{addr}' contains invalid characters");
    }

    Ok(())
}
