// ⚙️ Configuration - client constants and server environment

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// VENDOR CLIENT
// ============================================================================

pub const DEFAULT_ENDPOINT: &str = "https://gs-loc.apple.com/clls/wloc";
pub const DEFAULT_USER_AGENT: &str = "locationd/1753.17 CFNetwork/711.1.12 Darwin/14.0.0";
pub const DEFAULT_LOCALE: &str = "en_US";
pub const DEFAULT_BUNDLE_ID: &str = "com.apple.locationd";
pub const DEFAULT_CLIENT_VERSION: &str = "8.1.12B411";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Everything the protocol client needs to talk to the positioning service.
///
/// Defaults reproduce the request the service is known to accept; the
/// envelope strings are part of the wire format, change them with care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub locale: String,
    pub bundle_id: String,
    pub client_version: String,

    /// Connect + read deadline for a single request
    pub timeout: Duration,

    /// The service has presented certificates default trust stores reject.
    /// Leaving this on keeps those requests working.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            bundle_id: DEFAULT_BUNDLE_ID.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: true,
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

// ============================================================================
// HTTP SERVER
// ============================================================================

#[cfg(feature = "server")]
pub use server::ServerConfig;

#[cfg(feature = "server")]
mod server {
    use config::{Config, ConfigError, Environment};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, Serialize, Clone)]
    pub struct ServerConfig {
        /// Log level (trace, debug, info, warn, error)
        #[serde(default = "default_log_level")]
        pub log_level: String,

        /// Listen port
        #[serde(default = "default_port")]
        pub port: u16,

        /// Built frontend served as static files when the directory exists
        #[serde(default = "default_web_dir")]
        pub web_dir: String,

        /// Vendor request deadline
        #[serde(default = "default_timeout_secs")]
        pub timeout_secs: u64,
    }

    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_web_dir() -> String {
        "web/dist".to_string()
    }

    fn default_timeout_secs() -> u64 {
        super::DEFAULT_TIMEOUT_SECS
    }

    impl ServerConfig {
        /// Read `BSSID_LOCATOR_*` environment variables
        pub fn from_env() -> Result<Self, ConfigError> {
            Config::builder()
                .add_source(Environment::with_prefix("BSSID_LOCATOR"))
                .build()?
                .try_deserialize()
        }
    }

}
