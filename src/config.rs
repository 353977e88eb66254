//! Process-wide configuration.
//!
//! A host application installs its identity and default reporter once at
//! startup with [`configure`]; traces started afterwards pick these up
//! unless their start options override them. Unset fields fall back to the
//! `ZIPLINE_SYSTEM_ID` and `ZIPLINE_IPV4` environment variables.

use crate::model::Endpoint;
use crate::reporter::{NoopReporter, Reporter};
use std::env;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const ENV_SYSTEM_ID: &str = "ZIPLINE_SYSTEM_ID";
const ENV_IPV4: &str = "ZIPLINE_IPV4";

/// Idle TTL applied to traces that do not set their own.
pub const DEFAULT_TTL: Duration = Duration::from_millis(30_000);

/// Process-wide defaults for traces started in this host.
#[derive(Clone, Debug)]
pub struct Config {
    system_id: String,
    ipv4: Option<Ipv4Addr>,
    port: Option<u16>,
    reporter: Arc<dyn Reporter>,
    default_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            system_id: env::var(ENV_SYSTEM_ID).unwrap_or_else(|_| "unknown".to_owned()),
            ipv4: env::var(ENV_IPV4).ok().and_then(|addr| addr.parse().ok()),
            port: None,
            reporter: Arc::new(NoopReporter::new()),
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl Config {
    /// Tag for the hosting application, used as the service name on
    /// locally-produced endpoints.
    pub fn with_system_id<T: Into<String>>(mut self, system_id: T) -> Self {
        self.system_id = system_id.into();
        self
    }

    /// The local IPv4 address attached to locally-produced endpoints.
    pub fn with_ipv4(mut self, ipv4: Ipv4Addr) -> Self {
        self.ipv4 = Some(ipv4);
        self
    }

    /// The local port attached to locally-produced endpoints.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The reporter handed each trace's final batch, unless the trace
    /// overrides it.
    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// The idle TTL applied to traces that do not set their own.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub(crate) fn reporter(&self) -> Arc<dyn Reporter> {
        self.reporter.clone()
    }

    pub(crate) fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The endpoint describing this process.
    pub(crate) fn local_endpoint(&self) -> Endpoint {
        let builder = Endpoint::builder().service_name(self.system_id.clone());
        match (self.ipv4, self.port) {
            (Some(ipv4), Some(port)) => builder.ipv4(ipv4).port(port).build(),
            (Some(ipv4), None) => builder.ipv4(ipv4).build(),
            (None, Some(port)) => builder.port(port).build(),
            (None, None) => builder.build(),
        }
    }
}

lazy_static::lazy_static! {
    /// The installed process configuration.
    static ref GLOBAL_CONFIG: RwLock<Config> = RwLock::new(Config::default());
}

/// Install the process-wide configuration.
pub fn configure(config: Config) {
    if let Ok(mut global) = GLOBAL_CONFIG.write() {
        *global = config;
    }
}

/// A snapshot of the current process configuration.
pub(crate) fn current() -> Config {
    GLOBAL_CONFIG
        .read()
        .map(|config| config.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_fallbacks() {
        temp_env::with_vars(
            [
                (ENV_SYSTEM_ID, Some("checkout")),
                (ENV_IPV4, Some("10.1.2.3")),
            ],
            || {
                let config = Config::default();
                assert_eq!(config.system_id, "checkout");
                assert_eq!(config.ipv4, Some(Ipv4Addr::new(10, 1, 2, 3)));
            },
        );
    }

    #[test]
    fn test_defaults_without_env() {
        temp_env::with_vars(
            [(ENV_SYSTEM_ID, None::<&str>), (ENV_IPV4, None::<&str>)],
            || {
                let config = Config::default();
                assert_eq!(config.system_id, "unknown");
                assert_eq!(config.ipv4, None);
                assert_eq!(config.default_ttl(), DEFAULT_TTL);
            },
        );
    }

    #[test]
    fn test_invalid_ipv4_env_is_ignored() {
        temp_env::with_vars([(ENV_IPV4, Some("not-an-address"))], || {
            assert_eq!(Config::default().ipv4, None);
        });
    }

    #[test]
    fn test_local_endpoint_carries_identity() {
        let endpoint = Config::default()
            .with_system_id("api")
            .with_ipv4(Ipv4Addr::new(192, 168, 0, 7))
            .with_port(443)
            .local_endpoint();
        let json = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(json["serviceName"], "api");
        assert_eq!(json["ipv4"], "192.168.0.7");
        assert_eq!(json["port"], 443);
    }
}
