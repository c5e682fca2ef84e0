//! Configuration for the alertctl command line tool.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `ALERTCTL__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `ALERTCTL__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `ALERTCTL__CONNECTION__HOST=splunk.example.com` sets the management host
//! - `ALERTCTL__CONNECTION__PASSWORD=secret` sets the login password
//! - `ALERTCTL__TARGET__NAME="My Awesome Alert"` sets the resource to delete
//!
//! Values of textual options such as passwords, names and versions are taken verbatim from the
//! environment, so `ALERTCTL__CONNECTION__PASSWORD=007` yields the password `007`.
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! connection:
//!   host: splunk.example.com
//!   password: secret
//!
//! target:
//!   name: My Awesome Alert
//! ```
//!
//! YAML reads unquoted scalars such as `007` or `9.10` as numbers. Quote textual values that look
//! like numbers: `password: "007"`.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use alertctl_client::{CollectionKind, ConnectionConfig, Namespace};
use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::{CloneableSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "ALERTCTL__";

/// Keys holding free-form text.
///
/// Environment values for these keys are used verbatim. The generic environment provider would
/// read `007` as the number 7 or `true` as a boolean.
const TEXT_KEYS: &[&str] = &[
    "connection.username",
    "connection.password",
    "connection.host",
    "connection.version",
    "target.name",
    "target.collection",
    "target.owner",
    "target.app",
    "sentry.dsn",
    "sentry.environment",
];

fn is_text_key(key: &str) -> bool {
    TEXT_KEYS.iter().any(|text| text.eq_ignore_ascii_case(key))
}

/// The resource deleted when no name is configured.
pub const DEFAULT_TARGET_NAME: &str = "My Awesome Alert";

/// Newtype around `String` that may protect against accidental
/// logging of secrets in our configuration struct. Use with
/// [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(String);

impl ConfigSecret {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// The resource to operate on.
///
/// Used in: [`Config::target`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Target {
    /// Exact, case-sensitive name of the resource to delete.
    ///
    /// # Default
    ///
    /// `"My Awesome Alert"`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__TARGET__NAME`
    pub name: String,

    /// Path of the collection that holds the resource.
    ///
    /// Well-known values are `saved/searches`, `alerts/fired_alerts` and `apps/local`. Any other
    /// path is used verbatim.
    ///
    /// # Default
    ///
    /// `saved/searches`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__TARGET__COLLECTION`
    pub collection: CollectionKind,

    /// Owner part of the namespace. Together with [`app`](Self::app) this selects the
    /// `servicesNS` tree; a missing part is a wildcard.
    ///
    /// # Default
    ///
    /// `None` (global namespace)
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__TARGET__OWNER`
    pub owner: Option<String>,

    /// App part of the namespace.
    ///
    /// # Default
    ///
    /// `None` (global namespace)
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__TARGET__APP`
    pub app: Option<String>,
}

impl Target {
    /// Returns the namespace described by [`owner`](Self::owner) and [`app`](Self::app).
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.owner.as_deref(), self.app.as_deref())
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            name: DEFAULT_TARGET_NAME.to_owned(),
            collection: CollectionKind::default(),
            owner: None,
            app: None,
        }
    }
}

/// Transport settings for the management connection.
///
/// Used in: [`Config::http`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Http {
    /// Connect and read timeout for every request.
    ///
    /// # Default
    ///
    /// `30s`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__HTTP__TIMEOUT`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Whether to accept TLS certificates that do not chain to a trusted root.
    ///
    /// Management ports ship with a self-signed certificate, so this is on by default. Turn it
    /// off once the server presents a trusted certificate.
    ///
    /// # Default
    ///
    /// `true`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__HTTP__ACCEPT_INVALID_CERTS`
    pub accept_invalid_certs: bool,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

/// [Sentry](https://sentry.io/) error tracking configuration.
///
/// Sentry is disabled by default and only enabled when a DSN is provided.
///
/// Used in: [`Config::sentry`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentry {
    /// Sentry DSN (Data Source Name).
    ///
    /// # Default
    ///
    /// `None` (Sentry disabled)
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__SENTRY__DSN`
    pub dsn: Option<SecretBox<ConfigSecret>>,

    /// Environment name for this deployment.
    ///
    /// # Default
    ///
    /// `None`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__SENTRY__ENVIRONMENT`
    pub environment: Option<Cow<'static, str>>,

    /// Error event sampling rate.
    ///
    /// # Default
    ///
    /// `1.0` (send all errors)
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__SENTRY__SAMPLE_RATE`
    pub sample_rate: f32,

    /// Send the `sentry-trace` header along with management requests.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__SENTRY__PROPAGATE_TRACES`
    pub propagate_traces: bool,

    /// Enable Sentry SDK debug mode.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__SENTRY__DEBUG`
    pub debug: bool,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    ///
    /// Sentry is considered enabled if a DSN is configured.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            propagate_traces: false,
            debug: false,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO  alertctl_cli::workflow > Deleted alert: My Awesome Alert
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z [alertctl_cli::workflow] INFO: Deleted alert: My Awesome Alert
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2020-12-04T12:11:08.729716Z","level":"INFO","fields":{"message":"Deleted alert: My Awesome Alert"},"target":"alertctl_cli::workflow"}
    /// ```
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Controls the verbosity and format of log output. Logs are always written to stderr, status
/// lines to stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// Valid levels in increasing severity: TRACE, DEBUG, INFO, WARN, ERROR, OFF. At `DEBUG`,
    /// every request to the management API is logged with its response status.
    ///
    /// The `RUST_LOG` environment variable provides more granular control per module if needed.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// See [`LogFormat`] for available options and examples.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `ALERTCTL__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for alertctl.
///
/// Configuration is loaded with the following precedence (highest to lowest):
/// 1. Environment variables (prefixed with `ALERTCTL__`)
/// 2. YAML configuration file (if provided via `-c` flag)
/// 3. Default values
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Connection parameters and credentials of the management endpoint.
    ///
    /// Every field defaults independently: `admin` / `changed!` on `https://localhost:8089`,
    /// API version `default`.
    ///
    /// # Environment Variables
    ///
    /// - `ALERTCTL__CONNECTION__USERNAME`
    /// - `ALERTCTL__CONNECTION__PASSWORD`
    /// - `ALERTCTL__CONNECTION__SCHEME` (`http` or `https`)
    /// - `ALERTCTL__CONNECTION__HOST`
    /// - `ALERTCTL__CONNECTION__PORT`
    /// - `ALERTCTL__CONNECTION__VERSION`
    pub connection: ConnectionConfig,

    /// The resource to delete. See [`Target`].
    pub target: Target,

    /// Transport settings. See [`Http`].
    pub http: Http,

    /// Logging configuration. See [`Logging`].
    pub logging: Logging,

    /// Sentry error tracking configuration. See [`Sentry`].
    pub sentry: Sentry,
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided in `args`)
    /// 3. Environment variables (prefixed with `ALERTCTL__`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .filter(|key| !is_text_key(key.as_str())),
        );

        let text = Env::prefixed(ENV_PREFIX)
            .split("__")
            .filter(|key| is_text_key(key.as_str()));
        for (key, value) in text.iter() {
            figment = figment.merge(Serialized::default(key.as_str(), value));
        }

        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alertctl_client::{ApiVersion, Scheme};
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_without_sources() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.connection.username, "admin");
            assert_eq!(
                config.connection.password.expose_secret().as_str(),
                "changed!"
            );
            assert_eq!(config.connection.scheme, Scheme::Https);
            assert_eq!(config.connection.host, "localhost");
            assert_eq!(config.connection.port, 8089);
            assert_eq!(config.connection.version, ApiVersion::Default);

            assert_eq!(config.target.name, "My Awesome Alert");
            assert_eq!(config.target.collection, CollectionKind::SavedSearches);
            assert!(config.target.namespace().is_global());

            assert!(config.http.accept_invalid_certs);
            assert!(!config.sentry.is_enabled());

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__HOST", "splunk.example.com");
            jail.set_env("ALERTCTL__CONNECTION__PORT", "9089");
            jail.set_env("ALERTCTL__CONNECTION__SCHEME", "http");
            jail.set_env("ALERTCTL__CONNECTION__PASSWORD", "12345");
            jail.set_env("ALERTCTL__CONNECTION__VERSION", "8.2");
            jail.set_env("ALERTCTL__TARGET__NAME", "Nightly Errors");
            jail.set_env("ALERTCTL__TARGET__COLLECTION", "alerts/fired_alerts");
            jail.set_env("ALERTCTL__TARGET__APP", "search");
            jail.set_env("ALERTCTL__HTTP__TIMEOUT", "5s");
            jail.set_env("ALERTCTL__SENTRY__DSN", "abcde");

            let config = Config::load(None).unwrap();

            assert_eq!(config.connection.host, "splunk.example.com");
            assert_eq!(config.connection.port, 9089);
            assert_eq!(config.connection.scheme, Scheme::Http);
            assert_eq!(config.connection.password.expose_secret().as_str(), "12345");
            assert_eq!(config.connection.version, ApiVersion::Pinned("8.2".into()));
            // Untouched fields keep their defaults
            assert_eq!(config.connection.username, "admin");

            assert_eq!(config.target.name, "Nightly Errors");
            assert_eq!(config.target.collection, CollectionKind::FiredAlerts);
            assert_eq!(
                config.target.namespace(),
                Namespace::new(None, Some("search"))
            );

            assert_eq!(config.http.timeout, Duration::from_secs(5));
            assert_eq!(
                config.sentry.dsn.unwrap().expose_secret().as_str(),
                "abcde"
            );

            Ok(())
        });
    }

    #[test]
    fn textual_env_values_are_kept_verbatim() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__USERNAME", "1e3");
            jail.set_env("ALERTCTL__CONNECTION__PASSWORD", "007");
            jail.set_env("ALERTCTL__CONNECTION__VERSION", "9.10");
            jail.set_env("ALERTCTL__TARGET__NAME", "2024");
            jail.set_env("ALERTCTL__TARGET__OWNER", "true");

            let config = Config::load(None).unwrap();

            assert_eq!(config.connection.username, "1e3");
            assert_eq!(config.connection.password.expose_secret().as_str(), "007");
            assert_eq!(config.connection.version, ApiVersion::Pinned("9.10".into()));
            assert_eq!(config.target.name, "2024");
            assert_eq!(config.target.owner.as_deref(), Some("true"));

            Ok(())
        });
    }

    #[test]
    fn boolean_password_is_a_string() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__PASSWORD", "true");

            let config = Config::load(None).unwrap();
            assert_eq!(config.connection.password.expose_secret().as_str(), "true");

            Ok(())
        });
    }

    #[test]
    fn text_env_overrides_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            connection:
                password: "from-yaml"
                port: 8090
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__PASSWORD", "0100");

            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.connection.password.expose_secret().as_str(), "0100");
            assert_eq!(config.connection.port, 8090);

            Ok(())
        });
    }

    #[test]
    fn scheme_ignores_case() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__SCHEME", "HTTPS");
            let config = Config::load(None).unwrap();
            assert_eq!(config.connection.scheme, Scheme::Https);

            jail.set_env("ALERTCTL__CONNECTION__SCHEME", "Http");
            let config = Config::load(None).unwrap();
            assert_eq!(config.connection.scheme, Scheme::Http);

            jail.set_env("ALERTCTL__CONNECTION__SCHEME", "ftp");
            assert!(Config::load(None).is_err());

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            connection:
                username: operator
                password: s3cret
                host: 10.0.0.5
            target:
                name: Disk Full
                collection: saved/searches
                owner: nobody
                app: search
            logging:
                level: debug
                format: json
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.connection.username, "operator");
            assert_eq!(config.connection.password.expose_secret().as_str(), "s3cret");
            assert_eq!(config.connection.host, "10.0.0.5");
            assert_eq!(config.connection.port, 8089);

            assert_eq!(config.target.name, "Disk Full");
            assert_eq!(
                config.target.namespace(),
                Namespace::new(Some("nobody"), Some("search"))
            );

            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            connection:
                host: yaml.example.com
                port: 8090
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__HOST", "env.example.com");

            let config = Config::load(Some(tempfile.path())).unwrap();

            // Env should overwrite the yaml config
            assert_eq!(config.connection.host, "env.example.com");
            assert_eq!(config.connection.port, 8090);

            Ok(())
        });
    }

    #[test]
    fn secrets_are_redacted() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ALERTCTL__CONNECTION__PASSWORD", "hunter2");
            jail.set_env("ALERTCTL__SENTRY__DSN", "https://key@sentry.example.com/1");

            let config = Config::load(None).unwrap();
            let debug = format!("{config:?}");

            assert!(!debug.contains("hunter2"));
            assert!(!debug.contains("key@sentry"));

            Ok(())
        });
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Auto);
        assert!("colorful".parse::<LogFormat>().is_err());
    }
}
