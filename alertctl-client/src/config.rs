use std::fmt;
use std::str::FromStr;

use secrecy::{CloneableSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

/// The username used when none is configured.
pub const DEFAULT_USERNAME: &str = "admin";
/// The password used when none is configured.
pub const DEFAULT_PASSWORD: &str = "changed!";
/// The host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// The management port used when none is configured.
pub const DEFAULT_PORT: u16 = 8089;

/// Newtype around `String` that keeps passwords out of logs.
///
/// Use with [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Password(#[serde(deserialize_with = "lenient_string")] String);

impl Password {
    /// Returns the password as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Password {
    fn from(str: &str) -> Self {
        Password(str.to_string())
    }
}

impl std::ops::Deref for Password {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for Password {}
impl SerializableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// The URL scheme used to reach the management endpoint.
///
/// Parsing ignores case, so `HTTPS` and `https` are the same scheme.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Scheme {
    /// Plain text HTTP.
    Http,
    /// HTTP over TLS. Management ports usually serve a self-signed certificate.
    #[default]
    Https,
}

impl Scheme {
    /// Returns the scheme as used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scheme parse error.
#[derive(Clone, Debug)]
pub struct SchemeParseError(String);

impl fmt::Display for SchemeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as scheme: expected one of "http", "https""#,
            self.0
        )
    }
}

impl std::error::Error for SchemeParseError {}

impl FromStr for Scheme {
    type Err = SchemeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("http") => Ok(Scheme::Http),
            s if s.eq_ignore_ascii_case("https") => Ok(Scheme::Https),
            s => Err(SchemeParseError(s.into())),
        }
    }
}

impl Serialize for Scheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let scheme = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        scheme.parse().map_err(serde::de::Error::custom)
    }
}

/// The management API version a session targets.
///
/// `default` means the newest version the server offers. Any other value is carried verbatim,
/// for example `8.2`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ApiVersion {
    /// Whatever the server considers current.
    #[default]
    Default,
    /// An explicitly pinned version string.
    Pinned(String),
}

impl ApiVersion {
    /// Returns the version as configured, `"default"` for [`ApiVersion::Default`].
    pub fn as_str(&self) -> &str {
        match self {
            ApiVersion::Default => "default",
            ApiVersion::Pinned(version) => version,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            Ok(ApiVersion::Default)
        } else {
            Ok(ApiVersion::Pinned(s.to_owned()))
        }
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = lenient_string(deserializer)?;
        let Ok(version) = version.parse::<ApiVersion>();
        Ok(version)
    }
}

/// Connection parameters for a management endpoint.
///
/// Every field has a default, so partial configuration (for example only `host` and `port`) is
/// completed with the defaults documented on each field. The config is not validated until it is
/// passed to [`Session::create`](crate::Session::create).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Username for the login handshake.
    ///
    /// # Default
    ///
    /// `"admin"`
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,

    /// Password for the login handshake. Redacted from `Debug` output.
    ///
    /// # Default
    ///
    /// `"changed!"`
    pub password: SecretBox<Password>,

    /// URL scheme.
    ///
    /// # Default
    ///
    /// `https`
    pub scheme: Scheme,

    /// Hostname or IP address of the management endpoint.
    ///
    /// # Default
    ///
    /// `"localhost"`
    pub host: String,

    /// Management port.
    ///
    /// # Default
    ///
    /// `8089`
    pub port: u16,

    /// API version the session targets.
    ///
    /// # Default
    ///
    /// `"default"`
    pub version: ApiVersion,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_owned(),
            password: SecretBox::new(Box::new(Password::from(DEFAULT_PASSWORD))),
            scheme: Scheme::default(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            version: ApiVersion::default(),
        }
    }
}

impl ConnectionConfig {
    /// Replaces the password.
    pub fn with_password(self, password: &str) -> Self {
        Self {
            password: SecretBox::new(Box::new(Password::from(password))),
            ..self
        }
    }

    /// Returns the root URL of the management endpoint, e.g. `https://localhost:8089/`.
    pub fn base_url(&self) -> crate::Result<Url> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(crate::Error::InvalidUrl {
                message: "host cannot be empty".to_owned(),
            });
        }

        // IPv6 literals need brackets in the authority.
        let url = if host.contains(':') && !host.starts_with('[') {
            format!("{}://[{}]:{}/", self.scheme, host, self.port)
        } else {
            format!("{}://{}:{}/", self.scheme, host, self.port)
        };

        Ok(Url::parse(&url)?)
    }
}

/// Deserializes a string, also accepting bare numbers and booleans.
///
/// YAML reads unquoted scalars like `12345` or `true` as numbers or booleans, even when the
/// target field is textual. Such values are turned back into their canonical text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl serde::de::Visitor<'_> for Visitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, a number or a boolean")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: serde::de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(Visitor)
}
