use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Result, SelectorError};

/// Status flag value of a proxy row that may be handed out
pub const STATUS_ACTIVE: i32 = 1;

/// Proxy protocol type, numbered the way callers pass type filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyType {
    Http = 1,
    Https = 2,
    Socks4 = 3,
    Socks5 = 4,
}

impl ProxyType {
    pub fn code(&self) -> i64 {
        *self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ProxyType::Http),
            2 => Some(ProxyType::Https),
            3 => Some(ProxyType::Socks4),
            4 => Some(ProxyType::Socks5),
            _ => None,
        }
    }

    /// Token stored in the type column
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "HTTP",
            ProxyType::Https => "HTTPS",
            ProxyType::Socks4 => "SOCKS4",
            ProxyType::Socks5 => "SOCKS5",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "HTTP" => Some(ProxyType::Http),
            "HTTPS" => Some(ProxyType::Https),
            "SOCKS4" => Some(ProxyType::Socks4),
            "SOCKS5" => Some(ProxyType::Socks5),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anonymity classification of a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anonymity {
    Transparent = 1,
    Medium = 2,
    High = 3,
    Elite = 4,
    Personal = 5,
}

impl Anonymity {
    pub fn code(&self) -> i64 {
        *self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Anonymity::Transparent),
            2 => Some(Anonymity::Medium),
            3 => Some(Anonymity::High),
            4 => Some(Anonymity::Elite),
            5 => Some(Anonymity::Personal),
            _ => None,
        }
    }

    /// Every token the anonymity column may hold for this level.
    ///
    /// Proxy lists disagree on naming, so transparent and elite proxies
    /// each have two spellings.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Anonymity::Transparent => &["transparent", "none"],
            Anonymity::Medium => &["medium"],
            Anonymity::High => &["high"],
            Anonymity::Elite => &["elite", "elite proxy"],
            Anonymity::Personal => &["personal"],
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        [
            Anonymity::Transparent,
            Anonymity::Medium,
            Anonymity::High,
            Anonymity::Elite,
            Anonymity::Personal,
        ]
        .into_iter()
        .find(|level| level.tokens().contains(&lower.as_str()))
    }
}

impl std::fmt::Display for Anonymity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens()[0])
    }
}

/// Proxy row as read from the data source.
///
/// Columns other than `id` and `status` are nullable in real proxy tables,
/// so they stay optional here and [`ProxyRecord::validate`] decides whether
/// the row is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProxyRecord {
    pub id: i64,
    pub ip: Option<String>,
    pub port: Option<i32>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub proxy_type: Option<String>,
    pub country: Option<String>,
    pub anonymity: Option<String>,
    pub login: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub status: i32,
}

impl ProxyRecord {
    /// Build an active record with the required fields set
    pub fn new(id: i64, ip: impl Into<String>, port: i32, proxy_type: ProxyType) -> Self {
        Self {
            id,
            ip: Some(ip.into()),
            port: Some(port),
            proxy_type: Some(proxy_type.as_str().to_string()),
            country: None,
            anonymity: None,
            login: None,
            password: None,
            status: STATUS_ACTIVE,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Get the protocol enum
    pub fn type_enum(&self) -> Option<ProxyType> {
        self.proxy_type.as_deref().and_then(ProxyType::from_str)
    }

    /// Get the anonymity enum
    pub fn anonymity_enum(&self) -> Option<Anonymity> {
        self.anonymity.as_deref().and_then(Anonymity::from_str)
    }

    /// Check that id, ip, port and type are all present and non-empty
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(SelectorError::InvalidFormat("missing id".into()));
        }
        if is_blank(&self.ip) {
            return Err(SelectorError::InvalidFormat(format!(
                "proxy {} has no ip",
                self.id
            )));
        }
        if self.port.unwrap_or(0) == 0 {
            return Err(SelectorError::InvalidFormat(format!(
                "proxy {} has no port",
                self.id
            )));
        }
        if is_blank(&self.proxy_type) {
            return Err(SelectorError::InvalidFormat(format!(
                "proxy {} has no type",
                self.id
            )));
        }
        Ok(())
    }

    /// Connection string in `tcp://[login:password@]ip:port` form.
    ///
    /// Credentials are only included when both login and password are set.
    /// Does not validate; see [`ProxyRecord::validate`].
    pub fn connection_string(&self) -> String {
        let ip = self.ip.as_deref().unwrap_or_default();
        let port = self.port.unwrap_or_default();

        match (non_blank(&self.login), non_blank(&self.password)) {
            (Some(login), Some(password)) => {
                format!("tcp://{}:{}@{}:{}", login, password, ip, port)
            }
            _ => format!("tcp://{}:{}", ip, port),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}
