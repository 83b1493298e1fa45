//! Transport security of a canonical outbound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::util::{is_empty_str, is_false};
use crate::error::{LinkError, Result};

/// Closed set of transport security kinds
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SecurityKind {
    None,
    Tls,
    Xtls,
    Reality,
}

impl SecurityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityKind::None => "none",
            SecurityKind::Tls => "tls",
            SecurityKind::Xtls => "xtls",
            SecurityKind::Reality => "reality",
        }
    }
}

impl fmt::Display for SecurityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityKind {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SecurityKind::None),
            "tls" => Ok(SecurityKind::Tls),
            "xtls" => Ok(SecurityKind::Xtls),
            "reality" => Ok(SecurityKind::Reality),
            other => Err(LinkError::malformed(format!(
                "unsupported security '{}'",
                other
            ))),
        }
    }
}

/// TLS parameters, shared by `tls` and `xtls`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TlsSettings {
    #[serde(default)]
    pub server_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_insecure: bool,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct RealitySettings {
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub spider_x: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub server_name: String,
}

/// Transport security; exactly one settings variant, selected by kind
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Security {
    #[default]
    None,
    Tls(TlsSettings),
    Xtls(TlsSettings),
    Reality(RealitySettings),
}

/// Security-related fields as they travel in share links.
///
/// An empty `kind` means the link did not say; the protocol default applies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SecurityFields {
    pub kind: String,
    pub server_name: String,
    pub fingerprint: String,
    pub alpn: String,
    pub allow_insecure: bool,
    pub public_key: String,
    pub short_id: String,
    pub spider_x: String,
}

impl Security {
    pub fn kind(&self) -> SecurityKind {
        match self {
            Security::None => SecurityKind::None,
            Security::Tls(_) => SecurityKind::Tls,
            Security::Xtls(_) => SecurityKind::Xtls,
            Security::Reality(_) => SecurityKind::Reality,
        }
    }

    /// Builds the empty settings for a kind.
    pub fn default_for(kind: SecurityKind) -> Self {
        match kind {
            SecurityKind::None => Security::None,
            SecurityKind::Tls => Security::Tls(TlsSettings::default()),
            SecurityKind::Xtls => Security::Xtls(TlsSettings::default()),
            SecurityKind::Reality => Security::Reality(RealitySettings::default()),
        }
    }

    /// Maps link fields onto the single settings variant their kind selects.
    pub fn from_fields(fields: &SecurityFields, default: SecurityKind) -> Result<Self> {
        let kind = if fields.kind.is_empty() {
            default
        } else {
            fields.kind.parse()?
        };

        let tls = || TlsSettings {
            server_name: fields.server_name.clone(),
            allow_insecure: fields.allow_insecure,
            fingerprint: fields.fingerprint.clone(),
            alpn: fields
                .alpn
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        };

        Ok(match kind {
            SecurityKind::None => Security::None,
            SecurityKind::Tls => Security::Tls(tls()),
            SecurityKind::Xtls => Security::Xtls(tls()),
            SecurityKind::Reality => Security::Reality(RealitySettings {
                public_key: fields.public_key.clone(),
                short_id: fields.short_id.clone(),
                spider_x: fields.spider_x.clone(),
                fingerprint: fields.fingerprint.clone(),
                server_name: fields.server_name.clone(),
            }),
        })
    }

    /// Inverse of [`Security::from_fields`].
    pub fn to_fields(&self) -> SecurityFields {
        let mut fields = SecurityFields {
            kind: self.kind().as_str().to_string(),
            ..Default::default()
        };

        match self {
            Security::None => {}
            Security::Tls(tls) | Security::Xtls(tls) => {
                fields.server_name = tls.server_name.clone();
                fields.fingerprint = tls.fingerprint.clone();
                fields.alpn = tls.alpn.join(",");
                fields.allow_insecure = tls.allow_insecure;
            }
            Security::Reality(reality) => {
                fields.server_name = reality.server_name.clone();
                fields.fingerprint = reality.fingerprint.clone();
                fields.public_key = reality.public_key.clone();
                fields.short_id = reality.short_id.clone();
                fields.spider_x = reality.spider_x.clone();
            }
        }

        fields
    }
}
