//! Shadowsocks share links
//!
//! Supports both SIP002 and the legacy form:
//! - SIP002: ss://BASE64(method:password)@host:port/?plugin=...#tag
//! - SIP002 with plain userinfo: ss://method:password@host:port#tag
//! - Legacy: ss://BASE64(method:password@host:port)#tag

use tracing::trace;

use crate::codec::base64::{decode_base64_utf8, encode_base64_url, is_base64_alphabet};
use crate::codec::uri::{
    QueryBuilder, format_host, fragment_suffix, parse_port, parse_query, percent_decode,
    split_host_port, split_query,
};
use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::defaults::default_port;
use crate::model::{
    CanonicalOutbound, Mux, ProtocolKind, Remote, Security, ShadowsocksRemote, Transport,
    resolve_label,
};

use super::{ProtocolCodec, wrong_protocol};

// ============================================================================
// Shadowsocks Link Record
// ============================================================================

/// Fields of a Shadowsocks link, as written
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksLink {
    pub method: String,
    pub password: String,
    pub address: String,
    pub port: String,
    /// SIP003 `plugin` value, `name;opts`, never interpreted
    pub plugin: Option<String>,
    pub remark: String,
}

impl ShadowsocksLink {
    pub fn parse(body: &str, fragment: Option<&str>) -> Result<Self> {
        trace!("Parsing Shadowsocks link");
        let (main, query) = split_query(body);
        let main = main.trim_end_matches('/');

        let plugin = query
            .map(parse_query)
            .and_then(|params| params.get("plugin").cloned())
            .filter(|plugin| !plugin.is_empty());

        let mut link = if is_base64_alphabet(main) {
            trace!("Parsing as legacy Base64 format");
            Self::parse_legacy(main)?
        } else {
            trace!("Parsing as SIP002 format");
            Self::parse_sip002(main)?
        };

        link.plugin = plugin;
        link.remark = fragment.unwrap_or_default().to_string();
        Ok(link)
    }

    /// `BASE64(method:password@host:port)`
    fn parse_legacy(main: &str) -> Result<Self> {
        let decoded = decode_base64_utf8(main)?;
        let (userinfo, hostport) = decoded
            .rsplit_once('@')
            .ok_or_else(|| LinkError::malformed("legacy Shadowsocks payload is missing '@'"))?;

        Self::from_parts(userinfo, hostport)
    }

    /// `userinfo@host:port`, userinfo either base64 or percent-encoded plain text
    fn parse_sip002(main: &str) -> Result<Self> {
        let (userinfo, hostport) = main
            .rsplit_once('@')
            .ok_or_else(|| LinkError::malformed("Shadowsocks link is missing '@'"))?;

        // Base64 userinfo may arrive with its `=` padding percent-encoded
        let userinfo = percent_decode(userinfo)?;
        let credentials = match decode_base64_utf8(&userinfo) {
            Ok(decoded) if decoded.contains(':') => decoded,
            _ => userinfo,
        };

        Self::from_parts(&credentials, hostport)
    }

    /// Splits `method:password` on the first `:` and `host:port` on the last.
    fn from_parts(credentials: &str, hostport: &str) -> Result<Self> {
        let (method, password) = credentials.split_once(':').unwrap_or((credentials, ""));
        let (address, port) = split_host_port(hostport)?;

        Ok(Self {
            method: method.to_string(),
            password: password.to_string(),
            address,
            port: port.unwrap_or_default().to_string(),
            ..Default::default()
        })
    }

    pub fn to_canonical(&self) -> Result<CanonicalOutbound> {
        if self.method.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Shadowsocks, "method"));
        }
        if self.password.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Shadowsocks, "password"));
        }
        if self.address.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Shadowsocks, "address"));
        }

        let port = parse_port(
            Some(self.port.as_str()),
            default_port(ProtocolKind::Shadowsocks),
        )?;

        Ok(CanonicalOutbound {
            label: resolve_label(&[&self.remark], &self.address),
            remote: Remote::Shadowsocks(ShadowsocksRemote {
                address: self.address.clone(),
                port,
                method: self.method.clone(),
                password: self.password.clone(),
                plugin: self.plugin.clone(),
            }),
            transport: Transport::default(),
            security: Security::None,
            mux: Mux::default(),
        })
    }

    pub fn from_canonical(outbound: &CanonicalOutbound) -> Result<Self, InvariantViolation> {
        let Remote::Shadowsocks(remote) = &outbound.remote else {
            return Err(wrong_protocol(ProtocolKind::Shadowsocks, outbound));
        };

        Ok(Self {
            method: remote.method.clone(),
            password: remote.password.clone(),
            address: remote.address.clone(),
            port: remote.port.to_string(),
            plugin: remote.plugin.clone(),
            remark: outbound.label.clone(),
        })
    }

    /// Always emits SIP002 with URL-safe unpadded userinfo.
    pub fn to_link(&self) -> String {
        let userinfo = encode_base64_url(&format!("{}:{}", self.method, self.password));

        let mut query = QueryBuilder::new();
        query.push("plugin", self.plugin.clone().unwrap_or_default());
        let query = if query.is_empty() {
            String::new()
        } else {
            format!("/{}", query.to_suffix())
        };

        format!(
            "ss://{}@{}:{}{}{}",
            userinfo,
            format_host(&self.address),
            self.port,
            query,
            fragment_suffix(&self.remark)
        )
    }
}

// ============================================================================
// Shadowsocks Codec
// ============================================================================

pub struct ShadowsocksCodec;

impl ProtocolCodec for ShadowsocksCodec {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Shadowsocks
    }

    fn parse(&self, body: &str, fragment: Option<&str>) -> Result<CanonicalOutbound> {
        ShadowsocksLink::parse(body, fragment)?.to_canonical()
    }

    fn serialize(
        &self,
        outbound: &CanonicalOutbound,
        _options: &ShareOptions,
    ) -> Result<String, InvariantViolation> {
        outbound.check_invariants()?;
        Ok(ShadowsocksLink::from_canonical(outbound)?.to_link())
    }
}
