//! Hysteria2 share links
//!
//! Format: hysteria2://[user[:password]@]host[:port]?params#tag

use tracing::trace;

use crate::codec::uri::{
    QueryBuilder, format_host, fragment_suffix, number_or, parse_flag, parse_port, parse_query,
    percent_decode, percent_encode, split_host_port, split_query,
};
use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::defaults::{
    HYSTERIA2_DOWN_MBPS, HYSTERIA2_PROTOCOL, HYSTERIA2_UP_MBPS, default_port,
};
use crate::model::{
    CanonicalOutbound, Hysteria2Remote, Mux, Network, ProtocolKind, Remote, Security,
    SecurityFields, SecurityKind, Transport, resolve_label,
};

use super::{ProtocolCodec, wrong_protocol};

// ============================================================================
// Hysteria2 Link Record
// ============================================================================

/// Fields of a Hysteria2 link, as written
///
/// Numeric values stay raw so the canonical mapping owns every default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hysteria2Link {
    pub username: String,
    pub password: String,
    pub address: String,
    pub port: String,
    pub protocol: String,
    pub auth: String,
    pub alpn: String,
    pub sni: String,
    pub insecure: bool,
    pub up_mbps: String,
    pub down_mbps: String,
    pub recv_window_conn: String,
    pub recv_window: String,
    pub obfs: String,
    pub obfs_password: String,
    pub disable_mtu_discovery: bool,
    pub fast_open: bool,
    pub hop_interval: String,
    pub remark: String,
}

impl Hysteria2Link {
    pub fn parse(body: &str, fragment: Option<&str>) -> Result<Self> {
        trace!("Parsing Hysteria2 link");
        let (main, query) = split_query(body);

        let (raw_userinfo, hostport) = main.rsplit_once('@').unwrap_or(("", main));
        let (address, port) = split_host_port(hostport)?;

        // Split before decoding so an encoded `%3A` stays inside its part
        let (username, password) = match raw_userinfo.split_once(':') {
            Some((user, pass)) => (percent_decode(user)?, percent_decode(pass)?),
            None => (percent_decode(raw_userinfo)?, String::new()),
        };
        let userinfo = percent_decode(raw_userinfo)?;

        let params = query.map(parse_query).unwrap_or_default();
        let param = |key: &str| params.get(key).cloned().unwrap_or_default();
        let flag = |key: &str| parse_flag(params.get(key).map(String::as_str));

        // `auth` falls back to the whole userinfo
        let auth = match params.get("auth") {
            Some(auth) if !auth.is_empty() => auth.clone(),
            _ => userinfo.clone(),
        };

        Ok(Self {
            username,
            password,
            address,
            port: port.unwrap_or_default().to_string(),
            protocol: param("protocol"),
            auth,
            alpn: param("alpn"),
            sni: param("sni"),
            insecure: flag("insecure"),
            up_mbps: param("up_mbps"),
            down_mbps: param("down_mbps"),
            recv_window_conn: param("recv_window_conn"),
            recv_window: param("recv_window"),
            obfs: param("obfs"),
            obfs_password: param("obfs-password"),
            disable_mtu_discovery: flag("disable_mtu_discovery"),
            fast_open: flag("fast_open"),
            hop_interval: param("hop_interval"),
            remark: fragment.unwrap_or_default().to_string(),
        })
    }

    /// TLS only when the link carries TLS parameters.
    fn security_fields(&self) -> SecurityFields {
        let has_tls = !self.sni.is_empty() || !self.alpn.is_empty() || self.insecure;
        SecurityFields {
            kind: if has_tls {
                SecurityKind::Tls.as_str().to_string()
            } else {
                SecurityKind::None.as_str().to_string()
            },
            server_name: self.sni.clone(),
            alpn: self.alpn.clone(),
            allow_insecure: self.insecure,
            ..Default::default()
        }
    }

    pub fn to_canonical(&self) -> Result<CanonicalOutbound> {
        if self.address.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Hysteria2, "address"));
        }

        let port = parse_port(
            Some(self.port.as_str()),
            default_port(ProtocolKind::Hysteria2),
        )?;

        Ok(CanonicalOutbound {
            label: resolve_label(&[&self.remark], &self.address),
            remote: Remote::Hysteria2(Hysteria2Remote {
                address: self.address.clone(),
                port,
                username: self.username.clone(),
                password: self.password.clone(),
                auth: self.auth.clone(),
                protocol: if self.protocol.is_empty() {
                    HYSTERIA2_PROTOCOL.to_string()
                } else {
                    self.protocol.clone()
                },
                up_mbps: number_or(&self.up_mbps, HYSTERIA2_UP_MBPS, "up_mbps"),
                down_mbps: number_or(&self.down_mbps, HYSTERIA2_DOWN_MBPS, "down_mbps"),
                recv_window_conn: number_or(&self.recv_window_conn, 0, "recv_window_conn"),
                recv_window: number_or(&self.recv_window, 0, "recv_window"),
                obfs: self.obfs.clone(),
                obfs_password: self.obfs_password.clone(),
                disable_mtu_discovery: self.disable_mtu_discovery,
                fast_open: self.fast_open,
                hop_interval: number_or(&self.hop_interval, 0, "hop_interval"),
            }),
            transport: Transport::default_for(Network::Hysteria2),
            security: Security::from_fields(&self.security_fields(), SecurityKind::None)?,
            mux: Mux::default(),
        })
    }

    pub fn from_canonical(outbound: &CanonicalOutbound) -> Result<Self, InvariantViolation> {
        let Remote::Hysteria2(remote) = &outbound.remote else {
            return Err(wrong_protocol(ProtocolKind::Hysteria2, outbound));
        };

        let security = outbound.security.to_fields();

        Ok(Self {
            username: remote.username.clone(),
            password: remote.password.clone(),
            address: remote.address.clone(),
            port: remote.port.to_string(),
            protocol: remote.protocol.clone(),
            auth: remote.auth.clone(),
            alpn: security.alpn,
            sni: security.server_name,
            insecure: security.allow_insecure,
            up_mbps: remote.up_mbps.to_string(),
            down_mbps: remote.down_mbps.to_string(),
            recv_window_conn: remote.recv_window_conn.to_string(),
            recv_window: remote.recv_window.to_string(),
            obfs: remote.obfs.clone(),
            obfs_password: remote.obfs_password.clone(),
            disable_mtu_discovery: remote.disable_mtu_discovery,
            fast_open: remote.fast_open,
            hop_interval: remote.hop_interval.to_string(),
            remark: outbound.label.clone(),
        })
    }

    /// Decoded userinfo: `user[:password]`, empty when the link carries none
    fn userinfo(&self) -> String {
        if self.password.is_empty() {
            self.username.clone()
        } else {
            format!("{}:{}", self.username, self.password)
        }
    }

    /// Userinfo as written into the link, each part encoded on its own
    fn encoded_userinfo(&self) -> String {
        if self.password.is_empty() {
            percent_encode(&self.username)
        } else {
            format!(
                "{}:{}",
                percent_encode(&self.username),
                percent_encode(&self.password)
            )
        }
    }

    pub fn to_link(&self) -> String {
        let userinfo = self.userinfo();
        let userinfo_prefix = if userinfo.is_empty() {
            String::new()
        } else {
            format!("{}@", self.encoded_userinfo())
        };

        let mut query = QueryBuilder::new();
        query
            .push_non_default("protocol", self.protocol.as_str(), HYSTERIA2_PROTOCOL)
            .push_non_default("auth", self.auth.as_str(), &userinfo)
            .push("alpn", self.alpn.as_str())
            .push("sni", self.sni.as_str())
            .push_flag("insecure", self.insecure)
            .push_non_default(
                "up_mbps",
                self.up_mbps.as_str(),
                &HYSTERIA2_UP_MBPS.to_string(),
            )
            .push_non_default(
                "down_mbps",
                self.down_mbps.as_str(),
                &HYSTERIA2_DOWN_MBPS.to_string(),
            )
            .push_non_default("recv_window_conn", self.recv_window_conn.as_str(), "0")
            .push_non_default("recv_window", self.recv_window.as_str(), "0")
            .push("obfs", self.obfs.as_str())
            .push("obfs-password", self.obfs_password.as_str())
            .push_flag("disable_mtu_discovery", self.disable_mtu_discovery)
            .push_flag("fast_open", self.fast_open)
            .push_non_default("hop_interval", self.hop_interval.as_str(), "0");

        format!(
            "hysteria2://{}{}:{}{}{}",
            userinfo_prefix,
            format_host(&self.address),
            self.port,
            query.to_suffix(),
            fragment_suffix(&self.remark)
        )
    }
}

// ============================================================================
// Hysteria2 Codec
// ============================================================================

pub struct Hysteria2Codec;

impl ProtocolCodec for Hysteria2Codec {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Hysteria2
    }

    fn parse(&self, body: &str, fragment: Option<&str>) -> Result<CanonicalOutbound> {
        Hysteria2Link::parse(body, fragment)?.to_canonical()
    }

    fn serialize(
        &self,
        outbound: &CanonicalOutbound,
        _options: &ShareOptions,
    ) -> Result<String, InvariantViolation> {
        outbound.check_invariants()?;
        Ok(Hysteria2Link::from_canonical(outbound)?.to_link())
    }
}
