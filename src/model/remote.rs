//! Protocol-specific endpoint and credentials.

use serde::{Deserialize, Serialize};

use crate::config::util::{is_empty_str, is_false, is_zero_u32, is_zero_u64};

use super::ProtocolKind;
use super::defaults::{
    DEFAULT_PORT, HYSTERIA2_DOWN_MBPS, HYSTERIA2_PROTOCOL, HYSTERIA2_UP_MBPS,
    SHADOWSOCKS_DEFAULT_PORT, SHADOWSOCKS_TEMPLATE_METHOD, USER_LEVEL, VLESS_ENCRYPTION,
    VMESS_ALTER_ID, VMESS_SECURITY,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VMessRemote {
    pub address: String,
    pub port: u16,
    pub id: String,
    pub alter_id: u16,
    pub level: u32,
    /// Body encryption (`scy`)
    pub security: String,
}

impl Default for VMessRemote {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_PORT,
            id: String::new(),
            alter_id: VMESS_ALTER_ID,
            level: USER_LEVEL,
            security: VMESS_SECURITY.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VLessRemote {
    pub address: String,
    pub port: u16,
    pub id: String,
    pub level: u32,
    #[serde(default)]
    pub flow: String,
    pub encryption: String,
}

impl Default for VLessRemote {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_PORT,
            id: String::new(),
            level: USER_LEVEL,
            flow: String::new(),
            encryption: VLESS_ENCRYPTION.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrojanRemote {
    pub address: String,
    pub port: u16,
    pub password: String,
    pub level: u32,
    #[serde(default)]
    pub flow: String,
}

impl Default for TrojanRemote {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_PORT,
            password: String::new(),
            level: USER_LEVEL,
            flow: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShadowsocksRemote {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,
    /// SIP003 plugin string, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl Default for ShadowsocksRemote {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: SHADOWSOCKS_DEFAULT_PORT,
            method: SHADOWSOCKS_TEMPLATE_METHOD.to_string(),
            password: String::new(),
            plugin: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Remote {
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub username: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub password: String,
    #[serde(default)]
    pub auth: String,
    pub protocol: String,
    pub up_mbps: f64,
    pub down_mbps: f64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub recv_window_conn: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub recv_window: u64,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub obfs: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub obfs_password: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_mtu_discovery: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fast_open: bool,
    /// Port hopping interval in seconds, 0 disables
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub hop_interval: u32,
}

impl Default for Hysteria2Remote {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            auth: String::new(),
            protocol: HYSTERIA2_PROTOCOL.to_string(),
            up_mbps: HYSTERIA2_UP_MBPS,
            down_mbps: HYSTERIA2_DOWN_MBPS,
            recv_window_conn: 0,
            recv_window: 0,
            obfs: String::new(),
            obfs_password: String::new(),
            disable_mtu_discovery: false,
            fast_open: false,
            hop_interval: 0,
        }
    }
}

/// Remote endpoint; the variant decides the outbound's protocol
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Remote {
    VMess(VMessRemote),
    VLess(VLessRemote),
    Trojan(TrojanRemote),
    Shadowsocks(ShadowsocksRemote),
    Hysteria2(Hysteria2Remote),
}

impl Remote {
    pub fn kind(&self) -> ProtocolKind {
        match self {
            Remote::VMess(_) => ProtocolKind::VMess,
            Remote::VLess(_) => ProtocolKind::VLess,
            Remote::Trojan(_) => ProtocolKind::Trojan,
            Remote::Shadowsocks(_) => ProtocolKind::Shadowsocks,
            Remote::Hysteria2(_) => ProtocolKind::Hysteria2,
        }
    }

    /// Empty-credential remote for a protocol
    pub fn template(kind: ProtocolKind) -> Self {
        match kind {
            ProtocolKind::VMess => Remote::VMess(VMessRemote::default()),
            ProtocolKind::VLess => Remote::VLess(VLessRemote::default()),
            ProtocolKind::Trojan => Remote::Trojan(TrojanRemote::default()),
            ProtocolKind::Shadowsocks => Remote::Shadowsocks(ShadowsocksRemote::default()),
            ProtocolKind::Hysteria2 => Remote::Hysteria2(Hysteria2Remote::default()),
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Remote::VMess(r) => &r.address,
            Remote::VLess(r) => &r.address,
            Remote::Trojan(r) => &r.address,
            Remote::Shadowsocks(r) => &r.address,
            Remote::Hysteria2(r) => &r.address,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Remote::VMess(r) => r.port,
            Remote::VLess(r) => r.port,
            Remote::Trojan(r) => r.port,
            Remote::Shadowsocks(r) => r.port,
            Remote::Hysteria2(r) => r.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_kind_matches() {
        for kind in ProtocolKind::ALL {
            assert_eq!(Remote::template(kind).kind(), kind);
        }
    }

    #[test]
    fn test_shadowsocks_template_port() {
        let remote = Remote::template(ProtocolKind::Shadowsocks);
        assert_eq!(remote.port(), 8388);
        if let Remote::Shadowsocks(ss) = remote {
            assert_eq!(ss.method, "aes-256-gcm");
        } else {
            panic!("Expected Shadowsocks remote");
        }
    }

    #[test]
    fn test_protocol_tag_serialization() {
        let json = serde_json::to_value(Remote::template(ProtocolKind::VLess)).unwrap();
        assert_eq!(json["protocol"], "vless");
        assert_eq!(json["encryption"], "none");
    }
}
