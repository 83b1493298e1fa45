//! Shared defaulting table.
//!
//! Every parser and template reads its fallbacks from here so the protocols
//! cannot drift apart.

use super::{ProtocolKind, SecurityKind};

// ============================================================================
// Endpoint Defaults
// ============================================================================

/// Port used by VMess, VLESS, Trojan and Hysteria2 when a link omits it
pub const DEFAULT_PORT: u16 = 443;

/// Port used by Shadowsocks when a link omits it
pub const SHADOWSOCKS_DEFAULT_PORT: u16 = 8388;

pub const VMESS_ALTER_ID: u16 = 0;
pub const VMESS_SECURITY: &str = "auto";
pub const VLESS_ENCRYPTION: &str = "none";
pub const USER_LEVEL: u32 = 0;

/// Method pre-selected in a blank Shadowsocks form
pub const SHADOWSOCKS_TEMPLATE_METHOD: &str = "aes-256-gcm";

pub const HYSTERIA2_PROTOCOL: &str = "udp";
pub const HYSTERIA2_UP_MBPS: f64 = 10.0;
pub const HYSTERIA2_DOWN_MBPS: f64 = 50.0;
pub const HYSTERIA2_CONGESTION: &str = "bbr";

// ============================================================================
// Transport Defaults
// ============================================================================

pub const HEADER_TYPE_NONE: &str = "none";
pub const QUIC_SECURITY: &str = "none";

pub const KCP_MTU: u32 = 1350;
pub const KCP_TTI: u32 = 50;
pub const KCP_UPLINK_CAPACITY: u32 = 5;
pub const KCP_DOWNLINK_CAPACITY: u32 = 20;
pub const KCP_READ_BUFFER_SIZE: u32 = 2;
pub const KCP_WRITE_BUFFER_SIZE: u32 = 2;

// ============================================================================
// Mux Defaults
// ============================================================================

pub const MUX_CONCURRENCY: u16 = 8;
pub const MUX_MAX_CONCURRENCY: u16 = 1024;

/// Returns the port a protocol falls back to when the link has none.
pub fn default_port(kind: ProtocolKind) -> u16 {
    match kind {
        ProtocolKind::Shadowsocks => SHADOWSOCKS_DEFAULT_PORT,
        ProtocolKind::VMess
        | ProtocolKind::VLess
        | ProtocolKind::Trojan
        | ProtocolKind::Hysteria2 => DEFAULT_PORT,
    }
}

/// Returns the transport security assumed when a link leaves it empty.
pub fn default_security(kind: ProtocolKind) -> SecurityKind {
    match kind {
        ProtocolKind::VLess | ProtocolKind::Trojan => SecurityKind::Tls,
        ProtocolKind::VMess | ProtocolKind::Shadowsocks | ProtocolKind::Hysteria2 => {
            SecurityKind::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_per_protocol() {
        assert_eq!(default_port(ProtocolKind::VMess), 443);
        assert_eq!(default_port(ProtocolKind::VLess), 443);
        assert_eq!(default_port(ProtocolKind::Trojan), 443);
        assert_eq!(default_port(ProtocolKind::Hysteria2), 443);
        assert_eq!(default_port(ProtocolKind::Shadowsocks), 8388);
    }

    #[test]
    fn test_default_security_per_protocol() {
        assert_eq!(default_security(ProtocolKind::Trojan), SecurityKind::Tls);
        assert_eq!(default_security(ProtocolKind::VLess), SecurityKind::Tls);
        assert_eq!(default_security(ProtocolKind::VMess), SecurityKind::None);
    }
}
