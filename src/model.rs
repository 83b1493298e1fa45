//! Canonical outbound model
//!
//! Every share-link parser converges on [`CanonicalOutbound`] and every
//! serializer starts from it. Protocol, network and security are closed
//! enumerations and each carries only the settings variant it selects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, LinkError, Result};

pub mod defaults;
pub mod remote;
pub mod security;
pub mod transport;

pub use remote::{
    Hysteria2Remote, Remote, ShadowsocksRemote, TrojanRemote, VLessRemote, VMessRemote,
};
pub use security::{RealitySettings, Security, SecurityFields, SecurityKind, TlsSettings};
pub use transport::{
    GrpcSettings, H2Settings, Hysteria2Settings, KcpSettings, Network, QuicSettings, TcpSettings,
    Transport, TransportFields, WsSettings,
};

use defaults::{MUX_CONCURRENCY, MUX_MAX_CONCURRENCY};

// ============================================================================
// Protocol Kind
// ============================================================================

/// Closed set of supported proxy protocols
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    VMess,
    VLess,
    Trojan,
    Shadowsocks,
    Hysteria2,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 5] = [
        ProtocolKind::VMess,
        ProtocolKind::VLess,
        ProtocolKind::Trojan,
        ProtocolKind::Shadowsocks,
        ProtocolKind::Hysteria2,
    ];

    /// URI scheme, without `://`
    pub fn scheme(&self) -> &'static str {
        match self {
            ProtocolKind::VMess => "vmess",
            ProtocolKind::VLess => "vless",
            ProtocolKind::Trojan => "trojan",
            ProtocolKind::Shadowsocks => "ss",
            ProtocolKind::Hysteria2 => "hysteria2",
        }
    }

    /// Engine protocol name
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolKind::Shadowsocks => "shadowsocks",
            other => other.scheme(),
        }
    }

    /// Case-insensitive scheme lookup
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.scheme().eq_ignore_ascii_case(scheme))
            .ok_or_else(|| LinkError::UnsupportedProtocol(scheme.to_string()))
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Mux
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mux {
    pub enabled: bool,
    /// 1..=1024
    pub concurrency: u16,
}

impl Default for Mux {
    fn default() -> Self {
        Self {
            enabled: false,
            concurrency: MUX_CONCURRENCY,
        }
    }
}

// ============================================================================
// Canonical Outbound
// ============================================================================

/// One remote proxy endpoint, independent of the link format it came from
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CanonicalOutbound {
    /// Display name (`ps` / remark)
    pub label: String,
    pub remote: Remote,
    pub transport: Transport,
    pub security: Security,
    #[serde(default)]
    pub mux: Mux,
}

impl CanonicalOutbound {
    pub fn protocol(&self) -> ProtocolKind {
        self.remote.kind()
    }

    /// Fully-defaulted, empty-credential outbound for a blank "add endpoint" form.
    pub fn template(kind: ProtocolKind) -> Self {
        let transport = match kind {
            ProtocolKind::Hysteria2 => Transport::default_for(Network::Hysteria2),
            _ => Transport::default(),
        };

        Self {
            label: String::new(),
            remote: Remote::template(kind),
            transport,
            security: Security::default_for(defaults::default_security(kind)),
            mux: Mux::default(),
        }
    }

    /// Checks the structural invariants a serializer relies on.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let kind = self.protocol();

        if self.remote.port() == 0 {
            return Err(InvariantViolation(format!("{} remote port is 0", kind)));
        }

        if !(1..=MUX_MAX_CONCURRENCY).contains(&self.mux.concurrency) {
            return Err(InvariantViolation(format!(
                "mux concurrency {} outside 1..={}",
                self.mux.concurrency, MUX_MAX_CONCURRENCY
            )));
        }

        let network = self.transport.network();
        match kind {
            ProtocolKind::VMess | ProtocolKind::VLess | ProtocolKind::Trojan
                if network == Network::Hysteria2 =>
            {
                return Err(InvariantViolation(format!(
                    "{} outbound cannot use hysteria2 transport",
                    kind
                )));
            }
            ProtocolKind::Hysteria2 if network != Network::Hysteria2 => {
                return Err(InvariantViolation(format!(
                    "hysteria2 outbound carries {} transport",
                    network
                )));
            }
            ProtocolKind::Shadowsocks if network != Network::Tcp => {
                return Err(InvariantViolation(format!(
                    "shadowsocks outbound carries {} transport",
                    network
                )));
            }
            _ => {}
        }

        if kind == ProtocolKind::Shadowsocks && self.security != Security::None {
            return Err(InvariantViolation(format!(
                "shadowsocks outbound carries {} security",
                self.security.kind()
            )));
        }

        if kind == ProtocolKind::Hysteria2
            && matches!(self.security, Security::Xtls(_) | Security::Reality(_))
        {
            return Err(InvariantViolation(format!(
                "hysteria2 outbound carries {} security",
                self.security.kind()
            )));
        }

        Ok(())
    }
}

/// Picks the display label: first non-empty candidate, else the address.
pub(crate) fn resolve_label(candidates: &[&str], address: &str) -> String {
    candidates
        .iter()
        .find(|c| !c.is_empty())
        .copied()
        .unwrap_or(address)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scheme_case_insensitive() {
        assert_eq!(
            ProtocolKind::from_scheme("VMESS").unwrap(),
            ProtocolKind::VMess
        );
        assert_eq!(
            ProtocolKind::from_scheme("Ss").unwrap(),
            ProtocolKind::Shadowsocks
        );
    }

    #[test]
    fn test_from_scheme_rejects_unknown_and_empty() {
        assert_eq!(
            ProtocolKind::from_scheme("socks5").unwrap_err(),
            LinkError::UnsupportedProtocol("socks5".to_string())
        );
        assert!(ProtocolKind::from_scheme("").is_err());
    }

    #[test]
    fn test_every_template_holds_invariants() {
        for kind in ProtocolKind::ALL {
            let template = CanonicalOutbound::template(kind);
            assert_eq!(template.protocol(), kind);
            assert_eq!(template.mux, Mux::default());
            template.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_template_security_defaults() {
        assert_eq!(
            CanonicalOutbound::template(ProtocolKind::Trojan)
                .security
                .kind(),
            SecurityKind::Tls
        );
        assert_eq!(
            CanonicalOutbound::template(ProtocolKind::VMess)
                .security
                .kind(),
            SecurityKind::None
        );
    }

    #[test]
    fn test_invariants_reject_zero_port() {
        let mut outbound = CanonicalOutbound::template(ProtocolKind::VMess);
        if let Remote::VMess(vmess) = &mut outbound.remote {
            vmess.port = 0;
        }
        assert!(outbound.check_invariants().is_err());
    }

    #[test]
    fn test_invariants_reject_mux_out_of_range() {
        let mut outbound = CanonicalOutbound::template(ProtocolKind::VLess);
        outbound.mux.concurrency = 2048;
        assert!(outbound.check_invariants().is_err());
    }

    #[test]
    fn test_invariants_reject_hysteria2_transport_on_vmess() {
        let mut outbound = CanonicalOutbound::template(ProtocolKind::VMess);
        outbound.transport = Transport::default_for(Network::Hysteria2);
        assert!(outbound.check_invariants().is_err());
    }

    #[test]
    fn test_invariants_reject_shadowsocks_stream_settings() {
        let mut outbound = CanonicalOutbound::template(ProtocolKind::Shadowsocks);
        outbound.transport = Transport::default_for(Network::Ws);
        assert!(outbound.check_invariants().is_err());

        let mut outbound = CanonicalOutbound::template(ProtocolKind::Shadowsocks);
        outbound.security = Security::Tls(TlsSettings::default());
        assert!(outbound.check_invariants().is_err());
    }

    #[test]
    fn test_resolve_label() {
        assert_eq!(resolve_label(&["", "remark"], "1.2.3.4"), "remark");
        assert_eq!(resolve_label(&["", ""], "1.2.3.4"), "1.2.3.4");
        assert_eq!(resolve_label(&[], "host"), "host");
    }

    #[test]
    fn test_outbound_json_shape() {
        let json = serde_json::to_value(CanonicalOutbound::template(ProtocolKind::Trojan)).unwrap();
        assert_eq!(json["remote"]["protocol"], "trojan");
        assert_eq!(json["transport"]["network"], "tcp");
        assert_eq!(json["security"]["kind"], "tls");
        assert_eq!(json["mux"]["concurrency"], 8);
    }
}
