//! Transport (stream) settings of a canonical outbound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::uri::number_or;
use crate::config::util::{is_empty_str, is_false};
use crate::error::{LinkError, Result};

use super::defaults::{
    HEADER_TYPE_NONE, HYSTERIA2_CONGESTION, KCP_DOWNLINK_CAPACITY, KCP_MTU, KCP_READ_BUFFER_SIZE,
    KCP_TTI, KCP_UPLINK_CAPACITY, KCP_WRITE_BUFFER_SIZE, QUIC_SECURITY,
};

// ============================================================================
// Network
// ============================================================================

/// Closed set of stream networks
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Kcp,
    Ws,
    H2,
    Quic,
    Grpc,
    Hysteria2,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Kcp => "kcp",
            Network::Ws => "ws",
            Network::H2 => "h2",
            Network::Quic => "quic",
            Network::Grpc => "grpc",
            Network::Hysteria2 => "hysteria2",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = LinkError;

    /// Accepts the canonical names plus the aliases seen in the wild
    /// (`websocket`, `http`, `mkcp`, and `multi` for multi-mode gRPC).
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "tcp" => Ok(Network::Tcp),
            "kcp" | "mkcp" => Ok(Network::Kcp),
            "ws" | "websocket" => Ok(Network::Ws),
            "h2" | "http" => Ok(Network::H2),
            "quic" => Ok(Network::Quic),
            "grpc" | "multi" => Ok(Network::Grpc),
            "hysteria2" => Ok(Network::Hysteria2),
            other => Err(LinkError::malformed(format!(
                "unsupported transport network '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Per-network Settings
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TcpSettings {
    /// Camouflage header, `none` or `http`
    pub header_type: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub host: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub path: String,
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self {
            header_type: HEADER_TYPE_NONE.to_string(),
            host: String::new(),
            path: String::new(),
        }
    }
}

/// mKCP settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KcpSettings {
    pub mtu: u32,
    pub tti: u32,
    pub uplink_capacity: u32,
    pub downlink_capacity: u32,
    #[serde(default)]
    pub congestion: bool,
    pub read_buffer_size: u32,
    pub write_buffer_size: u32,
    pub header_type: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub seed: String,
}

impl Default for KcpSettings {
    fn default() -> Self {
        Self {
            mtu: KCP_MTU,
            tti: KCP_TTI,
            uplink_capacity: KCP_UPLINK_CAPACITY,
            downlink_capacity: KCP_DOWNLINK_CAPACITY,
            congestion: false,
            read_buffer_size: KCP_READ_BUFFER_SIZE,
            write_buffer_size: KCP_WRITE_BUFFER_SIZE,
            header_type: HEADER_TYPE_NONE.to_string(),
            seed: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct WsSettings {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub host: String,
}

/// HTTP/2 settings; `host` is a list in the engine config
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct H2Settings {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuicSettings {
    pub security: String,
    #[serde(default, skip_serializing_if = "is_empty_str")]
    pub key: String,
    pub header_type: String,
}

impl Default for QuicSettings {
    fn default() -> Self {
        Self {
            security: QUIC_SECURITY.to_string(),
            key: String::new(),
            header_type: HEADER_TYPE_NONE.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct GrpcSettings {
    #[serde(default)]
    pub service_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi_mode: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Settings {
    pub congestion: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_udp_extension: bool,
}

impl Default for Hysteria2Settings {
    fn default() -> Self {
        Self {
            congestion: HYSTERIA2_CONGESTION.to_string(),
            use_udp_extension: false,
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Stream transport; exactly one settings variant, selected by network
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "network", rename_all = "lowercase")]
pub enum Transport {
    Tcp(TcpSettings),
    Kcp(KcpSettings),
    Ws(WsSettings),
    H2(H2Settings),
    Quic(QuicSettings),
    Grpc(GrpcSettings),
    Hysteria2(Hysteria2Settings),
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Tcp(TcpSettings::default())
    }
}

/// Transport-related fields as they travel in share links.
///
/// Empty strings mean "not present in the link".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransportFields {
    pub network: String,
    pub header_type: String,
    pub host: String,
    pub path: String,
    pub service_name: String,
    pub mode: String,
    pub seed: String,
    pub uplink_capacity: String,
    pub downlink_capacity: String,
}

impl Transport {
    pub fn network(&self) -> Network {
        match self {
            Transport::Tcp(_) => Network::Tcp,
            Transport::Kcp(_) => Network::Kcp,
            Transport::Ws(_) => Network::Ws,
            Transport::H2(_) => Network::H2,
            Transport::Quic(_) => Network::Quic,
            Transport::Grpc(_) => Network::Grpc,
            Transport::Hysteria2(_) => Network::Hysteria2,
        }
    }

    /// Builds the defaulted settings for a network.
    pub fn default_for(network: Network) -> Self {
        match network {
            Network::Tcp => Transport::Tcp(TcpSettings::default()),
            Network::Kcp => Transport::Kcp(KcpSettings::default()),
            Network::Ws => Transport::Ws(WsSettings::default()),
            Network::H2 => Transport::H2(H2Settings::default()),
            Network::Quic => Transport::Quic(QuicSettings::default()),
            Network::Grpc => Transport::Grpc(GrpcSettings::default()),
            Network::Hysteria2 => Transport::Hysteria2(Hysteria2Settings::default()),
        }
    }

    /// Maps link fields onto the single settings variant their network selects.
    ///
    /// Only stream transports come from link fields; `hysteria2` is implied by
    /// its own scheme and is rejected here.
    pub fn from_fields(fields: &TransportFields) -> Result<Self> {
        let network: Network = fields.network.parse()?;
        trace!("Building {} transport from link fields", network);

        let header_type = non_empty_or(&fields.header_type, HEADER_TYPE_NONE);

        let transport = match network {
            Network::Tcp => Transport::Tcp(TcpSettings {
                header_type,
                host: fields.host.clone(),
                path: fields.path.clone(),
            }),
            Network::Kcp => Transport::Kcp(KcpSettings {
                uplink_capacity: number_or(
                    &fields.uplink_capacity,
                    KCP_UPLINK_CAPACITY,
                    "uplinkCapacity",
                ),
                downlink_capacity: number_or(
                    &fields.downlink_capacity,
                    KCP_DOWNLINK_CAPACITY,
                    "downlinkCapacity",
                ),
                header_type,
                seed: fields.seed.clone(),
                ..KcpSettings::default()
            }),
            Network::Ws => Transport::Ws(WsSettings {
                path: fields.path.clone(),
                host: fields.host.clone(),
            }),
            Network::H2 => Transport::H2(H2Settings {
                path: fields.path.clone(),
                host: split_list(&fields.host),
            }),
            Network::Quic => Transport::Quic(QuicSettings {
                security: non_empty_or(&fields.host, QUIC_SECURITY),
                key: fields.path.clone(),
                header_type,
            }),
            Network::Grpc => Transport::Grpc(GrpcSettings {
                service_name: if fields.service_name.is_empty() {
                    fields.path.clone()
                } else {
                    fields.service_name.clone()
                },
                multi_mode: fields.mode.eq_ignore_ascii_case("multi")
                    || fields.network.eq_ignore_ascii_case("multi")
                    || fields.header_type.eq_ignore_ascii_case("multi"),
            }),
            Network::Hysteria2 => {
                return Err(LinkError::malformed(
                    "hysteria2 is not a stream transport for this protocol",
                ));
            }
        };

        Ok(transport)
    }

    /// Inverse of [`Transport::from_fields`].
    pub fn to_fields(&self) -> TransportFields {
        let mut fields = TransportFields {
            network: self.network().as_str().to_string(),
            ..Default::default()
        };

        match self {
            Transport::Tcp(tcp) => {
                fields.header_type = tcp.header_type.clone();
                fields.host = tcp.host.clone();
                fields.path = tcp.path.clone();
            }
            Transport::Kcp(kcp) => {
                fields.header_type = kcp.header_type.clone();
                fields.seed = kcp.seed.clone();
                fields.uplink_capacity = kcp.uplink_capacity.to_string();
                fields.downlink_capacity = kcp.downlink_capacity.to_string();
            }
            Transport::Ws(ws) => {
                fields.host = ws.host.clone();
                fields.path = ws.path.clone();
            }
            Transport::H2(h2) => {
                fields.host = h2.host.join(",");
                fields.path = h2.path.clone();
            }
            Transport::Quic(quic) => {
                fields.host = quic.security.clone();
                fields.path = quic.key.clone();
                fields.header_type = quic.header_type.clone();
            }
            Transport::Grpc(grpc) => {
                fields.service_name = grpc.service_name.clone();
                if grpc.multi_mode {
                    fields.mode = "multi".to_string();
                }
            }
            Transport::Hysteria2(_) => {}
        }

        fields
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(network: &str) -> TransportFields {
        TransportFields {
            network: network.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_network_aliases() {
        assert_eq!("websocket".parse::<Network>().unwrap(), Network::Ws);
        assert_eq!("http".parse::<Network>().unwrap(), Network::H2);
        assert_eq!("mkcp".parse::<Network>().unwrap(), Network::Kcp);
        assert_eq!("".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("WS".parse::<Network>().unwrap(), Network::Ws);
    }

    #[test]
    fn test_network_unknown_is_error() {
        let err = "carrier-pigeon".parse::<Network>().unwrap_err();
        assert!(matches!(err, LinkError::MalformedLink(_)));
    }

    #[test]
    fn test_hysteria2_network_rejected_from_link_fields() {
        assert!(matches!(
            Transport::from_fields(&fields("hysteria2")).unwrap_err(),
            LinkError::MalformedLink(_)
        ));
    }

    #[test]
    fn test_kcp_defaults() {
        let transport = Transport::from_fields(&fields("kcp")).unwrap();
        if let Transport::Kcp(kcp) = transport {
            assert_eq!(kcp.mtu, 1350);
            assert_eq!(kcp.tti, 50);
            assert_eq!(kcp.uplink_capacity, 5);
            assert_eq!(kcp.downlink_capacity, 20);
            assert_eq!(kcp.read_buffer_size, 2);
            assert_eq!(kcp.write_buffer_size, 2);
            assert_eq!(kcp.header_type, "none");
        } else {
            panic!("Expected kcp transport");
        }
    }

    #[test]
    fn test_kcp_unparsable_capacity_falls_back() {
        let mut f = fields("kcp");
        f.uplink_capacity = "fast".to_string();
        f.downlink_capacity = "100".to_string();
        let transport = Transport::from_fields(&f).unwrap();
        if let Transport::Kcp(kcp) = transport {
            assert_eq!(kcp.uplink_capacity, 5);
            assert_eq!(kcp.downlink_capacity, 100);
        } else {
            panic!("Expected kcp transport");
        }
    }

    #[test]
    fn test_grpc_service_name_falls_back_to_path() {
        let mut f = fields("grpc");
        f.path = "svc".to_string();
        let transport = Transport::from_fields(&f).unwrap();
        assert_eq!(
            transport,
            Transport::Grpc(GrpcSettings {
                service_name: "svc".to_string(),
                multi_mode: false,
            })
        );
    }

    #[test]
    fn test_grpc_multi_alias() {
        let transport = Transport::from_fields(&fields("multi")).unwrap();
        if let Transport::Grpc(grpc) = transport {
            assert!(grpc.multi_mode);
        } else {
            panic!("Expected grpc transport");
        }
    }

    #[test]
    fn test_h2_host_list() {
        let mut f = fields("h2");
        f.host = "a.example.com, b.example.com".to_string();
        let transport = Transport::from_fields(&f).unwrap();
        if let Transport::H2(h2) = &transport {
            assert_eq!(h2.host, vec!["a.example.com", "b.example.com"]);
        } else {
            panic!("Expected h2 transport");
        }
        assert_eq!(transport.to_fields().host, "a.example.com,b.example.com");
    }

    #[test]
    fn test_fields_round_trip_is_stable() {
        let mut f = fields("ws");
        f.host = "cdn.example.com".to_string();
        f.path = "/ray".to_string();
        let first = Transport::from_fields(&f).unwrap();
        let second = Transport::from_fields(&first.to_fields()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serde_tag_is_network() {
        let json = serde_json::to_value(Transport::default()).unwrap();
        assert_eq!(json["network"], "tcp");
        assert_eq!(json["header_type"], "none");
    }
}
