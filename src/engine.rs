//! Proxy engine outbound projection
//!
//! A 1:1 structural mapping from [`CanonicalOutbound`] onto the engine's
//! outbound JSON (`settings.vnext` / `settings.servers`, `streamSettings`,
//! `mux`). Only the settings object selected by the network and security kind
//! is emitted.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::config::util::{is_empty_str, is_false};
use crate::model::defaults::HEADER_TYPE_NONE;
use crate::model::{
    CanonicalOutbound, Hysteria2Remote, Remote, Security, ShadowsocksRemote, TlsSettings,
    Transport, TrojanRemote,
};

// ============================================================================
// Outbound
// ============================================================================

/// One engine outbound
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineOutbound {
    pub tag: String,
    pub protocol: String,
    pub settings: OutboundSettings,
    pub stream_settings: StreamSettings,
    pub mux: MuxSettings,
}

/// `settings` block: `vnext` for VMess/VLESS, `servers` for the rest
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum OutboundSettings {
    Vnext { vnext: Vec<VnextServer> },
    Servers { servers: Vec<ServerEntry> },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VnextServer {
    pub address: String,
    pub port: u16,
    pub users: Vec<VnextUser>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VnextUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u16>,
    pub level: u32,
    /// VMess body encryption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// VLESS encryption, always `none` today
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub flow: String,
}

/// Entry of `settings.servers`
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ServerEntry {
    Trojan(TrojanServer),
    Shadowsocks(ShadowsocksServer),
    Hysteria2(Hysteria2Server),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TrojanServer {
    pub address: String,
    pub port: u16,
    pub password: String,
    pub level: u32,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub flow: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ShadowsocksServer {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Server {
    pub address: String,
    pub port: u16,
    pub auth_str: String,
    pub protocol: String,
    pub up: f64,
    pub down: f64,
    pub recv_window_conn: u64,
    pub recv_window: u64,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub obfs: String,
    #[serde(rename = "obfs-password", skip_serializing_if = "is_empty_str")]
    pub obfs_password: String,
    pub disable_mtu_discovery: bool,
    pub fast_open: bool,
    pub hop_interval: u32,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct MuxSettings {
    pub enabled: bool,
    pub concurrency: u16,
}

// ============================================================================
// Stream Settings
// ============================================================================

/// `streamSettings`; exactly one network and at most one security block is set
#[derive(Serialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    pub network: String,
    pub security: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_settings: Option<TcpStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcp_settings: Option<KcpStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<WsStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_settings: Option<HttpStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quic_settings: Option<QuicStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_settings: Option<GrpcStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hysteria2_settings: Option<Hysteria2Stream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_settings: Option<TlsStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xtls_settings: Option<TlsStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_settings: Option<RealityStream>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HeaderObject {
    #[serde(rename = "type")]
    pub header_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequest>,
}

/// HTTP camouflage request for `tcp` with `header.type = http`
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub path: Vec<String>,
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TcpStream {
    pub accept_proxy_protocol: bool,
    pub header: HeaderObject,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KcpStream {
    pub mtu: u32,
    pub tti: u32,
    pub uplink_capacity: u32,
    pub downlink_capacity: u32,
    pub congestion: bool,
    pub read_buffer_size: u32,
    pub write_buffer_size: u32,
    pub header: HeaderObject,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub seed: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WsStream {
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HttpStream {
    pub path: String,
    pub host: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QuicStream {
    pub security: String,
    pub key: String,
    pub header: HeaderObject,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcStream {
    pub service_name: String,
    pub multi_mode: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Stream {
    pub password: String,
    pub use_udp_extension: bool,
    pub congestion: Hysteria2Congestion,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Congestion {
    #[serde(rename = "type")]
    pub congestion_type: String,
    pub up_mbps: f64,
    pub down_mbps: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsStream {
    pub server_name: String,
    pub allow_insecure: bool,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealityStream {
    pub server_name: String,
    pub fingerprint: String,
    pub public_key: String,
    pub short_id: String,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub spider_x: String,
    #[serde(skip_serializing_if = "is_false")]
    pub show: bool,
}

// ============================================================================
// Projection
// ============================================================================

/// Projects a canonical outbound onto the engine's outbound JSON shape.
pub fn to_outbound(outbound: &CanonicalOutbound, tag: &str) -> EngineOutbound {
    trace!(
        "Projecting {} outbound '{}' with tag '{}'",
        outbound.protocol(),
        outbound.label,
        tag
    );

    EngineOutbound {
        tag: tag.to_string(),
        protocol: outbound.protocol().name().to_string(),
        settings: settings(&outbound.remote),
        stream_settings: stream_settings(outbound),
        mux: MuxSettings {
            enabled: outbound.mux.enabled,
            concurrency: outbound.mux.concurrency,
        },
    }
}

fn settings(remote: &Remote) -> OutboundSettings {
    match remote {
        Remote::VMess(vmess) => OutboundSettings::Vnext {
            vnext: vec![VnextServer {
                address: vmess.address.clone(),
                port: vmess.port,
                users: vec![VnextUser {
                    id: vmess.id.clone(),
                    alter_id: Some(vmess.alter_id),
                    level: vmess.level,
                    security: Some(vmess.security.clone()),
                    encryption: None,
                    flow: String::new(),
                }],
            }],
        },
        Remote::VLess(vless) => OutboundSettings::Vnext {
            vnext: vec![VnextServer {
                address: vless.address.clone(),
                port: vless.port,
                users: vec![VnextUser {
                    id: vless.id.clone(),
                    alter_id: None,
                    level: vless.level,
                    security: None,
                    encryption: Some(vless.encryption.clone()),
                    flow: vless.flow.clone(),
                }],
            }],
        },
        Remote::Trojan(trojan) => servers(ServerEntry::Trojan(trojan_server(trojan))),
        Remote::Shadowsocks(ss) => servers(ServerEntry::Shadowsocks(shadowsocks_server(ss))),
        Remote::Hysteria2(hy2) => servers(ServerEntry::Hysteria2(hysteria2_server(hy2))),
    }
}

fn servers(entry: ServerEntry) -> OutboundSettings {
    OutboundSettings::Servers {
        servers: vec![entry],
    }
}

fn trojan_server(trojan: &TrojanRemote) -> TrojanServer {
    TrojanServer {
        address: trojan.address.clone(),
        port: trojan.port,
        password: trojan.password.clone(),
        level: trojan.level,
        flow: trojan.flow.clone(),
    }
}

fn shadowsocks_server(ss: &ShadowsocksRemote) -> ShadowsocksServer {
    ShadowsocksServer {
        address: ss.address.clone(),
        port: ss.port,
        method: ss.method.clone(),
        password: ss.password.clone(),
        plugin: ss.plugin.clone(),
    }
}

fn hysteria2_server(hy2: &Hysteria2Remote) -> Hysteria2Server {
    Hysteria2Server {
        address: hy2.address.clone(),
        port: hy2.port,
        auth_str: hy2.auth.clone(),
        protocol: hy2.protocol.clone(),
        up: hy2.up_mbps,
        down: hy2.down_mbps,
        recv_window_conn: hy2.recv_window_conn,
        recv_window: hy2.recv_window,
        obfs: hy2.obfs.clone(),
        obfs_password: hy2.obfs_password.clone(),
        disable_mtu_discovery: hy2.disable_mtu_discovery,
        fast_open: hy2.fast_open,
        hop_interval: hy2.hop_interval,
    }
}

fn header(header_type: &str) -> HeaderObject {
    HeaderObject {
        header_type: header_type.to_string(),
        request: None,
    }
}

fn stream_settings(outbound: &CanonicalOutbound) -> StreamSettings {
    let mut stream = StreamSettings {
        network: outbound.transport.network().as_str().to_string(),
        security: outbound.security.kind().as_str().to_string(),
        ..Default::default()
    };

    match &outbound.transport {
        Transport::Tcp(tcp) => {
            let mut tcp_header = header(&tcp.header_type);
            if tcp.header_type != HEADER_TYPE_NONE {
                let mut headers = BTreeMap::new();
                if !tcp.host.is_empty() {
                    headers.insert(
                        "Host".to_string(),
                        tcp.host.split(',').map(|h| h.trim().to_string()).collect(),
                    );
                }
                tcp_header.request = Some(HttpRequest {
                    path: vec![if tcp.path.is_empty() {
                        "/".to_string()
                    } else {
                        tcp.path.clone()
                    }],
                    headers,
                });
            }
            stream.tcp_settings = Some(TcpStream {
                accept_proxy_protocol: false,
                header: tcp_header,
            });
        }
        Transport::Kcp(kcp) => {
            stream.kcp_settings = Some(KcpStream {
                mtu: kcp.mtu,
                tti: kcp.tti,
                uplink_capacity: kcp.uplink_capacity,
                downlink_capacity: kcp.downlink_capacity,
                congestion: kcp.congestion,
                read_buffer_size: kcp.read_buffer_size,
                write_buffer_size: kcp.write_buffer_size,
                header: header(&kcp.header_type),
                seed: kcp.seed.clone(),
            });
        }
        Transport::Ws(ws) => {
            let mut headers = BTreeMap::new();
            if !ws.host.is_empty() {
                headers.insert("Host".to_string(), ws.host.clone());
            }
            stream.ws_settings = Some(WsStream {
                path: ws.path.clone(),
                headers,
            });
        }
        Transport::H2(h2) => {
            stream.http_settings = Some(HttpStream {
                path: h2.path.clone(),
                host: h2.host.clone(),
            });
        }
        Transport::Quic(quic) => {
            stream.quic_settings = Some(QuicStream {
                security: quic.security.clone(),
                key: quic.key.clone(),
                header: header(&quic.header_type),
            });
        }
        Transport::Grpc(grpc) => {
            stream.grpc_settings = Some(GrpcStream {
                service_name: grpc.service_name.clone(),
                multi_mode: grpc.multi_mode,
            });
        }
        Transport::Hysteria2(settings) => {
            let (password, up_mbps, down_mbps) = match &outbound.remote {
                Remote::Hysteria2(hy2) => (hy2.auth.clone(), hy2.up_mbps, hy2.down_mbps),
                _ => Default::default(),
            };
            stream.hysteria2_settings = Some(Hysteria2Stream {
                password,
                use_udp_extension: settings.use_udp_extension,
                congestion: Hysteria2Congestion {
                    congestion_type: settings.congestion.clone(),
                    up_mbps,
                    down_mbps,
                },
            });
        }
    }

    match &outbound.security {
        Security::None => {}
        Security::Tls(tls) => stream.tls_settings = Some(tls_stream(tls)),
        Security::Xtls(tls) => stream.xtls_settings = Some(tls_stream(tls)),
        Security::Reality(reality) => {
            stream.reality_settings = Some(RealityStream {
                server_name: reality.server_name.clone(),
                fingerprint: reality.fingerprint.clone(),
                public_key: reality.public_key.clone(),
                short_id: reality.short_id.clone(),
                spider_x: reality.spider_x.clone(),
                show: false,
            });
        }
    }

    stream
}

fn tls_stream(tls: &TlsSettings) -> TlsStream {
    TlsStream {
        server_name: tls.server_name.clone(),
        allow_insecure: tls.allow_insecure,
        fingerprint: tls.fingerprint.clone(),
        alpn: tls.alpn.clone(),
    }
}
