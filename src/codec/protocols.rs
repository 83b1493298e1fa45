//! Protocol codecs module
//!
//! Each protocol has an intermediate link record (the fields exactly as the
//! link carries them) plus a codec that implements [`ProtocolCodec`] by going
//! link → record → [`CanonicalOutbound`] and back.

mod hysteria2;
mod shadowsocks;
mod trojan;
mod vless;
mod vmess;

pub use hysteria2::{Hysteria2Codec, Hysteria2Link};
pub use shadowsocks::{ShadowsocksCodec, ShadowsocksLink};
pub use trojan::{TrojanCodec, TrojanLink};
pub use vless::{VLessCodec, VLessLink};
pub use vmess::{VMessCodec, VMessLink};

use std::collections::HashMap;

use crate::codec::uri::{
    QueryBuilder, parse_flag, parse_query, percent_decode, split_host_port, split_query,
};
use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::defaults::HEADER_TYPE_NONE;
use crate::model::{CanonicalOutbound, ProtocolKind, SecurityFields, TransportFields};

// ============================================================================
// Protocol Codec Trait
// ============================================================================

/// Parser/serializer pair for one protocol
pub trait ProtocolCodec: Send + Sync {
    /// The protocol this codec handles
    fn kind(&self) -> ProtocolKind;

    /// Parses the post-scheme body (fragment already removed) into an outbound.
    fn parse(&self, body: &str, fragment: Option<&str>) -> Result<CanonicalOutbound>;

    /// Rebuilds a share link from an outbound of this protocol.
    fn serialize(
        &self,
        outbound: &CanonicalOutbound,
        options: &ShareOptions,
    ) -> Result<String, InvariantViolation>;

    /// Blank outbound for UI-driven creation
    fn template(&self) -> CanonicalOutbound {
        CanonicalOutbound::template(self.kind())
    }
}

/// Reports an outbound handed to the wrong codec.
pub(crate) fn wrong_protocol(expected: ProtocolKind, outbound: &CanonicalOutbound) -> InvariantViolation {
    InvariantViolation(format!(
        "{} codec received a {} outbound",
        expected,
        outbound.protocol()
    ))
}

// ============================================================================
// credential@host:port?query Links
// ============================================================================

/// Pieces of a `credential@host:port?query` body (VLESS and Trojan)
#[derive(Debug)]
pub(crate) struct CredentialBody {
    pub credential: String,
    pub address: String,
    pub port: String,
    pub params: HashMap<String, String>,
}

/// Splits a credential link body on the last `@` before the query.
pub(crate) fn split_credential_body(kind: ProtocolKind, body: &str) -> Result<CredentialBody> {
    let (main, query) = split_query(body);

    let (credential, hostport) = main
        .rsplit_once('@')
        .ok_or_else(|| LinkError::malformed(format!("{} link is missing '@'", kind)))?;

    let (address, port) = split_host_port(hostport)?;

    Ok(CredentialBody {
        credential: percent_decode(credential)?,
        address,
        port: port.unwrap_or_default().to_string(),
        params: query.map(parse_query).unwrap_or_default(),
    })
}

fn param(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

/// Reads the transport keys shared by VLESS and Trojan query strings.
pub(crate) fn transport_fields_from_query(params: &HashMap<String, String>) -> TransportFields {
    TransportFields {
        network: param(params, "type"),
        header_type: param(params, "headerType"),
        host: param(params, "host"),
        path: param(params, "path"),
        service_name: param(params, "serviceName"),
        mode: param(params, "mode"),
        seed: param(params, "seed"),
        ..Default::default()
    }
}

/// Reads the security keys shared by VLESS and Trojan query strings.
pub(crate) fn security_fields_from_query(params: &HashMap<String, String>) -> SecurityFields {
    SecurityFields {
        kind: param(params, "security"),
        server_name: param(params, "sni"),
        fingerprint: param(params, "fp"),
        alpn: param(params, "alpn"),
        allow_insecure: parse_flag(params.get("allowInsecure").map(String::as_str))
            || parse_flag(params.get("insecure").map(String::as_str)),
        public_key: param(params, "pbk"),
        short_id: param(params, "sid"),
        spider_x: param(params, "spx"),
    }
}

/// Appends security keys, omitting the protocol's default kind.
pub(crate) fn push_security_query(
    query: &mut QueryBuilder,
    fields: &SecurityFields,
    default_kind: &str,
) {
    query
        .push_non_default("security", fields.kind.as_str(), default_kind)
        .push("sni", fields.server_name.as_str())
        .push("fp", fields.fingerprint.as_str())
        .push("pbk", fields.public_key.as_str())
        .push("sid", fields.short_id.as_str())
        .push("spx", fields.spider_x.as_str())
        .push("alpn", fields.alpn.as_str())
        .push_flag("allowInsecure", fields.allow_insecure);
}

/// Appends transport keys, omitting `tcp` and `none` header defaults.
pub(crate) fn push_transport_query(query: &mut QueryBuilder, fields: &TransportFields) {
    query
        .push_non_default("type", fields.network.as_str(), "tcp")
        .push_non_default("headerType", fields.header_type.as_str(), HEADER_TYPE_NONE);

    if fields.network == "quic" {
        query.push_non_default("host", fields.host.as_str(), "none");
    } else {
        query.push("host", fields.host.as_str());
    }

    query
        .push("path", fields.path.as_str())
        .push("serviceName", fields.service_name.as_str())
        .push("mode", fields.mode.as_str())
        .push("seed", fields.seed.as_str());
}
