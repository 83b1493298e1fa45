//! Share-link dispatch
//!
//! This module provides:
//! - Scheme detection (`vmess://`, `vless://`, `trojan://`, `ss://`, `hysteria2://`)
//! - Dispatch to the matching [`ProtocolCodec`]
//! - Batch import of plain or base64-wrapped link lists

use tracing::{debug, trace, warn};

use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::{CanonicalOutbound, ProtocolKind};

pub mod base64;
pub mod protocols;
pub mod uri;

use self::base64::{decode_base64_utf8, is_base64_alphabet};
use self::protocols::{
    Hysteria2Codec, ProtocolCodec, ShadowsocksCodec, TrojanCodec, VLessCodec, VMessCodec,
};
use self::uri::{split_fragment, split_scheme_body};

// ============================================================================
// Dispatch
// ============================================================================

/// Detects the protocol of a share link from its scheme.
///
/// The empty string and links without `://` are rejected; there is no
/// fallback protocol.
pub fn detect(link: &str) -> Result<ProtocolKind> {
    let link = link.trim();
    let Some((scheme, _)) = link.split_once("://") else {
        return Err(LinkError::UnsupportedProtocol(link.to_string()));
    };
    ProtocolKind::from_scheme(scheme)
}

/// Returns the codec for a protocol.
pub fn codec_for(kind: ProtocolKind) -> &'static dyn ProtocolCodec {
    match kind {
        ProtocolKind::VMess => &VMessCodec,
        ProtocolKind::VLess => &VLessCodec,
        ProtocolKind::Trojan => &TrojanCodec,
        ProtocolKind::Shadowsocks => &ShadowsocksCodec,
        ProtocolKind::Hysteria2 => &Hysteria2Codec,
    }
}

/// Parses a single share link into a canonical outbound.
pub fn parse_link(link: &str) -> Result<CanonicalOutbound> {
    let kind = detect(link)?;
    let (_, body) = split_scheme_body(link)?;
    let (body, fragment) = split_fragment(body)?;

    debug!("Parsing {} link", kind);
    let outbound = codec_for(kind).parse(body, fragment.as_deref())?;
    trace!(
        "Parsed {} outbound '{}' -> {}:{}",
        kind,
        outbound.label,
        outbound.remote.address(),
        outbound.remote.port()
    );

    Ok(outbound)
}

/// Serializes an outbound back into a share link of its own protocol.
pub fn serialize_link(
    outbound: &CanonicalOutbound,
    options: &ShareOptions,
) -> Result<String, InvariantViolation> {
    let kind = outbound.protocol();
    debug!("Serializing {} outbound '{}'", kind, outbound.label);
    codec_for(kind).serialize(outbound, options)
}

/// Display name of an outbound
pub fn label(outbound: &CanonicalOutbound) -> &str {
    &outbound.label
}

/// Blank outbound for a protocol
pub fn template(kind: ProtocolKind) -> CanonicalOutbound {
    codec_for(kind).template()
}

// ============================================================================
// Batch Import
// ============================================================================

/// Checks whether a link list is wrapped in a single base64 blob.
fn is_base64_wrapped(content: &str) -> bool {
    if content.contains("://") {
        return false;
    }
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    is_base64_alphabet(&cleaned)
}

/// Unwraps a base64-encoded link list; plain lists are returned as-is.
pub fn decode_link_list(content: &str) -> Result<String> {
    let content = content.trim();
    if is_base64_wrapped(content) {
        debug!("Detected base64-wrapped link list");
        decode_base64_utf8(content)
    } else {
        Ok(content.to_string())
    }
}

/// Parses every link in a list, one result per non-comment line.
pub fn parse_link_list(content: &str) -> Vec<Result<CanonicalOutbound>> {
    let decoded = match decode_link_list(content) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Link list looked base64-wrapped but failed to decode: {}", e);
            content.to_string()
        }
    };

    let lines: Vec<&str> = decoded
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    debug!("Parsing {} links from content", lines.len());

    lines.into_iter().map(parse_link).collect()
}

/// Parses a link list, collecting only successful results
pub fn parse_link_list_lossy(content: &str) -> Vec<CanonicalOutbound> {
    let results = parse_link_list(content);
    let total = results.len();

    let outbounds: Vec<CanonicalOutbound> = results
        .into_iter()
        .filter_map(|r| match r {
            Ok(outbound) => Some(outbound),
            Err(e) => {
                warn!("Skipping link: {}", e);
                None
            }
        })
        .collect();

    let success = outbounds.len();
    let failed = total - success;
    debug!(
        "Link list parsing complete: {} total, {} successful, {} failed",
        total, success, failed
    );

    outbounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base64::encode_base64;

    #[test]
    fn test_detect_known_schemes() {
        assert_eq!(detect("vmess://abc").unwrap(), ProtocolKind::VMess);
        assert_eq!(detect("VLESS://abc").unwrap(), ProtocolKind::VLess);
        assert_eq!(detect("  trojan://abc").unwrap(), ProtocolKind::Trojan);
        assert_eq!(detect("ss://abc").unwrap(), ProtocolKind::Shadowsocks);
        assert_eq!(detect("hysteria2://abc").unwrap(), ProtocolKind::Hysteria2);
    }

    #[test]
    fn test_detect_rejects_unknown_and_empty() {
        assert_eq!(
            detect("socks5://host:1080").unwrap_err(),
            LinkError::UnsupportedProtocol("socks5".to_string())
        );
        assert!(matches!(
            detect("").unwrap_err(),
            LinkError::UnsupportedProtocol(_)
        ));
        assert!(matches!(
            detect("no-scheme-here").unwrap_err(),
            LinkError::UnsupportedProtocol(_)
        ));
        assert!(matches!(
            detect("://body").unwrap_err(),
            LinkError::UnsupportedProtocol(_)
        ));
    }

    #[test]
    fn test_codec_for_matches_kind() {
        for kind in ProtocolKind::ALL {
            assert_eq!(codec_for(kind).kind(), kind);
            assert_eq!(template(kind).protocol(), kind);
        }
    }

    #[test]
    fn test_parse_link_label() {
        let outbound = parse_link("trojan://pw@example.com:443#my%20node").unwrap();
        assert_eq!(label(&outbound), "my node");

        let outbound = parse_link("trojan://pw@example.com:443#").unwrap();
        assert_eq!(label(&outbound), "example.com");
    }

    #[test]
    fn test_serialize_link_keeps_protocol() {
        for link in [
            "trojan://pw@example.com:443#t",
            "vless://uuid@example.com:443?security=none#v",
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@example.com:8388#s",
            "hysteria2://auth@example.com:443#h",
        ] {
            let outbound = parse_link(link).unwrap();
            let serialized = serialize_link(&outbound, &ShareOptions::default()).unwrap();
            assert_eq!(detect(&serialized).unwrap(), outbound.protocol());
        }
    }

    #[test]
    fn test_decode_link_list_plain_passthrough() {
        let content = "trojan://pw@a.com:443\nss://x@b.com:1";
        assert_eq!(decode_link_list(content).unwrap(), content);
    }

    #[test]
    fn test_decode_link_list_base64() {
        let plain = "trojan://pw@a.com:443#a\ntrojan://pw@b.com:443#b";
        let wrapped = encode_base64(plain);
        assert_eq!(decode_link_list(&wrapped).unwrap(), plain);
    }

    #[test]
    fn test_parse_link_list_skips_blank_and_comments() {
        let content = "\n# comment\ntrojan://pw@a.com:443#a\n\n   \nsocks5://x:1\n";
        let results = parse_link_list(content);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(LinkError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn test_parse_link_list_lossy() {
        let wrapped = encode_base64(
            "trojan://pw@a.com:443#a\nvless://not-a-valid-body\ntrojan://pw@b.com:443#b",
        );
        let outbounds = parse_link_list_lossy(&wrapped);
        assert_eq!(outbounds.len(), 2);
        assert_eq!(outbounds[0].label, "a");
        assert_eq!(outbounds[1].label, "b");
    }
}
