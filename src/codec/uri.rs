//! URI primitives shared by every protocol codec
//!
//! Share links are not strict RFC 3986 URIs (credentials contain `@`, bodies
//! are raw base64), so they are cut apart by hand rather than with `Url`.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use tracing::trace;
use url::form_urlencoded;

use crate::error::{LinkError, Result};

// ============================================================================
// Splitting
// ============================================================================

/// Splits `scheme://body` into its two halves.
pub fn split_scheme_body(link: &str) -> Result<(&str, &str)> {
    let link = link.trim();
    match link.split_once("://") {
        Some((scheme, body)) if !scheme.is_empty() => Ok((scheme, body)),
        _ => Err(LinkError::malformed("missing scheme separator ://")),
    }
}

/// Separates the `#fragment` and percent-decodes it.
///
/// An empty fragment is reported as absent.
pub fn split_fragment(raw: &str) -> Result<(&str, Option<String>)> {
    match raw.split_once('#') {
        Some((rest, fragment)) if !fragment.is_empty() => {
            Ok((rest, Some(percent_decode(fragment)?)))
        }
        Some((rest, _)) => Ok((rest, None)),
        None => Ok((raw, None)),
    }
}

/// Separates the `?query` from the rest.
pub fn split_query(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (raw, None),
    }
}

/// Splits `host:port`, `[v6]:port`, or a bare host.
///
/// The port is returned raw so the caller can apply its own default.
pub fn split_host_port(hostport: &str) -> Result<(String, Option<&str>)> {
    let hostport = hostport.trim_end_matches('/');

    if let Some(rest) = hostport.strip_prefix('[') {
        let bracket_end = rest
            .find(']')
            .ok_or_else(|| LinkError::malformed("IPv6 address is missing its closing bracket"))?;
        let host = rest[..bracket_end].to_string();
        let port = rest[bracket_end + 1..].strip_prefix(':');
        return Ok((host, port));
    }

    match hostport.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), Some(port))),
        None => Ok((hostport.to_string(), None)),
    }
}

/// Wraps IPv6 literals in brackets for use in a link.
pub fn format_host(host: &str) -> String {
    if host.contains(':') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

// ============================================================================
// Encoding
// ============================================================================

pub fn percent_decode(s: &str) -> Result<String> {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| LinkError::encoding(format!("percent-decoded value is not UTF-8: {}", s)))
}

pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Parses a query string into single-valued entries.
///
/// Values are percent-decoded; for repeated keys the last occurrence wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

/// Ordered builder for the query string of an outgoing link.
#[derive(Default)]
pub struct QueryBuilder {
    pairs: Vec<(&'static str, String)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair unless the value is empty.
    pub fn push(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if !value.is_empty() {
            self.pairs.push((key, value));
        }
        self
    }

    /// Adds a pair unless the value is empty or equals the default.
    pub fn push_non_default(
        &mut self,
        key: &'static str,
        value: impl Into<String>,
        default: &str,
    ) -> &mut Self {
        let value = value.into();
        if value != default {
            self.push(key, value);
        }
        self
    }

    /// Adds `key=1` when the flag is set.
    pub fn push_flag(&mut self, key: &'static str, flag: bool) -> &mut Self {
        if flag {
            self.pairs.push((key, "1".to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encodes the pairs, `application/x-www-form-urlencoded` style.
    pub fn finish(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// `?query`, or nothing when no pair survived.
    pub fn to_suffix(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("?{}", self.finish())
        }
    }
}

/// `#label`, or nothing for an empty label.
pub fn fragment_suffix(label: &str) -> String {
    if label.is_empty() {
        String::new()
    } else {
        format!("#{}", percent_encode(label))
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Resolves a port field.
///
/// Absent, empty, or non-numeric input takes the default. A numeric value
/// outside `1..=65535` has no sensible fallback and is rejected.
pub fn parse_port(raw: Option<&str>, default: u16) -> Result<u16> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(default);
    }

    match raw.parse::<i64>() {
        Ok(n) => u16::try_from(n)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| LinkError::InvalidNumber {
                field: "port",
                value: raw.to_string(),
            }),
        Err(_) => {
            trace!("Unparsable port {:?}, using default {}", raw, default);
            Ok(default)
        }
    }
}

/// Parses a numeric field, falling back to the default on any failure.
pub fn number_or<T>(raw: &str, default: T, field: &str) -> T
where
    T: FromStr + Display + Copy,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    raw.parse().unwrap_or_else(|_| {
        trace!("Unparsable {} {:?}, using default {}", field, raw, default);
        default
    })
}

/// `"1"` and `"true"` are set, anything else is unset.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1") | Some("true") | Some("True") | Some("TRUE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scheme_body() {
        assert_eq!(
            split_scheme_body("vless://abc@host").unwrap(),
            ("vless", "abc@host")
        );
        assert!(split_scheme_body("not-a-link").is_err());
        assert!(split_scheme_body("://missing").is_err());
    }

    #[test]
    fn test_split_fragment_decodes() {
        let (rest, fragment) = split_fragment("body#%F0%9F%87%BA%F0%9F%87%B8%20US").unwrap();
        assert_eq!(rest, "body");
        assert_eq!(fragment.as_deref(), Some("🇺🇸 US"));
    }

    #[test]
    fn test_split_fragment_keeps_plus() {
        let (_, fragment) = split_fragment("body#a+b").unwrap();
        assert_eq!(fragment.as_deref(), Some("a+b"));
    }

    #[test]
    fn test_split_fragment_empty_and_absent() {
        assert_eq!(split_fragment("body#").unwrap(), ("body", None));
        assert_eq!(split_fragment("body").unwrap(), ("body", None));
    }

    #[test]
    fn test_split_fragment_invalid_utf8() {
        let err = split_fragment("body#%FF%FE").unwrap_err();
        assert!(matches!(err, LinkError::InvalidEncoding(_)));
    }

    #[test]
    fn test_parse_query_last_wins_and_decodes() {
        let params = parse_query("path=%2Fws&host=a.com&host=b.com");
        assert_eq!(params.get("path").map(String::as_str), Some("/ws"));
        assert_eq!(params.get("host").map(String::as_str), Some("b.com"));
    }

    #[test]
    fn test_split_host_port_variants() {
        assert_eq!(
            split_host_port("example.com:8080").unwrap(),
            ("example.com".to_string(), Some("8080"))
        );
        assert_eq!(
            split_host_port("[2001:db8::1]:443").unwrap(),
            ("2001:db8::1".to_string(), Some("443"))
        );
        assert_eq!(
            split_host_port("example.com").unwrap(),
            ("example.com".to_string(), None)
        );
        assert_eq!(
            split_host_port("example.com:443/").unwrap(),
            ("example.com".to_string(), Some("443"))
        );
        assert!(split_host_port("[::1:8080").is_err());
    }

    #[test]
    fn test_format_host() {
        assert_eq!(format_host("::1"), "[::1]");
        assert_eq!(format_host("example.com"), "example.com");
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port(Some("8443"), 443).unwrap(), 8443);
        assert_eq!(parse_port(None, 443).unwrap(), 443);
        assert_eq!(parse_port(Some(""), 8388).unwrap(), 8388);
        assert_eq!(parse_port(Some("abc"), 443).unwrap(), 443);
    }

    #[test]
    fn test_parse_port_out_of_range() {
        for bad in ["0", "-1", "65536", "99999999999"] {
            let err = parse_port(Some(bad), 443).unwrap_err();
            assert!(
                matches!(err, LinkError::InvalidNumber { field: "port", .. }),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_number_or() {
        assert_eq!(number_or("1500", 1350u32, "mtu"), 1500);
        assert_eq!(number_or("x", 1350u32, "mtu"), 1350);
        assert_eq!(number_or("", 10.0f64, "up_mbps"), 10.0);
        assert_eq!(number_or("12.5", 10.0f64, "up_mbps"), 12.5);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("true")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_query_builder_skips_empty_and_defaults() {
        let mut query = QueryBuilder::new();
        query
            .push("sni", "example.com")
            .push("fp", "")
            .push_non_default("security", "tls", "tls")
            .push_non_default("type", "ws", "tcp")
            .push_flag("insecure", true)
            .push_flag("fast_open", false)
            .push("path", "/a b");
        assert_eq!(
            query.to_suffix(),
            "?sni=example.com&type=ws&insecure=1&path=%2Fa+b"
        );
    }

    #[test]
    fn test_query_builder_empty_suffix() {
        assert_eq!(QueryBuilder::new().to_suffix(), "");
    }

    #[test]
    fn test_fragment_suffix() {
        assert_eq!(fragment_suffix(""), "");
        assert_eq!(fragment_suffix("my node"), "#my%20node");
    }
}
