//! VLESS share links
//!
//! Format: vless://uuid@host:port?params#tag

use tracing::trace;

use crate::codec::uri::{QueryBuilder, format_host, fragment_suffix, parse_port, percent_encode};
use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::defaults::{USER_LEVEL, VLESS_ENCRYPTION, default_port, default_security};
use crate::model::{
    CanonicalOutbound, Mux, ProtocolKind, Remote, Security, SecurityFields, Transport,
    TransportFields, VLessRemote, resolve_label,
};

use super::{
    ProtocolCodec, push_security_query, push_transport_query, security_fields_from_query,
    split_credential_body, transport_fields_from_query, wrong_protocol,
};

// ============================================================================
// VLESS Link Record
// ============================================================================

/// Fields of a VLESS link, as written
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VLessLink {
    pub id: String,
    pub address: String,
    pub port: String,
    pub encryption: String,
    pub flow: String,
    pub transport: TransportFields,
    pub security: SecurityFields,
    pub remark: String,
}

impl VLessLink {
    /// Parses `uuid@host:port?query`.
    pub fn parse(body: &str, fragment: Option<&str>) -> Result<Self> {
        trace!("Parsing VLESS link");
        let body = split_credential_body(ProtocolKind::VLess, body)?;

        Ok(Self {
            id: body.credential,
            address: body.address,
            port: body.port,
            encryption: body.params.get("encryption").cloned().unwrap_or_default(),
            flow: body.params.get("flow").cloned().unwrap_or_default(),
            transport: transport_fields_from_query(&body.params),
            security: security_fields_from_query(&body.params),
            remark: fragment.unwrap_or_default().to_string(),
        })
    }

    /// Maps the record onto a canonical outbound, applying defaults.
    pub fn to_canonical(&self) -> Result<CanonicalOutbound> {
        if self.id.is_empty() {
            return Err(LinkError::missing(ProtocolKind::VLess, "id"));
        }
        if self.address.is_empty() {
            return Err(LinkError::missing(ProtocolKind::VLess, "address"));
        }

        let port = parse_port(Some(self.port.as_str()), default_port(ProtocolKind::VLess))?;

        Ok(CanonicalOutbound {
            label: resolve_label(&[&self.remark], &self.address),
            remote: Remote::VLess(VLessRemote {
                address: self.address.clone(),
                port,
                id: self.id.clone(),
                level: USER_LEVEL,
                flow: self.flow.clone(),
                encryption: if self.encryption.is_empty() {
                    VLESS_ENCRYPTION.to_string()
                } else {
                    self.encryption.clone()
                },
            }),
            transport: Transport::from_fields(&self.transport)?,
            security: Security::from_fields(
                &self.security,
                default_security(ProtocolKind::VLess),
            )?,
            mux: Mux::default(),
        })
    }

    /// Reads the record back out of a canonical outbound.
    pub fn from_canonical(outbound: &CanonicalOutbound) -> Result<Self, InvariantViolation> {
        let Remote::VLess(remote) = &outbound.remote else {
            return Err(wrong_protocol(ProtocolKind::VLess, outbound));
        };

        Ok(Self {
            id: remote.id.clone(),
            address: remote.address.clone(),
            port: remote.port.to_string(),
            encryption: remote.encryption.clone(),
            flow: remote.flow.clone(),
            transport: outbound.transport.to_fields(),
            security: outbound.security.to_fields(),
            remark: outbound.label.clone(),
        })
    }

    pub fn to_link(&self) -> String {
        let mut query = QueryBuilder::new();
        query
            .push_non_default("encryption", self.encryption.as_str(), VLESS_ENCRYPTION)
            .push("flow", self.flow.as_str());
        push_security_query(
            &mut query,
            &self.security,
            default_security(ProtocolKind::VLess).as_str(),
        );
        push_transport_query(&mut query, &self.transport);

        format!(
            "vless://{}@{}:{}{}{}",
            percent_encode(&self.id),
            format_host(&self.address),
            self.port,
            query.to_suffix(),
            fragment_suffix(&self.remark)
        )
    }
}

// ============================================================================
// VLESS Codec
// ============================================================================

pub struct VLessCodec;

impl ProtocolCodec for VLessCodec {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::VLess
    }

    fn parse(&self, body: &str, fragment: Option<&str>) -> Result<CanonicalOutbound> {
        VLessLink::parse(body, fragment)?.to_canonical()
    }

    fn serialize(
        &self,
        outbound: &CanonicalOutbound,
        _options: &ShareOptions,
    ) -> Result<String, InvariantViolation> {
        outbound.check_invariants()?;
        Ok(VLessLink::from_canonical(outbound)?.to_link())
    }
}
