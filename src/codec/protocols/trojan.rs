//! Trojan share links
//!
//! Format: trojan://password@host:port?params#tag

use tracing::trace;

use crate::codec::uri::{QueryBuilder, format_host, fragment_suffix, parse_port, percent_encode};
use crate::config::ShareOptions;
use crate::error::{InvariantViolation, LinkError, Result};
use crate::model::defaults::{USER_LEVEL, default_port, default_security};
use crate::model::{
    CanonicalOutbound, Mux, ProtocolKind, Remote, Security, SecurityFields, Transport,
    TransportFields, TrojanRemote, resolve_label,
};

use super::{
    ProtocolCodec, push_security_query, push_transport_query, security_fields_from_query,
    split_credential_body, transport_fields_from_query, wrong_protocol,
};

/// Fields of a Trojan link, as written
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrojanLink {
    pub password: String,
    pub address: String,
    pub port: String,
    pub flow: String,
    pub transport: TransportFields,
    pub security: SecurityFields,
    pub remark: String,
}

impl TrojanLink {
    /// Parses `password@host:port?query`; the password may itself contain `@`.
    pub fn parse(body: &str, fragment: Option<&str>) -> Result<Self> {
        trace!("Parsing Trojan link");
        let body = split_credential_body(ProtocolKind::Trojan, body)?;

        Ok(Self {
            password: body.credential,
            address: body.address,
            port: body.port,
            flow: body.params.get("flow").cloned().unwrap_or_default(),
            transport: transport_fields_from_query(&body.params),
            security: security_fields_from_query(&body.params),
            remark: fragment.unwrap_or_default().to_string(),
        })
    }

    pub fn to_canonical(&self) -> Result<CanonicalOutbound> {
        if self.password.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Trojan, "password"));
        }
        if self.address.is_empty() {
            return Err(LinkError::missing(ProtocolKind::Trojan, "address"));
        }

        let port = parse_port(Some(self.port.as_str()), default_port(ProtocolKind::Trojan))?;

        Ok(CanonicalOutbound {
            label: resolve_label(&[&self.remark], &self.address),
            remote: Remote::Trojan(TrojanRemote {
                address: self.address.clone(),
                port,
                password: self.password.clone(),
                level: USER_LEVEL,
                flow: self.flow.clone(),
            }),
            transport: Transport::from_fields(&self.transport)?,
            security: Security::from_fields(
                &self.security,
                default_security(ProtocolKind::Trojan),
            )?,
            mux: Mux::default(),
        })
    }

    pub fn from_canonical(outbound: &CanonicalOutbound) -> Result<Self, InvariantViolation> {
        let Remote::Trojan(remote) = &outbound.remote else {
            return Err(wrong_protocol(ProtocolKind::Trojan, outbound));
        };

        Ok(Self {
            password: remote.password.clone(),
            address: remote.address.clone(),
            port: remote.port.to_string(),
            flow: remote.flow.clone(),
            transport: outbound.transport.to_fields(),
            security: outbound.security.to_fields(),
            remark: outbound.label.clone(),
        })
    }

    pub fn to_link(&self) -> String {
        let mut query = QueryBuilder::new();
        query.push("flow", self.flow.as_str());
        push_security_query(
            &mut query,
            &self.security,
            default_security(ProtocolKind::Trojan).as_str(),
        );
        push_transport_query(&mut query, &self.transport);

        format!(
            "trojan://{}@{}:{}{}{}",
            percent_encode(&self.password),
            format_host(&self.address),
            self.port,
            query.to_suffix(),
            fragment_suffix(&self.remark)
        )
    }
}

pub struct TrojanCodec;

impl ProtocolCodec for TrojanCodec {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Trojan
    }

    fn parse(&self, body: &str, fragment: Option<&str>) -> Result<CanonicalOutbound> {
        TrojanLink::parse(body, fragment)?.to_canonical()
    }

    fn serialize(
        &self,
        outbound: &CanonicalOutbound,
        _options: &ShareOptions,
    ) -> Result<String, InvariantViolation> {
        outbound.check_invariants()?;
        Ok(TrojanLink::from_canonical(outbound)?.to_link())
    }
}
