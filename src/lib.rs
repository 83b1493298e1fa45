pub mod cli;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;

pub use codec::{
    codec_for, detect, label, parse_link, parse_link_list, parse_link_list_lossy, serialize_link,
    template,
};
pub use engine::to_outbound;
pub use error::{InvariantViolation, LinkError};
pub use model::{CanonicalOutbound, ProtocolKind};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
