//! Data models for the inbound target resolution pipeline

pub mod message;
pub mod player;
pub mod target;
pub mod tenant;

pub use message::InboundMessage;
pub use player::Player;
pub use target::{InboundTarget, PlayerCandidate, TargetStatus};
pub use tenant::Tenant;
