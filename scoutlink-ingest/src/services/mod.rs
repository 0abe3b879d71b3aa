//! Pipeline services
//!
//! Each service owns one concern of the inbound target resolution
//! pipeline; the worker and the webhook handlers compose them.

pub mod candidate_resolver;
pub mod correlator;
pub mod link_extractor;
pub mod materializer;
pub mod messaging;
pub mod profile_url;
pub mod sportmonks_client;
pub mod worker;

pub use candidate_resolver::{CandidateResolver, ResolutionOutcome};
pub use correlator::{ConfirmationCorrelator, CorrelationOutcome, Reply};
pub use materializer::PlayerMaterializer;
pub use messaging::{MessagingGateway, WhatsAppGateway};
pub use sportmonks_client::{PlayerDirectory, SportmonksClient};
pub use worker::{ResolutionWorker, WorkerSettings};
