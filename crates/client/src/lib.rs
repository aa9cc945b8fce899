//! # LM Risk Client
//!
//! Talks to the language-model services and feeds scores back into a
//! [`lmrisk_tree::RiskTree`].
//!
//! ```text
//! RiskTree + pending files
//!     │
//!     ├──> ScoringWorker (one request in flight, generation-tagged jobs)
//!     │      └─> ModelService::score ──> HttpModelService | StubModelService
//!     │
//!     └──> ScoreUpdate ──> RiskTree::apply_scores
//! ```
//!
//! Completion, codelens statistics, coverage and thumbnails go through the
//! same [`ModelService`] trait.

mod cache;
mod codelens;
mod completion;
mod error;
mod http;
mod queue;
mod remote;
mod scoring;
mod service;
mod stub;

pub use cache::EntropyCache;
pub use codelens::{fetch_stats, CodelensOptions};
pub use completion::{complete_at, completion_context, rank_predictions, CompletionOptions};
pub use error::{ClientError, Result};
pub use http::{parse_session_cookie, ServiceClient, DEFAULT_TIMEOUT};
pub use queue::{DrainReport, ScoreJob, ScoreOutcome, ScoreUpdate, ScoringWorker};
pub use remote::{Endpoints, HttpModelService};
pub use scoring::ScoringContext;
pub use service::ModelService;
pub use stub::{stub_entropy, StubModelService};
