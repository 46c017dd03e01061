//! Candidate review: adopt or reject a proposed feature and promote adopted
//! tags and scores into their master tables.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CandidateId, CandidateKind, CandidateStatus, CandidateStatusView, FeatureCandidate,
    Promotion, ReviewAction, ReviewCommand, ReviewOutcome, ScoreDefinition, TagDefinition,
};
pub use repository::{CandidateStore, SqliteCandidateStore};
pub use service::{CandidateError, CandidateReviewService};
