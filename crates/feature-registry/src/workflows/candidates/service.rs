use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    CandidateId, CandidateKind, CandidateStatus, FeatureCandidate, Promotion, ReviewAction,
    ReviewCommand, ReviewOutcome, ScoreDefinition, TagDefinition,
};
use super::repository::CandidateStore;
use crate::store::StoreError;

/// Applies reviewer decisions to feature candidates and promotes adopted
/// candidates into the tag or score master table.
pub struct CandidateReviewService<S> {
    store: S,
    clock: fn() -> DateTime<Utc>,
}

impl<S: CandidateStore> CandidateReviewService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Transition the candidate and, on adoption, insert its definition row.
    ///
    /// Status change and insert share one transaction. Repeating a decision
    /// is a no-op; reversing one is a conflict.
    pub fn review(&self, command: ReviewCommand) -> Result<ReviewOutcome, CandidateError> {
        let now = (self.clock)();
        let ReviewCommand {
            candidate_id,
            action,
        } = command;
        let target = action.target_status();

        self.store.atomically(|store| {
            let Some(candidate) = store.find(&candidate_id)? else {
                return match action {
                    ReviewAction::Adopt => Err(CandidateError::NotFound(candidate_id.clone())),
                    ReviewAction::Reject => {
                        warn!(%candidate_id, "reject matched no candidate row");
                        Ok(ReviewOutcome {
                            candidate_id: candidate_id.clone(),
                            status: target,
                            status_changed: false,
                            promotion: Promotion::NotApplicable,
                        })
                    }
                };
            };

            match candidate.current_status() {
                Some(current) if current == target => {
                    info!(%candidate_id, status = target.label(), "candidate already reviewed");
                    return Ok(ReviewOutcome {
                        candidate_id: candidate_id.clone(),
                        status: target,
                        status_changed: false,
                        promotion: Promotion::NotApplicable,
                    });
                }
                Some(current) if current.is_terminal() => {
                    return Err(CandidateError::Conflict {
                        candidate_id: candidate_id.clone(),
                        current,
                        requested: target,
                    });
                }
                _ => {}
            }

            store.set_status(&candidate_id, target, now)?;

            let promotion = match action {
                ReviewAction::Reject => Promotion::NotApplicable,
                ReviewAction::Adopt => promote(store, &candidate, now)?,
            };

            info!(
                %candidate_id,
                status = target.label(),
                promotion = ?promotion,
                "candidate reviewed"
            );

            Ok(ReviewOutcome {
                candidate_id: candidate_id.clone(),
                status: target,
                status_changed: true,
                promotion,
            })
        })
    }
}

fn promote<S: CandidateStore>(
    store: &S,
    candidate: &FeatureCandidate,
    now: DateTime<Utc>,
) -> Result<Promotion, StoreError> {
    match candidate.kind() {
        CandidateKind::Tag => {
            let inserted = store.insert_tag_definition(&TagDefinition::from_candidate(candidate, now))?;
            Ok(Promotion::Tag { inserted })
        }
        CandidateKind::Score => {
            let inserted =
                store.insert_score_definition(&ScoreDefinition::from_candidate(candidate, now))?;
            Ok(Promotion::Score { inserted })
        }
        CandidateKind::Other(candidate_type) => {
            warn!(
                candidate_id = %candidate.candidate_id,
                candidate_type = %candidate_type,
                "adopted candidate has no master table for its type; nothing inserted"
            );
            Ok(Promotion::Skipped { candidate_type })
        }
    }
}

/// Error raised by the review workflow.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("candidate_id and action are required.")]
    InvalidRequest,
    #[error("Candidate not found.")]
    NotFound(CandidateId),
    #[error(
        "Candidate {candidate_id} is already {}; it cannot be {}.",
        .current.label(),
        .requested.label()
    )]
    Conflict {
        candidate_id: CandidateId,
        current: CandidateStatus,
        requested: CandidateStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
