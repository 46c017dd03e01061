use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::service::CandidateError;
use crate::store::format_timestamp;

/// Primary key of a row in `feature_candidates`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reviewer decision on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Adopt,
    Reject,
}

impl ReviewAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "adopt" => Some(Self::Adopt),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn target_status(self) -> CandidateStatus {
        match self {
            Self::Adopt => CandidateStatus::Adopted,
            Self::Reject => CandidateStatus::Rejected,
        }
    }
}

/// Lifecycle of a candidate. Only `New` may transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    New,
    Adopted,
    Rejected,
}

impl CandidateStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Adopted => "adopted",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(Self::New),
            "adopted" => Some(Self::Adopted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Adopted | Self::Rejected)
    }
}

/// Validated input of the review endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommand {
    pub candidate_id: CandidateId,
    pub action: ReviewAction,
}

impl ReviewCommand {
    pub fn new(candidate_id: Option<&str>, action: Option<&str>) -> Result<Self, CandidateError> {
        let candidate_id = candidate_id
            .filter(|id| !id.is_empty())
            .ok_or(CandidateError::InvalidRequest)?;
        let action = action
            .and_then(ReviewAction::parse)
            .ok_or(CandidateError::InvalidRequest)?;
        Ok(Self {
            candidate_id: CandidateId(candidate_id.to_string()),
            action,
        })
    }

    /// Read `candidate_id` (string or non-zero number) and `action` from a
    /// JSON body.
    pub fn from_json(payload: &Value) -> Result<Self, CandidateError> {
        let candidate_id = match payload.get("candidate_id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) if id.as_f64() != Some(0.0) => Some(id.to_string()),
            _ => None,
        };
        let action = payload.get("action").and_then(Value::as_str);
        Self::new(candidate_id.as_deref(), action)
    }
}

/// The candidate columns the review workflow reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCandidate {
    pub candidate_id: CandidateId,
    pub candidate_type: String,
    pub name_proposed: Option<String>,
    pub description_proposed: Option<String>,
    pub status: Option<String>,
}

impl FeatureCandidate {
    pub fn kind(&self) -> CandidateKind {
        CandidateKind::from_type(&self.candidate_type)
    }

    /// `None` when the stored status is null or not a known label.
    pub fn current_status(&self) -> Option<CandidateStatus> {
        self.status.as_deref().and_then(CandidateStatus::from_label)
    }
}

/// Discriminator selecting the master table a candidate is promoted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKind {
    Tag,
    Score,
    Other(String),
}

impl CandidateKind {
    pub fn from_type(raw: &str) -> Self {
        match raw {
            "tag" => Self::Tag,
            "score" => Self::Score,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Row written to `tag_definitions` when a tag candidate is adopted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDefinition {
    pub tag_id: String,
    pub tag_code: Option<String>,
    pub tag_name: Option<String>,
    pub description: Option<String>,
    pub value_type: &'static str,
    pub source_type: &'static str,
    pub is_multi_valued: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TagDefinition {
    pub fn from_candidate(candidate: &FeatureCandidate, now: DateTime<Utc>) -> Self {
        let timestamp = format_timestamp(now);
        Self {
            tag_id: candidate.candidate_id.0.clone(),
            tag_code: candidate.name_proposed.clone(),
            tag_name: candidate.name_proposed.clone(),
            description: candidate.description_proposed.clone(),
            value_type: "string",
            source_type: "llm",
            is_multi_valued: false,
            is_active: true,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Row written to `score_definitions` when a score candidate is adopted.
/// Range and refresh cadence are left for a curator to fill in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDefinition {
    pub score_id: String,
    pub score_code: Option<String>,
    pub score_name: Option<String>,
    pub description: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub direction: &'static str,
    pub source_type: &'static str,
    pub refresh_interval: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ScoreDefinition {
    pub fn from_candidate(candidate: &FeatureCandidate, now: DateTime<Utc>) -> Self {
        let timestamp = format_timestamp(now);
        Self {
            score_id: candidate.candidate_id.0.clone(),
            score_code: candidate.name_proposed.clone(),
            score_name: candidate.name_proposed.clone(),
            description: candidate.description_proposed.clone(),
            min_value: None,
            max_value: None,
            direction: "higher_is_better",
            source_type: "llm",
            refresh_interval: None,
            is_active: true,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Which master table, if any, received the adopted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// Nothing to promote: a rejection, or a repeat of an earlier decision.
    NotApplicable,
    Tag { inserted: bool },
    Score { inserted: bool },
    /// Adopted with a `type` that maps to no master table.
    Skipped { candidate_type: String },
}

/// Result of a review, including what the workflow did to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub candidate_id: CandidateId,
    pub status: CandidateStatus,
    pub status_changed: bool,
    pub promotion: Promotion,
}

impl ReviewOutcome {
    pub fn status_view(&self) -> CandidateStatusView {
        CandidateStatusView {
            candidate_id: self.candidate_id.clone(),
            status: self.status.label(),
        }
    }
}

/// Response body of the review endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateStatusView {
    pub candidate_id: CandidateId,
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn review_command_requires_id_and_known_action() {
        assert!(ReviewCommand::new(Some("c1"), Some("adopt")).is_ok());
        for (id, action) in [
            (None, Some("adopt")),
            (Some(""), Some("reject")),
            (Some("c1"), None),
            (Some("c1"), Some("approve")),
            (Some("c1"), Some("Adopt")),
        ] {
            assert!(
                matches!(
                    ReviewCommand::new(id, action),
                    Err(CandidateError::InvalidRequest)
                ),
                "{id:?} {action:?}"
            );
        }
    }

    #[test]
    fn review_command_accepts_numeric_ids() {
        let command = ReviewCommand::from_json(&json!({ "candidate_id": 42, "action": "reject" }))
            .expect("numeric id accepted");
        assert_eq!(command.candidate_id, CandidateId("42".to_string()));
        assert_eq!(command.action, ReviewAction::Reject);

        assert!(ReviewCommand::from_json(&json!({ "candidate_id": true, "action": "adopt" })).is_err());
        assert!(ReviewCommand::from_json(&json!({ "candidate_id": 0, "action": "adopt" })).is_err());
        assert!(ReviewCommand::from_json(&json!({ "candidate_id": "0", "action": "adopt" })).is_ok());
        assert!(ReviewCommand::from_json(&json!(["c1", "adopt"])).is_err());
    }

    #[test]
    fn definitions_copy_candidate_naming_and_defaults() {
        let candidate = FeatureCandidate {
            candidate_id: CandidateId("c7".to_string()),
            candidate_type: "score".to_string(),
            name_proposed: Some("engagement_depth".to_string()),
            description_proposed: Some("Depth of product engagement".to_string()),
            status: Some("new".to_string()),
        };
        let now = Utc::now();

        let tag = TagDefinition::from_candidate(&candidate, now);
        assert_eq!(tag.tag_id, "c7");
        assert_eq!(tag.tag_code, tag.tag_name);
        assert_eq!((tag.value_type, tag.source_type), ("string", "llm"));
        assert!(tag.is_active && !tag.is_multi_valued);

        let score = ScoreDefinition::from_candidate(&candidate, now);
        assert_eq!(score.score_name.as_deref(), Some("engagement_depth"));
        assert_eq!(score.direction, "higher_is_better");
        assert!(score.min_value.is_none() && score.max_value.is_none());
        assert_eq!(score.created_at, score.updated_at);
    }

    #[test]
    fn status_view_serializes_labels() {
        let outcome = ReviewOutcome {
            candidate_id: CandidateId("c1".to_string()),
            status: CandidateStatus::Adopted,
            status_changed: true,
            promotion: Promotion::Tag { inserted: true },
        };
        let body = serde_json::to_value(outcome.status_view()).expect("serializes");
        assert_eq!(body, json!({ "candidate_id": "c1", "status": "adopted" }));
    }
}
