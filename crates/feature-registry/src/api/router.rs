use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::info;

use super::state::ApiState;
use crate::error::{AppError, EndpointError};
use crate::store::{Row, RowSet};
use crate::workflows::candidates::{
    CandidateReviewService, CandidateStatusView, ReviewCommand, SqliteCandidateStore,
};
use crate::workflows::notebook::{
    NotebookLauncher, TokenSource, TriggerParameters, TriggerReceipt,
};
use crate::workflows::query::{
    list_account_scores, list_account_tags, list_feature_candidates, list_score_definitions,
    list_tag_definitions, AccountTagFilter, CandidateFilter, DefinitionFilter,
};

type Params = Query<HashMap<String, String>>;
type Shared<T, L> = State<Arc<ApiState<T, L>>>;

/// Router exposing the feature registry endpoints under `/api`.
pub fn api_router<T, L>(state: Arc<ApiState<T, L>>) -> Router
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    Router::new()
        .route(
            "/api/getFeatureCandidates",
            get(feature_candidates_handler::<T, L>),
        )
        .route(
            "/api/updateFeatureCandidate",
            post(update_candidate_handler::<T, L>),
        )
        .route("/api/getTagDefinitions", get(tag_definitions_handler::<T, L>))
        .route(
            "/api/getScoreDefinitions",
            get(score_definitions_handler::<T, L>),
        )
        .route("/api/getAccountTags", get(account_tags_handler::<T, L>))
        .route(
            "/api/getAccountScores",
            get(account_scores_handler::<T, L>),
        )
        .route(
            "/api/generateTagCandidates",
            post(generate_candidates_handler::<T, L>),
        )
        .with_state(state)
}

pub(crate) async fn feature_candidates_handler<T, L>(
    State(state): Shared<T, L>,
    Query(params): Params,
) -> Result<Json<Vec<Row>>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "getFeatureCandidates";
    let filter = CandidateFilter::from_params(&params);
    info!(
        endpoint = ENDPOINT,
        candidate_type = %filter.candidate_type,
        status = %filter.status,
        "listing feature candidates"
    );

    let rows = state
        .blocking(move |database, _| {
            let conn = database.connect()?;
            Ok(list_feature_candidates(&conn, &filter)?)
        })
        .await
        .map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(rows))
}

pub(crate) async fn update_candidate_handler<T, L>(
    State(state): Shared<T, L>,
    body: Bytes,
) -> Result<Json<CandidateStatusView>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "updateFeatureCandidate";
    info!(endpoint = ENDPOINT, "reviewing feature candidate");

    let review = async {
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|_| AppError::InvalidBody("Invalid JSON"))?;
        let command = ReviewCommand::from_json(&payload)?;
        state
            .blocking(move |database, _| {
                let service = CandidateReviewService::new(SqliteCandidateStore::open(database)?);
                Ok(service.review(command)?)
            })
            .await
    };

    let outcome = review.await.map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(outcome.status_view()))
}

pub(crate) async fn tag_definitions_handler<T, L>(
    State(state): Shared<T, L>,
    Query(params): Params,
) -> Result<Json<Vec<Row>>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "getTagDefinitions";
    let filter = DefinitionFilter::from_params(&params);
    info!(
        endpoint = ENDPOINT,
        include_inactive = filter.include_inactive,
        limit = filter.limit.get(),
        "listing tag definitions"
    );

    let rows = state
        .blocking(move |database, _| {
            let conn = database.connect()?;
            Ok(list_tag_definitions(&conn, &filter)?)
        })
        .await
        .map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(rows))
}

pub(crate) async fn score_definitions_handler<T, L>(
    State(state): Shared<T, L>,
    Query(params): Params,
) -> Result<Json<Vec<Row>>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "getScoreDefinitions";
    let filter = DefinitionFilter::from_params(&params);
    info!(
        endpoint = ENDPOINT,
        include_inactive = filter.include_inactive,
        limit = filter.limit.get(),
        "listing score definitions"
    );

    let rows = state
        .blocking(move |database, _| {
            let conn = database.connect()?;
            Ok(list_score_definitions(&conn, &filter)?)
        })
        .await
        .map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(rows))
}

pub(crate) async fn account_tags_handler<T, L>(
    State(state): Shared<T, L>,
    Query(params): Params,
) -> Result<Json<RowSet>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "getAccountTags";
    let filter = AccountTagFilter::from_params(&params);
    info!(
        endpoint = ENDPOINT,
        account_id = ?filter.account_id,
        tag_id = ?filter.tag_id,
        "listing account tags"
    );

    let set = state
        .blocking(move |database, _| {
            let conn = database.connect()?;
            Ok(list_account_tags(&conn, &filter)?)
        })
        .await
        .map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(set))
}

pub(crate) async fn account_scores_handler<T, L>(
    State(state): Shared<T, L>,
    Query(params): Params,
) -> Result<Json<RowSet>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "getAccountScores";
    info!(endpoint = ENDPOINT, "listing account scores");

    let set = state
        .blocking(move |database, catalog| {
            let conn = database.connect()?;
            Ok(list_account_scores(&conn, catalog, &params)?)
        })
        .await
        .map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(set))
}

pub(crate) async fn generate_candidates_handler<T, L>(
    State(state): Shared<T, L>,
    body: Bytes,
) -> Result<Json<TriggerReceipt>, EndpointError>
where
    T: TokenSource + 'static,
    L: NotebookLauncher + 'static,
{
    const ENDPOINT: &str = "generateTagCandidates";
    info!(endpoint = ENDPOINT, "generating tag candidates");

    let trigger = async {
        let parameters = TriggerParameters::from_body(&body)?;
        Ok::<_, AppError>(state.notebook.trigger(parameters).await?)
    };

    let receipt = trigger.await.map_err(|err| err.at(ENDPOINT))?;
    Ok(Json(receipt))
}
