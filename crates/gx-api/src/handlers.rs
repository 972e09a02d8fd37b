//! # gx-api Handlers
//!
//! JSON endpoints. Each handler is a thin shell: decode, call into core or
//! valuation, encode. Errors travel as `ApiError`.

use actix_web::{web, HttpResponse};
use gx_core::feed::is_valid_entity_id;
use gx_core::{AnnotationKind, AppError, EntityCard, NodeId, Settings};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ── Valuation ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub ticker: Option<String>,
}

pub async fn analyze(
    data: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> ApiResult<HttpResponse> {
    let ticker = body.into_inner().ticker.unwrap_or_default();
    let analysis = gx_valuation::analyze(data.valuation.as_ref(), &ticker).await?;
    Ok(HttpResponse::Ok().json(analysis))
}

// ── Annotations ─────────────────────────────────────────────────────────────

fn entity_id(raw: String) -> ApiResult<String> {
    if is_valid_entity_id(&raw) {
        Ok(raw)
    } else {
        Err(AppError::ValidationError(format!("invalid entity id: {raw}")).into())
    }
}

fn parse_kind(raw: &str) -> ApiResult<AnnotationKind> {
    Ok(raw.parse::<AnnotationKind>()?)
}

pub async fn widget(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = entity_id(path.into_inner())?;
    let view = data.widget(&id).render().await?;
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub text: String,
}

pub async fn add_reply(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ReplyRequest>,
) -> ApiResult<HttpResponse> {
    let id = entity_id(path.into_inner())?;
    let replies = data.widget(&id).submit_reply(&body.text).await?;
    Ok(HttpResponse::Created().json(replies))
}

pub async fn add_retweet(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = entity_id(path.into_inner())?;
    let retweets = data.widget(&id).retweet().await?;
    Ok(HttpResponse::Created().json(retweets))
}

pub async fn add_like(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = entity_id(path.into_inner())?;
    let likes = data.widget(&id).like().await?;
    Ok(HttpResponse::Created().json(likes))
}

/// Reaching this route is the confirmation. `index` is the row's `index` field.
pub async fn delete_annotation(
    data: web::Data<AppState>,
    path: web::Path<(String, String, usize)>,
) -> ApiResult<HttpResponse> {
    let (id, kind, index) = path.into_inner();
    let id = entity_id(id)?;
    let kind = parse_kind(&kind)?;
    let widget = data.widget(&id);
    let removed = widget.request_delete(kind, index).confirm().await?;
    Ok(HttpResponse::Ok().json(removed))
}

// ── Dashboard ───────────────────────────────────────────────────────────────

pub async fn stats(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let kind = parse_kind(&path)?;
    Ok(HttpResponse::Ok().json(data.dashboard.compute_stats(kind).await?))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

pub async fn merged_feed(
    data: web::Data<AppState>,
    query: web::Query<FeedQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query.limit.unwrap_or(data.defaults.merged_feed_limit);
    Ok(HttpResponse::Ok().json(data.dashboard.merged_feed(limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub today: bool,
}

pub async fn list_kind(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let kind = parse_kind(&path)?;
    let records = if query.today {
        data.dashboard.today_of_kind(kind).await?
    } else {
        data.dashboard.all_of_kind(kind).await?
    };
    Ok(HttpResponse::Ok().json(records))
}

pub async fn clear_kind(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let kind = parse_kind(&path)?;
    let cleared = data.dashboard.clear_kind(kind).await?;
    log::info!("cleared {cleared} {kind} buckets");
    Ok(HttpResponse::Ok().json(json!({ "kind": kind, "cleared": cleared })))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub hours: Option<i64>,
}

pub async fn summary(
    data: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> ApiResult<HttpResponse> {
    let hours = query.hours.unwrap_or(data.defaults.summary_window_hours);
    let summary = data.dashboard.feed_summary(hours).await?;
    Ok(HttpResponse::Ok().json(json!({ "windowHours": hours, "summary": summary })))
}

// ── Feed ────────────────────────────────────────────────────────────────────

pub async fn discovered(
    data: web::Data<AppState>,
    body: web::Json<Vec<EntityCard>>,
) -> ApiResult<HttpResponse> {
    let outcomes = data.observer.lock().await.process_batch(body.into_inner()).await;
    Ok(HttpResponse::Ok().json(outcomes))
}

/// Nodes that left the feed; they are processed afresh if they come back.
pub async fn removed(
    data: web::Data<AppState>,
    body: web::Json<Vec<NodeId>>,
) -> ApiResult<HttpResponse> {
    let mut observer = data.observer.lock().await;
    let forgotten = observer.forget(&body);
    Ok(HttpResponse::Ok().json(json!({ "forgotten": forgotten, "tracked": observer.tracked() })))
}

pub async fn update_settings(
    data: web::Data<AppState>,
    body: web::Json<Settings>,
) -> ApiResult<HttpResponse> {
    let visibility = data.observer.lock().await.apply_settings(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(visibility))
}

pub async fn get_settings(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.settings().await))
}

// ── Session ─────────────────────────────────────────────────────────────────

pub async fn session(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.snapshot().await))
}

pub async fn login(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.login().await?))
}

pub async fn logout(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    data.session.logout().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

pub async fn create_group(
    data: web::Data<AppState>,
    body: web::Json<CreateGroupRequest>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Created().json(data.session.create_group(&body.name).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupRequest {
    pub invite_code: String,
}

pub async fn join_group(
    data: web::Data<AppState>,
    body: web::Json<JoinGroupRequest>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.join_group(&body.invite_code).await?))
}

pub async fn leave_group(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(data.session.leave_group().await?))
}

/// Decode failures of JSON bodies, query strings and paths answer in the
/// same `{error}` shape as everything else.
pub(crate) fn bad_request(err: impl std::fmt::Display) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}
