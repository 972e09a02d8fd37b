//! HTML pages rendered through `gx-ui`.

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use askama::Template;
use chrono::Utc;
use gx_core::AnnotationKind;
use gx_ui::{AnalysisTemplate, DashboardTemplate, IndexTemplate};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub async fn index() -> ApiResult<HttpResponse> {
    Ok(html(StatusCode::OK, IndexTemplate::new("", None).render()?))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub ticker: String,
}

/// Failures re-render the form with the message, under the error's status.
pub async fn analyze(data: web::Data<AppState>, form: web::Form<AnalyzeForm>) -> ApiResult<HttpResponse> {
    let ticker = form.into_inner().ticker;
    match gx_valuation::analyze(data.valuation.as_ref(), &ticker).await {
        Ok(analysis) => Ok(html(StatusCode::OK, AnalysisTemplate::from(&analysis).render()?)),
        Err(err) => {
            let status = ApiError::from(err.clone()).status_code();
            let page = IndexTemplate::new(ticker, Some(err.to_string())).render()?;
            Ok(html(status, page))
        }
    }
}

pub async fn dashboard(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let mut stats = Vec::with_capacity(AnnotationKind::ALL.len());
    for kind in AnnotationKind::ALL {
        stats.push((kind, data.dashboard.compute_stats(kind).await?));
    }
    let feed = data.dashboard.merged_feed(data.defaults.merged_feed_limit).await?;
    let window = data.defaults.summary_window_hours;
    let summary = data.dashboard.feed_summary(window).await?;

    let page = DashboardTemplate::build(&stats, &feed, summary, window, Utc::now());
    Ok(html(StatusCode::OK, page.render()?))
}
