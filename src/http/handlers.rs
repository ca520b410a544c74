use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::vault::VaultStatus;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub subject: String,
    pub balance: f64,
}

/// `GET /balance?subject=<s>`. Unknown subjects are 404; fetch errors read as 0.
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Response {
    let subject = match query.subject {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "missing 'subject' parameter" })),
            )
                .into_response();
        }
    };

    if !state.vault.subjects().contains(&subject) {
        tracing::debug!(subject = %subject, "Balance requested for unknown subject");
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown subject '{}'", subject) })),
        )
            .into_response();
    }

    let balance = state.vault.balance(&subject).await;
    Json(BalanceResponse { subject, balance }).into_response()
}

pub async fn get_status(State(state): State<AppState>) -> Json<VaultStatus> {
    Json(state.vault.status())
}

pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
