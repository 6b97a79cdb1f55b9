//! # ヘルスチェックハンドラ
//!
//! API サーバーの稼働状態を確認するためのエンドポイント。
//!
//! - `GET /health`: liveness（プロセスの生存確認）
//! - `GET /health/ready`: readiness（データベース接続の確認）

use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use gakuseki_shared::{
    HealthResponse,
    health::{CheckStatus, ReadinessResponse, ReadinessStatus},
};
use sqlx::PgPool;

/// Readiness Check 用の共有状態
pub struct ReadinessState {
    pub pool: PgPool,
}

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check エンドポイント
///
/// データベースに `SELECT 1` を発行し、接続可能かどうかを返す。
/// 接続できない場合は 503 を返す。
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let database_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let mut checks = HashMap::new();
    checks.insert(
        "database".to_string(),
        if database_ok {
            CheckStatus::Ok
        } else {
            CheckStatus::Error
        },
    );

    let (status_code, status) = if database_ok {
        (StatusCode::OK, ReadinessStatus::Ready)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ReadinessStatus::NotReady)
    };

    (status_code, Json(ReadinessResponse { status, checks }))
}
