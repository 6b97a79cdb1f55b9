//! # 認証ミドルウェア
//!
//! `Authorization: Bearer <token>` のアクセストークンを検証し、
//! 型付きのリクエストコンテキスト [`RequestIdentity`] を extensions に
//! 注入する。ハンドラは `Extension<RequestIdentity>` で受け取る。
//!
//! 文字列キーの key-value バッグではなく型付きの構造体を通すことで、
//! 未検証の型変換やタイポによる取りこぼしを型レベルで防ぐ。

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gakuseki_domain::user::{UserId, UserRole};
use gakuseki_infra::TokenService;
use gakuseki_shared::ErrorResponse;

/// 認証済みリクエストのコンテキスト
///
/// 検証済みアクセストークンのクレームから構築される。
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub user_id: UserId,
    pub role:    UserRole,
}

/// 認証ミドルウェアの状態
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub token_service: Arc<dyn TokenService>,
}

/// 401 レスポンスを作成する
fn unauthorized_response(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::unauthorized(detail)),
    )
        .into_response()
}

/// 認証ミドルウェア
///
/// アクセストークンを検証し、[`RequestIdentity`] をリクエストに注入する。
/// ヘッダーが無い・トークンが不正・期限切れの場合は 401 を返す。
pub async fn require_auth(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return unauthorized_response("Authorization ヘッダーがありません");
    };

    let Ok(header) = header.to_str() else {
        return unauthorized_response("Authorization ヘッダーが不正です");
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return unauthorized_response("Bearer トークンではありません");
    };

    let claims = match state.token_service.verify_access(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "トークン検証に失敗");
            return unauthorized_response(&e.to_string());
        }
    };

    let identity = match (claims.user_id(), claims.user_role()) {
        (Ok(user_id), Ok(role)) => RequestIdentity { user_id, role },
        _ => return unauthorized_response("トークンのクレームが不正です"),
    };

    request.extensions_mut().insert(identity);

    next.run(request).await
}
