//! # API エラー定義
//!
//! API サーバー固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス |
//! |-----------|----------------|
//! | `Validation` / 不正カーソル / 不正入力 | 400 Bad Request |
//! | `AuthenticationFailed` | 401 Unauthorized |
//! | `Forbidden` | 403 Forbidden |
//! | `NotFound` | 404 Not Found |
//! | `Conflict` | 409 Conflict |
//! | `Infra`（上記以外） | 500 Internal Server Error |
//! | `Timeout` | 504 Gateway Timeout |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gakuseki_domain::DomainError;
use gakuseki_infra::{InfraError, InfraErrorKind};
use gakuseki_shared::ErrorResponse;
use thiserror::Error;

/// API サーバーで発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// 入力値の検証失敗
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 認証失敗（メール・パスワード不一致）
    #[error("認証に失敗しました")]
    AuthenticationFailed,

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// リソースが見つからない
    #[error("{entity} が見つかりません")]
    NotFound {
        /// エンティティの種類（"ユーザー" など）
        entity: &'static str,
    },

    /// 一意制約との競合
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// データベース操作の期限超過
    #[error("データベース操作がタイムアウトしました")]
    Timeout,

    /// ドメイン層エラー
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// インフラ層エラー
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
            ApiError::AuthenticationFailed => {
                ErrorResponse::unauthorized("メールアドレスまたはパスワードが正しくありません")
            }
            ApiError::Forbidden(msg) => ErrorResponse::forbidden(msg.clone()),
            ApiError::NotFound { entity } => {
                ErrorResponse::not_found(format!("{entity} が見つかりません"))
            }
            ApiError::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
            ApiError::Timeout => {
                tracing::error!("データベース操作がタイムアウトしました");
                ErrorResponse::timeout("データベース操作がタイムアウトしました")
            }
            ApiError::Domain(e) => match e {
                DomainError::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
                DomainError::NotFound { entity_type, id } => {
                    ErrorResponse::not_found(format!("{entity_type} が見つかりません: {id}"))
                }
                DomainError::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
                DomainError::Forbidden(msg) => ErrorResponse::forbidden(msg.clone()),
            },
            ApiError::Infra(e) => match e.kind() {
                // クライアント入力起因のインフラエラーは 400 に変換する
                InfraErrorKind::InvalidCursor(msg) => ErrorResponse::invalid_cursor(msg.clone()),
                InfraErrorKind::InvalidInput(msg) => ErrorResponse::bad_request(msg.clone()),
                _ => {
                    tracing::error!(
                        error = %e,
                        span_trace = %e.span_trace(),
                        "インフラエラー"
                    );
                    ErrorResponse::internal_error()
                }
            },
        };

        let status = StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_バリデーションエラーは400になる() {
        assert_eq!(
            status_of(ApiError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_認証失敗は401になる() {
        assert_eq!(
            status_of(ApiError::AuthenticationFailed),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_権限不足は403になる() {
        assert_eq!(
            status_of(ApiError::Forbidden("no".to_string())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_not_foundは404になる() {
        assert_eq!(
            status_of(ApiError::NotFound { entity: "ユーザー" }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_競合は409になる() {
        assert_eq!(
            status_of(ApiError::Conflict("dup".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_タイムアウトは504になる() {
        assert_eq!(status_of(ApiError::Timeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_不正カーソルは400になる() {
        let error = ApiError::Infra(InfraError::invalid_cursor("bad token"));
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_その他のインフラエラーは500になる() {
        let error = ApiError::Infra(InfraError::unexpected("boom"));
        assert_eq!(status_of(error), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ドメインの競合は409になる() {
        let error = ApiError::Domain(DomainError::Conflict("dup".to_string()));
        assert_eq!(status_of(error), StatusCode::CONFLICT);
    }
}
