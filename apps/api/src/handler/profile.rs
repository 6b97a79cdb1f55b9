//! # プロフィールハンドラ
//!
//! プロフィールの取得・更新、アバター画像の配信を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/users/me` - 自分のプロフィール取得
//! - `PATCH /api/v1/users/{id}` - プロフィール部分更新（マルチパート）
//! - `GET /api/v1/users/avatars/{file}` - アバター画像の配信
//!
//! 更新はマルチパートフォームで受け取る。テキストフィールド
//! （`username` / `email` / `password`）とファイルフィールド（`avatar`）は
//! すべて省略可能で、指定されたものだけが更新される。

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use gakuseki_domain::user::UserId;
use gakuseki_shared::ApiResponse;
use uuid::Uuid;

use crate::{
    error::ApiError,
    handler::UserData,
    middleware::RequestIdentity,
    usecase::{ProfileUpdateInput, ProfileUseCase},
};

/// プロフィールハンドラの共有状態
pub struct ProfileState {
    pub usecase: Arc<dyn ProfileUseCase>,
}

/// GET /api/v1/users/me
///
/// アクセストークンの主体のプロフィールを返す。
pub async fn me(
    State(state): State<Arc<ProfileState>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.usecase.profile(&identity.user_id).await?;

    Ok(Json(ApiResponse::new(UserData::from(&user))))
}

/// PATCH /api/v1/users/{id}
///
/// プロフィールを部分更新する。本人または職員のみが実行できる。
pub async fn update_profile(
    State(state): State<Arc<ProfileState>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut input = ProfileUpdateInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("マルチパートの解析に失敗: {e}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("username") => {
                input.username = Some(read_text(field).await?);
            }
            Some("email") => {
                input.email = Some(read_text(field).await?);
            }
            Some("password") => {
                input.password = Some(read_text(field).await?);
            }
            Some("avatar") => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("アバターの読み取りに失敗: {e}"))
                })?;
                input.avatar = Some(bytes.to_vec());
            }
            // 未知のフィールドは無視する
            _ => {}
        }
    }

    let target = UserId::from_uuid(id);
    let user = state
        .usecase
        .update_profile(&identity, &target, input)
        .await?;

    Ok(Json(ApiResponse::new(UserData::from(&user))))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("フィールドの読み取りに失敗: {e}")))
}

/// GET /api/v1/users/avatars/{file}
///
/// 保存済みのアバター画像を配信する。ファイル名の検証
/// （パストラバーサル防止）はストレージ層で行われる。
pub async fn avatar(
    State(state): State<Arc<ProfileState>>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, mime) = state.usecase.avatar(&file_name).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime)],
        bytes,
    ))
}
