//! # プロフィールユースケース
//!
//! プロフィールの取得・部分更新（アバター差し替えを含む）と
//! アバター画像の配信を実装する。
//!
//! ## アバター差し替えの流れ
//!
//! 1. 画像のマジックナンバーを検査（PNG / JPEG のみ受け付ける）
//! 2. 新しいファイルを保存し、採番されたファイル名をパッチに含める
//! 3. データベース更新後、古いファイルを削除する
//!
//! 古いファイルの削除失敗は更新自体を失敗させない（ログのみ）。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gakuseki_domain::{
    password::PlainPassword,
    user::{Email, User, UserId, UserName, UserRole},
};
use gakuseki_infra::{
    AvatarContentType,
    AvatarStorage,
    PasswordHasher,
    repository::{UserPatch, UserRepository},
};

use crate::{
    error::ApiError,
    middleware::RequestIdentity,
    usecase::with_db_deadline,
};

/// アバター画像の最大サイズ（2 MiB）
const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

/// プロフィール部分更新の入力
///
/// `None` のフィールドは変更しない。
#[derive(Debug, Default)]
pub struct ProfileUpdateInput {
    pub username: Option<String>,
    pub email:    Option<String>,
    pub password: Option<String>,
    /// アバター画像のバイト列（マルチパートの `avatar` フィールド）
    pub avatar:   Option<Vec<u8>>,
}

impl ProfileUpdateInput {
    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.avatar.is_none()
    }
}

/// プロフィールユースケーストレイト
#[async_trait]
pub trait ProfileUseCase: Send + Sync {
    /// プロフィールを取得する
    async fn profile(&self, user_id: &UserId) -> Result<User, ApiError>;

    /// プロフィールを部分更新する
    ///
    /// 呼び出し元は対象ユーザー本人、または職員であること。
    ///
    /// # エラー
    ///
    /// - 本人でも職員でもない場合は `Forbidden`
    /// - 更新対象のフィールドがひとつも無い場合は `Validation`
    /// - 対象ユーザーが存在しない場合は `NotFound`
    async fn update_profile(
        &self,
        identity: &RequestIdentity,
        target: &UserId,
        input: ProfileUpdateInput,
    ) -> Result<User, ApiError>;

    /// アバター画像を読み出す
    ///
    /// # 戻り値
    ///
    /// 画像のバイト列と MIME タイプ。
    async fn avatar(&self, file_name: &str) -> Result<(Vec<u8>, &'static str), ApiError>;
}

/// プロフィールユースケースの実装
pub struct ProfileUseCaseImpl {
    users:           Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    avatar_storage:  Arc<dyn AvatarStorage>,
}

impl ProfileUseCaseImpl {
    /// 新しいユースケースインスタンスを作成
    pub fn new(
        users: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        avatar_storage: Arc<dyn AvatarStorage>,
    ) -> Self {
        Self {
            users,
            password_hasher,
            avatar_storage,
        }
    }

    /// アバター画像を検査して保存し、採番されたファイル名を返す
    async fn store_avatar(&self, bytes: &[u8]) -> Result<String, ApiError> {
        if bytes.len() > AVATAR_MAX_BYTES {
            return Err(ApiError::Validation(
                "アバター画像は 2 MiB 以内である必要があります".to_string(),
            ));
        }

        let Some(content_type) = AvatarContentType::sniff(bytes) else {
            return Err(ApiError::Validation(
                "アバター画像は PNG または JPEG である必要があります".to_string(),
            ));
        };

        Ok(self.avatar_storage.store(content_type, bytes).await?)
    }
}

#[async_trait]
impl ProfileUseCase for ProfileUseCaseImpl {
    async fn profile(&self, user_id: &UserId) -> Result<User, ApiError> {
        let user = with_db_deadline(self.users.find_by_id(user_id)).await?;

        user.ok_or(ApiError::NotFound { entity: "ユーザー" })
    }

    #[tracing::instrument(skip_all, fields(target = %target))]
    async fn update_profile(
        &self,
        identity: &RequestIdentity,
        target: &UserId,
        input: ProfileUpdateInput,
    ) -> Result<User, ApiError> {
        // 本人または職員のみが更新できる
        if identity.user_id != *target && identity.role != UserRole::Staff {
            return Err(ApiError::Forbidden(
                "このユーザーを更新する権限がありません".to_string(),
            ));
        }

        if input.is_empty() {
            return Err(ApiError::Validation(
                "更新する内容がありません".to_string(),
            ));
        }

        // 404 の判定と、差し替え前のアバターパスの取得
        let current = with_db_deadline(self.users.find_by_id(target))
            .await?
            .ok_or(ApiError::NotFound { entity: "ユーザー" })?;

        let mut patch = UserPatch::default();

        if let Some(username) = input.username {
            patch.username = Some(UserName::new(username)?);
        }
        if let Some(email) = input.email {
            patch.email = Some(Email::new(email)?);
        }
        if let Some(password) = input.password {
            let password = PlainPassword::new_validated(password)?;
            patch.password_hash = Some(self.password_hasher.hash(&password)?);
        }
        if let Some(bytes) = &input.avatar {
            patch.avatar_path = Some(self.store_avatar(bytes).await?);
        }

        let affected = with_db_deadline(self.users.update(target, &patch, Utc::now())).await?;
        if affected == 0 {
            return Err(ApiError::NotFound { entity: "ユーザー" });
        }

        // 新しいアバターの保存に成功した後でのみ古いファイルを消す
        if patch.avatar_path.is_some() {
            if let Some(old) = current.avatar_path() {
                if let Err(e) = self.avatar_storage.remove(old).await {
                    tracing::warn!(error = %e, file = old, "古いアバターの削除に失敗しました");
                }
            }
        }

        let updated = with_db_deadline(self.users.find_by_id(target))
            .await?
            .ok_or(ApiError::NotFound { entity: "ユーザー" })?;

        tracing::info!(user_id = %target, "プロフィールを更新しました");

        Ok(updated)
    }

    async fn avatar(&self, file_name: &str) -> Result<(Vec<u8>, &'static str), ApiError> {
        let bytes = self
            .avatar_storage
            .load(file_name)
            .await?
            .ok_or(ApiError::NotFound { entity: "アバター" })?;

        Ok((bytes, AvatarContentType::mime_for_file(file_name)))
    }
}
