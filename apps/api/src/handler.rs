//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックは usecase 層に委譲
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `auth`: アカウント登録・ログイン
//! - `profile`: プロフィール取得・更新、アバター配信
//! - `student`: 学籍登録・一覧

pub mod auth;
pub mod health;
pub mod profile;
pub mod student;

pub use auth::{AuthHandlerState, login, register};
use chrono::{DateTime, Utc};
use gakuseki_domain::user::{User, UserRole};
pub use health::{ReadinessState, health_check, readiness_check};
pub use profile::{ProfileState, avatar, me, update_profile};
use serde::Serialize;
pub use student::{StudentState, list_students, register_student};
use uuid::Uuid;

/// レスポンス用のユーザー表現
///
/// パスワードハッシュなどの資格情報は含めない。
#[derive(Debug, Serialize)]
pub struct UserData {
    pub id:          Uuid,
    pub username:    String,
    pub email:       String,
    pub role:        UserRole,
    pub avatar_path: Option<String>,
    pub created_at:  DateTime<Utc>,
    pub updated_at:  DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id:          *user.id().as_uuid(),
            username:    user.username().as_str().to_string(),
            email:       user.email().as_str().to_string(),
            role:        user.role(),
            avatar_path: user.avatar_path().map(ToString::to_string),
            created_at:  user.created_at(),
            updated_at:  user.updated_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gakuseki_domain::{
        password::PasswordHash,
        user::{Email, UserId, UserName},
    };

    use super::*;

    #[test]
    fn test_user_dataに資格情報が含まれない() {
        let user = User::new(
            UserId::new(),
            UserName::new("山田太郎").unwrap(),
            Email::new("taro@example.com").unwrap(),
            PasswordHash::new("$argon2id$..."),
            UserRole::Student,
            Utc::now(),
        );

        let json = serde_json::to_value(UserData::from(&user)).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("username"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password"));
        assert_eq!(json["role"], "student");
    }
}
