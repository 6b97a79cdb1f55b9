//! # ユーザー
//!
//! ユーザーエンティティとそれに関連する値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`User`] | ユーザー（職員または学生のアカウント） |
//! | [`UserRole`] | ロール（`staff` / `student`）。学籍 API のアクセス制御に使用 |
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: UserId は UUID をラップし、型安全性を確保
//! - **不変性**: エンティティフィールドは基本的に不変、変更はメソッド経由
//! - **バリデーション**: 値オブジェクトの生成時に検証ロジックを実行

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{DomainError, password::PasswordHash};

/// ユーザー ID（一意識別子）
///
/// UUID v7 を使用し、生成順にソート可能。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct UserId(Uuid);

impl UserId {
   /// 新しいユーザー ID を生成する
   pub fn new() -> Self {
      Self(Uuid::now_v7())
   }

   /// 既存の UUID からユーザー ID を作成する
   pub fn from_uuid(uuid: Uuid) -> Self {
      Self(uuid)
   }

   /// 内部の UUID 参照を取得する
   pub fn as_uuid(&self) -> &Uuid {
      &self.0
   }
}

impl Default for UserId {
   fn default() -> Self {
      Self::new()
   }
}

/// メールアドレス（値オブジェクト）
///
/// 生成時にバリデーションを実行し、不正な値の作成を防ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
   /// メールアドレスを作成する
   ///
   /// # バリデーション
   ///
   /// - 空文字列ではない
   /// - `local@domain` の形式である
   /// - 最大 255 文字
   ///
   /// # エラー
   ///
   /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
   pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
      let value = value.into();

      if value.is_empty() {
         return Err(DomainError::Validation(
            "メールアドレスは必須です".to_string(),
         ));
      }

      let Some((local, domain)) = value.split_once('@') else {
         return Err(DomainError::Validation(
            "メールアドレスの形式が不正です".to_string(),
         ));
      };

      if local.is_empty() || domain.is_empty() {
         return Err(DomainError::Validation(
            "メールアドレスの形式が不正です".to_string(),
         ));
      }

      if value.len() > 255 {
         return Err(DomainError::Validation(
            "メールアドレスは255文字以内である必要があります".to_string(),
         ));
      }

      Ok(Self(value))
   }

   /// 文字列参照を取得する
   pub fn as_str(&self) -> &str {
      &self.0
   }

   /// 所有権を持つ文字列に変換する
   pub fn into_string(self) -> String {
      self.0
   }
}

impl std::fmt::Display for Email {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "{}", self.0)
   }
}

/// ユーザー名（値オブジェクト）
///
/// ログイン ID を兼ねる表示名。システム全体で一意。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName(String);

impl UserName {
   /// ユーザー名を作成する
   ///
   /// # バリデーション
   ///
   /// - 2 文字以上 100 文字以内
   pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
      let value = value.into();
      let count = value.chars().count();

      if !(2..=100).contains(&count) {
         return Err(DomainError::Validation(
            "ユーザー名は2文字以上100文字以内である必要があります".to_string(),
         ));
      }

      Ok(Self(value))
   }

   /// 文字列参照を取得する
   pub fn as_str(&self) -> &str {
      &self.0
   }

   /// 所有権を持つ文字列に変換する
   pub fn into_string(self) -> String {
      self.0
   }
}

/// ユーザーロール
///
/// 学籍 API のアクセス制御に使用する。
/// `staff` は学籍の閲覧のみ、`student` は学籍登録のみが許可される。
#[derive(
   Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
   /// 職員（教員・事務）
   Staff,
   /// 学生
   Student,
}

impl std::str::FromStr for UserRole {
   type Err = DomainError;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s {
         "staff" => Ok(Self::Staff),
         "student" => Ok(Self::Student),
         _ => Err(DomainError::Validation(format!("不正なロール: {}", s))),
      }
   }
}

impl UserRole {
   /// 文字列への変換
   pub fn as_str(&self) -> &'static str {
      (*self).into()
   }
}

/// ユーザーエンティティ
///
/// 職員または学生のアカウントを表現する。
/// メール + パスワードでログインし、JWT を受け取る。
///
/// # 不変条件
///
/// - `email` はシステム内で一意
/// - `username` はシステム内で一意
/// - `avatar_path` はアバター保存ディレクトリ内のファイル名（パス区切りを含まない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
   id: UserId,
   username: UserName,
   email: Email,
   password_hash: PasswordHash,
   role: UserRole,
   avatar_path: Option<String>,
   created_at: DateTime<Utc>,
   updated_at: DateTime<Utc>,
}

impl User {
   /// 新しいユーザーを作成する
   ///
   /// # 引数
   ///
   /// - `now`: 現在日時（呼び出し元から注入）
   ///
   /// # 不変条件
   ///
   /// - 作成時の `avatar_path` は None
   pub fn new(
      id: UserId,
      username: UserName,
      email: Email,
      password_hash: PasswordHash,
      role: UserRole,
      now: DateTime<Utc>,
   ) -> Self {
      Self {
         id,
         username,
         email,
         password_hash,
         role,
         avatar_path: None,
         created_at: now,
         updated_at: now,
      }
   }

   /// 既存のデータからユーザーを復元する（データベースから取得時）
   #[allow(clippy::too_many_arguments)]
   pub fn from_db(
      id: UserId,
      username: UserName,
      email: Email,
      password_hash: PasswordHash,
      role: UserRole,
      avatar_path: Option<String>,
      created_at: DateTime<Utc>,
      updated_at: DateTime<Utc>,
   ) -> Self {
      Self {
         id,
         username,
         email,
         password_hash,
         role,
         avatar_path,
         created_at,
         updated_at,
      }
   }

   pub fn id(&self) -> &UserId {
      &self.id
   }

   pub fn username(&self) -> &UserName {
      &self.username
   }

   pub fn email(&self) -> &Email {
      &self.email
   }

   pub fn password_hash(&self) -> &PasswordHash {
      &self.password_hash
   }

   pub fn role(&self) -> UserRole {
      self.role
   }

   pub fn avatar_path(&self) -> Option<&str> {
      self.avatar_path.as_deref()
   }

   pub fn created_at(&self) -> DateTime<Utc> {
      self.created_at
   }

   pub fn updated_at(&self) -> DateTime<Utc> {
      self.updated_at
   }

   /// 職員かどうかを返す
   pub fn is_staff(&self) -> bool {
      self.role == UserRole::Staff
   }
}
