//! # UserRepository
//!
//! ユーザー情報の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **部分更新は動的 SQL**: 指定されたフィールドだけを `UPDATE ... SET` に
//!   含める。組み立ては `sqlx::QueryBuilder` で行い、値は常にバインド
//! - **一意性チェックは事前照会**: 登録前にメール / ユーザー名の使用有無を
//!   確認し、ユースケース層で 409 に変換する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gakuseki_domain::{
   password::PasswordHash,
   user::{Email, User, UserId, UserName, UserRole},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::InfraError;

/// ユーザーの部分更新内容
///
/// `None` のフィールドは更新対象にならない。
#[derive(Debug, Default)]
pub struct UserPatch {
   pub username:      Option<UserName>,
   pub email:         Option<Email>,
   pub password_hash: Option<PasswordHash>,
   pub avatar_path:   Option<String>,
}

impl UserPatch {
   /// 更新対象のフィールドがひとつも無いかどうか
   pub fn is_empty(&self) -> bool {
      self.username.is_none()
         && self.email.is_none()
         && self.password_hash.is_none()
         && self.avatar_path.is_none()
   }
}

/// ユーザーリポジトリトレイト
///
/// ユーザー情報の永続化操作を定義する。
/// インフラ層で具体的な実装を提供し、ユースケース層から利用する。
#[async_trait]
pub trait UserRepository: Send + Sync {
   /// ユーザーを作成する
   async fn create(&self, user: &User) -> Result<(), InfraError>;

   /// ID でユーザーを検索する
   ///
   /// # 戻り値
   ///
   /// - `Ok(Some(user))`: ユーザーが見つかった場合
   /// - `Ok(None)`: ユーザーが見つからない場合
   /// - `Err(_)`: データベースエラー
   async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

   /// メールアドレスでユーザーを検索する（ログイン用）
   async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError>;

   /// メールアドレスまたはユーザー名が使用済みかどうかを返す
   ///
   /// 登録時の重複チェックに使用する。
   async fn email_or_username_taken(
      &self,
      email: &Email,
      username: &UserName,
   ) -> Result<bool, InfraError>;

   /// ユーザーを部分更新する
   ///
   /// `updated_at` は常に `now` で更新される。
   ///
   /// # 戻り値
   ///
   /// 更新された行数（0 は対象ユーザーが存在しないことを意味する）。
   ///
   /// # Errors
   ///
   /// 空のパッチは `InvalidInput` を返す（呼び出し元の誤り）。
   async fn update(
      &self,
      id: &UserId,
      patch: &UserPatch,
      now: DateTime<Utc>,
   ) -> Result<u64, InfraError>;
}

/// データベース行とドメインエンティティの変換用
#[derive(sqlx::FromRow)]
struct UserRow {
   id:            Uuid,
   username:      String,
   email:         String,
   password_hash: String,
   role:          String,
   avatar_path:   Option<String>,
   created_at:    DateTime<Utc>,
   updated_at:    DateTime<Utc>,
}

impl UserRow {
   fn into_user(self) -> Result<User, InfraError> {
      Ok(User::from_db(
         UserId::from_uuid(self.id),
         UserName::new(self.username).map_err(|e| InfraError::unexpected(e.to_string()))?,
         Email::new(self.email).map_err(|e| InfraError::unexpected(e.to_string()))?,
         PasswordHash::new(self.password_hash),
         self
            .role
            .parse::<UserRole>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
         self.avatar_path,
         self.created_at,
         self.updated_at,
      ))
   }
}

const USER_COLUMNS: &str =
   "id, username, email, password_hash, role, avatar_path, created_at, updated_at";

/// 部分更新の UPDATE 文を組み立てる
///
/// 指定されたフィールドと `updated_at` のみを SET 句に含める。
/// 値はすべてバインドパラメータで渡す。
fn build_update_query(
   id: &UserId,
   patch: &UserPatch,
   now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
   let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("UPDATE users SET ");

   {
      let mut set = qb.separated(", ");
      if let Some(username) = &patch.username {
         set.push("username = ");
         set.push_bind_unseparated(username.as_str().to_string());
      }
      if let Some(email) = &patch.email {
         set.push("email = ");
         set.push_bind_unseparated(email.as_str().to_string());
      }
      if let Some(password_hash) = &patch.password_hash {
         set.push("password_hash = ");
         set.push_bind_unseparated(password_hash.as_str().to_string());
      }
      if let Some(avatar_path) = &patch.avatar_path {
         set.push("avatar_path = ");
         set.push_bind_unseparated(avatar_path.clone());
      }
      set.push("updated_at = ");
      set.push_bind_unseparated(now);
   }

   qb.push(" WHERE id = ");
   qb.push_bind(*id.as_uuid());

   qb
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
   pool: PgPool,
}

impl PostgresUserRepository {
   /// 新しいリポジトリインスタンスを作成
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
   async fn create(&self, user: &User) -> Result<(), InfraError> {
      sqlx::query(
         r#"
            INSERT INTO users
                (id, username, email, password_hash, role, avatar_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
      )
      .bind(user.id().as_uuid())
      .bind(user.username().as_str())
      .bind(user.email().as_str())
      .bind(user.password_hash().as_str())
      .bind(user.role().as_str())
      .bind(user.avatar_path())
      .bind(user.created_at())
      .bind(user.updated_at())
      .execute(&self.pool)
      .await?;

      Ok(())
   }

   async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
      let row = sqlx::query_as::<_, UserRow>(&format!(
         "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
      ))
      .bind(id.as_uuid())
      .fetch_optional(&self.pool)
      .await?;

      row.map(UserRow::into_user).transpose()
   }

   async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
      let row = sqlx::query_as::<_, UserRow>(&format!(
         "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
      ))
      .bind(email.as_str())
      .fetch_optional(&self.pool)
      .await?;

      row.map(UserRow::into_user).transpose()
   }

   async fn email_or_username_taken(
      &self,
      email: &Email,
      username: &UserName,
   ) -> Result<bool, InfraError> {
      let taken: bool = sqlx::query_scalar(
         "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
      )
      .bind(email.as_str())
      .bind(username.as_str())
      .fetch_one(&self.pool)
      .await?;

      Ok(taken)
   }

   async fn update(
      &self,
      id: &UserId,
      patch: &UserPatch,
      now: DateTime<Utc>,
   ) -> Result<u64, InfraError> {
      if patch.is_empty() {
         return Err(InfraError::invalid_input(
            "更新対象のフィールドがありません".to_string(),
         ));
      }

      let mut qb = build_update_query(id, patch, now);
      let result = qb.build().execute(&self.pool).await?;

      Ok(result.rows_affected())
   }
}
