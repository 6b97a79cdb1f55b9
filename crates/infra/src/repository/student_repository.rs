//! # StudentRepository
//!
//! 学籍の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **一覧はキーセットページネーション**: OFFSET を使わず、
//!   `(ソート列, id)` のタプル比較で次ページの窓を決める（[`crate::keyset`]）
//! - **次カーソルはページ末尾から生成**: ページが満杯のときだけ発行し、
//!   満杯でないページはデータの尽きたことを意味する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gakuseki_domain::{
   pagination::{PageLimit, SortDirection, SortKey},
   student::{Student, StudentId, StudentName},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
   error::InfraError,
   keyset::{KeysetQuery, encode_cursor},
};

/// 学籍一覧の 1 ページ
#[derive(Debug)]
pub struct StudentPage {
   pub items:       Vec<Student>,
   pub next_cursor: Option<String>,
}

/// 学籍リポジトリトレイト
#[async_trait]
pub trait StudentRepository: Send + Sync {
   /// 学籍を作成する
   async fn create(&self, student: &Student) -> Result<(), InfraError>;

   /// 学生名で学籍を検索する（重複チェック用）
   ///
   /// # 戻り値
   ///
   /// - `Ok(Some(student))`: 学籍が見つかった場合
   /// - `Ok(None)`: 学籍が見つからない場合
   /// - `Err(_)`: データベースエラー
   async fn find_by_name(&self, name: &StudentName) -> Result<Option<Student>, InfraError>;

   /// 学籍の一覧を 1 ページ取得する
   ///
   /// # 引数
   ///
   /// - `limit`: 1 ページの件数（検証済み）
   /// - `sort` / `direction`: ソート指定（許可リスト解決済み）
   /// - `cursor_token`: 前ページ末尾のカーソル。`None` または空文字列は先頭ページ
   ///
   /// # Errors
   ///
   /// カーソルが復号できない場合は `InvalidCursor` を返す。
   async fn list_page(
      &self,
      limit: PageLimit,
      sort: SortKey,
      direction: SortDirection,
      cursor_token: Option<&str>,
   ) -> Result<StudentPage, InfraError>;
}

/// データベース行とドメインエンティティの変換用
#[derive(sqlx::FromRow)]
struct StudentRow {
   id:           Uuid,
   name:         String,
   class:        String,
   address:      String,
   major:        String,
   profile_note: String,
   created_at:   DateTime<Utc>,
   updated_at:   DateTime<Utc>,
}

impl StudentRow {
   fn into_student(self) -> Result<Student, InfraError> {
      Ok(Student::from_db(
         StudentId::from_uuid(self.id),
         StudentName::new(self.name).map_err(|e| InfraError::unexpected(e.to_string()))?,
         self.class,
         self.address,
         self.major,
         self.profile_note,
         self.created_at,
         self.updated_at,
      ))
   }
}

const STUDENT_COLUMNS: &str =
   "id, name, class, address, major, profile_note, created_at, updated_at";

/// 先読み込みの取得結果から 1 ページを組み立てる
///
/// `limit + 1` 件の先読みで `limit` 件を超えて返ってきた場合のみ
/// 次ページが存在する。超過分を切り落とし、ページ末尾の行から
/// 次カーソルを生成する。超過しなかった場合は最終ページであり、
/// 次カーソルは発行しない。
fn assemble_page(
   mut items: Vec<Student>,
   limit: PageLimit,
   sort: SortKey,
) -> Result<StudentPage, InfraError> {
   let has_more = limit.has_more(items.len());
   if has_more {
      items.truncate(limit.as_i64() as usize);
   }

   let next_cursor = match (has_more, items.last()) {
      (true, Some(last)) => {
         // カーソルのソート値は復号時に元の型へ戻せる文字列形にする
         // （created_at は RFC 3339、name はそのまま）
         let sort_value = match sort {
            SortKey::CreatedAt => last.created_at().to_rfc3339(),
            SortKey::Name => last.name().as_str().to_string(),
         };
         Some(encode_cursor(&sort_value, last.id().as_uuid())?)
      }
      _ => None,
   };

   Ok(StudentPage { items, next_cursor })
}

/// PostgreSQL 実装の StudentRepository
#[derive(Debug, Clone)]
pub struct PostgresStudentRepository {
   pool: PgPool,
}

impl PostgresStudentRepository {
   /// 新しいリポジトリインスタンスを作成
   pub fn new(pool: PgPool) -> Self {
      Self { pool }
   }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
   async fn create(&self, student: &Student) -> Result<(), InfraError> {
      sqlx::query(
         r#"
            INSERT INTO students
                (id, name, class, address, major, profile_note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
      )
      .bind(student.id().as_uuid())
      .bind(student.name().as_str())
      .bind(student.class())
      .bind(student.address())
      .bind(student.major())
      .bind(student.profile_note())
      .bind(student.created_at())
      .bind(student.updated_at())
      .execute(&self.pool)
      .await?;

      Ok(())
   }

   async fn find_by_name(&self, name: &StudentName) -> Result<Option<Student>, InfraError> {
      let row = sqlx::query_as::<_, StudentRow>(&format!(
         "SELECT {STUDENT_COLUMNS} FROM students WHERE name = $1"
      ))
      .bind(name.as_str())
      .fetch_optional(&self.pool)
      .await?;

      row.map(StudentRow::into_student).transpose()
   }

   #[tracing::instrument(skip_all, level = "debug", fields(limit = limit.as_i64(), sort = %sort))]
   async fn list_page(
      &self,
      limit: PageLimit,
      sort: SortKey,
      direction: SortDirection,
      cursor_token: Option<&str>,
   ) -> Result<StudentPage, InfraError> {
      let query = KeysetQuery::new(sort, direction, cursor_token)?;

      let mut qb: QueryBuilder<'_, Postgres> =
         QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students"));
      query.push_predicate(&mut qb);
      query.push_order_and_limit(&mut qb, limit);

      let rows: Vec<StudentRow> = qb.build_query_as().fetch_all(&self.pool).await?;

      let items = rows
         .into_iter()
         .map(StudentRow::into_student)
         .collect::<Result<Vec<_>, _>>()?;

      assemble_page(items, limit, sort)
   }
}
