//! # 学籍
//!
//! 学籍エンティティとそれに関連する値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`Student`] | 学籍（登録済みの学生レコード） |
//! | [`StudentName`] | 学生名。システム内で一意 |
//!
//! 学籍一覧は `created_at` または `name` でソートした
//! キーセットページネーションで取得する（infra 層の責務）。

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// 学籍 ID（一意識別子）
///
/// UUID v7 を使用し、生成順にソート可能。
/// キーセットページネーションのタイブレークキーとしても使用する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct StudentId(Uuid);

impl StudentId {
   /// 新しい学籍 ID を生成する
   pub fn new() -> Self {
      Self(Uuid::now_v7())
   }

   /// 既存の UUID から学籍 ID を作成する
   pub fn from_uuid(uuid: Uuid) -> Self {
      Self(uuid)
   }

   /// 内部の UUID 参照を取得する
   pub fn as_uuid(&self) -> &Uuid {
      &self.0
   }
}

impl Default for StudentId {
   fn default() -> Self {
      Self::new()
   }
}

/// 学生名（値オブジェクト）
///
/// システム内で一意。重複登録のチェックに使用する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentName(String);

impl StudentName {
   /// 学生名を作成する
   ///
   /// # バリデーション
   ///
   /// - 1 文字以上 100 文字以内
   pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
      let value = value.into();
      let count = value.chars().count();

      if count == 0 {
         return Err(DomainError::Validation("学生名は必須です".to_string()));
      }
      if count > 100 {
         return Err(DomainError::Validation(
            "学生名は100文字以内である必要があります".to_string(),
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

impl std::fmt::Display for StudentName {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "{}", self.0)
   }
}

/// 学籍作成の引数
///
/// フィールド数が多いため、引数構造体として渡す。
#[derive(Debug)]
pub struct NewStudent {
   pub id:           StudentId,
   pub name:         StudentName,
   pub class:        String,
   pub address:      String,
   pub major:        String,
   pub profile_note: String,
   pub now:          DateTime<Utc>,
}

/// 学籍エンティティ
///
/// 登録済みの学生レコードを表現する。
///
/// # 不変条件
///
/// - `name` はシステム内で一意
/// - `class` と `major` は空文字列ではない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
   id: StudentId,
   name: StudentName,
   class: String,
   address: String,
   major: String,
   profile_note: String,
   created_at: DateTime<Utc>,
   updated_at: DateTime<Utc>,
}

impl Student {
   /// 新しい学籍を作成する
   ///
   /// # エラー
   ///
   /// `class` または `major` が空の場合は `DomainError::Validation` を返す。
   pub fn new(args: NewStudent) -> Result<Self, DomainError> {
      if args.class.is_empty() {
         return Err(DomainError::Validation("クラスは必須です".to_string()));
      }
      if args.major.is_empty() {
         return Err(DomainError::Validation("専攻は必須です".to_string()));
      }

      Ok(Self {
         id: args.id,
         name: args.name,
         class: args.class,
         address: args.address,
         major: args.major,
         profile_note: args.profile_note,
         created_at: args.now,
         updated_at: args.now,
      })
   }

   /// 既存のデータから学籍を復元する（データベースから取得時）
   #[allow(clippy::too_many_arguments)]
   pub fn from_db(
      id: StudentId,
      name: StudentName,
      class: String,
      address: String,
      major: String,
      profile_note: String,
      created_at: DateTime<Utc>,
      updated_at: DateTime<Utc>,
   ) -> Self {
      Self {
         id,
         name,
         class,
         address,
         major,
         profile_note,
         created_at,
         updated_at,
      }
   }

   pub fn id(&self) -> &StudentId {
      &self.id
   }

   pub fn name(&self) -> &StudentName {
      &self.name
   }

   pub fn class(&self) -> &str {
      &self.class
   }

   pub fn address(&self) -> &str {
      &self.address
   }

   pub fn major(&self) -> &str {
      &self.major
   }

   pub fn profile_note(&self) -> &str {
      &self.profile_note
   }

   pub fn created_at(&self) -> DateTime<Utc> {
      self.created_at
   }

   pub fn updated_at(&self) -> DateTime<Utc> {
      self.updated_at
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;
   use rstest::rstest;

   use super::*;

   fn test_now() -> DateTime<Utc> {
      DateTime::from_timestamp(1_700_000_000, 0).unwrap()
   }

   fn new_args(name: &str, class: &str, major: &str) -> NewStudent {
      NewStudent {
         id:           StudentId::new(),
         name:         StudentName::new(name).unwrap(),
         class:        class.to_string(),
         address:      "東京都千代田区1-1".to_string(),
         major:        major.to_string(),
         profile_note: String::new(),
         now:          test_now(),
      }
   }

   // ===== StudentName テスト =====

   #[rstest]
   fn test_学生名を作成できる() {
      let name = StudentName::new("佐藤花子").unwrap();
      assert_eq!(name.as_str(), "佐藤花子");
   }

   #[rstest]
   fn test_空の学生名は拒否される() {
      assert!(StudentName::new("").is_err());
   }

   #[rstest]
   fn test_101文字の学生名は拒否される() {
      assert!(StudentName::new("あ".repeat(101)).is_err());
   }

   // ===== Student テスト =====

   #[rstest]
   fn test_学籍を作成できる() {
      let student = Student::new(new_args("佐藤花子", "3-A", "情報工学")).unwrap();

      assert_eq!(student.name().as_str(), "佐藤花子");
      assert_eq!(student.class(), "3-A");
      assert_eq!(student.major(), "情報工学");
      assert_eq!(student.created_at(), student.updated_at());
   }

   #[rstest]
   fn test_クラスが空の場合は拒否される() {
      let result = Student::new(new_args("佐藤花子", "", "情報工学"));
      assert!(matches!(result, Err(DomainError::Validation(_))));
   }

   #[rstest]
   fn test_専攻が空の場合は拒否される() {
      let result = Student::new(new_args("佐藤花子", "3-A", ""));
      assert!(matches!(result, Err(DomainError::Validation(_))));
   }

   #[rstest]
   fn test_from_dbで全フィールドが復元される() {
      let id = StudentId::new();
      let student = Student::from_db(
         id.clone(),
         StudentName::new("田中一郎").unwrap(),
         "2-B".to_string(),
         "大阪府大阪市".to_string(),
         "機械工学".to_string(),
         "野球部".to_string(),
         test_now(),
         test_now(),
      );

      assert_eq!(student.id(), &id);
      assert_eq!(student.profile_note(), "野球部");
   }
}
