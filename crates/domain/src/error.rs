//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 一意制約に反する登録 |
//! | `Forbidden` | 403 Forbidden | 権限不足 |

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// ビジネスロジックの実行中に発生する例外状態を表現する。
/// API 層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
   /// バリデーションエラー
   ///
   /// 入力値がビジネスルールに違反している場合に使用する。
   #[error("バリデーションエラー: {0}")]
   Validation(String),

   /// エンティティが見つからない
   ///
   /// `entity_type` にはエンティティの種類（"User", "Student" など）を指定し、
   /// エラーメッセージを具体的にする。
   #[error("{entity_type} が見つかりません: {id}")]
   NotFound {
      /// エンティティの種類
      entity_type: &'static str,
      /// 検索に使用した識別子
      id:          String,
   },

   /// 一意制約との競合
   ///
   /// すでに存在するメールアドレスや学生名での登録を拒否する場合に使用する。
   #[error("競合が発生しました: {0}")]
   Conflict(String),

   /// 権限不足
   ///
   /// 呼び出し元のロールが操作の要件を満たさない場合に使用する。
   #[error("権限がありません: {0}")]
   Forbidden(String),
}
