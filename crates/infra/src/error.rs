//! # インフラ層エラー定義
//!
//! データベースやファイルシステムとの通信で発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **エラーの変換**: sqlx::Error, std::io::Error などをラップ
//! - **SpanTrace 自動捕捉**: `From` 実装や convenience constructor で
//!   エラー生成時の呼び出し経路を自動記録する
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（Database, InvalidCursor 等）

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別（[`InfraErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
/// `From<sqlx::Error>` 等の変換や convenience constructor でエラーを生成すると、
/// その時点のスパン情報が自動的にキャプチャされる。
///
/// ## パターンマッチ
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::InvalidCursor(_) => { /* 400 を返す */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
   kind:       InfraErrorKind,
   span_trace: SpanTrace,
}

/// インフラ層エラーの種別
///
/// API 層でこのエラー種別に応じて適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum InfraErrorKind {
   /// データベースエラー
   ///
   /// SQL クエリの実行失敗、接続エラー、制約違反など。
   #[error("データベースエラー: {0}")]
   Database(#[source] sqlx::Error),

   /// シリアライズ/デシリアライズエラー
   ///
   /// JSON の変換に失敗した場合に使用する。
   #[error("シリアライズエラー: {0}")]
   Serialization(#[source] serde_json::Error),

   /// ファイル入出力エラー
   ///
   /// アバターファイルの保存・削除・読み出しで発生するエラー。
   #[error("入出力エラー: {0}")]
   Io(#[source] std::io::Error),

   /// 不正なページネーションカーソル
   ///
   /// base64 の復号失敗、JSON の形状不一致、ソート値の型復元失敗など。
   /// 原因はクライアント入力にあるため API 層で 400 に変換する。
   #[error("不正なカーソル: {0}")]
   InvalidCursor(String),

   /// クライアント入力エラー
   ///
   /// インフラ層で検出されるが、原因はクライアント入力にある。
   #[error("入力エラー: {0}")]
   InvalidInput(String),

   /// 予期しないエラー
   ///
   /// 上記に分類できない予期しないエラー。
   #[error("予期しないエラー: {0}")]
   Unexpected(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
   /// エラー種別を取得する
   pub fn kind(&self) -> &InfraErrorKind {
      &self.kind
   }

   /// SpanTrace を取得する
   pub fn span_trace(&self) -> &SpanTrace {
      &self.span_trace
   }

   // ===== Convenience constructors =====

   /// 不正カーソルエラーを生成する
   pub fn invalid_cursor(msg: impl Into<String>) -> Self {
      Self {
         kind:       InfraErrorKind::InvalidCursor(msg.into()),
         span_trace: SpanTrace::capture(),
      }
   }

   /// クライアント入力エラーを生成する
   pub fn invalid_input(msg: impl Into<String>) -> Self {
      Self {
         kind:       InfraErrorKind::InvalidInput(msg.into()),
         span_trace: SpanTrace::capture(),
      }
   }

   /// 予期しないエラーを生成する
   pub fn unexpected(msg: impl Into<String>) -> Self {
      Self {
         kind:       InfraErrorKind::Unexpected(msg.into()),
         span_trace: SpanTrace::capture(),
      }
   }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("InfraError")
         .field("kind", &self.kind)
         .field("span_trace", &self.span_trace)
         .finish()
   }
}

impl std::error::Error for InfraError {
   fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
      self.kind.source()
   }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<sqlx::Error> for InfraError {
   fn from(source: sqlx::Error) -> Self {
      Self {
         kind:       InfraErrorKind::Database(source),
         span_trace: SpanTrace::capture(),
      }
   }
}

impl From<serde_json::Error> for InfraError {
   fn from(source: serde_json::Error) -> Self {
      Self {
         kind:       InfraErrorKind::Serialization(source),
         span_trace: SpanTrace::capture(),
      }
   }
}

impl From<std::io::Error> for InfraError {
   fn from(source: std::io::Error) -> Self {
      Self {
         kind:       InfraErrorKind::Io(source),
         span_trace: SpanTrace::capture(),
      }
   }
}
