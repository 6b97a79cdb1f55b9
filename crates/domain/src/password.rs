//! # パスワード
//!
//! パスワード関連の値オブジェクトを定義する。
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`PlainPassword`] | 登録・ログイン時の入力値 |
//! | [`PasswordHash`] | 永続化用のハッシュ値 |
//! | [`PasswordVerifyResult`] | パスワード検証の成否 |

use crate::DomainError;

/// パスワードの最小文字数
const MIN_PASSWORD_LENGTH: usize = 8;

/// 平文パスワード（入力値）
///
/// ユーザーが入力したパスワードをラップする。
///
/// # セキュリティ
///
/// Debug 出力ではパスワードの値をマスクする。
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_tuple("PlainPassword").field(&"[REDACTED]").finish()
   }
}

impl PlainPassword {
   /// パスワードを作成する（検証なし）
   ///
   /// ログイン時の入力に使用する。登録時は [`new_validated`](Self::new_validated)
   /// を使う。
   pub fn new(value: impl Into<String>) -> Self {
      Self(value.into())
   }

   /// 文字数要件を検証してパスワードを作成する
   ///
   /// # エラー
   ///
   /// 8 文字未満の場合は `DomainError::Validation` を返す。
   pub fn new_validated(value: impl Into<String>) -> Result<Self, DomainError> {
      let value = value.into();
      if value.chars().count() < MIN_PASSWORD_LENGTH {
         return Err(DomainError::Validation(format!(
            "パスワードは {MIN_PASSWORD_LENGTH} 文字以上である必要があります"
         )));
      }
      Ok(Self(value))
   }

   /// 文字列参照を取得する
   pub fn as_str(&self) -> &str {
      &self.0
   }
}

/// パスワードハッシュ（永続化用）
///
/// Argon2id でハッシュ化されたパスワード文字列をラップする。
/// データベースに保存される形式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
   /// ハッシュ文字列からインスタンスを作成する
   pub fn new(hash: impl Into<String>) -> Self {
      Self(hash.into())
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

/// パスワード検証結果
///
/// bool ではなく専用の型を使うことで、意図が明確になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
   /// パスワードが一致した
   Match,
   /// パスワードが一致しなかった
   Mismatch,
}

impl PasswordVerifyResult {
   /// 一致したかどうかを返す
   pub fn is_match(&self) -> bool {
      matches!(self, Self::Match)
   }

   /// 一致しなかったかどうかを返す
   pub fn is_mismatch(&self) -> bool {
      matches!(self, Self::Mismatch)
   }
}

impl From<bool> for PasswordVerifyResult {
   fn from(matched: bool) -> Self {
      if matched { Self::Match } else { Self::Mismatch }
   }
}
