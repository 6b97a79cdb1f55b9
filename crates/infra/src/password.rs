//! # パスワードハッシュ・検証
//!
//! Argon2id によるパスワードのハッシュ化と検証を提供する。
//!
//! 登録時は [`PasswordHasher`]、ログイン時は [`PasswordChecker`] を使用する。
//! どちらもトレイトとして公開し、ユースケース層のテストではスタブに
//! 差し替えられるようにする。

use argon2::{
   Argon2,
   Params,
   PasswordHasher as _,
   PasswordVerifier as _,
   password_hash::{PasswordHash as Argon2PasswordHash, SaltString, rand_core::OsRng},
};
use gakuseki_domain::password::{PasswordHash, PasswordVerifyResult, PlainPassword};

use crate::InfraError;

/// OWASP 推奨パラメータ（RFC 9106）の Argon2id インスタンスを作成する
///
/// - Memory: 64 MB
/// - Iterations: 1
/// - Parallelism: 1
fn default_argon2() -> Argon2<'static> {
   let params = Params::new(
      65536, // memory (KB) = 64 MB
      1,     // iterations
      1,     // parallelism
      None,  // output length (default: 32)
   )
   .expect("Argon2 パラメータが不正です");

   Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

/// パスワードのハッシュ化を担当するトレイト
pub trait PasswordHasher: Send + Sync {
   /// パスワードをハッシュ化する
   ///
   /// # Errors
   ///
   /// ハッシュ計算に失敗した場合
   fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError>;
}

/// パスワード検証を担当するトレイト
pub trait PasswordChecker: Send + Sync {
   /// パスワードを検証する
   ///
   /// # Errors
   ///
   /// - 不正なハッシュ形式の場合
   fn verify(
      &self,
      password: &PlainPassword,
      hash: &PasswordHash,
   ) -> Result<PasswordVerifyResult, InfraError>;
}

/// Argon2id によるパスワードハッシュ化の実装
pub struct Argon2PasswordHasher {
   argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
   pub fn new() -> Self {
      Self {
         argon2: default_argon2(),
      }
   }
}

impl Default for Argon2PasswordHasher {
   fn default() -> Self {
      Self::new()
   }
}

impl PasswordHasher for Argon2PasswordHasher {
   fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
      let salt = SaltString::generate(&mut OsRng);
      let hash = self
         .argon2
         .hash_password(password.as_str().as_bytes(), &salt)
         .map_err(|e| InfraError::unexpected(format!("ハッシュ計算に失敗: {e}")))?;

      Ok(PasswordHash::new(hash.to_string()))
   }
}

/// Argon2id によるパスワード検証の実装
pub struct Argon2PasswordChecker {
   argon2: Argon2<'static>,
}

impl Argon2PasswordChecker {
   pub fn new() -> Self {
      Self {
         argon2: default_argon2(),
      }
   }
}

impl Default for Argon2PasswordChecker {
   fn default() -> Self {
      Self::new()
   }
}

impl PasswordChecker for Argon2PasswordChecker {
   fn verify(
      &self,
      password: &PlainPassword,
      hash: &PasswordHash,
   ) -> Result<PasswordVerifyResult, InfraError> {
      let parsed = Argon2PasswordHash::new(hash.as_str())
         .map_err(|e| InfraError::unexpected(format!("不正なハッシュ形式: {e}")))?;

      let matched = self
         .argon2
         .verify_password(password.as_str().as_bytes(), &parsed)
         .is_ok();

      Ok(PasswordVerifyResult::from(matched))
   }
}
