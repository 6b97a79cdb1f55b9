//! # JWT の発行・検証
//!
//! HS256 署名のアクセストークン / リフレッシュトークンを発行し、
//! アクセストークンを検証する。
//!
//! ## 設計方針
//!
//! - **トレイトベース**: ハンドラ・ミドルウェアのテストでスタブに差し替え可能
//! - **二系統の秘密鍵**: アクセスとリフレッシュは別の鍵で署名する
//! - **クレームは最小限**: ユーザー ID・ユーザー名・メール・ロールのみ。
//!   資格情報（ハッシュ等）は決して含めない

use chrono::{DateTime, Duration, Utc};
use gakuseki_domain::user::{User, UserId, UserRole};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::InfraError;

/// アクセストークンの有効期間（24 時間）
const ACCESS_TOKEN_TTL_HOURS: i64 = 24;

/// リフレッシュトークンの有効期間（7 日）
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// アクセストークンのクレーム
///
/// `sub` はユーザー ID（UUID 文字列）。`exp` / `iat` は Unix 秒。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
   pub sub:      String,
   pub username: String,
   pub email:    String,
   pub role:     String,
   pub iat:      i64,
   pub exp:      i64,
}

impl AccessClaims {
   /// `sub` をユーザー ID として取り出す
   pub fn user_id(&self) -> Result<UserId, TokenVerifyError> {
      Uuid::parse_str(&self.sub)
         .map(UserId::from_uuid)
         .map_err(|_| TokenVerifyError::Invalid)
   }

   /// `role` をロールとして取り出す
   pub fn user_role(&self) -> Result<UserRole, TokenVerifyError> {
      self.role.parse().map_err(|_| TokenVerifyError::Invalid)
   }
}

/// ログイン成功時に返すトークンペア
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
   pub access_token:  String,
   pub refresh_token: String,
   pub token_type:    String,
   pub expires_in:    i64,
}

/// アクセストークン検証の失敗
///
/// 原因はクライアント提示のトークンにあるため、API 層で 401 に変換する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenVerifyError {
   /// 有効期限切れ
   #[error("トークンの有効期限が切れています")]
   Expired,
   /// 署名不正・形式不正
   #[error("トークンが不正です")]
   Invalid,
}

/// トークンの発行・検証を担当するトレイト
pub trait TokenService: Send + Sync {
   /// アクセストークンとリフレッシュトークンのペアを発行する
   ///
   /// # Errors
   ///
   /// 署名に失敗した場合
   fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, InfraError>;

   /// アクセストークンを検証してクレームを取り出す
   fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenVerifyError>;
}

/// HS256 署名によるトークンサービスの実装
pub struct HmacTokenService {
   access_encoding:  EncodingKey,
   access_decoding:  DecodingKey,
   refresh_encoding: EncodingKey,
}

impl HmacTokenService {
   /// 秘密鍵からトークンサービスを作成する
   pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
      Self {
         access_encoding:  EncodingKey::from_secret(access_secret.as_bytes()),
         access_decoding:  DecodingKey::from_secret(access_secret.as_bytes()),
         refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
      }
   }

   fn claims_for(user: &User, now: DateTime<Utc>, ttl: Duration) -> AccessClaims {
      AccessClaims {
         sub:      user.id().to_string(),
         username: user.username().as_str().to_string(),
         email:    user.email().as_str().to_string(),
         role:     user.role().as_str().to_string(),
         iat:      now.timestamp(),
         exp:      (now + ttl).timestamp(),
      }
   }
}

impl TokenService for HmacTokenService {
   fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, InfraError> {
      let access_ttl = Duration::hours(ACCESS_TOKEN_TTL_HOURS);
      let refresh_ttl = Duration::days(REFRESH_TOKEN_TTL_DAYS);

      let header = Header::new(Algorithm::HS256);

      let access_token = jsonwebtoken::encode(
         &header,
         &Self::claims_for(user, now, access_ttl),
         &self.access_encoding,
      )
      .map_err(|e| InfraError::unexpected(format!("アクセストークンの署名に失敗: {e}")))?;

      let refresh_token = jsonwebtoken::encode(
         &header,
         &Self::claims_for(user, now, refresh_ttl),
         &self.refresh_encoding,
      )
      .map_err(|e| InfraError::unexpected(format!("リフレッシュトークンの署名に失敗: {e}")))?;

      Ok(TokenPair {
         access_token,
         refresh_token,
         token_type: "Bearer".to_string(),
         expires_in: access_ttl.num_seconds(),
      })
   }

   fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenVerifyError> {
      let validation = Validation::new(Algorithm::HS256);

      jsonwebtoken::decode::<AccessClaims>(token, &self.access_decoding, &validation)
         .map(|data| data.claims)
         .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenVerifyError::Expired,
            _ => TokenVerifyError::Invalid,
         })
   }
}
