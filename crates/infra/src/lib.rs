//! # Gakuseki インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはリポジトリトレイトの具体的な実装を提供する。
//! 外部システムの詳細をカプセル化し、ドメイン層をインフラの変更から保護する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理
//! - **リポジトリ実装**: ユーザー・学籍の永続化と、キーセットページネーション
//! - **パスワードハッシュ**: Argon2id によるハッシュ化・検証
//! - **トークン発行**: JWT（HS256）の発行・検証
//! - **アバター保存**: ローカルファイルシステムへの保存・配信
//!
//! ## 依存関係
//!
//! ```text
//! api → infra → domain
//!   ↘     ↓
//!     shared
//! ```
//!
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`keyset`] - カーソルの符号化とキーセット述語の組み立て
//! - [`password`] - パスワードハッシュ・検証
//! - [`token`] - JWT の発行・検証
//! - [`avatar`] - アバターファイルの保存
//! - [`repository`] - リポジトリ実装

pub mod avatar;
pub mod db;
pub mod error;
pub mod keyset;
pub mod password;
pub mod repository;
pub mod token;

pub use avatar::{AvatarContentType, AvatarStorage, FsAvatarStorage};
pub use error::{InfraError, InfraErrorKind};
pub use password::{
   Argon2PasswordChecker,
   Argon2PasswordHasher,
   PasswordChecker,
   PasswordHasher,
};
pub use token::{AccessClaims, HmacTokenService, TokenPair, TokenService, TokenVerifyError};
