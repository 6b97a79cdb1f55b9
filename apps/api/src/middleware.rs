//! # ミドルウェア
//!
//! axum のルートに適用するミドルウェアを定義する。
//!
//! - [`auth`]: Bearer トークンの検証と、型付きリクエストコンテキストの注入

pub mod auth;

pub use auth::{AuthMiddlewareState, RequestIdentity, require_auth};
