//! # ユースケース層
//!
//! API サーバーのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **トレイトベースの設計**: テスト可能性のためトレイトを定義
//! - **依存性注入**: リポジトリ・ハッシャー・トークンサービスを外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//! - **期限付き DB 操作**: データベース操作は [`with_db_deadline`] で包み、
//!   期限超過時はぶら下がらずにタイムアウトエラーを返す

pub mod auth;
pub mod profile;
pub mod student;

use std::{future::Future, time::Duration};

pub use auth::{AuthUseCase, AuthUseCaseImpl, LoginResult, RegisterInput};
use gakuseki_infra::InfraError;
pub use profile::{ProfileUpdateInput, ProfileUseCase, ProfileUseCaseImpl};
pub use student::{ListStudentsInput, RegisterStudentInput, StudentUseCase, StudentUseCaseImpl};

use crate::error::ApiError;

/// データベース操作の期限
const DB_DEADLINE: Duration = Duration::from_secs(10);

/// データベース操作を期限付きで実行する
///
/// 期限を超えた場合は実行中のクエリを中断し、[`ApiError::Timeout`] を返す。
/// この層ではリトライしない。一時的な DB エラーはそのまま呼び出し元へ
/// 伝播させる。
pub(crate) async fn with_db_deadline<T>(
    fut: impl Future<Output = Result<T, InfraError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(DB_DEADLINE, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_elapsed) => Err(ApiError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_期限内の操作は結果をそのまま返す() {
        let result = with_db_deadline(async { Ok(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_インフラエラーはapi_errorに変換される() {
        let result: Result<i32, _> =
            with_db_deadline(async { Err(InfraError::unexpected("boom")) }).await;

        assert!(matches!(result, Err(ApiError::Infra(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_期限超過はタイムアウトになる() {
        let result: Result<i32, _> = with_db_deadline(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;

        assert!(matches!(result, Err(ApiError::Timeout)));
    }
}
