//! # 認証ハンドラ
//!
//! アカウント登録とログインのエンドポイントを提供する。
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/auth/register` - アカウント登録
//! - `POST /api/v1/auth/login` - ログイン（トークンペア発行）

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use gakuseki_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    handler::UserData,
    usecase::{AuthUseCase, RegisterInput},
};

/// 認証ハンドラの共有状態
pub struct AuthHandlerState {
    pub usecase: Arc<dyn AuthUseCase>,
}

// --- リクエスト/レスポンス型 ---

/// アカウント登録リクエスト
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email:    String,
    pub password: String,
    /// 省略時は `student`
    #[serde(default)]
    pub role:     Option<String>,
}

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user:          UserData,
    pub access_token:  String,
    pub refresh_token: String,
    pub token_type:    String,
    pub expires_in:    i64,
}

// --- ハンドラ ---

/// POST /api/v1/auth/register
///
/// アカウントを登録する。メールアドレスまたはユーザー名が使用済みの
/// 場合は 409 を返す。
pub async fn register(
    State(state): State<Arc<AuthHandlerState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .usecase
        .register(RegisterInput {
            username: req.username,
            email:    req.email,
            password: req.password,
            role:     req.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserData::from(&user))),
    ))
}

/// POST /api/v1/auth/login
///
/// メールアドレスとパスワードでログインし、アクセストークンと
/// リフレッシュトークンのペアを発行する。認証失敗は 401。
pub async fn login(
    State(state): State<Arc<AuthHandlerState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.usecase.login(&req.email, &req.password).await?;

    Ok(Json(ApiResponse::new(LoginData {
        user:          UserData::from(&result.user),
        access_token:  result.tokens.access_token,
        refresh_token: result.tokens.refresh_token,
        token_type:    result.tokens.token_type,
        expires_in:    result.tokens.expires_in,
    })))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::post,
    };
    use chrono::Utc;
    use gakuseki_domain::{
        password::PasswordHash,
        user::{Email, User, UserId, UserName, UserRole},
    };
    use gakuseki_infra::TokenPair;
    use tower::ServiceExt;

    use super::*;
    use crate::usecase::LoginResult;

    // テスト用スタブ

    struct StubAuthUseCase {
        succeed: bool,
    }

    fn test_user() -> User {
        User::new(
            UserId::new(),
            UserName::new("山田太郎").unwrap(),
            Email::new("taro@example.com").unwrap(),
            PasswordHash::new("$argon2id$stub"),
            UserRole::Student,
            Utc::now(),
        )
    }

    #[async_trait]
    impl AuthUseCase for StubAuthUseCase {
        async fn register(&self, _input: RegisterInput) -> Result<User, ApiError> {
            if self.succeed {
                Ok(test_user())
            } else {
                Err(ApiError::Conflict(
                    "メールアドレスまたはユーザー名は既に使用されています".to_string(),
                ))
            }
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResult, ApiError> {
            if self.succeed {
                Ok(LoginResult {
                    user:   test_user(),
                    tokens: TokenPair {
                        access_token:  "access".to_string(),
                        refresh_token: "refresh".to_string(),
                        token_type:    "Bearer".to_string(),
                        expires_in:    86400,
                    },
                })
            } else {
                Err(ApiError::AuthenticationFailed)
            }
        }
    }

    fn create_test_app(succeed: bool) -> Router {
        let state = Arc::new(AuthHandlerState {
            usecase: Arc::new(StubAuthUseCase { succeed }),
        });

        Router::new()
            .route("/api/v1/auth/register", post(register))
            .route("/api/v1/auth/login", post(login))
            .with_state(state)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_成功で201とユーザーデータが返る() {
        let sut = create_test_app(true);

        let request = json_request(
            "/api/v1/auth/register",
            serde_json::json!({
                "username": "山田太郎",
                "email": "taro@example.com",
                "password": "password123"
            }),
        );
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["data"]["username"], "山田太郎");
        assert_eq!(json["data"]["role"], "student");
        assert!(json["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_register_重複は409になる() {
        let sut = create_test_app(false);

        let request = json_request(
            "/api/v1/auth/register",
            serde_json::json!({
                "username": "山田太郎",
                "email": "taro@example.com",
                "password": "password123"
            }),
        );
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_成功でトークンペアが返る() {
        let sut = create_test_app(true);

        let request = json_request(
            "/api/v1/auth/login",
            serde_json::json!({
                "email": "taro@example.com",
                "password": "password123"
            }),
        );
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"]["access_token"], "access");
        assert_eq!(json["data"]["refresh_token"], "refresh");
        assert_eq!(json["data"]["token_type"], "Bearer");
        assert_eq!(json["data"]["user"]["email"], "taro@example.com");
    }

    #[tokio::test]
    async fn test_login_失敗は401になる() {
        let sut = create_test_app(false);

        let request = json_request(
            "/api/v1/auth/login",
            serde_json::json!({
                "email": "taro@example.com",
                "password": "wrongpassword"
            }),
        );
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
