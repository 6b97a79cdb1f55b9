//! # 認証ユースケース
//!
//! アカウント登録とログインのビジネスロジックを実装する。
//!
//! ## タイミング攻撃対策
//!
//! ログインでは、ユーザーが存在しない場合もダミーハッシュで検証を実行し、
//! 処理時間を均一化する。これによりメールアドレスの存在確認攻撃を防ぐ。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gakuseki_domain::{
    password::{PasswordHash, PlainPassword},
    user::{Email, User, UserId, UserName, UserRole},
};
use gakuseki_infra::{
    PasswordChecker,
    PasswordHasher,
    TokenPair,
    TokenService,
    repository::UserRepository,
};

use crate::{error::ApiError, usecase::with_db_deadline};

/// アカウント登録の入力
#[derive(Debug)]
pub struct RegisterInput {
    pub username: String,
    pub email:    String,
    pub password: String,
    /// 省略時は `student`
    pub role:     Option<String>,
}

/// ログイン成功の結果
#[derive(Debug)]
pub struct LoginResult {
    pub user:   User,
    pub tokens: TokenPair,
}

/// 認証ユースケーストレイト
#[async_trait]
pub trait AuthUseCase: Send + Sync {
    /// アカウントを登録する
    ///
    /// # エラー
    ///
    /// - 入力値が不正な場合は `Validation`
    /// - メールアドレスまたはユーザー名が使用済みの場合は `Conflict`
    async fn register(&self, input: RegisterInput) -> Result<User, ApiError>;

    /// ログインしてトークンペアを発行する
    ///
    /// # エラー
    ///
    /// メールアドレスが未登録、またはパスワード不一致の場合は
    /// `AuthenticationFailed`（どちらの理由かは区別しない）。
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ApiError>;
}

/// 認証ユースケースの実装
pub struct AuthUseCaseImpl {
    users:            Arc<dyn UserRepository>,
    password_hasher:  Arc<dyn PasswordHasher>,
    password_checker: Arc<dyn PasswordChecker>,
    token_service:    Arc<dyn TokenService>,
}

impl AuthUseCaseImpl {
    /// 新しいユースケースインスタンスを作成
    pub fn new(
        users: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        password_checker: Arc<dyn PasswordChecker>,
        token_service: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            password_hasher,
            password_checker,
            token_service,
        }
    }

    /// ダミーハッシュで検証を実行する（タイミング攻撃対策）
    ///
    /// ユーザーが存在しない場合も実際のパスワード検証と同等の時間を消費する。
    /// 固定 sleep ではなく実際に検証を実行することで、CPU/メモリ状況による
    /// 自然な変動も含めて同じ時間特性になる。
    fn dummy_verification(&self, password: &PlainPassword) {
        // ダミーハッシュ（有効な Argon2id 形式）
        let dummy_hash = PasswordHash::new(
            "$argon2id$v=19$m=65536,t=1,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        );
        // 結果は無視（エラーでも問題ない）
        let _ = self.password_checker.verify(password, &dummy_hash);
    }
}

#[async_trait]
impl AuthUseCase for AuthUseCaseImpl {
    #[tracing::instrument(skip_all)]
    async fn register(&self, input: RegisterInput) -> Result<User, ApiError> {
        let username = UserName::new(input.username)?;
        let email = Email::new(input.email)?;
        let password = PlainPassword::new_validated(input.password)?;
        let role = match input.role.as_deref() {
            None | Some("") => UserRole::Student,
            Some(s) => s.parse::<UserRole>()?,
        };

        if with_db_deadline(self.users.email_or_username_taken(&email, &username)).await? {
            return Err(ApiError::Conflict(
                "メールアドレスまたはユーザー名は既に使用されています".to_string(),
            ));
        }

        let password_hash = self.password_hasher.hash(&password)?;
        let user = User::new(UserId::new(), username, email, password_hash, role, Utc::now());

        with_db_deadline(self.users.create(&user)).await?;

        tracing::info!(user_id = %user.id(), "ユーザーを登録しました");

        Ok(user)
    }

    #[tracing::instrument(skip_all)]
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ApiError> {
        let email = Email::new(email)?;
        let password = PlainPassword::new(password);

        let user = with_db_deadline(self.users.find_by_email(&email)).await?;

        let Some(user) = user else {
            // ユーザーが存在しない場合もダミー検証で処理時間を均一化する
            self.dummy_verification(&password);
            return Err(ApiError::AuthenticationFailed);
        };

        let result = self
            .password_checker
            .verify(&password, user.password_hash())?;
        if result.is_mismatch() {
            return Err(ApiError::AuthenticationFailed);
        }

        let tokens = self.token_service.issue_pair(&user, Utc::now())?;

        tracing::info!(user_id = %user.id(), "ログインに成功しました");

        Ok(LoginResult { user, tokens })
    }
}
