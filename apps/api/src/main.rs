//! # Gakuseki API サーバー
//!
//! 学籍管理バックオフィスの HTTP API サーバー。
//!
//! ## 役割
//!
//! - **アカウント管理**: 登録・ログイン（JWT 発行）
//! - **プロフィール管理**: 取得・部分更新・アバター画像の保存と配信
//! - **学籍管理**: ロールで制御された登録と、カーソルページネーションによる一覧
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `API_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `API_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `JWT_ACCESS_SECRET` | **Yes** | アクセストークンの署名鍵 |
//! | `JWT_REFRESH_SECRET` | **Yes** | リフレッシュトークンの署名鍵 |
//! | `AVATAR_DIR` | No | アバター保存先（デフォルト: `var/avatars`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p gakuseki-api
//!
//! # 本番環境
//! API_PORT=13000 DATABASE_URL=postgres://... cargo run -p gakuseki-api --release
//! ```

mod config;
mod error;
mod handler;
mod middleware;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use config::ApiConfig;
use gakuseki_infra::{
    Argon2PasswordChecker,
    Argon2PasswordHasher,
    AvatarStorage,
    FsAvatarStorage,
    HmacTokenService,
    PasswordChecker,
    PasswordHasher,
    TokenService,
    db,
    repository::{
        PostgresStudentRepository,
        PostgresUserRepository,
        StudentRepository,
        UserRepository,
    },
};
use gakuseki_shared::{
    canonical_log::CanonicalLogLineLayer,
    observability::{MakeRequestUuidV7, TracingConfig, make_request_span},
};
use handler::{
    AuthHandlerState,
    ProfileState,
    ReadinessState,
    StudentState,
    avatar,
    health_check,
    list_students,
    login,
    me,
    readiness_check,
    register,
    register_student,
    update_profile,
};
use middleware::{AuthMiddlewareState, require_auth};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use usecase::{AuthUseCaseImpl, ProfileUseCaseImpl, StudentUseCaseImpl};

/// リクエストボディの上限（マルチパートのアバター込みで 5 MiB）
const BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// API サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env("api");
    gakuseki_shared::observability::init_tracing(tracing_config);
    let _tracing_guard = tracing::info_span!("app", service = "api").entered();

    // 設定読み込み
    let config = ApiConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "API サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    tracing::info!("データベースに接続しました");

    // マイグレーション実行
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの実行に失敗しました");
    tracing::info!("マイグレーションを適用しました");

    // アバター保存先の初期化
    let avatar_storage = Arc::new(FsAvatarStorage::new(&config.avatar_dir));
    avatar_storage
        .init()
        .await
        .expect("アバター保存先の初期化に失敗しました");
    let avatar_storage: Arc<dyn AvatarStorage> = avatar_storage;

    // Readiness Check 用 State（pool が move される前に clone）
    let readiness_state = Arc::new(ReadinessState { pool: pool.clone() });

    // 依存コンポーネントを初期化
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let student_repository: Arc<dyn StudentRepository> =
        Arc::new(PostgresStudentRepository::new(pool));
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());
    let password_checker: Arc<dyn PasswordChecker> = Arc::new(Argon2PasswordChecker::new());
    let token_service: Arc<dyn TokenService> = Arc::new(HmacTokenService::new(
        &config.jwt_access_secret,
        &config.jwt_refresh_secret,
    ));

    let auth_usecase = AuthUseCaseImpl::new(
        user_repository.clone(),
        password_hasher.clone(),
        password_checker,
        token_service.clone(),
    );
    let profile_usecase =
        ProfileUseCaseImpl::new(user_repository, password_hasher, avatar_storage);
    let student_usecase = StudentUseCaseImpl::new(student_repository);

    let auth_handler_state = Arc::new(AuthHandlerState {
        usecase: Arc::new(auth_usecase),
    });
    let profile_state = Arc::new(ProfileState {
        usecase: Arc::new(profile_usecase),
    });
    let student_state = Arc::new(StudentState {
        usecase: Arc::new(student_usecase),
    });
    let auth_middleware_state = AuthMiddlewareState { token_service };

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/register", post(register))
                .route("/api/v1/auth/login", post(login))
                .with_state(auth_handler_state),
        )
        // アバター配信は認証不要（フロントエンドの <img> から参照される）
        .merge(
            Router::new()
                .route("/api/v1/users/avatars/{file}", get(avatar))
                .with_state(profile_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/me", get(me))
                .route("/api/v1/users/{id}", patch(update_profile))
                .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
                .layer(from_fn_with_state(
                    auth_middleware_state.clone(),
                    require_auth,
                ))
                .with_state(profile_state),
        )
        .merge(
            Router::new()
                .route(
                    "/api/v1/students",
                    post(register_student).get(list_students),
                )
                .layer(from_fn_with_state(auth_middleware_state, require_auth))
                .with_state(student_state),
        )
        // Request ID レイヤー（レイヤー順序が重要: 下に書いたものが外側）
        // 1. SetRequestIdLayer（最外）: リクエスト受信時に UUID v7 を生成
        // 2. TraceLayer: カスタムスパンに request_id を含め、全ログに自動注入
        // 3. CanonicalLogLineLayer: リクエスト完了時に1行サマリログを出力（スパン内）
        // 4. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CanonicalLogLineLayer)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
