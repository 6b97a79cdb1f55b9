//! # API サーバー設定
//!
//! 環境変数から API サーバーの設定を読み込む。
//! 読み込んだ設定はコンストラクタ経由で各コンポーネントに注入する
//! （プロセス全体で共有するグローバル状態は持たない）。

use std::env;

/// API サーバーの設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
   /// バインドアドレス
   pub host:               String,
   /// ポート番号
   pub port:               u16,
   /// データベース接続 URL
   pub database_url:       String,
   /// アクセストークンの署名鍵
   pub jwt_access_secret:  String,
   /// リフレッシュトークンの署名鍵
   pub jwt_refresh_secret: String,
   /// アバター画像の保存ディレクトリ
   pub avatar_dir:         String,
}

impl ApiConfig {
   /// 環境変数から設定を読み込む
   pub fn from_env() -> Result<Self, env::VarError> {
      Ok(Self {
         host:               env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
         port:               env::var("API_PORT")
            .expect("API_PORT が設定されていません")
            .parse()
            .expect("API_PORT は有効なポート番号である必要があります"),
         database_url:       env::var("DATABASE_URL")
            .expect("DATABASE_URL が設定されていません"),
         jwt_access_secret:  env::var("JWT_ACCESS_SECRET")
            .expect("JWT_ACCESS_SECRET が設定されていません"),
         jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET が設定されていません"),
         avatar_dir:         env::var("AVATAR_DIR")
            .unwrap_or_else(|_| "var/avatars".to_string()),
      })
   }
}
