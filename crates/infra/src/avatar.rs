//! # アバターファイルの保存
//!
//! プロフィール画像をローカルファイルシステムに保存・配信する。
//!
//! ## 設計方針
//!
//! - **トレイトベース**: ユースケース層のテストでスタブに差し替え可能
//! - **ファイル名はサーバー採番**: UUID v7 + 拡張子。クライアント提示の
//!   ファイル名は信用しない
//! - **パストラバーサル防止**: 配信時のファイル名はパス区切りを含まないこと
//!   を検証する

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::InfraError;

/// PNG のマジックナンバー
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG のマジックナンバー
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// アバターとして受け付ける画像形式
///
/// クライアント申告の Content-Type ではなく、ファイル先頭の
/// マジックナンバーで判定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarContentType {
   Png,
   Jpeg,
}

impl AvatarContentType {
   /// 先頭バイト列から画像形式を判定する
   ///
   /// PNG / JPEG 以外は `None` を返す。
   pub fn sniff(bytes: &[u8]) -> Option<Self> {
      if bytes.starts_with(&PNG_MAGIC) {
         Some(Self::Png)
      } else if bytes.starts_with(&JPEG_MAGIC) {
         Some(Self::Jpeg)
      } else {
         None
      }
   }

   /// 保存時のファイル拡張子
   pub fn extension(&self) -> &'static str {
      match self {
         Self::Png => "png",
         Self::Jpeg => "jpg",
      }
   }

   /// 配信時の MIME タイプ
   pub fn mime(&self) -> &'static str {
      match self {
         Self::Png => "image/png",
         Self::Jpeg => "image/jpeg",
      }
   }

   /// ファイル名の拡張子から MIME タイプを推定する（配信用）
   pub fn mime_for_file(file_name: &str) -> &'static str {
      match Path::new(file_name).extension().and_then(|e| e.to_str()) {
         Some("png") => "image/png",
         Some("jpg" | "jpeg") => "image/jpeg",
         _ => "application/octet-stream",
      }
   }
}

/// アバター保存を担当するトレイト
#[async_trait]
pub trait AvatarStorage: Send + Sync {
   /// 画像を保存し、採番したファイル名を返す
   async fn store(
      &self,
      content_type: AvatarContentType,
      bytes: &[u8],
   ) -> Result<String, InfraError>;

   /// 保存済みの画像を削除する
   ///
   /// ファイルが存在しない場合も成功とみなす（置き換え時の冪等性のため）。
   async fn remove(&self, file_name: &str) -> Result<(), InfraError>;

   /// 保存済みの画像を読み出す
   ///
   /// 存在しない場合は `Ok(None)` を返す。
   async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>, InfraError>;
}

/// ローカルファイルシステムへの保存実装
///
/// `root` 直下にフラットにファイルを配置する。
pub struct FsAvatarStorage {
   root: PathBuf,
}

impl FsAvatarStorage {
   /// 保存先ディレクトリを指定して作成する
   pub fn new(root: impl Into<PathBuf>) -> Self {
      Self { root: root.into() }
   }

   /// 保存先ディレクトリを作成する（存在する場合は何もしない）
   ///
   /// アプリケーション起動時に一度呼び出す。
   pub async fn init(&self) -> Result<(), InfraError> {
      tokio::fs::create_dir_all(&self.root).await?;
      Ok(())
   }

   /// ファイル名を検証して保存先パスを解決する
   ///
   /// パス区切りや `..` を含むファイル名は保存ディレクトリ外への
   /// アクセスになり得るため拒否する。
   fn resolve(&self, file_name: &str) -> Result<PathBuf, InfraError> {
      if file_name.is_empty()
         || file_name.contains('/')
         || file_name.contains('\\')
         || file_name.contains("..")
      {
         return Err(InfraError::invalid_input(format!(
            "不正なファイル名: {file_name}"
         )));
      }
      Ok(self.root.join(file_name))
   }
}

#[async_trait]
impl AvatarStorage for FsAvatarStorage {
   async fn store(
      &self,
      content_type: AvatarContentType,
      bytes: &[u8],
   ) -> Result<String, InfraError> {
      let file_name = format!("{}.{}", Uuid::now_v7(), content_type.extension());
      let path = self.resolve(&file_name)?;

      tokio::fs::write(&path, bytes).await?;

      Ok(file_name)
   }

   async fn remove(&self, file_name: &str) -> Result<(), InfraError> {
      let path = self.resolve(file_name)?;

      match tokio::fs::remove_file(&path).await {
         Ok(()) => Ok(()),
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
         Err(e) => Err(e.into()),
      }
   }

   async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>, InfraError> {
      let path = self.resolve(file_name)?;

      match tokio::fs::read(&path).await {
         Ok(bytes) => Ok(Some(bytes)),
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
         Err(e) => Err(e.into()),
      }
   }
}

#[cfg(test)]
mod tests {
   use rstest::rstest;

   use super::*;
   use crate::InfraErrorKind;

   /// 1x1 PNG のヘッダ部分（マジックナンバーのみ意味を持つ）
   fn png_bytes() -> Vec<u8> {
      let mut bytes = PNG_MAGIC.to_vec();
      bytes.extend_from_slice(&[0x00; 16]);
      bytes
   }

   fn jpeg_bytes() -> Vec<u8> {
      let mut bytes = JPEG_MAGIC.to_vec();
      bytes.extend_from_slice(&[0xE0, 0x00, 0x10]);
      bytes
   }

   fn temp_storage() -> FsAvatarStorage {
      let dir = std::env::temp_dir().join(format!("gakuseki-avatar-test-{}", Uuid::new_v4()));
      FsAvatarStorage::new(dir)
   }

   // ===== AvatarContentType テスト =====

   #[rstest]
   fn test_pngのマジックナンバーを判定できる() {
      assert_eq!(
         AvatarContentType::sniff(&png_bytes()),
         Some(AvatarContentType::Png)
      );
   }

   #[rstest]
   fn test_jpegのマジックナンバーを判定できる() {
      assert_eq!(
         AvatarContentType::sniff(&jpeg_bytes()),
         Some(AvatarContentType::Jpeg)
      );
   }

   #[rstest]
   #[case(b"GIF89a......".as_slice())]
   #[case(b"plain text".as_slice())]
   #[case(b"".as_slice())]
   fn test_画像以外のバイト列は拒否される(#[case] bytes: &[u8]) {
      assert_eq!(AvatarContentType::sniff(bytes), None);
   }

   #[rstest]
   fn test_拡張子からmimeタイプを推定できる() {
      assert_eq!(AvatarContentType::mime_for_file("a.png"), "image/png");
      assert_eq!(AvatarContentType::mime_for_file("a.jpg"), "image/jpeg");
      assert_eq!(AvatarContentType::mime_for_file("a.jpeg"), "image/jpeg");
      assert_eq!(
         AvatarContentType::mime_for_file("a.bin"),
         "application/octet-stream"
      );
   }

   // ===== FsAvatarStorage テスト =====

   #[tokio::test]
   async fn test_保存した画像を読み出せる() {
      let storage = temp_storage();
      storage.init().await.unwrap();

      let file_name = storage
         .store(AvatarContentType::Png, &png_bytes())
         .await
         .unwrap();
      let loaded = storage.load(&file_name).await.unwrap();

      assert!(file_name.ends_with(".png"));
      assert_eq!(loaded, Some(png_bytes()));
   }

   #[tokio::test]
   async fn test_存在しないファイルの読み出しはnoneを返す() {
      let storage = temp_storage();
      storage.init().await.unwrap();

      let loaded = storage.load("missing.png").await.unwrap();

      assert_eq!(loaded, None);
   }

   #[tokio::test]
   async fn test_削除後は読み出せない() {
      let storage = temp_storage();
      storage.init().await.unwrap();

      let file_name = storage
         .store(AvatarContentType::Jpeg, &jpeg_bytes())
         .await
         .unwrap();
      storage.remove(&file_name).await.unwrap();

      assert_eq!(storage.load(&file_name).await.unwrap(), None);
   }

   #[tokio::test]
   async fn test_存在しないファイルの削除も成功とみなす() {
      let storage = temp_storage();
      storage.init().await.unwrap();

      assert!(storage.remove("missing.png").await.is_ok());
   }

   #[tokio::test]
   async fn test_パス区切りを含むファイル名は拒否される() {
      let storage = temp_storage();
      storage.init().await.unwrap();

      for name in ["../etc/passwd", "a/b.png", "a\\b.png", ""] {
         let err = storage.load(name).await.unwrap_err();
         assert!(
            matches!(err.kind(), InfraErrorKind::InvalidInput(_)),
            "{name} は拒否されること"
         );
      }
   }
}
