//! # ページネーション
//!
//! 学籍一覧のキーセットページネーションで使用する値オブジェクトを定義する。
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`SortKey`] | ソート対象の論理キー。許可リスト外はデフォルトにフォールバック |
//! | [`SortDirection`] | ソート方向。`asc` 以外はすべて `desc` に正規化 |
//! | [`PageLimit`] | 1 ページの件数。0 以下は拒否、上限超過はクランプ |
//!
//! 物理カラム名への対応付けとカーソルの符号化は infra 層の責務。

use strum::IntoStaticStr;

use crate::DomainError;

/// ソートキー
///
/// 学籍一覧でソート可能な列の許可リスト。
/// 呼び出し元の文字列を直接 SQL に連結しないための列挙型表現。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SortKey {
   /// 登録日時（デフォルト）
   #[default]
   CreatedAt,
   /// 学生名
   Name,
}

impl SortKey {
   /// 文字列からソートキーをパースする
   ///
   /// 許可リストにない値はエラーではなく `CreatedAt` にフォールバックする。
   /// ソートキーは表示上の設定であり、正確性に関わる入力ではないため。
   pub fn parse_or_default(s: &str) -> Self {
      match s {
         "created_at" => Self::CreatedAt,
         "name" => Self::Name,
         _ => Self::default(),
      }
   }

   /// 文字列への変換
   pub fn as_str(&self) -> &'static str {
      (*self).into()
   }
}

/// ソート方向
///
/// `asc` 以外の入力（空文字列・不正値を含む）はすべて `desc` に正規化する。
/// 新しい順がデフォルト。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
   /// 昇順
   Asc,
   /// 降順（デフォルト）
   #[default]
   Desc,
}

impl SortDirection {
   /// 文字列からソート方向をパースする
   pub fn parse_or_default(s: &str) -> Self {
      if s.eq_ignore_ascii_case("asc") {
         Self::Asc
      } else {
         Self::Desc
      }
   }

   /// SQL の方向キーワードを返す
   pub fn as_sql(&self) -> &'static str {
      match self {
         Self::Asc => "ASC",
         Self::Desc => "DESC",
      }
   }
}

/// 1 ページの件数
///
/// # ポリシー
///
/// - 0 以下は呼び出し元の誤りとして拒否する（黙ってデフォルトに置き換えない）
/// - [`MAX`](Self::MAX) を超える値は上限にクランプする
/// - 範囲内の値はそのまま通す
/// - 未指定時は [`default`](Self::default)（10 件）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(i64);

impl PageLimit {
   /// 件数の上限
   pub const MAX: i64 = 50;
   /// 未指定時のデフォルト件数
   pub const DEFAULT: i64 = 10;

   /// 件数を検証して作成する
   ///
   /// # エラー
   ///
   /// 0 以下の場合は `DomainError::Validation` を返す。
   pub fn new(value: i64) -> Result<Self, DomainError> {
      if value <= 0 {
         return Err(DomainError::Validation(
            "limit は 1 以上である必要があります".to_string(),
         ));
      }
      Ok(Self(value.min(Self::MAX)))
   }

   /// 内部の件数を取得する
   pub fn as_i64(&self) -> i64 {
      self.0
   }

   /// 次ページ有無の判定のために 1 件先読みした取得件数
   ///
   /// `limit + 1` 件を問い合わせ、`limit` 件を超えて返ってきた場合のみ
   /// 次ページが存在すると判定する。これにより最終ページがちょうど
   /// `limit` 件のときも余分な空ページを発行しない。
   pub fn fetch_size(&self) -> i64 {
      self.0 + 1
   }

   /// 先読み込みの取得行数から次ページがあるかどうかを判定する
   pub fn has_more(&self, fetched: usize) -> bool {
      fetched as i64 > self.0
   }
}

impl Default for PageLimit {
   fn default() -> Self {
      Self(Self::DEFAULT)
   }
}
