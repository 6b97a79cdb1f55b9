//! # キーセットページネーション
//!
//! カーソルの符号化・復号と、キーセットスキャンの SQL 組み立てを提供する。
//!
//! ## カーソルのワイヤ形式
//!
//! `{"cursor": "<ソート値の文字列形>", "id": "<uuid>"}` を標準 base64 で
//! 符号化した不透明文字列。サーバーがページ末尾の行から生成し、クライアント
//! は次ページ取得時にそのまま返す。クライアントがトークンを保存する前提で、
//! この形状はバージョン間で安定に保つ。
//!
//! ## キーセットスキャンの不変条件
//!
//! 述語は `(ソート列, id)` の**行値（タプル）比較**で組み立てる。ソート列の
//! 値が重複しても id で決定的にタイブレークされるため、ページ境界での行の
//! 取りこぼし・重複が起きない。`ORDER BY` はタプル比較と同じ方向で
//! `ソート列, id` の両方に掛ける。
//!
//! SQL に連結されるのは許可リストで解決した物理カラム名と正規化済みの
//! 方向キーワードのみ。ソート値と id は常にバインドパラメータで渡す。

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use gakuseki_domain::pagination::{PageLimit, SortDirection, SortKey};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::InfraError;

/// カーソルのワイヤ形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CursorPayload {
   cursor: String,
   id:     String,
}

/// 復号済みカーソル
///
/// `sort_value` はソート値の文字列形。型付きの復元は
/// [`KeysetQuery::new`] がソートキーに応じて行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
   pub sort_value: String,
   pub row_id:     Uuid,
}

/// ソート値と行 ID からカーソルトークンを符号化する
///
/// [`decode_cursor`] とのラウンドトリップが成立する
/// （`decode(encode(v, id)) == (v, id)`）。
pub fn encode_cursor(sort_value: &str, row_id: &Uuid) -> Result<String, InfraError> {
   let payload = CursorPayload {
      cursor: sort_value.to_string(),
      id:     row_id.to_string(),
   };
   let json = serde_json::to_vec(&payload)?;

   Ok(BASE64.encode(json))
}

/// カーソルトークンを復号する
///
/// 空文字列は「先頭ページ」を意味する正常な入力であり、`Ok(None)` を返す。
///
/// # Errors
///
/// base64 として不正、JSON の形状不一致、`id` が UUID でない場合は
/// `InvalidCursor` を返す。
pub fn decode_cursor(token: &str) -> Result<Option<Cursor>, InfraError> {
   if token.is_empty() {
      return Ok(None);
   }

   let bytes = BASE64
      .decode(token)
      .map_err(|e| InfraError::invalid_cursor(format!("base64 の復号に失敗: {e}")))?;

   let payload: CursorPayload = serde_json::from_slice(&bytes)
      .map_err(|e| InfraError::invalid_cursor(format!("カーソルの形状が不正: {e}")))?;

   let row_id = Uuid::parse_str(&payload.id)
      .map_err(|e| InfraError::invalid_cursor(format!("カーソルの id が不正: {e}")))?;

   Ok(Some(Cursor {
      sort_value: payload.cursor,
      row_id,
   }))
}

/// 型付きのソート値
///
/// タプル比較のバインドパラメータとして使用する。
/// ソート列の型と一致させないと比較が狂うため、文字列のまま渡さない。
#[derive(Debug, Clone, PartialEq, Eq)]
enum SortValue {
   Timestamp(DateTime<Utc>),
   Text(String),
}

impl SortValue {
   /// ソートキーに応じてソート値の文字列形を型付きに復元する
   ///
   /// # Errors
   ///
   /// `created_at` のソート値が RFC 3339 として解釈できない場合は
   /// `InvalidCursor` を返す。
   fn parse(sort: SortKey, raw: &str) -> Result<Self, InfraError> {
      match sort {
         SortKey::CreatedAt => DateTime::parse_from_rfc3339(raw)
            .map(|t| Self::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| {
               InfraError::invalid_cursor(format!("カーソルの日時が不正: {e}"))
            }),
         SortKey::Name => Ok(Self::Text(raw.to_string())),
      }
   }
}

/// キーセットスキャンのクエリ組み立て
///
/// ソート指定と復号済みカーソルから、単一テーブルのキーセットスキャンの
/// 述語と並び順を決定的・インジェクション安全に組み立てる。
///
/// ## 使用例
///
/// ```ignore
/// let query = KeysetQuery::new(sort, direction, cursor_token)?;
/// let mut qb = QueryBuilder::new("SELECT ... FROM students");
/// query.push_predicate(&mut qb);
/// query.push_order_and_limit(&mut qb, limit);
/// ```
#[derive(Debug)]
pub struct KeysetQuery {
   sort:      SortKey,
   direction: SortDirection,
   bound:     Option<(SortValue, Uuid)>,
}

impl KeysetQuery {
   /// ソート指定とカーソルトークンからクエリを組み立てる
   ///
   /// カーソルが無い（`None` または空文字列）場合は述語なしの
   /// 先頭ページスキャンになる。
   ///
   /// # Errors
   ///
   /// トークンが復号できない、またはソート値が型復元できない場合は
   /// `InvalidCursor` を返す。
   pub fn new(
      sort: SortKey,
      direction: SortDirection,
      cursor_token: Option<&str>,
   ) -> Result<Self, InfraError> {
      let bound = match cursor_token {
         None => None,
         Some(token) => match decode_cursor(token)? {
            None => None,
            Some(cursor) => {
               let value = SortValue::parse(sort, &cursor.sort_value)?;
               Some((value, cursor.row_id))
            }
         },
      };

      Ok(Self {
         sort,
         direction,
         bound,
      })
   }

   pub fn sort_key(&self) -> SortKey {
      self.sort
   }

   pub fn direction(&self) -> SortDirection {
      self.direction
   }

   /// 許可リストによる物理カラム名の解決
   ///
   /// [`SortKey`] は閉じた列挙型なので、ここで返る文字列以外が
   /// SQL に混入することはない。
   fn sort_column(&self) -> &'static str {
      match self.sort {
         SortKey::CreatedAt => "created_at",
         SortKey::Name => "name",
      }
   }

   /// 方向に応じた比較演算子
   ///
   /// 降順（新しい順）はカーソルより「小さい」行へ、昇順は「大きい」行へ進む。
   fn comparison_operator(&self) -> &'static str {
      match self.direction {
         SortDirection::Desc => "<",
         SortDirection::Asc => ">",
      }
   }

   /// キーセット述語を追加する
   ///
   /// カーソルが無い場合は何も追加しない。
   pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>) {
      let Some((value, id)) = &self.bound else {
         return;
      };

      qb.push(" WHERE (");
      qb.push(self.sort_column());
      qb.push(", id) ");
      qb.push(self.comparison_operator());
      qb.push(" (");
      match value {
         SortValue::Timestamp(ts) => {
            qb.push_bind(*ts);
         }
         SortValue::Text(s) => {
            qb.push_bind(s.clone());
         }
      }
      qb.push(", ");
      qb.push_bind(*id);
      qb.push(")");
   }

   /// ORDER BY と LIMIT を追加する
   ///
   /// タプル比較と同じ方向で `ソート列, id` の両方に並び順を掛ける。
   /// LIMIT には次ページ有無の判定のため 1 件先読みした件数
   /// （[`PageLimit::fetch_size`]）をバインドする。
   pub fn push_order_and_limit(&self, qb: &mut QueryBuilder<'_, Postgres>, limit: PageLimit) {
      qb.push(" ORDER BY ");
      qb.push(self.sort_column());
      qb.push(" ");
      qb.push(self.direction.as_sql());
      qb.push(", id ");
      qb.push(self.direction.as_sql());
      qb.push(" LIMIT ");
      qb.push_bind(limit.fetch_size());
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;
   use rstest::rstest;

   use super::*;
   use crate::InfraErrorKind;

   fn assert_invalid_cursor(err: InfraError) {
      assert!(
         matches!(err.kind(), InfraErrorKind::InvalidCursor(_)),
         "InvalidCursor であること: {err}"
      );
   }

   // ===== カーソル符号化・復号テスト =====

   #[rstest]
   #[case("2024-01-02T03:04:05+00:00")]
   #[case("佐藤花子")]
   #[case("")]
   fn test_カーソルのラウンドトリップ(#[case] sort_value: &str) {
      let row_id = Uuid::now_v7();

      let token = encode_cursor(sort_value, &row_id).unwrap();
      let decoded = decode_cursor(&token).unwrap().unwrap();

      assert_eq!(decoded.sort_value, sort_value);
      assert_eq!(decoded.row_id, row_id);
   }

   #[rstest]
   fn test_空文字列のカーソルは先頭ページを意味する() {
      assert_eq!(decode_cursor("").unwrap(), None);
   }

   #[rstest]
   fn test_base64でないトークンはinvalid_cursorになる() {
      assert_invalid_cursor(decode_cursor("!!!not-base64!!!").unwrap_err());
   }

   #[rstest]
   fn test_jsonでないトークンはinvalid_cursorになる() {
      let token = BASE64.encode(b"plain text");
      assert_invalid_cursor(decode_cursor(&token).unwrap_err());
   }

   #[rstest]
   fn test_形状不一致のjsonはinvalid_cursorになる() {
      let token = BASE64.encode(br#"{"unexpected": "shape"}"#);
      assert_invalid_cursor(decode_cursor(&token).unwrap_err());
   }

   #[rstest]
   fn test_idがuuidでないトークンはinvalid_cursorになる() {
      let token = BASE64.encode(br#"{"cursor": "2024-01-01T00:00:00Z", "id": "not-a-uuid"}"#);
      assert_invalid_cursor(decode_cursor(&token).unwrap_err());
   }

   #[rstest]
   fn test_ワイヤ形式のフィールド名が安定している() {
      let row_id = Uuid::now_v7();
      let token = encode_cursor("value", &row_id).unwrap();
      let json: serde_json::Value =
         serde_json::from_slice(&BASE64.decode(token).unwrap()).unwrap();

      // クライアントがトークンを保存する前提の安定形状
      assert_eq!(json["cursor"], "value");
      assert_eq!(json["id"], row_id.to_string());
   }

   // ===== KeysetQuery 構築テスト =====

   fn cursor_token(sort_value: &str) -> String {
      encode_cursor(sort_value, &Uuid::now_v7()).unwrap()
   }

   #[rstest]
   fn test_created_atカーソルの日時が不正ならinvalid_cursorになる() {
      let token = cursor_token("not-a-timestamp");

      let result = KeysetQuery::new(SortKey::CreatedAt, SortDirection::Desc, Some(&token));

      assert_invalid_cursor(result.unwrap_err());
   }

   #[rstest]
   fn test_nameカーソルは任意の文字列を受け付ける() {
      let token = cursor_token("任意の名前");

      let result = KeysetQuery::new(SortKey::Name, SortDirection::Desc, Some(&token));

      assert!(result.is_ok());
   }

   #[rstest]
   fn test_空トークンは先頭ページになる() {
      let query = KeysetQuery::new(SortKey::CreatedAt, SortDirection::Desc, Some("")).unwrap();

      assert!(query.bound.is_none());
   }

   // ===== SQL 組み立てテスト =====

   fn build_sql(
      sort: SortKey,
      direction: SortDirection,
      cursor_token: Option<&str>,
      limit: i64,
   ) -> String {
      let query = KeysetQuery::new(sort, direction, cursor_token).unwrap();
      let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT id FROM students");
      query.push_predicate(&mut qb);
      query.push_order_and_limit(&mut qb, PageLimit::new(limit).unwrap());
      qb.sql().to_string()
   }

   #[rstest]
   fn test_降順はタプル比較が小なりになる() {
      let token = cursor_token("2024-01-02T03:04:05+00:00");

      let sql = build_sql(SortKey::CreatedAt, SortDirection::Desc, Some(&token), 10);

      assert_eq!(
         sql,
         "SELECT id FROM students WHERE (created_at, id) < ($1, $2) \
          ORDER BY created_at DESC, id DESC LIMIT $3"
      );
   }

   #[rstest]
   fn test_昇順はタプル比較が大なりになる() {
      let token = cursor_token("2024-01-02T03:04:05+00:00");

      let sql = build_sql(SortKey::CreatedAt, SortDirection::Asc, Some(&token), 10);

      assert_eq!(
         sql,
         "SELECT id FROM students WHERE (created_at, id) > ($1, $2) \
          ORDER BY created_at ASC, id ASC LIMIT $3"
      );
   }

   #[rstest]
   fn test_カーソルなしは述語が省略される() {
      let sql = build_sql(SortKey::CreatedAt, SortDirection::Desc, None, 10);

      assert_eq!(
         sql,
         "SELECT id FROM students ORDER BY created_at DESC, id DESC LIMIT $1"
      );
   }

   #[rstest]
   fn test_nameソートは物理カラムがnameになる() {
      let token = cursor_token("佐藤花子");

      let sql = build_sql(SortKey::Name, SortDirection::Asc, Some(&token), 5);

      assert_eq!(
         sql,
         "SELECT id FROM students WHERE (name, id) > ($1, $2) \
          ORDER BY name ASC, id ASC LIMIT $3"
      );
   }

   #[rstest]
   fn test_許可リスト外のソートキーはcreated_atとして組み立てられる() {
      // 許可リスト解決はドメイン層（SortKey::parse_or_default）で行われ、
      // ここに到達する時点で必ず閉じた列挙型になっている
      let sort = SortKey::parse_or_default("bogus");

      let sql = build_sql(sort, SortDirection::Desc, None, 10);

      assert!(sql.contains("ORDER BY created_at DESC"));
   }
}
