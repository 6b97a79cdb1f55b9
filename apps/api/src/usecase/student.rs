//! # 学籍ユースケース
//!
//! 学籍登録と、キーセットページネーションによる一覧取得を実装する。
//!
//! ## ロールによるアクセス制御
//!
//! - 学籍登録: 学生本人が行う操作。職員アカウントからの登録は拒否する
//! - 一覧取得: 職員向けの閲覧操作。学生アカウントからの閲覧は拒否する

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gakuseki_domain::{
    pagination::{PageLimit, SortDirection, SortKey},
    student::{NewStudent, Student, StudentId, StudentName},
    user::UserRole,
};
use gakuseki_infra::repository::{StudentPage, StudentRepository};

use crate::{error::ApiError, middleware::RequestIdentity, usecase::with_db_deadline};

/// 学籍登録の入力
#[derive(Debug)]
pub struct RegisterStudentInput {
    pub name:         String,
    pub class:        String,
    pub address:      String,
    pub major:        String,
    pub profile_note: Option<String>,
}

/// 学籍一覧取得の入力（クエリパラメータそのまま）
///
/// `limit` は文字列のまま受け取り、ここで検証する
/// （解釈できない値は黙ってデフォルトに置き換えず、エラーで返す）。
#[derive(Debug, Default)]
pub struct ListStudentsInput {
    pub limit:  Option<String>,
    pub sort:   Option<String>,
    pub order:  Option<String>,
    pub cursor: Option<String>,
}

/// 学籍ユースケーストレイト
#[async_trait]
pub trait StudentUseCase: Send + Sync {
    /// 学籍を登録する
    ///
    /// # エラー
    ///
    /// - 呼び出し元が職員の場合は `Forbidden`
    /// - 学生名が使用済みの場合は `Conflict`
    async fn register(
        &self,
        identity: &RequestIdentity,
        input: RegisterStudentInput,
    ) -> Result<Student, ApiError>;

    /// 学籍の一覧を 1 ページ取得する
    ///
    /// # エラー
    ///
    /// - 呼び出し元が学生の場合は `Forbidden`
    /// - `limit` が解釈できない・0 以下の場合は `Validation`
    /// - カーソルが復号できない場合は不正カーソル（400）
    async fn list(
        &self,
        identity: &RequestIdentity,
        input: ListStudentsInput,
    ) -> Result<StudentPage, ApiError>;
}

/// 学籍ユースケースの実装
pub struct StudentUseCaseImpl {
    students: Arc<dyn StudentRepository>,
}

impl StudentUseCaseImpl {
    /// 新しいユースケースインスタンスを作成
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }
}

#[async_trait]
impl StudentUseCase for StudentUseCaseImpl {
    #[tracing::instrument(skip_all)]
    async fn register(
        &self,
        identity: &RequestIdentity,
        input: RegisterStudentInput,
    ) -> Result<Student, ApiError> {
        if identity.role == UserRole::Staff {
            return Err(ApiError::Forbidden(
                "職員アカウントでは学籍登録できません".to_string(),
            ));
        }

        let name = StudentName::new(input.name)?;

        if with_db_deadline(self.students.find_by_name(&name))
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "この学生名は既に登録されています".to_string(),
            ));
        }

        let student = Student::new(NewStudent {
            id: StudentId::new(),
            name,
            class: input.class,
            address: input.address,
            major: input.major,
            profile_note: input.profile_note.unwrap_or_default(),
            now: Utc::now(),
        })?;

        with_db_deadline(self.students.create(&student)).await?;

        tracing::info!(student_id = %student.id(), "学籍を登録しました");

        Ok(student)
    }

    #[tracing::instrument(skip_all)]
    async fn list(
        &self,
        identity: &RequestIdentity,
        input: ListStudentsInput,
    ) -> Result<StudentPage, ApiError> {
        if identity.role == UserRole::Student {
            return Err(ApiError::Forbidden(
                "学生アカウントでは学籍一覧を閲覧できません".to_string(),
            ));
        }

        let limit = match input.limit.as_deref() {
            None | Some("") => PageLimit::default(),
            Some(raw) => {
                let value: i64 = raw.parse().map_err(|_| {
                    ApiError::Validation("limit は整数である必要があります".to_string())
                })?;
                PageLimit::new(value)?
            }
        };

        let sort = SortKey::parse_or_default(input.sort.as_deref().unwrap_or(""));
        let direction = SortDirection::parse_or_default(input.order.as_deref().unwrap_or(""));

        let page = with_db_deadline(self.students.list_page(
            limit,
            sort,
            direction,
            input.cursor.as_deref(),
        ))
        .await?;

        Ok(page)
    }
}
