//! # 学籍ハンドラ
//!
//! 学籍登録と一覧取得のエンドポイントを提供する。
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/students` - 学籍登録（職員は不可）
//! - `GET /api/v1/students` - 学籍一覧（学生は不可、カーソルページネーション）

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use gakuseki_domain::student::Student;
use gakuseki_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::RequestIdentity,
    usecase::{ListStudentsInput, RegisterStudentInput, StudentUseCase},
};

/// 学籍ハンドラの共有状態
pub struct StudentState {
    pub usecase: Arc<dyn StudentUseCase>,
}

// --- リクエスト/レスポンス型 ---

/// 学籍登録リクエスト
#[derive(Debug, Deserialize)]
pub struct RegisterStudentRequest {
    pub name:         String,
    pub class:        String,
    pub address:      String,
    pub major:        String,
    #[serde(default)]
    pub profile_note: Option<String>,
}

/// 学籍一覧のクエリパラメータ
///
/// `limit` は文字列で受け取り、ユースケース層で検証する
/// （解釈できない値をフレームワーク既定のエラーにしないため）。
#[derive(Debug, Deserialize)]
pub struct ListStudentsQuery {
    #[serde(default)]
    pub limit:  Option<String>,
    #[serde(default)]
    pub sort:   Option<String>,
    #[serde(default)]
    pub order:  Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// レスポンス用の学籍表現
#[derive(Debug, Serialize)]
pub struct StudentData {
    pub id:           Uuid,
    pub name:         String,
    pub class:        String,
    pub address:      String,
    pub major:        String,
    pub profile_note: String,
    pub created_at:   DateTime<Utc>,
    pub updated_at:   DateTime<Utc>,
}

impl From<&Student> for StudentData {
    fn from(student: &Student) -> Self {
        Self {
            id:           *student.id().as_uuid(),
            name:         student.name().as_str().to_string(),
            class:        student.class().to_string(),
            address:      student.address().to_string(),
            major:        student.major().to_string(),
            profile_note: student.profile_note().to_string(),
            created_at:   student.created_at(),
            updated_at:   student.updated_at(),
        }
    }
}

// --- ハンドラ ---

/// POST /api/v1/students
///
/// 学籍を登録する。学生名が使用済みの場合は 409 を返す。
pub async fn register_student(
    State(state): State<Arc<StudentState>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(req): Json<RegisterStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state
        .usecase
        .register(
            &identity,
            RegisterStudentInput {
                name:         req.name,
                class:        req.class,
                address:      req.address,
                major:        req.major,
                profile_note: req.profile_note,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StudentData::from(&student))),
    ))
}

/// GET /api/v1/students
///
/// 学籍の一覧を 1 ページ返す。`next_cursor` が `null` なら最終ページ。
pub async fn list_students(
    State(state): State<Arc<StudentState>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .usecase
        .list(
            &identity,
            ListStudentsInput {
                limit:  query.limit,
                sort:   query.sort,
                order:  query.order,
                cursor: query.cursor,
            },
        )
        .await?;

    let data = page.items.iter().map(StudentData::from).collect();

    Ok(Json(PaginatedResponse::new(data, page.next_cursor)))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::get,
    };
    use gakuseki_domain::{
        student::{NewStudent, StudentId, StudentName},
        user::{UserId, UserRole},
    };
    use gakuseki_infra::repository::StudentPage;
    use tower::ServiceExt;

    use super::*;

    // テスト用スタブ

    struct StubStudentUseCase {
        page: Vec<Student>,
    }

    fn test_student(name: &str) -> Student {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Student::new(NewStudent {
            id:           StudentId::new(),
            name:         StudentName::new(name).unwrap(),
            class:        "3-A".to_string(),
            address:      "東京都".to_string(),
            major:        "情報工学".to_string(),
            profile_note: String::new(),
            now,
        })
        .unwrap()
    }

    #[async_trait]
    impl StudentUseCase for StubStudentUseCase {
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
            Ok(test_student(&input.name))
        }

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
            // 次ページがあるときだけカーソルを返す実装の振る舞いを模す
            let next_cursor = (input.cursor.is_none() && !self.page.is_empty())
                .then(|| "next-token".to_string());
            Ok(StudentPage {
                items: self.page.clone(),
                next_cursor,
            })
        }
    }

    fn create_test_app(role: UserRole, page: Vec<Student>) -> Router {
        let identity = RequestIdentity {
            user_id: UserId::new(),
            role,
        };
        let state = Arc::new(StudentState {
            usecase: Arc::new(StubStudentUseCase { page }),
        });

        Router::new()
            .route(
                "/api/v1/students",
                get(list_students).post(register_student),
            )
            .layer(Extension(identity))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_登録成功で201と学籍データが返る() {
        let sut = create_test_app(UserRole::Student, Vec::new());

        let body = serde_json::json!({
            "name": "佐藤花子",
            "class": "3-A",
            "address": "東京都",
            "major": "情報工学"
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/students")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["data"]["name"], "佐藤花子");
    }

    #[tokio::test]
    async fn test_職員の登録は403になる() {
        let sut = create_test_app(UserRole::Staff, Vec::new());

        let body = serde_json::json!({
            "name": "佐藤花子",
            "class": "3-A",
            "address": "東京都",
            "major": "情報工学"
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/students")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_一覧はdataとnext_cursorを返す() {
        let sut = create_test_app(
            UserRole::Staff,
            vec![test_student("佐藤花子"), test_student("田中一郎")],
        );

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/students?limit=2&sort=created_at&order=desc")
            .body(Body::empty())
            .unwrap();
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["next_cursor"], "next-token");
    }

    #[tokio::test]
    async fn test_カーソル付きの最終ページはnext_cursorがnullになる() {
        let sut = create_test_app(UserRole::Staff, vec![test_student("佐藤花子")]);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/students?cursor=some-token")
            .body(Body::empty())
            .unwrap();
        let response = sut.oneshot(request).await.unwrap();

        let json = body_json(response).await;
        assert_eq!(json["next_cursor"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_学生の一覧閲覧は403になる() {
        let sut = create_test_app(UserRole::Student, Vec::new());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/students")
            .body(Body::empty())
            .unwrap();
        let response = sut.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
