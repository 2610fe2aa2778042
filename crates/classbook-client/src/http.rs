//! reqwest-backed implementation of `JournalApi`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use classbook_core::error::ApiError;
use classbook_core::model::{
    Class, ClassCreate, ClassWithStudents, Id, JournalEntry, JournalEntryCreate, MessageResponse,
    Student, StudentCreate, Subject, SubjectCreate, TokenResponse, User, UserCreate,
};
use classbook_core::traits::{JournalApi, TokenStore};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the journal API.
///
/// Shared by every view; attaches the bearer token from the `TokenStore` to
/// each request when one is present.
pub struct HttpApi {
    base_url: String,
    timeout_secs: u64,
    tokens: Arc<dyn TokenStore>,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(
        base_url: Option<String>,
        timeout_secs: u64,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            tokens,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.tokens.get() {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        debug!(status, url = %response.url(), "response");
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body).into());
        }

        let parsed = response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::DELETE, path)).await
    }
}

#[async_trait]
impl JournalApi for HttpApi {
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        let form = [("username", username), ("password", password)];
        self.send(self.request(Method::POST, "/auth/token").form(&form))
            .await
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn register(&self, user: &UserCreate) -> Result<User> {
        self.post("/auth/register", user).await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<User> {
        self.get("/auth/me").await
    }

    #[instrument(skip(self))]
    async fn list_classes(&self) -> Result<Vec<Class>> {
        self.get("/classes").await
    }

    #[instrument(skip(self, class), fields(name = %class.name))]
    async fn create_class(&self, class: &ClassCreate) -> Result<Class> {
        self.post("/classes", class).await
    }

    #[instrument(skip(self))]
    async fn list_classes_with_students(&self) -> Result<Vec<ClassWithStudents>> {
        self.get("/classes-with-students").await
    }

    #[instrument(skip(self))]
    async fn list_students(&self) -> Result<Vec<Student>> {
        self.get("/students").await
    }

    #[instrument(skip(self, student), fields(class_id = student.class_id))]
    async fn create_student(&self, student: &StudentCreate) -> Result<Student> {
        self.post("/students", student).await
    }

    #[instrument(skip(self))]
    async fn delete_student(&self, id: Id) -> Result<MessageResponse> {
        self.delete(&format!("/students/{id}")).await
    }

    #[instrument(skip(self))]
    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.get("/subjects").await
    }

    #[instrument(skip(self, subject), fields(name = %subject.name))]
    async fn create_subject(&self, subject: &SubjectCreate) -> Result<Subject> {
        self.post("/subjects", subject).await
    }

    #[instrument(skip(self))]
    async fn delete_subject(&self, id: Id) -> Result<MessageResponse> {
        self.delete(&format!("/subjects/{id}")).await
    }

    #[instrument(skip(self))]
    async fn list_entries(&self) -> Result<Vec<JournalEntry>> {
        self.get("/entries").await
    }

    #[instrument(skip(self))]
    async fn get_entry(&self, id: Id) -> Result<JournalEntry> {
        self.get(&format!("/entries/{id}")).await
    }

    #[instrument(skip(self, entry), fields(class_id = entry.class_id))]
    async fn create_entry(&self, entry: &JournalEntryCreate) -> Result<JournalEntry> {
        self.post("/entries", entry).await
    }

    #[instrument(skip(self, entry))]
    async fn update_entry(&self, id: Id, entry: &JournalEntryCreate) -> Result<JournalEntry> {
        self.put(&format!("/entries/{id}"), entry).await
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, id: Id) -> Result<MessageResponse> {
        self.delete(&format!("/entries/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classbook_core::model::{parse_lesson_date, AttendanceMap, AttendanceStatus, GradeMap};
    use classbook_core::traits::MemoryTokenStore;
    use wiremock::matchers::{body_json, body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer, tokens: Arc<MemoryTokenStore>) -> HttpApi {
        HttpApi::new(Some(server.uri()), 5, tokens).unwrap()
    }

    #[tokio::test]
    async fn login_posts_form_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=anna"))
            .and(body_string_contains("password=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-123",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let token = client.login("anna", "s3cret").await.unwrap();
        assert_eq!(token.access_token, "tok-123");
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1, "username": "anna", "email": "anna@school.test"
            })))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::with_token("tok-123")));
        let user = client.current_user().await.unwrap();
        assert_eq!(user.username, "anna");
    }

    #[tokio::test]
    async fn no_token_no_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/classes"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/classes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 4, "name": "5A"}
            ])))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let classes = client.list_classes().await.unwrap();
        assert_eq!(classes[0].name, "5A");
    }

    #[tokio::test]
    async fn error_detail_is_parsed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Incorrect username or password"
            })))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.login("anna", "nope").await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();
        assert!(api_err.is_unauthorized());
        assert_eq!(
            api_err.detail_message().as_deref(),
            Some("Incorrect username or password")
        );
    }

    #[tokio::test]
    async fn missing_endpoint_status_is_preserved() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/classes-with-students"))
            .respond_with(ResponseTemplate::new(405).set_body_json(serde_json::json!({
                "detail": "Method Not Allowed"
            })))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.list_classes_with_students().await.unwrap_err();
        assert!(classbook_core::error::is_missing_endpoint(&err));
    }

    #[tokio::test]
    async fn entry_create_body_shape() {
        let server = MockServer::start().await;

        let date = parse_lesson_date("2024-09-02T08:30").unwrap();
        let mut attendance = AttendanceMap::new();
        attendance.insert(10, AttendanceStatus::Present);
        attendance.insert(11, AttendanceStatus::Absent);
        let payload = JournalEntryCreate {
            subject_id: 1,
            class_id: 2,
            date,
            topic: "Fractions".into(),
            homework: "p. 12".into(),
            attendance,
            grades: GradeMap::new(),
        };

        Mock::given(method("POST"))
            .and(path("/entries"))
            .and(body_json(serde_json::json!({
                "subject_id": 1,
                "class_id": 2,
                "date": "2024-09-02T08:30:00",
                "topic": "Fractions",
                "homework": "p. 12",
                "attendance": {"10": "present", "11": "absent"},
                "grades": {}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 99,
                "subject_id": 1,
                "class_id": 2,
                "date": "2024-09-02T08:30:00",
                "topic": "Fractions",
                "homework": "p. 12",
                "attendance": {"10": "present", "11": "absent"},
                "grades": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let entry = client.create_entry(&payload).await.unwrap();
        assert_eq!(entry.id, 99);
        assert_eq!(entry.present_count(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_use_entry_path() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/entries/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Entry deleted"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/students/3"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Student not found"
            })))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let msg = client.delete_entry(7).await.unwrap();
        assert_eq!(msg.message, "Entry deleted");
        let err = client.delete_student(3).await.unwrap_err();
        assert!(err.to_string().contains("Student not found"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subjects"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = api(&server, Arc::new(MemoryTokenStore::new()));
        let err = client.list_subjects().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = HttpApi::new(
            Some(format!("{}/", server.uri())),
            5,
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();
        assert!(client.list_entries().await.unwrap().is_empty());
    }
}
