//! Entity services: one per resource type, mapping 1:1 onto REST calls.
//!
//! The only policy here is the empty-list fallback for list endpoints that
//! some backend revisions do not expose (404/405).

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::error::is_missing_endpoint;
use crate::model::{
    Class, ClassCreate, ClassWithStudents, Id, JournalEntry, JournalEntryCreate, MessageResponse,
    Student, StudentCreate, Subject, SubjectCreate,
};
use crate::traits::JournalApi;

#[derive(Clone)]
pub struct ClassService {
    api: Arc<dyn JournalApi>,
}

impl ClassService {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Class>> {
        self.api.list_classes().await
    }

    /// Classes with rosters; empty when the backend lacks the endpoint.
    pub async fn list_with_students(&self) -> Result<Vec<ClassWithStudents>> {
        match self.api.list_classes_with_students().await {
            Ok(classes) => Ok(classes),
            Err(e) if is_missing_endpoint(&e) => {
                warn!("classes-with-students endpoint not available, using empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, name: &str) -> Result<Class> {
        self.api
            .create_class(&ClassCreate {
                name: name.to_string(),
            })
            .await
    }

    /// Create a student directly in `class_id`.
    pub async fn add_student(&self, class_id: Id, mut student: StudentCreate) -> Result<Student> {
        student.class_id = class_id;
        self.api.create_student(&student).await
    }
}

#[derive(Clone)]
pub struct StudentService {
    api: Arc<dyn JournalApi>,
}

impl StudentService {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Student>> {
        self.api.list_students().await
    }

    pub async fn create(&self, student: &StudentCreate) -> Result<Student> {
        self.api.create_student(student).await
    }

    pub async fn remove(&self, id: Id) -> Result<MessageResponse> {
        self.api.delete_student(id).await
    }
}

#[derive(Clone)]
pub struct SubjectService {
    api: Arc<dyn JournalApi>,
}

impl SubjectService {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self { api }
    }

    /// Subjects of the current teacher; empty when the backend lacks the endpoint.
    pub async fn list(&self) -> Result<Vec<Subject>> {
        match self.api.list_subjects().await {
            Ok(subjects) => Ok(subjects),
            Err(e) if is_missing_endpoint(&e) => {
                warn!("subjects endpoint not available, using empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, name: &str) -> Result<Subject> {
        self.api
            .create_subject(&SubjectCreate {
                name: name.to_string(),
            })
            .await
    }

    pub async fn remove(&self, id: Id) -> Result<MessageResponse> {
        self.api.delete_subject(id).await
    }
}

#[derive(Clone)]
pub struct EntryService {
    api: Arc<dyn JournalApi>,
}

impl EntryService {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<JournalEntry>> {
        self.api.list_entries().await
    }

    pub async fn get(&self, id: Id) -> Result<JournalEntry> {
        self.api.get_entry(id).await
    }

    pub async fn create(&self, entry: &JournalEntryCreate) -> Result<JournalEntry> {
        self.api.create_entry(entry).await
    }

    pub async fn update(&self, id: Id, entry: &JournalEntryCreate) -> Result<JournalEntry> {
        self.api.update_entry(id, entry).await
    }

    pub async fn remove(&self, id: Id) -> Result<MessageResponse> {
        self.api.delete_entry(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockApi;
    use crate::traits::MemoryTokenStore;

    fn mock() -> Arc<MockApi> {
        Arc::new(MockApi::new(Arc::new(MemoryTokenStore::new())))
    }

    #[tokio::test]
    async fn missing_endpoints_fall_back_to_empty() {
        let api = mock();
        api.add_class("5A");
        api.add_subject("Math");
        api.fail_on("list_classes_with_students", 404, serde_json::json!("Not Found"));
        api.fail_on("list_subjects", 405, serde_json::json!("Method Not Allowed"));

        let classes = ClassService::new(api.clone());
        let subjects = SubjectService::new(api.clone());
        assert!(classes.list_with_students().await.unwrap().is_empty());
        assert!(subjects.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let api = mock();
        api.fail_on("list_subjects", 500, serde_json::json!("boom"));
        api.fail_on("list_classes_with_students", 401, serde_json::json!("Not authenticated"));

        assert!(SubjectService::new(api.clone()).list().await.is_err());
        let err = ClassService::new(api.clone())
            .list_with_students()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn add_student_forces_class_id() {
        let api = mock();
        let class = api.add_class("7B");
        let service = ClassService::new(api.clone());
        let student = service
            .add_student(
                class.id,
                StudentCreate {
                    first_name: "Vera".into(),
                    last_name: "Lebedeva".into(),
                    email: "vera@school.test".into(),
                    class_id: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(student.class_id, class.id);
    }
}
