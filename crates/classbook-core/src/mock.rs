//! In-memory backend for testing sessions, forms and views without a server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::ApiError;
use crate::model::{
    AttendanceMap, Class, ClassCreate, ClassWithStudents, GradeMap, Id, JournalEntry,
    JournalEntryCreate, MessageResponse, Student, StudentCreate, Subject, SubjectCreate,
    TokenResponse, User, UserCreate,
};
use crate::traits::{JournalApi, TokenStore};

/// A mock journal API backed by vectors.
///
/// Reads the bearer token from the same [`TokenStore`] the session writes to,
/// so `current_user` behaves like the real `/auth/me`. Every call is counted
/// per operation name, and failures can be injected per operation.
pub struct MockApi {
    tokens: Arc<dyn TokenStore>,
    state: Mutex<MockState>,
    calls: Mutex<HashMap<&'static str, u32>>,
    failures: Mutex<HashMap<&'static str, (u16, String)>>,
}

#[derive(Default)]
struct MockState {
    next_id: Id,
    users: Vec<(User, String)>,
    sessions: HashMap<String, Id>,
    classes: Vec<Class>,
    students: Vec<Student>,
    subjects: Vec<Subject>,
    entries: Vec<JournalEntry>,
    last_entry_payload: Option<JournalEntryCreate>,
}

impl MockState {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn class_name(&self, id: Id) -> Option<String> {
        self.classes.iter().find(|c| c.id == id).map(|c| c.name.clone())
    }

    fn subject_name(&self, id: Id) -> Option<String> {
        self.subjects.iter().find(|s| s.id == id).map(|s| s.name.clone())
    }

    fn build_entry(&self, id: Id, payload: &JournalEntryCreate) -> JournalEntry {
        JournalEntry {
            id,
            subject_id: payload.subject_id,
            class_id: payload.class_id,
            date: payload.date,
            topic: payload.topic.clone(),
            homework: payload.homework.clone(),
            attendance: payload.attendance.clone(),
            grades: payload.grades.clone(),
            subject_name: self.subject_name(payload.subject_id),
            class_name: self.class_name(payload.class_id),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn detail(status: u16, message: &str) -> anyhow::Error {
    ApiError::from_response(status, &serde_json::json!({ "detail": message }).to_string()).into()
}

impl MockApi {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Register an account that `login` will accept.
    pub fn add_user(&self, username: &str, email: &str, password: &str) -> User {
        let mut state = lock(&self.state);
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            email: email.to_string(),
        };
        state.users.push((user.clone(), password.to_string()));
        user
    }

    pub fn add_class(&self, name: &str) -> Class {
        let mut state = lock(&self.state);
        let class = Class {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.classes.push(class.clone());
        class
    }

    pub fn add_student(&self, class_id: Id, first_name: &str, last_name: &str) -> Student {
        let mut state = lock(&self.state);
        let student = Student {
            id: state.next_id(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("{}.{}@school.test", first_name, last_name).to_lowercase(),
            class_id,
            class_name: state.class_name(class_id),
            subjects: Vec::new(),
        };
        state.students.push(student.clone());
        student
    }

    pub fn add_subject(&self, name: &str) -> Subject {
        let mut state = lock(&self.state);
        let subject = Subject {
            id: state.next_id(),
            name: name.to_string(),
            teacher_id: state.users.first().map(|(u, _)| u.id),
        };
        state.subjects.push(subject.clone());
        subject
    }

    pub fn add_entry(
        &self,
        subject_id: Id,
        class_id: Id,
        date: NaiveDateTime,
        topic: &str,
        attendance: AttendanceMap,
    ) -> JournalEntry {
        let mut state = lock(&self.state);
        let id = state.next_id();
        let entry = state.build_entry(
            id,
            &JournalEntryCreate {
                subject_id,
                class_id,
                date,
                topic: topic.to_string(),
                homework: String::new(),
                attendance,
                grades: GradeMap::new(),
            },
        );
        state.entries.push(entry.clone());
        entry
    }

    /// Make every later call to `op` fail with `status` and `detail`.
    pub fn fail_on(&self, op: &'static str, status: u16, detail: serde_json::Value) {
        let body = serde_json::json!({ "detail": detail }).to_string();
        lock(&self.failures).insert(op, (status, body));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Number of calls made to `op` (the `JournalApi` method name).
    pub fn call_count(&self, op: &str) -> u32 {
        lock(&self.calls).get(op).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> u32 {
        lock(&self.calls).values().sum()
    }

    /// The payload of the most recent create or update of an entry.
    pub fn last_entry_payload(&self) -> Option<JournalEntryCreate> {
        lock(&self.state).last_entry_payload.clone()
    }

    fn record(&self, op: &'static str) -> anyhow::Result<()> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        if let Some((status, body)) = lock(&self.failures).get(op) {
            return Err(ApiError::from_response(*status, body).into());
        }
        Ok(())
    }
}

#[async_trait]
impl JournalApi for MockApi {
    async fn login(&self, username: &str, password: &str) -> anyhow::Result<TokenResponse> {
        self.record("login")?;
        let mut state = lock(&self.state);
        let user_id = state
            .users
            .iter()
            .find(|(u, p)| u.username == username && p == password)
            .map(|(u, _)| u.id)
            .ok_or_else(|| detail(401, "Incorrect username or password"))?;
        let token = format!("mock-token-{user_id}");
        state.sessions.insert(token.clone(), user_id);
        Ok(TokenResponse {
            access_token: token,
            token_type: "bearer".into(),
        })
    }

    async fn register(&self, user: &UserCreate) -> anyhow::Result<User> {
        self.record("register")?;
        let mut state = lock(&self.state);
        if state.users.iter().any(|(u, _)| u.username == user.username) {
            return Err(detail(400, "Username already registered"));
        }
        let created = User {
            id: state.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
        };
        state.users.push((created.clone(), user.password.clone()));
        Ok(created)
    }

    async fn current_user(&self) -> anyhow::Result<User> {
        self.record("current_user")?;
        let token = self
            .tokens
            .get()
            .ok_or_else(|| detail(401, "Not authenticated"))?;
        let state = lock(&self.state);
        state
            .sessions
            .get(&token)
            .and_then(|id| state.users.iter().find(|(u, _)| u.id == *id))
            .map(|(u, _)| u.clone())
            .ok_or_else(|| detail(401, "Could not validate credentials"))
    }

    async fn list_classes(&self) -> anyhow::Result<Vec<Class>> {
        self.record("list_classes")?;
        Ok(lock(&self.state).classes.clone())
    }

    async fn create_class(&self, class: &ClassCreate) -> anyhow::Result<Class> {
        self.record("create_class")?;
        let mut state = lock(&self.state);
        if state.classes.iter().any(|c| c.name == class.name) {
            return Err(detail(400, "Class already exists"));
        }
        let created = Class {
            id: state.next_id(),
            name: class.name.clone(),
        };
        state.classes.push(created.clone());
        Ok(created)
    }

    async fn list_classes_with_students(&self) -> anyhow::Result<Vec<ClassWithStudents>> {
        self.record("list_classes_with_students")?;
        let state = lock(&self.state);
        Ok(state
            .classes
            .iter()
            .map(|c| ClassWithStudents {
                id: c.id,
                name: c.name.clone(),
                students: state
                    .students
                    .iter()
                    .filter(|s| s.class_id == c.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn list_students(&self) -> anyhow::Result<Vec<Student>> {
        self.record("list_students")?;
        Ok(lock(&self.state).students.clone())
    }

    async fn create_student(&self, student: &StudentCreate) -> anyhow::Result<Student> {
        self.record("create_student")?;
        let mut state = lock(&self.state);
        let class_name = state
            .class_name(student.class_id)
            .ok_or_else(|| detail(404, "Class not found"))?;
        let created = Student {
            id: state.next_id(),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            class_id: student.class_id,
            class_name: Some(class_name),
            subjects: Vec::new(),
        };
        state.students.push(created.clone());
        Ok(created)
    }

    async fn delete_student(&self, id: Id) -> anyhow::Result<MessageResponse> {
        self.record("delete_student")?;
        let mut state = lock(&self.state);
        let before = state.students.len();
        state.students.retain(|s| s.id != id);
        if state.students.len() == before {
            return Err(detail(404, "Student not found"));
        }
        Ok(MessageResponse {
            message: "Student removed".into(),
        })
    }

    async fn list_subjects(&self) -> anyhow::Result<Vec<Subject>> {
        self.record("list_subjects")?;
        Ok(lock(&self.state).subjects.clone())
    }

    async fn create_subject(&self, subject: &SubjectCreate) -> anyhow::Result<Subject> {
        self.record("create_subject")?;
        let mut state = lock(&self.state);
        let created = Subject {
            id: state.next_id(),
            name: subject.name.clone(),
            teacher_id: state.users.first().map(|(u, _)| u.id),
        };
        state.subjects.push(created.clone());
        Ok(created)
    }

    async fn delete_subject(&self, id: Id) -> anyhow::Result<MessageResponse> {
        self.record("delete_subject")?;
        let mut state = lock(&self.state);
        let before = state.subjects.len();
        state.subjects.retain(|s| s.id != id);
        if state.subjects.len() == before {
            return Err(detail(404, "Subject not found"));
        }
        Ok(MessageResponse {
            message: "Subject deleted".into(),
        })
    }

    async fn list_entries(&self) -> anyhow::Result<Vec<JournalEntry>> {
        self.record("list_entries")?;
        Ok(lock(&self.state).entries.clone())
    }

    async fn get_entry(&self, id: Id) -> anyhow::Result<JournalEntry> {
        self.record("get_entry")?;
        lock(&self.state)
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| detail(404, "Entry not found"))
    }

    async fn create_entry(&self, entry: &JournalEntryCreate) -> anyhow::Result<JournalEntry> {
        self.record("create_entry")?;
        let mut state = lock(&self.state);
        state.last_entry_payload = Some(entry.clone());
        let id = state.next_id();
        let created = state.build_entry(id, entry);
        state.entries.push(created.clone());
        Ok(created)
    }

    async fn update_entry(
        &self,
        id: Id,
        entry: &JournalEntryCreate,
    ) -> anyhow::Result<JournalEntry> {
        self.record("update_entry")?;
        let mut state = lock(&self.state);
        state.last_entry_payload = Some(entry.clone());
        let updated = state.build_entry(id, entry);
        let slot = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| detail(404, "Entry not found"))?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_entry(&self, id: Id) -> anyhow::Result<MessageResponse> {
        self.record("delete_entry")?;
        let mut state = lock(&self.state);
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() == before {
            return Err(detail(404, "Entry not found"));
        }
        Ok(MessageResponse {
            message: "Entry deleted".into(),
        })
    }
}
