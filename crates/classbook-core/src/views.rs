//! List/detail view state.
//!
//! Each view fetches on [`load`](ClassManager::load), re-fetches after every
//! successful mutation, and reports failures through its own dismissible
//! [`Banner`]. Rendering is left to the front end.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error};

use crate::error::{user_message, SubmitError};
use crate::form::EntryForm;
use crate::model::{ClassWithStudents, Id, JournalEntry, Student, StudentCreate, Subject};
use crate::services::{ClassService, EntryService, StudentService, SubjectService};
use crate::traits::JournalApi;

/// A dismissible error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Banner {
    message: Option<String>,
}

impl Banner {
    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn dismiss(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Outcome of a confirm-guarded removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Cancelled,
    Failed,
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

pub struct ClassManager {
    service: ClassService,
    classes: Vec<ClassWithStudents>,
    banner: Banner,
}

impl ClassManager {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self {
            service: ClassService::new(api),
            classes: Vec::new(),
            banner: Banner::default(),
        }
    }

    pub fn classes(&self) -> &[ClassWithStudents] {
        &self.classes
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn banner_mut(&mut self) -> &mut Banner {
        &mut self.banner
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.classes
            .is_empty()
            .then_some("No classes yet. Create the first one.")
    }

    pub async fn load(&mut self) {
        match self.service.list_with_students().await {
            Ok(classes) => self.classes = classes,
            Err(e) => {
                error!("failed to load classes: {e:#}");
                self.banner.show("Failed to load classes");
                self.classes.clear();
            }
        }
    }

    /// Create a class and reload. Blank names are ignored.
    pub async fn create_class(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.service.create(name).await {
            Ok(class) => {
                debug!(id = class.id, "class created");
                self.load().await;
                true
            }
            Err(e) => {
                self.banner
                    .show(user_message(&e, "Failed to create class"));
                false
            }
        }
    }

    /// Add a student to `class_id` and reload.
    pub async fn add_student(&mut self, class_id: Id, student: StudentCreate) -> bool {
        if class_id == 0 {
            return false;
        }
        match self.service.add_student(class_id, student).await {
            Ok(_) => {
                self.load().await;
                true
            }
            Err(e) => {
                self.banner.show(user_message(&e, "Failed to add student"));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

pub struct StudentManager {
    service: StudentService,
    students: Vec<Student>,
    banner: Banner,
}

impl StudentManager {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self {
            service: StudentService::new(api),
            students: Vec::new(),
            banner: Banner::default(),
        }
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.students
            .is_empty()
            .then_some("No students yet. Add students to your classes.")
    }

    pub async fn load(&mut self) {
        match self.service.list().await {
            Ok(students) => self.students = students,
            Err(e) => {
                error!("failed to load students: {e:#}");
                self.banner.show("Failed to load students");
            }
        }
    }

    pub async fn add(&mut self, student: &StudentCreate) -> bool {
        match self.service.create(student).await {
            Ok(_) => {
                self.load().await;
                true
            }
            Err(e) => {
                self.banner.show(user_message(&e, "Failed to add student"));
                false
            }
        }
    }

    /// Remove a student after explicit confirmation.
    pub async fn remove(&mut self, student_id: Id, confirm: &dyn Confirm) -> Removal {
        if !confirm.confirm("Remove this student from your class?") {
            return Removal::Cancelled;
        }
        match self.service.remove(student_id).await {
            Ok(_) => {
                self.load().await;
                Removal::Removed
            }
            Err(e) => {
                error!(student_id, "failed to remove student: {e:#}");
                self.banner.show("Failed to remove student");
                Removal::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

pub struct SubjectManager {
    service: SubjectService,
    subjects: Vec<Subject>,
    banner: Banner,
}

impl SubjectManager {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self {
            service: SubjectService::new(api),
            subjects: Vec::new(),
            banner: Banner::default(),
        }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.subjects
            .is_empty()
            .then_some("No subjects yet. Add the subjects you teach.")
    }

    pub async fn load(&mut self) {
        match self.service.list().await {
            Ok(subjects) => self.subjects = subjects,
            Err(e) => {
                error!("failed to load subjects: {e:#}");
                self.banner.show("Failed to load subjects");
            }
        }
    }

    /// Create a subject and reload. Blank names are ignored.
    pub async fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.service.create(name).await {
            Ok(_) => {
                self.load().await;
                true
            }
            Err(e) => {
                self.banner
                    .show(user_message(&e, "Failed to create subject"));
                false
            }
        }
    }

    /// Delete a subject after explicit confirmation.
    pub async fn remove(&mut self, subject_id: Id, confirm: &dyn Confirm) -> Removal {
        if !confirm.confirm("Delete this subject?") {
            return Removal::Cancelled;
        }
        match self.service.remove(subject_id).await {
            Ok(_) => {
                self.load().await;
                Removal::Removed
            }
            Err(e) => {
                self.banner
                    .show(user_message(&e, "Failed to delete subject"));
                Removal::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Journal page
// ---------------------------------------------------------------------------

/// Tabs of the journal page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalTab {
    #[default]
    Entries,
    Classes,
    Students,
    Subjects,
}

pub struct JournalPage {
    api: Arc<dyn JournalApi>,
    entries_service: EntryService,
    subjects_service: SubjectService,
    classes_service: ClassService,
    entries: Vec<JournalEntry>,
    subjects: Vec<Subject>,
    form: EntryForm,
    tab: JournalTab,
    loading: bool,
    banner: Banner,
}

impl JournalPage {
    pub fn new(api: Arc<dyn JournalApi>) -> Self {
        Self {
            entries_service: EntryService::new(api.clone()),
            subjects_service: SubjectService::new(api.clone()),
            classes_service: ClassService::new(api.clone()),
            api,
            entries: Vec::new(),
            subjects: Vec::new(),
            form: EntryForm::new(),
            tab: JournalTab::default(),
            loading: false,
            banner: Banner::default(),
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EntryForm {
        &mut self.form
    }

    pub fn tab(&self) -> JournalTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: JournalTab) {
        self.tab = tab;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn banner_mut(&mut self) -> &mut Banner {
        &mut self.banner
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.entries
            .is_empty()
            .then_some("No journal entries yet. Add the first lesson.")
    }

    /// Fetch entries and subjects together.
    pub async fn load(&mut self) {
        self.loading = true;
        let loaded = futures::try_join!(self.entries_service.list(), self.subjects_service.list());
        match loaded {
            Ok((entries, subjects)) => {
                self.entries = entries;
                self.subjects = subjects;
            }
            Err(e) => {
                error!("failed to load journal: {e:#}");
                self.banner.show("Failed to load data");
            }
        }
        self.loading = false;
    }

    async fn form_classes(&self) -> Result<Vec<ClassWithStudents>> {
        self.classes_service.list_with_students().await
    }

    /// Open the entry form for a new lesson.
    pub async fn open_create(&mut self) {
        match self.form_classes().await {
            Ok(classes) => self.form.open_create(self.subjects.clone(), classes),
            Err(e) => {
                error!("failed to load classes for entry form: {e:#}");
                self.banner.show("Failed to load classes");
            }
        }
    }

    /// Open the entry form prefilled from entry `entry_id`.
    pub async fn open_edit(&mut self, entry_id: Id) -> bool {
        let entry = match self.entries.iter().find(|e| e.id == entry_id) {
            Some(e) => e.clone(),
            None => match self.entries_service.get(entry_id).await {
                Ok(e) => e,
                Err(e) => {
                    self.banner.show(user_message(&e, "Entry not found"));
                    return false;
                }
            },
        };
        match self.form_classes().await {
            Ok(classes) => {
                self.form.open_edit(&entry, self.subjects.clone(), classes);
                true
            }
            Err(e) => {
                error!("failed to load classes for entry form: {e:#}");
                self.banner.show("Failed to load classes");
                false
            }
        }
    }

    /// Submit the open form and reload on success. The form keeps its own
    /// error message; the page banner mirrors it.
    pub async fn submit_form(&mut self) -> Result<JournalEntry, SubmitError> {
        let result = self.form.submit(self.api.as_ref()).await;
        match &result {
            Ok(_) => {
                self.banner.dismiss();
                self.load().await;
            }
            Err(_) => {
                if let Some(msg) = self.form.error() {
                    self.banner.show(msg);
                }
            }
        }
        result
    }

    /// Delete an entry after explicit confirmation.
    pub async fn delete_entry(&mut self, entry_id: Id, confirm: &dyn Confirm) -> Removal {
        if !confirm.confirm("Delete this journal entry?") {
            return Removal::Cancelled;
        }
        match self.entries_service.remove(entry_id).await {
            Ok(_) => {
                self.load().await;
                Removal::Removed
            }
            Err(e) => {
                self.banner.show(user_message(&e, "Failed to delete entry"));
                Removal::Failed
            }
        }
    }
}
