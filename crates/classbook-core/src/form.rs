//! Journal entry form.
//!
//! A client-side state machine around one lesson record:
//!
//! ```text
//! Closed ──open_create/open_edit──▶ Open(mode) ──begin_submit──▶ Submitting(mode)
//!    ▲                                  ▲                               │
//!    └────────────── success ───────────┼───────────────────────────────┤
//!                                       └────────── failure ────────────┘
//! ```
//!
//! Submission is guarded: subject, class, topic, homework and date must be
//! set, and every student on the selected class's roster must have an
//! attendance mark. A rejected submission never reaches the network.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{user_message, FormError, SubmitError};
use crate::model::{
    AttendanceMap, AttendanceStatus, ClassWithStudents, GradeInfo, GradeMap, Id, JournalEntry,
    JournalEntryCreate, Student, Subject,
};
use crate::traits::JournalApi;

/// Whether the form creates a new entry or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Closed,
    Open(FormMode),
    Submitting(FormMode),
}

/// Field values being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub subject_id: Option<Id>,
    pub class_id: Option<Id>,
    pub date: Option<NaiveDateTime>,
    pub topic: String,
    pub homework: String,
    pub attendance: AttendanceMap,
    pub grades: GradeMap,
}

impl EntryDraft {
    fn from_entry(entry: &JournalEntry) -> Self {
        Self {
            subject_id: selected(entry.subject_id),
            class_id: selected(entry.class_id),
            date: Some(entry.date),
            topic: entry.topic.clone(),
            homework: entry.homework.clone(),
            attendance: entry.attendance.clone(),
            grades: entry.grades.clone(),
        }
    }
}

/// Id `0` is the "nothing selected" placeholder of a select box.
fn selected(id: Id) -> Option<Id> {
    (id != 0).then_some(id)
}

/// A payload that passed validation, with where it should go.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub mode: FormMode,
    pub payload: JournalEntryCreate,
}

pub struct EntryForm {
    state: FormState,
    draft: EntryDraft,
    subjects: Vec<Subject>,
    classes: Vec<ClassWithStudents>,
    error: Option<String>,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryForm {
    pub fn new() -> Self {
        Self {
            state: FormState::Closed,
            draft: EntryDraft::default(),
            subjects: Vec::new(),
            classes: Vec::new(),
            error: None,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, FormState::Closed)
    }

    pub fn draft(&self) -> &EntryDraft {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn classes(&self) -> &[ClassWithStudents] {
        &self.classes
    }

    /// Open an empty form. The first subject is preselected.
    pub fn open_create(&mut self, subjects: Vec<Subject>, classes: Vec<ClassWithStudents>) {
        self.draft = EntryDraft {
            subject_id: subjects.first().map(|s| s.id),
            ..EntryDraft::default()
        };
        self.subjects = subjects;
        self.classes = classes;
        self.error = None;
        self.state = FormState::Open(FormMode::Create);
    }

    /// Open the form prefilled from an existing entry. Marks and grades for
    /// students no longer on the class roster are dropped.
    pub fn open_edit(
        &mut self,
        entry: &JournalEntry,
        subjects: Vec<Subject>,
        classes: Vec<ClassWithStudents>,
    ) {
        self.draft = EntryDraft::from_entry(entry);
        self.subjects = subjects;
        self.classes = classes;
        if let Some(class) = self.selected_class() {
            let stale: Vec<Id> = self
                .draft
                .attendance
                .keys()
                .chain(self.draft.grades.keys())
                .filter(|id| !class.has_student(**id))
                .copied()
                .collect();
            if !stale.is_empty() {
                debug!(?stale, "dropping marks for students no longer on the roster");
            }
            for id in stale {
                self.draft.attendance.remove(&id);
                self.draft.grades.remove(&id);
            }
        }
        self.error = None;
        self.state = FormState::Open(FormMode::Edit(entry.id));
    }

    /// Discard the draft.
    pub fn close(&mut self) {
        self.state = FormState::Closed;
        self.draft = EntryDraft::default();
        self.error = None;
    }

    fn ensure_editable(&self) -> Result<(), FormError> {
        match self.state {
            FormState::Open(_) => Ok(()),
            FormState::Closed => Err(FormError::NotOpen),
            FormState::Submitting(_) => Err(FormError::AlreadySubmitting),
        }
    }

    /// The selected class, if it is one of the loaded classes.
    pub fn selected_class(&self) -> Option<&ClassWithStudents> {
        let id = self.draft.class_id?;
        self.classes.iter().find(|c| c.id == id)
    }

    /// Students of the selected class, in server order.
    pub fn roster(&self) -> &[Student] {
        self.selected_class()
            .map(|c| c.students.as_slice())
            .unwrap_or(&[])
    }

    /// Marked students vs. roster size.
    pub fn attendance_progress(&self) -> (usize, usize) {
        let roster = self.roster();
        let marked = roster
            .iter()
            .filter(|s| self.draft.attendance.contains_key(&s.id))
            .count();
        (marked, roster.len())
    }

    pub fn select_subject(&mut self, subject_id: Id) -> Result<(), FormError> {
        self.ensure_editable()?;
        if subject_id != 0 && !self.subjects.iter().any(|s| s.id == subject_id) {
            return Err(FormError::UnknownSubject(subject_id));
        }
        self.draft.subject_id = selected(subject_id);
        Ok(())
    }

    /// Select a class. Attendance and grades are reset, since they belong
    /// to the previous roster.
    pub fn select_class(&mut self, class_id: Id) -> Result<(), FormError> {
        self.ensure_editable()?;
        if class_id != 0 && !self.classes.iter().any(|c| c.id == class_id) {
            return Err(FormError::UnknownClass(class_id));
        }
        self.draft.class_id = selected(class_id);
        self.draft.attendance.clear();
        self.draft.grades.clear();
        Ok(())
    }

    pub fn set_date(&mut self, date: NaiveDateTime) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.date = Some(date);
        Ok(())
    }

    pub fn set_topic(&mut self, topic: &str) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.topic = topic.to_string();
        Ok(())
    }

    pub fn set_homework(&mut self, homework: &str) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.homework = homework.to_string();
        Ok(())
    }

    fn ensure_on_roster(&self, student_id: Id) -> Result<(), FormError> {
        let class = self.selected_class().ok_or(FormError::ClassMissing)?;
        if class.has_student(student_id) {
            Ok(())
        } else {
            Err(FormError::NotOnRoster(student_id))
        }
    }

    pub fn mark_attendance(
        &mut self,
        student_id: Id,
        status: AttendanceStatus,
    ) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.ensure_on_roster(student_id)?;
        self.draft.attendance.insert(student_id, status);
        Ok(())
    }

    /// Mark every student on the roster with the same status.
    pub fn mark_all(&mut self, status: AttendanceStatus) -> Result<(), FormError> {
        self.ensure_editable()?;
        let ids: Vec<Id> = self.roster().iter().map(|s| s.id).collect();
        if self.draft.class_id.is_none() {
            return Err(FormError::ClassMissing);
        }
        for id in ids {
            self.draft.attendance.insert(id, status);
        }
        Ok(())
    }

    /// Set or clear (when empty) a student's grade.
    pub fn set_grade(&mut self, student_id: Id, grade: GradeInfo) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.ensure_on_roster(student_id)?;
        if grade.is_empty() {
            self.draft.grades.remove(&student_id);
        } else {
            self.draft.grades.insert(student_id, grade);
        }
        Ok(())
    }

    /// Check the guards and build the payload. Does not change state.
    pub fn validate(&self) -> Result<JournalEntryCreate, FormError> {
        self.ensure_editable()?;
        let draft = &self.draft;

        let subject_id = draft.subject_id.ok_or(FormError::SubjectMissing)?;
        let class_id = draft.class_id.ok_or(FormError::ClassMissing)?;
        if draft.topic.trim().is_empty() {
            return Err(FormError::TopicEmpty);
        }
        if draft.homework.trim().is_empty() {
            return Err(FormError::HomeworkEmpty);
        }
        let date = draft.date.ok_or(FormError::DateMissing)?;

        let class = self
            .selected_class()
            .ok_or(FormError::UnknownClass(class_id))?;
        let (marked, roster) = self.attendance_progress();
        if marked != roster {
            return Err(FormError::AttendanceIncomplete { marked, roster });
        }
        if let Some(stray) = draft
            .attendance
            .keys()
            .find(|id| !class.has_student(**id))
        {
            return Err(FormError::NotOnRoster(*stray));
        }

        Ok(JournalEntryCreate {
            subject_id,
            class_id,
            date,
            topic: draft.topic.trim().to_string(),
            homework: draft.homework.trim().to_string(),
            attendance: draft.attendance.clone(),
            grades: draft
                .grades
                .iter()
                .filter(|(id, _)| class.has_student(**id))
                .map(|(id, g)| (*id, g.clone()))
                .collect(),
        })
    }

    /// Validate and move to `Submitting`. On rejection the error banner is set
    /// and the form stays open.
    pub fn begin_submit(&mut self) -> Result<Submission, FormError> {
        let mode = match self.state {
            FormState::Open(mode) => mode,
            FormState::Closed => return Err(FormError::NotOpen),
            FormState::Submitting(_) => return Err(FormError::AlreadySubmitting),
        };
        match self.validate() {
            Ok(payload) => {
                self.error = None;
                self.state = FormState::Submitting(mode);
                Ok(Submission { mode, payload })
            }
            Err(e) => {
                debug!("entry form rejected: {e}");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Close after a successful request.
    pub fn complete_submit(&mut self) {
        if matches!(self.state, FormState::Submitting(_)) {
            self.close();
        }
    }

    /// Reopen after a failed request, keeping the draft.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        if let FormState::Submitting(mode) = self.state {
            self.state = FormState::Open(mode);
        }
        self.error = Some(message.into());
    }

    /// Run the whole submission against `api`: guard, create or update, then
    /// close on success or reopen with the server's message on failure.
    pub async fn submit(&mut self, api: &dyn JournalApi) -> Result<JournalEntry, SubmitError> {
        let submission = self.begin_submit()?;
        let result = match submission.mode {
            FormMode::Create => api.create_entry(&submission.payload).await,
            FormMode::Edit(id) => api.update_entry(id, &submission.payload).await,
        };
        match result {
            Ok(entry) => {
                self.complete_submit();
                Ok(entry)
            }
            Err(e) => {
                let fallback = match submission.mode {
                    FormMode::Create => "Failed to create entry",
                    FormMode::Edit(_) => "Failed to update entry",
                };
                self.fail_submit(user_message(&e, fallback));
                Err(SubmitError::Api(e))
            }
        }
    }
}
