//! Data model types mirrored from the journal REST API.
//!
//! These are flat records; the only behavior they carry is wire shaping
//! (lesson date formats, id-keyed maps) and small display helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the server to every resource.
pub type Id = i64;

/// An authenticated teacher account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
}

/// Registration payload for `POST /auth/register`.
///
/// Note: Custom Debug impl masks the password to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCreate")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Body returned by `POST /auth/token`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .finish()
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCreate {
    pub name: String,
}

/// A class together with its roster, as returned by `GET /classes-with-students`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWithStudents {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl ClassWithStudents {
    /// Whether the student belongs to this class's roster.
    pub fn has_student(&self, student_id: Id) -> bool {
        self.students.iter().any(|s| s.id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub class_id: Id,
    /// Filled in by list endpoints that join the class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Subject names, present on `GET /students`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
}

impl Student {
    /// "Last First", the order rosters are displayed in.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub class_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    /// Owning teacher. Some backend revisions omit it.
    #[serde(default)]
    pub teacher_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCreate {
    pub name: String,
}

/// Presence of a student at a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" | "p" => Ok(AttendanceStatus::Present),
            "absent" | "a" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// A grade and/or comment for one student in one lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl GradeInfo {
    pub fn is_empty(&self) -> bool {
        self.grade.is_none() && self.comment.is_none()
    }
}

/// Student id → attendance status.
pub type AttendanceMap = BTreeMap<Id, AttendanceStatus>;

/// Student id → grade.
pub type GradeMap = BTreeMap<Id, GradeInfo>;

/// One lesson record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Id,
    pub subject_id: Id,
    pub class_id: Id,
    #[serde(with = "lesson_date")]
    pub date: NaiveDateTime,
    pub topic: String,
    pub homework: String,
    #[serde(default)]
    pub attendance: AttendanceMap,
    #[serde(default)]
    pub grades: GradeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl JournalEntry {
    /// The full-replace payload that recreates this entry.
    pub fn to_create(&self) -> JournalEntryCreate {
        JournalEntryCreate {
            subject_id: self.subject_id,
            class_id: self.class_id,
            date: self.date,
            topic: self.topic.clone(),
            homework: self.homework.clone(),
            attendance: self.attendance.clone(),
            grades: self.grades.clone(),
        }
    }

    /// Count of students marked present.
    pub fn present_count(&self) -> usize {
        self.attendance
            .values()
            .filter(|s| **s == AttendanceStatus::Present)
            .count()
    }
}

/// Payload for `POST /entries` and `PUT /entries/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryCreate {
    pub subject_id: Id,
    pub class_id: Id,
    #[serde(with = "lesson_date")]
    pub date: NaiveDateTime,
    pub topic: String,
    pub homework: String,
    pub attendance: AttendanceMap,
    pub grades: GradeMap,
}

/// Body returned by delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Formats accepted for lesson dates, tried in order.
const LESSON_DATE_INPUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const LESSON_DATE_OUTPUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a lesson date from user input or an API payload. Timestamps with a
/// UTC offset keep their wall-clock time.
pub fn parse_lesson_date(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    LESSON_DATE_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_local()))
        .ok_or_else(|| format!("unrecognized lesson date: '{s}' (expected YYYY-MM-DDTHH:MM)"))
}

/// Render a lesson date the way the API expects it.
pub fn format_lesson_date(date: &NaiveDateTime) -> String {
    date.format(LESSON_DATE_OUTPUT).to_string()
}

mod lesson_date {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_lesson_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_lesson_date(&raw).map_err(serde::de::Error::custom)
    }
}
