//! The `classbook entries` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use comfy_table::{Cell, Table};

use classbook_core::error::user_message;
use classbook_core::form::EntryForm;
use classbook_core::model::{parse_lesson_date, AttendanceStatus, Id, JournalEntry, Subject};
use classbook_core::services::{ClassService, EntryService, SubjectService};
use classbook_core::views::{JournalPage, Removal};

use super::{check_banner, print_json, App, OutputFormat, PromptConfirm};
use crate::{EntryAction, EntryArgs};

pub async fn execute(config: Option<PathBuf>, format: OutputFormat, action: EntryAction) -> Result<()> {
    let app = App::signed_in(config, format).await?;
    let mut page = JournalPage::new(app.api.clone());

    match action {
        EntryAction::List => {
            page.load().await;
            check_banner(page.banner())?;
            match app.format {
                OutputFormat::Json => print_json(page.entries())?,
                OutputFormat::Table => match page.empty_message() {
                    Some(msg) => println!("{msg}"),
                    None => print_entries(page.entries(), page.subjects()),
                },
            }
        }
        EntryAction::Show { id } => show(&app, id).await?,
        EntryAction::Create { fields } => {
            page.load().await;
            check_banner(page.banner())?;
            page.open_create().await;
            check_banner(page.banner())?;
            apply(page.form_mut(), &fields)?;
            let entry = submit(&mut page).await?;
            println!("Created entry {} ({})", entry.id, entry.topic);
        }
        EntryAction::Update { id, fields } => {
            page.load().await;
            check_banner(page.banner())?;
            if !page.open_edit(id).await {
                check_banner(page.banner())?;
                anyhow::bail!("Entry not found");
            }
            apply(page.form_mut(), &fields)?;
            let entry = submit(&mut page).await?;
            println!("Updated entry {} ({})", entry.id, entry.topic);
        }
        EntryAction::Delete { id, yes } => {
            let confirm = PromptConfirm { assume_yes: yes };
            match page.delete_entry(id, &confirm).await {
                Removal::Removed => println!("Deleted entry {id}"),
                Removal::Cancelled => println!("Cancelled."),
                Removal::Failed => check_banner(page.banner())?,
            }
        }
    }

    Ok(())
}

async fn submit(page: &mut JournalPage) -> Result<JournalEntry> {
    match page.submit_form().await {
        Ok(entry) => Ok(entry),
        Err(e) => {
            check_banner(page.banner())?;
            Err(e.into())
        }
    }
}

/// Copy command-line fields into the open form. Fields left out keep the
/// draft's current value.
fn apply(form: &mut EntryForm, fields: &EntryArgs) -> Result<()> {
    if let Some(subject_id) = fields.subject {
        form.select_subject(subject_id)?;
    }
    if let Some(class_id) = fields.class {
        if form.draft().class_id != Some(class_id) {
            form.select_class(class_id)?;
        }
    }
    if let Some(date) = &fields.date {
        let date = parse_lesson_date(date).map_err(anyhow::Error::msg)?;
        form.set_date(date)?;
    }
    if let Some(topic) = &fields.topic {
        form.set_topic(topic)?;
    }
    if let Some(homework) = &fields.homework {
        form.set_homework(homework)?;
    }

    if fields.all_present {
        form.mark_all(AttendanceStatus::Present)?;
    }
    for id in &fields.present {
        form.mark_attendance(*id, AttendanceStatus::Present)?;
    }
    for id in &fields.absent {
        form.mark_attendance(*id, AttendanceStatus::Absent)?;
    }

    for pair in &fields.grade {
        let (id, grade) = parse_pair(pair)?;
        let mut info = form.draft().grades.get(&id).cloned().unwrap_or_default();
        info.grade = (!grade.is_empty()).then_some(grade);
        form.set_grade(id, info)?;
    }
    for pair in &fields.comment {
        let (id, comment) = parse_pair(pair)?;
        let mut info = form.draft().grades.get(&id).cloned().unwrap_or_default();
        info.comment = (!comment.is_empty()).then_some(comment);
        form.set_grade(id, info)?;
    }

    Ok(())
}

/// Parse `STUDENT_ID=VALUE`.
fn parse_pair(s: &str) -> Result<(Id, String)> {
    let (id, value) = s
        .split_once('=')
        .with_context(|| format!("expected STUDENT_ID=VALUE, got '{s}'"))?;
    let id = id
        .trim()
        .parse()
        .with_context(|| format!("invalid student id in '{s}'"))?;
    Ok((id, value.trim().to_string()))
}

fn lesson_time(date: &NaiveDateTime) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}

fn subject_name(entry: &JournalEntry, subjects: &[Subject]) -> String {
    entry
        .subject_name
        .clone()
        .or_else(|| {
            subjects
                .iter()
                .find(|s| s.id == entry.subject_id)
                .map(|s| s.name.clone())
        })
        .unwrap_or_else(|| entry.subject_id.to_string())
}

fn print_entries(entries: &[JournalEntry], subjects: &[Subject]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Subject", "Class", "Topic", "Present"]);
    for entry in entries {
        let class = entry
            .class_name
            .clone()
            .unwrap_or_else(|| entry.class_id.to_string());
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(lesson_time(&entry.date)),
            Cell::new(subject_name(entry, subjects)),
            Cell::new(class),
            Cell::new(&entry.topic),
            Cell::new(format!("{}/{}", entry.present_count(), entry.attendance.len())),
        ]);
    }
    println!("{table}");
}

async fn show(app: &App, id: Id) -> Result<()> {
    let entry = match EntryService::new(app.api.clone()).get(id).await {
        Ok(entry) => entry,
        Err(e) => anyhow::bail!("{}", user_message(&e, "Entry not found")),
    };

    if app.format == OutputFormat::Json {
        return print_json(&entry);
    }

    let subjects = SubjectService::new(app.api.clone())
        .list()
        .await
        .unwrap_or_default();
    let classes = ClassService::new(app.api.clone())
        .list_with_students()
        .await
        .unwrap_or_default();
    let class = classes.iter().find(|c| c.id == entry.class_id);

    println!("Entry {}", entry.id);
    println!("  Date:     {}", lesson_time(&entry.date));
    println!("  Subject:  {}", subject_name(&entry, &subjects));
    println!(
        "  Class:    {}",
        class
            .map(|c| c.name.clone())
            .or_else(|| entry.class_name.clone())
            .unwrap_or_else(|| entry.class_id.to_string())
    );
    println!("  Topic:    {}", entry.topic);
    println!("  Homework: {}", entry.homework);
    println!();

    let mut table = Table::new();
    table.set_header(vec!["Student", "Attendance", "Grade", "Comment"]);
    for (student_id, status) in &entry.attendance {
        let name = class
            .and_then(|c| c.students.iter().find(|s| s.id == *student_id))
            .map(|s| s.display_name())
            .unwrap_or_else(|| format!("#{student_id}"));
        let grade = entry.grades.get(student_id);
        table.add_row(vec![
            Cell::new(name),
            Cell::new(status),
            Cell::new(grade.and_then(|g| g.grade.as_deref()).unwrap_or("")),
            Cell::new(grade.and_then(|g| g.comment.as_deref()).unwrap_or("")),
        ]);
    }
    println!("{table}");

    Ok(())
}
