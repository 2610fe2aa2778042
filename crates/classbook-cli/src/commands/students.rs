//! The `classbook students` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use classbook_core::model::StudentCreate;
use classbook_core::views::{Removal, StudentManager};

use super::{check_banner, print_json, App, OutputFormat, PromptConfirm};
use crate::StudentAction;

pub async fn execute(
    config: Option<PathBuf>,
    format: OutputFormat,
    action: StudentAction,
) -> Result<()> {
    let app = App::signed_in(config, format).await?;
    let mut view = StudentManager::new(app.api.clone());

    match action {
        StudentAction::List => {
            view.load().await;
            check_banner(view.banner())?;
            match app.format {
                OutputFormat::Json => print_json(view.students())?,
                OutputFormat::Table => match view.empty_message() {
                    Some(msg) => println!("{msg}"),
                    None => {
                        let mut table = Table::new();
                        table.set_header(vec!["ID", "Name", "Email", "Class", "Subjects"]);
                        for s in view.students() {
                            let class = s
                                .class_name
                                .clone()
                                .unwrap_or_else(|| s.class_id.to_string());
                            table.add_row(vec![
                                Cell::new(s.id),
                                Cell::new(s.display_name()),
                                Cell::new(&s.email),
                                Cell::new(class),
                                Cell::new(s.subjects.join(", ")),
                            ]);
                        }
                        println!("{table}");
                    }
                },
            }
        }
        StudentAction::Add { class_id, student } => {
            let added = view
                .add(&StudentCreate {
                    first_name: student.first_name.clone(),
                    last_name: student.last_name.clone(),
                    email: student.email,
                    class_id,
                })
                .await;
            check_banner(view.banner())?;
            if added {
                println!("Added {} {}", student.first_name, student.last_name);
            }
        }
        StudentAction::Remove { id, yes } => {
            let confirm = PromptConfirm { assume_yes: yes };
            match view.remove(id, &confirm).await {
                Removal::Removed => println!("Removed student {id}"),
                Removal::Cancelled => println!("Cancelled."),
                Removal::Failed => check_banner(view.banner())?,
            }
        }
    }

    Ok(())
}
