//! The `classbook subjects` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use classbook_core::views::{Removal, SubjectManager};

use super::{check_banner, print_json, App, OutputFormat, PromptConfirm};
use crate::SubjectAction;

pub async fn execute(
    config: Option<PathBuf>,
    format: OutputFormat,
    action: SubjectAction,
) -> Result<()> {
    let app = App::signed_in(config, format).await?;
    let mut view = SubjectManager::new(app.api.clone());

    match action {
        SubjectAction::List => {
            view.load().await;
            check_banner(view.banner())?;
            match app.format {
                OutputFormat::Json => print_json(view.subjects())?,
                OutputFormat::Table => match view.empty_message() {
                    Some(msg) => println!("{msg}"),
                    None => {
                        let mut table = Table::new();
                        table.set_header(vec!["ID", "Subject"]);
                        for s in view.subjects() {
                            table.add_row(vec![Cell::new(s.id), Cell::new(&s.name)]);
                        }
                        println!("{table}");
                    }
                },
            }
        }
        SubjectAction::Add { name } => {
            if name.trim().is_empty() {
                anyhow::bail!("subject name must not be empty");
            }
            view.add(&name).await;
            check_banner(view.banner())?;
            println!("Added subject {}", name.trim());
        }
        SubjectAction::Remove { id, yes } => {
            let confirm = PromptConfirm { assume_yes: yes };
            match view.remove(id, &confirm).await {
                Removal::Removed => println!("Deleted subject {id}"),
                Removal::Cancelled => println!("Cancelled."),
                Removal::Failed => check_banner(view.banner())?,
            }
        }
    }

    Ok(())
}
