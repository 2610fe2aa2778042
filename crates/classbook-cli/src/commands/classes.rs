//! The `classbook classes` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use classbook_core::model::{ClassWithStudents, StudentCreate};
use classbook_core::views::ClassManager;

use super::{check_banner, print_json, App, OutputFormat};
use crate::ClassAction;

pub async fn execute(config: Option<PathBuf>, format: OutputFormat, action: ClassAction) -> Result<()> {
    let app = App::signed_in(config, format).await?;
    let mut view = ClassManager::new(app.api.clone());

    match action {
        ClassAction::List { roster } => {
            view.load().await;
            check_banner(view.banner())?;
            match app.format {
                OutputFormat::Json => print_json(view.classes())?,
                OutputFormat::Table => match view.empty_message() {
                    Some(msg) => println!("{msg}"),
                    None => print_classes(view.classes(), roster),
                },
            }
        }
        ClassAction::Create { name } => {
            if name.trim().is_empty() {
                anyhow::bail!("class name must not be empty");
            }
            view.create_class(&name).await;
            check_banner(view.banner())?;
            let created = view.classes().iter().find(|c| c.name == name.trim());
            match created {
                Some(c) => println!("Created class {} (id {})", c.name, c.id),
                None => println!("Created class {}", name.trim()),
            }
        }
        ClassAction::AddStudent { class_id, student } => {
            let added = view
                .add_student(
                    class_id,
                    StudentCreate {
                        first_name: student.first_name.clone(),
                        last_name: student.last_name.clone(),
                        email: student.email,
                        class_id,
                    },
                )
                .await;
            check_banner(view.banner())?;
            if !added {
                anyhow::bail!("select a class");
            }
            println!(
                "Added {} {} to class {class_id}",
                student.first_name, student.last_name
            );
        }
    }

    Ok(())
}

fn print_classes(classes: &[ClassWithStudents], roster: bool) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Class", "Students"]);
    for class in classes {
        table.add_row(vec![
            Cell::new(class.id),
            Cell::new(&class.name),
            Cell::new(class.students.len()),
        ]);
    }
    println!("{table}");

    if roster {
        for class in classes {
            println!("\n{} ({} students)", class.name, class.students.len());
            if class.students.is_empty() {
                println!("  No students in this class yet.");
            }
            for s in &class.students {
                println!("  [{}] {} <{}>", s.id, s.display_name(), s.email);
            }
        }
    }
}
