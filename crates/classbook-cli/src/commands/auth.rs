//! The `classbook login`, `register`, `logout` and `whoami` commands.

use std::path::PathBuf;

use anyhow::Result;

use classbook_core::model::UserCreate;

use super::{print_json, App, OutputFormat};

pub async fn login(config: Option<PathBuf>, username: String, password: String) -> Result<()> {
    let mut app = App::connect(config, OutputFormat::Table)?;
    let outcome = app.session.login(&username, &password).await;
    if !outcome.success {
        anyhow::bail!(
            "{}",
            outcome.error.unwrap_or_else(|| "Login failed".to_string())
        );
    }
    match app.session.user() {
        Some(user) => println!("Logged in as {} <{}>", user.username, user.email),
        None => println!("Logged in."),
    }
    Ok(())
}

pub async fn register(
    config: Option<PathBuf>,
    username: String,
    email: String,
    password: String,
) -> Result<()> {
    let mut app = App::connect(config, OutputFormat::Table)?;
    let outcome = app
        .session
        .register(&UserCreate {
            username: username.clone(),
            email,
            password,
        })
        .await;
    if !outcome.success {
        anyhow::bail!(
            "{}",
            outcome
                .error
                .unwrap_or_else(|| "Registration failed".to_string())
        );
    }
    println!("Registered {username}. Run `classbook login` to sign in.");
    Ok(())
}

pub fn logout(config: Option<PathBuf>) -> Result<()> {
    let mut app = App::connect(config, OutputFormat::Table)?;
    app.session.logout();
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(config: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let app = App::signed_in(config, format).await?;
    if let Some(user) = app.session.user() {
        match app.format {
            OutputFormat::Json => print_json(user)?,
            OutputFormat::Table => println!("{} <{}> (id {})", user.username, user.email, user.id),
        }
    }
    Ok(())
}
