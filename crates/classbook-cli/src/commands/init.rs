//! The `classbook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("classbook.toml").exists() {
        println!("classbook.toml already exists, skipping.");
    } else {
        std::fs::write("classbook.toml", SAMPLE_CONFIG)?;
        println!("Created classbook.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set base_url in classbook.toml to your journal server");
    println!("  2. Run: classbook register --username <name> --email <email> --password <password>");
    println!("  3. Run: classbook login --username <name> --password <password>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# classbook configuration

# Journal API server
base_url = "http://localhost:8000"

# Request timeout in seconds
timeout_secs = 30

# Where the access token is kept between runs
token_file = "${HOME}/.config/classbook/session.json"
"#;
