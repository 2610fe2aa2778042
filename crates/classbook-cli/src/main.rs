//! classbook CLI: a teacher's class journal from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "classbook", version, about = "Class journal for teachers")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for listings: table, json
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter classbook.toml
    Init,

    /// Sign in and store the access token
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Create a teacher account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Forget the stored access token
    Logout,

    /// Show the signed-in teacher
    Whoami,

    /// Manage classes and their rosters
    Classes {
        #[command(subcommand)]
        action: ClassAction,
    },

    /// Manage students
    Students {
        #[command(subcommand)]
        action: StudentAction,
    },

    /// Manage subjects
    Subjects {
        #[command(subcommand)]
        action: SubjectAction,
    },

    /// Manage journal entries
    Entries {
        #[command(subcommand)]
        action: EntryAction,
    },
}

#[derive(Subcommand)]
pub enum ClassAction {
    /// List classes with their rosters
    List {
        /// Print every student of every class
        #[arg(long)]
        roster: bool,
    },

    /// Create a class
    Create {
        #[arg(long)]
        name: String,
    },

    /// Add a student to a class
    AddStudent {
        #[arg(long)]
        class_id: i64,

        #[command(flatten)]
        student: StudentArgs,
    },
}

#[derive(Subcommand)]
pub enum StudentAction {
    /// List all students
    List,

    /// Add a student
    Add {
        #[arg(long)]
        class_id: i64,

        #[command(flatten)]
        student: StudentArgs,
    },

    /// Remove a student
    Remove {
        #[arg(long)]
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct StudentArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,
}

#[derive(Subcommand)]
pub enum SubjectAction {
    /// List your subjects
    List,

    /// Add a subject
    Add {
        #[arg(long)]
        name: String,
    },

    /// Delete a subject
    Remove {
        #[arg(long)]
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum EntryAction {
    /// List journal entries
    List,

    /// Show one entry with its attendance and grades
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Record a lesson
    Create {
        #[command(flatten)]
        fields: EntryArgs,
    },

    /// Replace an existing entry; omitted fields keep their values
    Update {
        #[arg(long)]
        id: i64,

        #[command(flatten)]
        fields: EntryArgs,
    },

    /// Delete an entry
    Delete {
        #[arg(long)]
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct EntryArgs {
    /// Subject id (defaults to your first subject when creating)
    #[arg(long)]
    subject: Option<i64>,

    /// Class id; changing it resets attendance and grades
    #[arg(long)]
    class: Option<i64>,

    /// Lesson date and time, e.g. 2024-09-02T08:30
    #[arg(long)]
    date: Option<String>,

    #[arg(long)]
    topic: Option<String>,

    #[arg(long)]
    homework: Option<String>,

    /// Mark the whole roster present before applying --absent
    #[arg(long)]
    all_present: bool,

    /// Student ids present (comma-separated)
    #[arg(long, value_delimiter = ',')]
    present: Vec<i64>,

    /// Student ids absent (comma-separated)
    #[arg(long, value_delimiter = ',')]
    absent: Vec<i64>,

    /// Grade as STUDENT_ID=GRADE (repeatable)
    #[arg(long)]
    grade: Vec<String>,

    /// Comment as STUDENT_ID=TEXT (repeatable)
    #[arg(long)]
    comment: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("classbook_core=warn".parse().unwrap())
                .add_directive("classbook_client=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let format = cli.format;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Login { username, password } => {
            commands::auth::login(config, username, password).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(config, username, email, password).await,
        Commands::Logout => commands::auth::logout(config),
        Commands::Whoami => commands::auth::whoami(config, format).await,
        Commands::Classes { action } => commands::classes::execute(config, format, action).await,
        Commands::Students { action } => {
            commands::students::execute(config, format, action).await
        }
        Commands::Subjects { action } => {
            commands::subjects::execute(config, format, action).await
        }
        Commands::Entries { action } => commands::entries::execute(config, format, action).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
