use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mosq", about = "Mosq rewards ledger: users, tasks and check-ins", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "MOSQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// MongoDB connection string; selects the MongoDB store
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// MongoDB database name
    #[arg(long, global = true, env = "MOSQ_DATABASE", default_value = "mosq_database")]
    pub database: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Register a task (no-op if the name exists)
    AddTask(AddTaskArgs),
    /// List active tasks
    ListTasks,
    /// Show one user's record
    User(UserArgs),
    /// Dump every user record as JSON
    ExportUsers(ExportArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, env = "MOSQ_BIND")]
    pub bind: Option<SocketAddr>,

    /// Invitor for users who arrive without a referral token
    #[arg(long)]
    pub fallback_invitor: Option<String>,

    /// Hours east of UTC at which check-in days roll over
    #[arg(long, allow_negative_numbers = true)]
    pub checkin_offset: Option<i32>,
}

#[derive(Args)]
pub struct AddTaskArgs {
    pub name: String,
    pub points: i64,
    #[arg(long, default_value = "")]
    pub link: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct UserArgs {
    pub uid: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
