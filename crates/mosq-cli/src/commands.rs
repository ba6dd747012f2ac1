use anyhow::Context;
use colored::Colorize;
use mosq_engine::{RewardEngine, Task, TaskName, Uid, User};
use mosq_server::{MosqServer, ServerConfig, StoreConfig};

use crate::cli::*;

/// Resolve the effective configuration: file (or defaults), then flags and
/// environment.
pub fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(uri) = &cli.database_url {
        config.store = StoreConfig::Mongodb {
            uri: uri.clone(),
            database: cli.database.clone(),
        };
    }
    if cli.verbose {
        config.log_level = "debug".into();
    }
    if let Command::Serve(args) = &cli.command {
        if let Some(bind) = args.bind {
            config.bind_addr = bind;
        }
        if let Some(invitor) = &args.fallback_invitor {
            config.fallback_invitor = invitor.clone();
        }
        if let Some(hours) = args.checkin_offset {
            config.checkin_utc_offset_hours = hours;
        }
    }
    config.validate()?;
    Ok(config)
}

pub async fn run_command(cli: Cli, config: ServerConfig) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(_) => Ok(MosqServer::new(config).serve().await?),
        Command::AddTask(args) => cmd_add_task(&engine(config).await?, args, &format).await,
        Command::ListTasks => cmd_list_tasks(&engine(config).await?, &format).await,
        Command::User(args) => cmd_user(&engine(config).await?, args, &format).await,
        Command::ExportUsers(args) => cmd_export_users(&engine(config).await?, args).await,
    }
}

async fn engine(config: ServerConfig) -> anyhow::Result<RewardEngine> {
    MosqServer::new(config)
        .build_engine()
        .await
        .context("failed to open store")
}

async fn cmd_add_task(
    engine: &RewardEngine,
    args: AddTaskArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let name = TaskName::parse(&args.name)?;
    let reg = engine
        .register_task(&name, args.points, &args.link, args.description.as_deref())
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reg.task)?),
        OutputFormat::Text if reg.created => println!(
            "{} Registered task {} ({} points)",
            "✓".green().bold(),
            name.as_str().yellow(),
            reg.task.task_point
        ),
        OutputFormat::Text => println!(
            "Task {} already exists ({} points); left unchanged",
            name.as_str().yellow(),
            reg.task.task_point
        ),
    }
    Ok(())
}

async fn cmd_list_tasks(engine: &RewardEngine, format: &OutputFormat) -> anyhow::Result<()> {
    let mut tasks = engine.active_tasks().await?;
    tasks.sort_by(|a, b| a.task_name.cmp(&b.task_name));
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
        OutputFormat::Text if tasks.is_empty() => println!("No active tasks."),
        OutputFormat::Text => {
            for task in &tasks {
                println!("{}", task_line(task));
            }
        }
    }
    Ok(())
}

async fn cmd_user(engine: &RewardEngine, args: UserArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let user = engine.user(&Uid::parse(&args.uid)?).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Text => print_user(&user),
    }
    Ok(())
}

async fn cmd_export_users(engine: &RewardEngine, args: ExportArgs) -> anyhow::Result<()> {
    let users = engine.all_users().await?;
    let json = serde_json::to_string_pretty(&users)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} Exported {} users to {}",
                "✓".green().bold(),
                users.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn task_line(task: &Task) -> String {
    format!(
        "{:<24} {:>6} pts  {:>5} done  {}",
        task.task_name.as_str().yellow(),
        task.task_point,
        task.total_completions,
        task.task_link.blue()
    )
}

fn print_user(user: &User) {
    println!("User {}", user.uid.as_str().yellow().bold());
    if let Some(invitor) = &user.invitor {
        println!("  Invitor: {invitor}");
    }
    println!("  Premium: {}", user.is_premium);
    println!("  Points: {}", user.task_point.to_string().green());
    println!("  Fleet: {}", user.fleet);
    println!("  Referrals: {}", user.referrals);
    println!("  Last check-in: {}", user.checkin);
    for task in &user.completed_tasks {
        println!("  {} {}", "done:".green(), task);
    }
}
