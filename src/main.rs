mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, JobsCommand, VideosCommand};
use reelvault::app::{self, App};
use rv_db::models::Job;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick a default based on --verbose
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelvault=debug,rv_ingest=debug,rv_jobs=debug,rv_av=debug,rv_db=debug".to_string()
        } else {
            "reelvault=info,rv_ingest=info,rv_jobs=info,rv_av=warn,rv_db=warn".to_string()
        }
    });

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Validate { file } => validate_config(file.as_deref().or(config_path)),
        Commands::Scan { root, library } => {
            let app = App::open(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(app.scan(&root, &library))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Checksums => {
            let app = App::open(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(app.checksums())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Enqueue {
            json,
            priority,
            parent,
        } => {
            let app = App::open(config_path)?;
            let job = app.enqueue(&json, priority.into(), parent)?;
            println!("{}", job.id);
            Ok(())
        }
        Commands::Work { follow } => {
            let app = App::open(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(work(&app, follow))
        }
        Commands::Jobs(cmd) => {
            let app = App::open(config_path)?;
            jobs(&app, cmd)
        }
        Commands::Videos(VideosCommand::Delete { id }) => {
            let app = App::open(config_path)?;
            app.delete_video(id)?;
            println!("✓ {id} marked deleted");
            Ok(())
        }
        Commands::Probe { file, json } => {
            let app = App::open(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            probe_file(&app, &rt, &file, json)
        }
        Commands::CheckTools => {
            let app = App::open(config_path)?;
            check_tools(&app);
            Ok(())
        }
    }
}

async fn work(app: &App, follow: bool) -> Result<()> {
    if !follow {
        match app.work().await? {
            Some(summary) => println!(
                "Processed {} jobs ({} completed, {} failed)",
                summary.completed + summary.failed,
                summary.completed,
                summary.failed
            ),
            None => println!("Another worker is already draining the queue"),
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping worker");
            on_signal.cancel();
        }
    });

    app.work_until_cancelled(cancel).await;
    Ok(())
}

fn jobs(app: &App, cmd: JobsCommand) -> Result<()> {
    match cmd {
        JobsCommand::List { status, limit } => {
            let jobs = app.list_jobs(status.map(Into::into), limit)?;
            if jobs.is_empty() {
                println!("No jobs");
            }
            for job in &jobs {
                print_job_line(job);
            }
        }
        JobsCommand::Show { id } => {
            let (job, children) = app.show_job(id)?;
            println!("Job: {}", job.id);
            println!("Type: {}", job.job_type);
            println!("Status: {}", job.status);
            println!("Priority: {:?}", job.priority);
            if let Some(parent) = job.parent_id {
                println!("Parent: {parent}");
            }
            println!("Payload: {}", job.payload);
            if let Some(ref outcome) = job.outcome {
                println!("Outcome: {outcome}");
            }
            println!("Created: {}", job.created_at);
            println!("Updated: {}", job.updated_at);

            println!("\nChildren: {}", children.len());
            for child in &children {
                print!("  ");
                print_job_line(child);
            }
        }
        JobsCommand::Resubmit { id } => {
            let job = app.resubmit_job(id)?;
            println!("{}", job.id);
        }
    }
    Ok(())
}

fn print_job_line(job: &Job) {
    print!("{} {:<22} {:<11}", job.id, job.job_type, job.status.as_str());
    if let Some(ref outcome) = job.outcome {
        print!(" {outcome}");
    }
    println!();
}

fn probe_file(app: &App, rt: &tokio::runtime::Runtime, file: &Path, json: bool) -> Result<()> {
    let result = rt.block_on(app.probe(file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    match result.dimensions() {
        Ok((w, h)) => println!("Video: {w}x{h}"),
        Err(e) => println!("Video: {e}"),
    }
    if let Some(secs) = result.duration_secs() {
        let secs = secs as u64;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let Some(size) = result.size_bytes() {
        println!("Size: {size} bytes");
    }
    println!("Streams: {}", result.streams.len());

    Ok(())
}

fn check_tools(app: &App) {
    println!("Checking external tools...\n");

    let mut all_ok = true;
    for tool in app.check_tools() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Scans and image jobs will fail until they are installed.");
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        println!("No config file specified, using defaults");
        let config = rv_core::config::Config::default();
        println!("  Database: {}", config.database.path.display());
        println!("  Images: {}", config.images.storage_dir.display());
        return Ok(());
    };

    println!("Validating config: {}", path.display());
    let (config, warnings) = app::validate_config(path)?;
    println!("✓ Configuration is valid");
    println!("  Database: {}", config.database.path.display());
    println!("  Scan batch size: {}", config.scan.batch_size);
    println!("  Checksum after scan: {}", config.scan.checksum_after_scan);
    println!("  Poll interval: {}s", config.jobs.poll_interval_secs);
    println!("  Tool timeout: {}s", config.tools.timeout_secs);
    println!("  Images: {}", config.images.storage_dir.display());

    for warning in &warnings {
        println!("⚠ {warning}");
    }
    Ok(())
}
