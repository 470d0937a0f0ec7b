//! jobflow CLI: webhook server and operator commands.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use jobflow::api::{self, AppState};
use jobflow::config::Config;
use jobflow::db::Db;
use jobflow::engine::{Dispatcher, TransitionResult};
use jobflow::model::{Job, JobId, JobStatus};
use jobflow::store::{JobStore, MemoryJobStore};
use jobflow::telemetry::{TelemetryConfig, TracingObserver, init_telemetry};
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "jobflow", about = "Job-status orchestration for the content pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server
    Serve {
        /// Keep jobs in memory instead of Postgres (local development)
        #[arg(long)]
        in_memory: bool,
    },
    /// Job operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Event operations
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Create a job at the start of the pipeline
    Create {
        /// Job ID (random UUID when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Show a job
    Show {
        /// Job ID
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Filter by status (e.g. TTS_PROCESSING)
        #[arg(long)]
        status: Option<String>,
        /// Maximum jobs to show
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=1000))]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum EventAction {
    /// Apply an event to a job, as if a stage had delivered it
    Apply {
        /// Target job ID
        job_id: String,
        /// Event type (e.g. tts_completed)
        event: String,
        /// JSON data payload
        #[arg(long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { in_memory } => cmd_serve(config, in_memory).await,
        Command::Job { action } => {
            let db = connect(&config).await?;
            match action {
                JobAction::Create { id } => cmd_job_create(&db, id).await,
                JobAction::Show { id } => cmd_job_show(&db, id).await,
                JobAction::List { status, limit } => cmd_job_list(&db, status, limit).await,
            }
        }
        Command::Event {
            action: EventAction::Apply {
                job_id,
                event,
                data,
            },
        } => {
            let db = connect(&config).await?;
            cmd_event_apply(&config, db, job_id, event, data).await
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<Db> {
    let db = Db::connect(config.require_database_url()?.expose_secret()).await?;
    db.migrate().await?;
    Ok(db)
}

async fn cmd_serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "jobflow".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let store: Arc<dyn JobStore> = if in_memory {
        tracing::warn!("using in-memory job store; jobs are lost on restart");
        Arc::new(MemoryJobStore::new())
    } else {
        let db = connect(&config).await?;
        db.health_check().await?;
        Arc::new(db)
    };

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set; webhook calls are admitted without a secret");
    }

    let dispatcher = Dispatcher::new(store, config.transition_mode, Arc::new(TracingObserver));
    let app = api::router(AppState::new(dispatcher, config.webhook_secret));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        mode = %config.transition_mode,
        "jobflow listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn cmd_job_create(db: &Db, id: Option<String>) -> anyhow::Result<()> {
    let id = id.map(JobId::from).unwrap_or_else(JobId::generate);
    let job = db.create(Job::new(id)).await?;
    println!("Created: {} (status: {})", job.id, job.status);
    Ok(())
}

async fn cmd_job_show(db: &Db, id: String) -> anyhow::Result<()> {
    let id = JobId::from(id);
    let job = db
        .get(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no job with id '{id}'"))?;

    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("ID:           {}", job.id);
    println!("Status:       {}", job.status);
    println!("Title:        {}", field(&job.title));
    println!("Audio:        {}", field(&job.audio_url));
    println!("Video:        {}", field(&job.video_url));
    println!("Published:    {}", field(&job.published_video_id));
    if let Some(ref err) = job.error_message {
        println!("Error:        {err}");
    }
    println!("Created:      {}", job.created_at);
    println!("Updated:      {}", job.updated_at);
    if let Some(ref script) = job.script {
        println!("---\n{script}");
    }
    Ok(())
}

async fn cmd_job_list(db: &Db, status: Option<String>, limit: u32) -> anyhow::Result<()> {
    let status: Option<JobStatus> = match status {
        Some(s) => Some(
            s.to_ascii_uppercase()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid status: {s}"))?,
        ),
        None => None,
    };

    let jobs = db.list_jobs(status, limit).await?;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!("{:<36}  {:<17}  {:<30}  UPDATED", "ID", "STATUS", "TITLE");
    println!("{}", "-".repeat(100));
    for job in &jobs {
        let title = job.title.as_deref().unwrap_or("-");
        let title: String = title.chars().take(30).collect();
        println!(
            "{:<36}  {:<17}  {:<30}  {}",
            job.id,
            job.status,
            title,
            job.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("\n{} job(s)", jobs.len());
    Ok(())
}

async fn cmd_event_apply(
    config: &Config,
    db: Db,
    job_id: String,
    event: String,
    data: Option<String>,
) -> anyhow::Result<()> {
    let data: serde_json::Value = match data {
        Some(json) => serde_json::from_str(&json)?,
        None => serde_json::json!({}),
    };

    let dispatcher = Dispatcher::new(
        Arc::new(db),
        config.transition_mode,
        Arc::new(TracingObserver),
    );
    let result = dispatcher
        .apply_event(&JobId::from(job_id), &event, &data)
        .await?;

    match result {
        TransitionResult::Applied { previous, update } => {
            println!("{previous} -> {}", update.status);
            let fields = update.written_fields();
            if !fields.is_empty() {
                println!("wrote: {}", fields.join(", "));
            }
        }
        TransitionResult::Acknowledged { status } => {
            println!("event '{event}' not recognized; status unchanged ({status})");
        }
    }
    Ok(())
}
