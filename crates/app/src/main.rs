use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use study_core::model::StudyMode;
use services::{
    AppServices, ChatCompletionsGenerator, Clock, GenerateStudySetRequest, StudyConfig,
    UploadedFile,
};
use tracing::{info, warn};

mod cli;
mod logging;

use cli::{Cli, Command, guess_mime};

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file (and its directory) so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

/// Builds the same payload the upload form sends: a data URL per file.
fn upload_from_file(path: &Path, mime: Option<String>) -> Result<GenerateStudySetRequest> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("document path has no file name")?
        .to_owned();
    let mime = mime
        .or_else(|| guess_mime(path).map(str::to_owned))
        .unwrap_or_else(|| "application/pdf".to_owned());

    Ok(GenerateStudySetRequest {
        files: vec![UploadedFile {
            name,
            data: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
            mime_type: Some(mime),
        }],
    })
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = StudyConfig::from_env();
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }

    let generator = ChatCompletionsGenerator::from_env();
    if !generator.enabled() {
        warn!("STUDY_AI_API_KEY is not set; generation and answer checking are disabled");
    }

    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default(), config, Arc::new(generator))
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(db = %db_url, policy = %app.config().policy, "storage ready");

    match cli.command {
        Command::Generate { file, mime } => {
            let request = upload_from_file(&file, mime)?;
            let generated = app.study_sets().generate(&request).await.map_err(|err| {
                anyhow::anyhow!("{:?} failure: {err}", err.category())
            })?;
            println!(
                "study set {} created ({} of {} blocks became questions)",
                generated.study_set_id,
                generated.questions.len(),
                generated.total_blocks
            );
            for (i, q) in generated.questions.iter().enumerate() {
                println!("{}. {}", i + 1, q.question());
                for (letter, option) in ['A', 'B', 'C', 'D'].iter().zip(q.options()) {
                    let marker = if *letter == q.answer().as_char() { "*" } else { " " };
                    println!("  {marker} {letter}) {option}");
                }
            }
        }
        Command::List { limit } => {
            for set in app.study_sets().list_study_sets(limit).await? {
                println!(
                    "{}\t{}\t{} terms\t{}",
                    set.id(),
                    set.title(),
                    set.term_count(),
                    set.created_at().format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Show { set_id } => {
            let set = app.study_sets().get_study_set(set_id).await?;
            println!("{} ({} terms)", set.title(), set.term_count());
            for term in set.terms() {
                println!("- {}\n    {}", term.term(), term.definition());
            }
        }
        Command::Record {
            set_id,
            mode,
            score,
        } => {
            let record = app.progress().record(set_id, mode, score).await?;
            println!("recorded progress {} ({mode}, score {score})", record.id());
        }
        Command::History { set_id, mode } => {
            for record in app.progress().history(set_id, mode).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id(),
                    record.mode(),
                    record.score(),
                    record.created_at().format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Overview { set_id } => {
            let overview = app.progress().overview(set_id).await?;
            println!(
                "overall {}%, mastered {}/{} ({})",
                overview.overall, overview.mastered, overview.total_terms, overview.policy
            );
            for mode in StudyMode::ALL {
                if let Some(score) = app.progress().latest_score(set_id, mode).await? {
                    println!("  last {mode}: {score}/{}", overview.total_terms);
                }
            }
        }
        Command::Check {
            submitted,
            reference,
        } => {
            let verdict = app.answers().check(&submitted, &reference).await;
            let label = if verdict.is_correct { "correct" } else { "incorrect" };
            println!("{label}: {}", verdict.explanation);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
