//! answer-sync - command-line driver for the answer synchronization engine
//!
//! Inspects and clears remote drafts, manages staged uploads, finalizes
//! submissions from JSON files and reorders form elements against an HTTP
//! form server.

use answer_sync::codec::decode_snapshot;
use answer_sync::engine::{
    delete_with_retry, DraftSynchronizer, FinalizeMode, ReorderCoordinator, SubmissionFinalizer,
    TempUploadManager,
};
use answer_sync::remote::{FormRemote, HttpFormClient};
use answer_sync::state::{
    AnswerCommand, ElementKind, Identity, OrderedElement, QuestionDefinition, SessionId,
    SiblingSet, UploadFile,
};
use answer_sync::SyncConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "answer-sync")]
#[command(about = "Synchronize form answers, drafts and uploads with a form server")]
#[command(version)]
struct Cli {
    /// Form server base URL (overrides the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Alternative config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remote draft of one respondent
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Staged uploads of a session
    Uploads {
        #[command(subcommand)]
        action: UploadAction,
    },
    /// Finalize answers from JSON files
    Submit {
        #[arg(long)]
        form: String,
        #[arg(long)]
        respondent: String,
        /// Session whose staged uploads are attached and swept
        #[arg(long)]
        session: String,
        /// Question definitions (JSON array)
        #[arg(long)]
        questions: PathBuf,
        /// Answers in wire form, keyed by question id (JSON object)
        #[arg(long)]
        answers: PathBuf,
        /// Existing answer ids keyed by question id; switches to edit mode
        #[arg(long)]
        existing: Option<PathBuf>,
    },
    /// Move one element within its sibling set
    Reorder {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Form id, or question id for choices
        #[arg(long)]
        parent: String,
        /// Current sibling ids in order, comma separated
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
        /// Element to move
        #[arg(long = "move")]
        element: String,
        /// New 0-based position
        #[arg(long)]
        to: usize,
    },
}

#[derive(Subcommand, Debug)]
enum DraftAction {
    /// Print the stored draft
    Show {
        #[arg(long)]
        form: String,
        #[arg(long)]
        respondent: String,
    },
    /// Delete the stored draft
    Clear {
        #[arg(long)]
        form: String,
        #[arg(long)]
        respondent: String,
    },
}

#[derive(Subcommand, Debug)]
enum UploadAction {
    /// List staged uploads
    List {
        #[arg(long)]
        session: String,
        /// Only uploads of this form
        #[arg(long)]
        form: Option<String>,
    },
    /// Stage a file for a question
    Add {
        #[arg(long)]
        session: String,
        #[arg(long)]
        form: String,
        #[arg(long)]
        question: String,
        file: PathBuf,
    },
    /// Delete every staged upload of a form
    Sweep {
        #[arg(long)]
        session: String,
        #[arg(long)]
        form: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Question,
    Section,
    Choice,
}

impl From<KindArg> for ElementKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Question => ElementKind::Question,
            KindArg::Section => ElementKind::Section,
            KindArg::Choice => ElementKind::Choice,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "answer_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::load_from(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SyncConfig::load()?,
    };
    if let Some(server) = cli.server {
        config.server_address = Some(server);
    }

    let client = HttpFormClient::from_config(&config)?;
    info!(server = %client.base_url(), "Using form server");
    let remote: Arc<dyn FormRemote> = Arc::new(client);

    match cli.command {
        Command::Draft { action } => run_draft(action, remote, &config).await,
        Command::Uploads { action } => run_uploads(action, remote).await,
        Command::Submit {
            form,
            respondent,
            session,
            questions,
            answers,
            existing,
        } => {
            let identity = Identity::new(&respondent, &form);
            let questions: Vec<QuestionDefinition> = read_json(&questions)?;
            let answers: HashMap<String, serde_json::Value> = read_json(&answers)?;
            let existing: Option<HashMap<String, String>> =
                existing
                    .as_deref()
                    .map(read_json::<HashMap<String, String>>)
                    .transpose()?;
            submit(
                identity,
                SessionId::from(session.as_str()),
                questions,
                answers,
                existing,
                remote,
                &config,
            )
            .await
        }
        Command::Reorder {
            kind,
            parent,
            order,
            element,
            to,
        } => {
            let elements = order
                .iter()
                .enumerate()
                .map(|(index, id)| OrderedElement::new(id, index as u32 + 1))
                .collect();
            let mut coordinator =
                ReorderCoordinator::new(SiblingSet::new(kind.into(), &parent), elements);
            let ordering = coordinator.reorder(remote.as_ref(), &element, to).await?;
            for e in ordering {
                println!("{}\t{}", e.order_sequence, e.id);
            }
            Ok(())
        }
    }
}

async fn run_draft(
    action: DraftAction,
    remote: Arc<dyn FormRemote>,
    config: &SyncConfig,
) -> Result<()> {
    match action {
        DraftAction::Show { form, respondent } => {
            let identity = Identity::new(&respondent, &form);
            match remote.fetch_draft(&identity).await? {
                Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
                None => println!("No draft stored for {identity}"),
            }
        }
        DraftAction::Clear { form, respondent } => {
            let identity = Identity::new(&respondent, &form);
            if delete_with_retry(remote.as_ref(), &identity, &config.draft_settings()).await {
                println!("Deleted draft for {identity}");
            } else {
                anyhow::bail!("Could not delete draft for {identity}");
            }
        }
    }
    Ok(())
}

async fn run_uploads(action: UploadAction, remote: Arc<dyn FormRemote>) -> Result<()> {
    match action {
        UploadAction::List { session, form } => {
            let mut uploads = TempUploadManager::new(SessionId::from(session.as_str()), remote);
            for upload in uploads.refresh().await? {
                if form.as_deref().is_some_and(|f| f != upload.form_id) {
                    continue;
                }
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    upload.id,
                    upload.form_id,
                    upload.question_id,
                    upload.filename,
                    upload.created_at.to_rfc3339()
                );
            }
        }
        UploadAction::Add {
            session,
            form,
            question,
            file,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let mut uploads = TempUploadManager::new(SessionId::from(session.as_str()), remote);
            let upload = uploads
                .upload(&form, &question, UploadFile::new(&filename, bytes))
                .await?;
            println!("{}", upload.id);
        }
        UploadAction::Sweep { session, form } => {
            let mut uploads = TempUploadManager::new(SessionId::from(session.as_str()), remote);
            let report = uploads.sweep(&form).await;
            println!("Deleted {} staged uploads", report.deleted);
            for id in report.failed {
                println!("Could not delete {id}");
            }
        }
    }
    Ok(())
}

async fn submit(
    identity: Identity,
    session: SessionId,
    questions: Vec<QuestionDefinition>,
    answers: HashMap<String, serde_json::Value>,
    existing: Option<HashMap<String, String>>,
    remote: Arc<dyn FormRemote>,
    config: &SyncConfig,
) -> Result<()> {
    let answers = decode_snapshot(&questions, &answers);
    let settings = config.draft_settings();

    let (mut drafts, mode) = match existing {
        Some(existing) => (
            DraftSynchronizer::from_existing(identity, &questions, remote.clone(), settings, answers),
            FinalizeMode::Edit { existing },
        ),
        None => {
            let drafts =
                DraftSynchronizer::start_fresh(identity, &questions, remote.clone(), settings).await;
            for (question_id, value) in answers.iter() {
                drafts.apply(AnswerCommand::Set {
                    question_id: question_id.clone(),
                    value: value.clone(),
                });
            }
            (drafts, FinalizeMode::Create)
        }
    };

    let mut uploads = TempUploadManager::new(session, remote.clone());

    let finalizer = SubmissionFinalizer::new(questions, remote);
    let outcome = finalizer.finalize(&mut drafts, &mut uploads, mode).await?;

    println!(
        "{} {} answers",
        if outcome.mode.is_edit() { "Updated" } else { "Submitted" },
        outcome.answers_written
    );
    if !outcome.sweep.is_clean() {
        println!("{} staged uploads could not be deleted", outcome.sweep.failed.len());
    }
    if !outcome.draft_deleted {
        println!("Draft could not be deleted");
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
