//! CLI: run an editorial pipeline session.
//!
//! Starts a new session (or continues one with `--resume --session-id <ID>`) and drives it
//! until it completes. At every review gate the interrupt payload is printed; decisions are
//! either approved automatically (default) or read from stdin with `--interactive`.
//!
//! Research and generation are delegated to external commands that receive the request
//! as JSON on stdin and answer on stdout (exit code 75 signals rate limiting).
//!
//! Set RUST_LOG=editorial_pipeline=trace for TRACE-level span enter/exit and events.

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use editorial_pipeline::providers::{
  CommandGenerationProvider, CommandResearchProvider, InMemorySimilarityIndex, SqliteMetadataLog,
};
use editorial_pipeline::store::{CheckpointStore, FileCheckpointStore, SqliteCheckpointStore};
use editorial_pipeline::{
  Engine, InterruptRequest, PipelineConfig, PipelineError, Providers, ResumeSchema, RunResult,
  SessionId, WorkflowState,
};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

const STATE_DIR: &str = ".editorial";
const DEFAULT_TOPIC: &str = "Jak zwiększyć ruch na blogu firmowym";
const DEFAULT_KEYWORDS: &str = "SEO blog,content marketing,ruch organiczny";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
  /// One SQLite database for all sessions.
  Sqlite,
  /// One JSON file per session.
  Json,
}

/// Run an editorial pipeline session.
#[derive(Parser, Debug)]
#[command(name = "run_pipeline")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  EDITORIAL_RESEARCH_CMD     Research command; prints a JSON array of {title,url,summary,text}.
  EDITORIAL_GENERATION_CMD   Generation command; prints the generated text.
  EDITORIAL_STATE_DIR        Directory for checkpoints, the metadata log and the topic index.
  EDITORIAL_*                Pipeline tunables, e.g. EDITORIAL_MIN_WORD_COUNT=600.

Examples:
  run_pipeline --research-cmd ./search.sh --generation-cmd ./llm.sh
  run_pipeline --interactive --topic "BIM w projektowaniu" --keywords "BIM,instalacje"
  run_pipeline --resume --session-id 3f1c..."#
)]
struct Args {
  /// Article topic.
  #[arg(long, default_value = DEFAULT_TOPIC)]
  topic: String,

  /// Comma-separated keywords; the first is the primary keyword.
  #[arg(long, default_value = DEFAULT_KEYWORDS)]
  keywords: String,

  /// Optional run-specific brief injected into the prompts.
  #[arg(long)]
  brief: Option<String>,

  /// Session id; generated for new sessions when omitted.
  #[arg(long, value_name = "ID")]
  session_id: Option<String>,

  /// Continue an existing session instead of starting one.
  #[arg(long, requires = "session_id")]
  resume: bool,

  /// Ask for each review decision on stdin instead of approving automatically.
  #[arg(long)]
  interactive: bool,

  /// Checkpoint backend.
  #[arg(long, value_enum, default_value = "sqlite")]
  store: StoreKind,

  /// State directory. Overridden by EDITORIAL_STATE_DIR if set.
  #[arg(long, value_name = "DIR", default_value = STATE_DIR)]
  state_dir: PathBuf,

  /// JSON config file with pipeline tunables.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Similarity at or above which a published topic counts as a duplicate.
  #[arg(long)]
  duplicate_threshold: Option<f64>,

  /// Research command. Overridden by EDITORIAL_RESEARCH_CMD if set.
  #[arg(long, value_name = "CMD")]
  research_cmd: Option<String>,

  /// Generation command. Overridden by EDITORIAL_GENERATION_CMD if set.
  #[arg(long, value_name = "CMD")]
  generation_cmd: Option<String>,
}

fn fail(msg: impl std::fmt::Display) -> ! {
  eprintln!("Error: {}", msg);
  process::exit(1);
}

async fn open_store(kind: StoreKind, state_dir: &Path) -> Result<Arc<dyn CheckpointStore>, PipelineError> {
  Ok(match kind {
    StoreKind::Sqlite => Arc::new(SqliteCheckpointStore::open(state_dir.join("checkpoints.db")).await?),
    StoreKind::Json => Arc::new(FileCheckpointStore::new(state_dir.join("sessions"))),
  })
}

fn print_interrupt(request: &InterruptRequest) {
  println!("\n=== Review needed: {} ===", request.node);
  match serde_json::to_string_pretty(&request.payload) {
    Ok(s) => println!("{}", s),
    Err(_) => println!("{}", request.payload),
  }
}

async fn ask(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> String {
  println!("{}", prompt);
  match lines.next_line().await {
    Ok(Some(line)) => line.trim().to_string(),
    Ok(None) => fail("stdin closed while waiting for a decision"),
    Err(e) => fail(format!("reading stdin: {}", e)),
  }
}

/// Reads lines until a lone `.`; empty input means "keep the current outline".
async fn ask_block(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Option<String> {
  println!("{}", prompt);
  let mut block = Vec::new();
  loop {
    match lines.next_line().await {
      Ok(Some(line)) if line.trim() == "." => break,
      Ok(Some(line)) => block.push(line),
      Ok(None) => break,
      Err(e) => fail(format!("reading stdin: {}", e)),
    }
  }
  let text = block.join("\n");
  (!text.trim().is_empty()).then_some(text)
}

/// Explicit yes/no only; anything else (including an empty line) asks again.
fn parse_confirm(answer: &str) -> Option<bool> {
  match answer.trim().to_lowercase().as_str() {
    "y" | "yes" | "t" | "tak" => Some(true),
    "n" | "no" | "nie" => Some(false),
    _ => None,
  }
}

async fn decide(lines: &mut Lines<BufReader<Stdin>>, request: &InterruptRequest) -> Value {
  match request.schema {
    ResumeSchema::Confirm => loop {
      let answer = ask(lines, "Proceed? [y/n]").await;
      match parse_confirm(&answer) {
        Some(proceed) => break json!(proceed),
        None => eprintln!("Please answer y or n."),
      }
    },
    ResumeSchema::OutlineReview | ResumeSchema::DraftReview => {
      let action = ask(lines, "Decision [approve/reject/abort]:").await.to_lowercase();
      match action.as_str() {
        "approve" | "a" => json!({"action": "approve"}),
        "abort" | "q" => json!({"action": "abort"}),
        "reject" | "r" if request.schema == ResumeSchema::OutlineReview => {
          let outline = ask_block(lines, "Edited outline (finish with a line containing only '.', empty keeps the current one):").await;
          let note = ask(lines, "Note (optional):").await;
          let mut value = json!({"action": "reject"});
          if let Some(outline) = outline {
            value["edited_outline"] = json!(outline);
          }
          if !note.is_empty() {
            value["note"] = json!(note);
          }
          value
        }
        "reject" | "r" => {
          let feedback = ask(lines, "Which sections should change, and how?").await;
          json!({"action": "reject", "feedback": feedback})
        }
        // Unknown input is forwarded so the engine reports the schema violation.
        other => json!({"action": other}),
      }
    }
  }
}

fn print_summary(session_id: &SessionId, state: &WorkflowState) {
  let words = state
    .draft
    .as_deref()
    .map(|d| d.split_whitespace().count())
    .unwrap_or(0);
  println!("\nPipeline completed.");
  println!("  Session: {}", session_id);
  println!("  Topic: {}", state.topic);
  println!("  Outline approved: {:?}", state.cp1_approved);
  println!("  Draft approved: {:?}", state.cp2_approved);
  println!("  Draft validated: {:?}", state.draft_validated);
  println!("  Draft words: {}", words);
  println!("  Metadata saved: {}", state.metadata_saved);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  info!("run_pipeline starting");
  let args = Args::parse();

  // Env vars override flags.
  let research_cmd = env::var("EDITORIAL_RESEARCH_CMD").ok().or_else(|| args.research_cmd.clone());
  let generation_cmd = env::var("EDITORIAL_GENERATION_CMD")
    .ok()
    .or_else(|| args.generation_cmd.clone());
  let state_dir = env::var("EDITORIAL_STATE_DIR")
    .ok()
    .map(PathBuf::from)
    .unwrap_or_else(|| args.state_dir.clone());
  let (Some(research_cmd), Some(generation_cmd)) = (research_cmd, generation_cmd) else {
    fail("both a research command and a generation command are required (see --help)");
  };

  let mut config = PipelineConfig::load(args.config.as_deref()).unwrap_or_else(|e| fail(e));
  if let Some(threshold) = args.duplicate_threshold {
    config.duplicate_threshold = threshold;
  }
  if let Err(e) = config.validate() {
    fail(e);
  }
  let config = Arc::new(config);

  info!(
    state_dir = %state_dir.display(),
    store = ?args.store,
    interactive = args.interactive,
    "options (env or flags)"
  );

  let store = open_store(args.store, &state_dir).await.unwrap_or_else(|e| fail(e));
  let index = InMemorySimilarityIndex::open(state_dir.join("index.json"))
    .await
    .unwrap_or_else(|e| fail(e));
  let metadata_log = SqliteMetadataLog::open(state_dir.join("metadata.db"))
    .await
    .unwrap_or_else(|e| fail(e));
  let providers = Providers {
    research: Arc::new(CommandResearchProvider::new(research_cmd)),
    generation: Arc::new(CommandGenerationProvider::new(generation_cmd)),
    index: Arc::new(index),
    metadata_log: Arc::new(metadata_log),
  };
  let engine = Engine::standard(&providers, store, config).unwrap_or_else(|e| fail(e));

  let session_id = args
    .session_id
    .clone()
    .map(SessionId::new)
    .unwrap_or_else(SessionId::generate);
  println!("Session: {}", session_id);

  let mut result = if args.resume {
    engine.retry(session_id.clone()).await
  } else {
    let keywords = args
      .keywords
      .split(',')
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .map(str::to_string)
      .collect();
    let mut state = WorkflowState::new(session_id.clone(), args.topic.clone(), keywords);
    if let Some(brief) = &args.brief {
      state = state.with_brief(brief.clone());
    }
    engine.start(session_id.clone(), state).await
  };

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    result = match result {
      Ok(RunResult::Completed(state)) => {
        info!(session_id = %session_id, "pipeline completed");
        print_summary(&session_id, &state);
        return;
      }
      Ok(RunResult::Paused(request)) => {
        print_interrupt(&request);
        let answer = if args.interactive {
          decide(&mut lines, &request).await
        } else {
          let answer = request.schema.auto_approve();
          println!("Auto-approving: {}", answer);
          answer
        };
        engine.resume(session_id.clone(), answer).await
      }
      Err(PipelineError::InvalidResume { node, reason }) if args.interactive => {
        eprintln!("Invalid decision for {}: {}", node, reason);
        engine.retry(session_id.clone()).await
      }
      Err(e) => {
        eprintln!("Pipeline error: {}", e);
        eprintln!("Continue later with: run_pipeline --resume --session-id {}", session_id);
        process::exit(1);
      }
    };
  }
}

#[cfg(test)]
mod tests {
  use super::parse_confirm;

  #[test]
  fn confirm_accepts_only_explicit_answers() {
    assert_eq!(parse_confirm("y"), Some(true));
    assert_eq!(parse_confirm(" Tak "), Some(true));
    assert_eq!(parse_confirm("NO"), Some(false));
    assert_eq!(parse_confirm("nie"), Some(false));
    for unclear in ["", "ye", "maybe", "1", "true"] {
      assert_eq!(parse_confirm(unclear), None, "{unclear:?}");
    }
  }
}
