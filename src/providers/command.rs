//! Command-backed providers: run an external command with the request as JSON on stdin
//! and read the answer from stdout.
//!
//! Exit code [RATE_LIMITED_EXIT_CODE] (`EX_TEMPFAIL`) is reported as rate limiting; any other
//! non-zero exit is a permanent failure.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{instrument, warn};

use super::{GenerationProvider, GenerationRequest, ResearchProvider, SearchResult};
use crate::error::ProviderError;

/// Exit status a provider command uses to signal rate limiting.
pub const RATE_LIMITED_EXIT_CODE: i32 = 75;

/// Spawns `command_line` (split on whitespace), writes `input` to stdin and returns stdout.
#[instrument(level = "trace", skip(input))]
async fn run_command(provider: &str, command_line: &str, input: Vec<u8>) -> Result<String, ProviderError> {
  let parts: Vec<&str> = command_line.split_whitespace().collect();
  let Some((bin, args)) = parts.split_first() else {
    return Err(ProviderError::permanent(provider, "command is empty"));
  };

  let mut child = Command::new(bin)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::inherit())
    .kill_on_drop(true)
    .spawn()
    .map_err(|e| ProviderError::permanent(provider, format!("spawn {bin}: {e}")))?;

  let writer = child.stdin.take().map(|mut stdin| {
    tokio::spawn(async move {
      if let Err(e) = stdin.write_all(&input).await {
        warn!(error = %e, "provider command closed stdin early");
      }
    })
  });

  let output = child
    .wait_with_output()
    .await
    .map_err(|e| ProviderError::permanent(provider, format!("wait: {e}")))?;
  if let Some(writer) = writer {
    if let Err(e) = writer.await {
      warn!(provider, error = %e, "stdin writer task failed");
    }
  }

  match output.status.code() {
    Some(0) => String::from_utf8(output.stdout)
      .map_err(|e| ProviderError::permanent(provider, format!("stdout is not utf-8: {e}"))),
    Some(RATE_LIMITED_EXIT_CODE) => Err(ProviderError::rate_limited(
      provider,
      format!("{bin} exited with {RATE_LIMITED_EXIT_CODE}"),
    )),
    Some(code) => Err(ProviderError::permanent(provider, format!("{bin} exited with {code}"))),
    None => Err(ProviderError::permanent(provider, format!("{bin} killed by signal"))),
  }
}

fn to_json<T: Serialize>(provider: &str, value: &T) -> Result<Vec<u8>, ProviderError> {
  serde_json::to_vec(value).map_err(|e| ProviderError::permanent(provider, e.to_string()))
}

/// Text generation through an external command. Stdout, trimmed, is the generated text.
#[derive(Debug, Clone)]
pub struct CommandGenerationProvider {
  command: String,
}

impl CommandGenerationProvider {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }
}

#[async_trait]
impl GenerationProvider for CommandGenerationProvider {
  async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
    let input = to_json("generation", &request)?;
    let out = run_command("generation", &self.command, input).await?;
    Ok(out.trim().to_string())
  }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
  query: &'a str,
  keywords: &'a [String],
  num_results: usize,
}

/// Web research through an external command printing a JSON array of results.
#[derive(Debug, Clone)]
pub struct CommandResearchProvider {
  command: String,
  num_results: usize,
}

impl CommandResearchProvider {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      num_results: 8,
    }
  }

  pub fn with_num_results(mut self, num_results: usize) -> Self {
    self.num_results = num_results;
    self
  }
}

#[async_trait]
impl ResearchProvider for CommandResearchProvider {
  async fn search(&self, topic: &str, keywords: &[String]) -> Result<Vec<SearchResult>, ProviderError> {
    let input = to_json(
      "research",
      &SearchRequest {
        query: topic,
        keywords,
        num_results: self.num_results,
      },
    )?;
    let out = run_command("research", &self.command, input).await?;
    serde_json::from_str(&out)
      .map_err(|e| ProviderError::permanent("research", format!("unparseable results: {e}")))
  }
}
