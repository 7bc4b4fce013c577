//! Prompt builders for the generation-backed nodes.
//!
//! Structure and Writer prompts open with a context block of three layers: the static
//! brand description from config, the per-run brief from state, and today's date.

use chrono::NaiveDate;

use crate::providers::SearchResult;
use crate::types::WorkflowState;

/// Research report excerpt length fed to the Structure prompt, in chars.
pub const STRUCTURE_REPORT_EXCERPT: usize = 2000;
/// Research report excerpt length fed to the Writer prompt, in chars.
pub const WRITER_REPORT_EXCERPT: usize = 3000;

/// Longest prefix of `s` holding at most `max_chars` chars.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
  match s.char_indices().nth(max_chars) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

pub fn context_block(brand: Option<&str>, brief: Option<&str>, today: NaiveDate) -> String {
  let brand = brand
    .map(str::trim)
    .filter(|b| !b.is_empty())
    .unwrap_or("No brand profile configured.");
  let brief = brief
    .map(str::trim)
    .filter(|b| !b.is_empty())
    .unwrap_or("None: a general article within the brand's subject area.");
  format!(
    "## BRAND AND SESSION CONTEXT\n\n\
     ### Brand\n{brand}\n\n\
     ### This article\n{brief}\n\n\
     ### Environment\nDate: {today}"
  )
}

/// System prompt for every Writer call; lists the word stems the draft must avoid.
pub fn writer_system_prompt(language: &str, forbidden_stems: &[String]) -> String {
  let forbidden = forbidden_stems
    .iter()
    .map(|s| format!("{s}*"))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "You are a senior SEO copywriter producing publication-ready blog articles in {language}.\n\n\
     Style: assertive and objective. Back every claim with numbers, facts or the supplied research. \
     Prefer the active voice and short, concrete sentences. Start with the substance immediately.\n\n\
     Before the final text you may plan headings and keyword placement inside <thinking></thinking> tags; \
     that block is removed before publication.\n\n\
     Replace vague filler with concrete data. Never use words starting with: {forbidden}.\n\n\
     Output format:\n\
     - The first line is exactly \"Meta-description: <SEO summary of the article, 150-160 characters>\".\n\
     - Directly below it comes the Markdown H1 and then the article.\n\
     - Plain text only: no code fences, greetings or closing remarks."
  )
}

/// Synthesis prompt for the research report; the numbered source list is built separately.
pub fn research_synthesis_prompt(topic: &str, keywords: &[String], results: &[SearchResult], language: &str) -> String {
  let listing = results
    .iter()
    .enumerate()
    .map(|(i, r)| {
      let body = if r.text.is_empty() { &r.summary } else { &r.text };
      format!("[{}] {}\n{}\n{}", i + 1, r.title, r.url, truncate_chars(body, 1500))
    })
    .collect::<Vec<_>>()
    .join("\n\n");
  format!(
    "You are an editor. Using the search results below, write a synthesis of 2-3 paragraphs \
     in {language} summarising the main themes and trends about \"{topic}\" (keywords: {keywords}). \
     Synthesise ideas instead of quoting sources.\n\n\
     SEARCH RESULTS:\n{listing}\n\n\
     Return only the synthesis paragraphs.",
    keywords = keywords.join(", "),
  )
}

/// Outline prompt. With reviewer feedback and at least one rejection, the edited outline is
/// treated as a strong prior to reconcile with the research.
pub fn structure_prompt(state: &WorkflowState, context: &str, language: &str) -> String {
  let report = truncate_chars(
    state.research_report.as_deref().unwrap_or_default(),
    STRUCTURE_REPORT_EXCERPT,
  );
  let header = format!(
    "{context}\n\nTOPIC: {topic}\nKEYWORDS: {keywords}\nPRIMARY KEYWORD (must appear in the H1): {primary}",
    topic = state.topic,
    keywords = state.keywords.join(", "),
    primary = state.primary_keyword(),
  );
  let footer = "Return ONLY the heading structure in Markdown (# H1, ## H2, ### H3). No article text.";

  match state.cp1_feedback.as_deref() {
    Some(feedback) if state.cp1_iterations > 0 => format!(
      "You are an SEO editor. Propose a revised heading structure (H1/H2/H3) for the article, in {language}.\n\n\
       {header}\n\n\
       The reviewer edited the previous structure and added notes:\n---\n{feedback}\n---\n\n\
       Follow the reviewer's version as closely as possible and reconcile it with the research report.\n\n\
       RESEARCH REPORT:\n{report}\n\n{footer}"
    ),
    _ => format!(
      "You are an SEO editor. Propose the heading structure of an article, in {language}, based on the research report.\n\n\
       {header}\n\n\
       REQUIREMENTS:\n\
       - The H1 contains the primary keyword\n\
       - One H1, 3-6 H2s, optional H3s under H2s\n\
       - Concrete, search-friendly headings\n\n\
       RESEARCH REPORT:\n{report}\n\n{footer}"
    ),
  }
}

/// Inputs of one Writer generation.
#[derive(Debug, Clone, Copy)]
pub struct WriterPrompt<'a> {
  pub state: &'a WorkflowState,
  pub context: &'a str,
  pub exemplars: &'a [String],
  pub min_words: usize,
  pub meta_min: usize,
  pub meta_max: usize,
  /// Reviewer feedback and current draft; switches to targeted revision.
  pub revision: Option<(&'a str, &'a str)>,
}

impl WriterPrompt<'_> {
  pub fn render(&self) -> String {
    let primary = self.state.primary_keyword();
    let exemplars = if self.exemplars.is_empty() {
      String::new()
    } else {
      format!(
        "## STYLE EXEMPLARS\nThe fragments below show the desired writing style. \
         Match the tone, do not copy the content.\n\n{}\n\n---\n\n",
        self.exemplars.join("\n\n---\n\n")
      )
    };
    let requirements = format!(
      "- Primary keyword \"{primary}\" in the H1 and in the first paragraph\n\
       - Exactly one line starting with \"Meta-description:\" holding {min}-{max} characters\n\
       - At least {words} words, not counting headings and the meta-description\n\
       - Heading hierarchy: # H1, ## H2, ### H3",
      min = self.meta_min,
      max = self.meta_max,
      words = self.min_words,
    );

    match self.revision {
      Some((feedback, draft)) => format!(
        "{context}\n\nYou are an editor. The reviewer rejected the draft and pointed at sections to fix.\n\n\
         {exemplars}## TASK\nRevise ONLY the flagged sections. Keep every other section verbatim.\n\n\
         ## REVIEWER FEEDBACK\n{feedback}\n\n\
         ## CURRENT DRAFT\n{draft}\n\n\
         ## REQUIREMENTS (must hold after the revision)\n{requirements}\n\n\
         Return the WHOLE article (revised and unchanged sections).",
        context = self.context,
      ),
      None => {
        let secondary = if self.state.keywords.len() > 1 {
          self.state.keywords[1..].join(", ")
        } else {
          "none".to_string()
        };
        format!(
          "{context}\n\n{exemplars}## TOPIC\n{topic}\n\n\
           ## KEYWORDS\nPrimary: {primary}\nSecondary: {secondary}\n\n\
           ## HEADING STRUCTURE (mandatory)\n{outline}\n\n\
           ## RESEARCH REPORT\n{report}\n\n\
           ## REQUIREMENTS\n{requirements}\n\
           - Weave keywords in naturally, no keyword stuffing\n\n\
           Write the complete blog article in Markdown.",
          context = self.context,
          topic = self.state.topic,
          outline = self.state.heading_structure.as_deref().unwrap_or_default(),
          report = truncate_chars(
            self.state.research_report.as_deref().unwrap_or_default(),
            WRITER_REPORT_EXCERPT,
          ),
        )
      }
    }
  }
}
