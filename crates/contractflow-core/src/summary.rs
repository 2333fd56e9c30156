//! Plain-language summary of the generated agreements
//!
//! The summarizer is asked for five fixed sections with exact headers. Its
//! answer is stripped of markdown and rendered line by line: a short
//! all-caps line without a period is a header, anything else is body text.
//! [`SummarySections`] offers a stricter reading that only accepts the known
//! headers.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, SummaryError};
use crate::mapping::FieldValues;

/// Section headers, in the order the summary must present them
pub const SECTION_HEADERS: [&str; 5] = [
    "OVERVIEW",
    "KEY TERMS",
    "TIMELINE",
    "FINANCIAL TERMS",
    "IMPORTANT CONSIDERATIONS",
];

/// Header lines are shorter than this (in characters, after trimming)
const MAX_HEADER_LEN: usize = 30;

lazy_static! {
    static ref MARKDOWN_HEADING: Regex = Regex::new(r"#{1,6}\s").unwrap();
}

/// External text-in/text-out summarization service
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Prompt asking for the fixed five-section layout
pub fn build_prompt(contract_text: &str) -> String {
    let mut prompt = String::from(
        "Analyze this contract and provide a structured summary. You MUST format your \
         response with these exact section headers in ALL CAPS followed by a blank line, \
         then the content:\n\n",
    );

    let guidance = [
        "[2-3 sentences summarizing the agreement]",
        "[Main obligations and important clauses]",
        "[Important dates - start date, end date, key milestones]",
        "[Payment amounts, values, compensation structure]",
        "[What signers need to know, risks, obligations]",
    ];
    for (header, hint) in SECTION_HEADERS.iter().zip(guidance) {
        prompt.push_str(header);
        prompt.push_str("\n\n");
        prompt.push_str(hint);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Contract text:\n");
    prompt.push_str(contract_text.trim());
    prompt.push_str(
        "\n\nCRITICAL: Use the exact headers shown above. Put each header on its own line \
         in ALL CAPS. Add a blank line after each header before the content. Write in clear, \
         professional language.",
    );
    prompt
}

/// Remove markdown heading markers and emphasis
pub fn strip_markdown(text: &str) -> String {
    MARKDOWN_HEADING
        .replace_all(text, "")
        .replace("**", "")
        .replace('*', "")
}

/// Ask `summarizer` for a summary of `contract_text`
pub async fn summarize<S>(summarizer: &S, contract_text: &str) -> Result<String, SummaryError>
where
    S: Summarizer + ?Sized,
{
    if contract_text.trim().is_empty() {
        return Err(SummaryError::EmptyInput);
    }

    let prompt = build_prompt(contract_text);
    debug!(prompt_len = prompt.len(), "Requesting summary");

    let raw = summarizer.complete(&prompt).await?;
    let summary = strip_markdown(&raw).trim().to_string();
    if summary.is_empty() {
        return Err(SummaryError::EmptySummary);
    }

    info!(summary_len = summary.len(), "Summary generated");
    Ok(summary)
}

/// Representative agreement text built from one row's values.
///
/// The well-known contract fields become a short narrative; every other
/// field follows as a `Label: value` line.
pub fn describe_agreement(values: &FieldValues) -> String {
    let get = |key: &str| values.get(key).map(String::as_str).unwrap_or("");
    let mut lines = Vec::new();
    let mut described: Vec<&str> = Vec::new();

    if values.contains_key("client_name") || values.contains_key("company_name") {
        lines.push(format!(
            "Contract between {} and {}",
            get("client_name"),
            get("company_name")
        ));
        described.extend(["client_name", "company_name"]);
    }
    if values.contains_key("start_date") || values.contains_key("end_date") {
        lines.push(format!(
            "Effective from {} to {}",
            get("start_date"),
            get("end_date")
        ));
        described.extend(["start_date", "end_date"]);
    }
    if values.contains_key("contract_value") {
        lines.push(format!("Contract value: {}", get("contract_value")));
        described.push("contract_value");
    }

    for (field, value) in values {
        if described.contains(&field.as_str()) || value.trim().is_empty() {
            continue;
        }
        lines.push(format!("{}: {}", field_label(field), value));
    }

    lines.join("\n")
}

/// `contract_date` -> `Contract date`
fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// How a summary line is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Header,
    Body,
    Blank,
}

/// Classify one summary line for display.
///
/// Headers are non-blank, already upper-case, under 30 characters once
/// trimmed, and contain no period. This misreads short shouting body lines
/// and misses headers that come back in mixed case.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if line == line.to_uppercase()
        && trimmed.chars().count() < MAX_HEADER_LEN
        && !line.contains('.')
    {
        LineKind::Header
    } else {
        LineKind::Body
    }
}

/// A rendered summary element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum SummaryBlock {
    Header(String),
    Paragraph(String),
}

/// Render a summary into headers and paragraphs, skipping blank lines
pub fn render(summary: &str) -> Vec<SummaryBlock> {
    summary
        .lines()
        .filter_map(|line| match classify_line(line) {
            LineKind::Header => Some(SummaryBlock::Header(line.to_string())),
            LineKind::Body => Some(SummaryBlock::Paragraph(line.to_string())),
            LineKind::Blank => None,
        })
        .collect()
}

/// One of the five known sections and its body text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub header: &'static str,
    pub body: String,
}

/// Summary read strictly against [`SECTION_HEADERS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummarySections {
    /// Text before the first recognized header
    pub preamble: String,
    pub sections: Vec<Section>,
}

impl SummarySections {
    /// Split on lines that equal a known header, ignoring case, surrounding
    /// whitespace and a trailing colon.
    pub fn parse(summary: &str) -> Self {
        let mut parsed = Self::default();
        let mut current: Option<Section> = None;

        for line in summary.lines() {
            if let Some(header) = known_header(line) {
                if let Some(section) = current.take() {
                    parsed.sections.push(section);
                }
                current = Some(Section {
                    header,
                    body: String::new(),
                });
                continue;
            }

            let target = match current.as_mut() {
                Some(section) => &mut section.body,
                None => &mut parsed.preamble,
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if !target.is_empty() {
                target.push('\n');
            }
            target.push_str(text);
        }

        if let Some(section) = current {
            parsed.sections.push(section);
        }
        parsed
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.header == header)
            .map(|s| s.body.as_str())
    }

    /// Known headers that never appeared
    pub fn missing(&self) -> Vec<&'static str> {
        SECTION_HEADERS
            .iter()
            .copied()
            .filter(|h| !self.sections.iter().any(|s| s.header == *h))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

fn known_header(line: &str) -> Option<&'static str> {
    let candidate = line.trim().trim_end_matches(':').trim();
    SECTION_HEADERS
        .iter()
        .copied()
        .find(|h| h.eq_ignore_ascii_case(candidate))
}
