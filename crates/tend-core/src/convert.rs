use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::datetime::parse_ymd;
use crate::task::Priority;

/// What the text-understanding collaborator promises to return for a
/// free-form sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    title: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

/// Converts free-form text into a structured draft. A failed conversion
/// must leave the store untouched; implementations only read.
pub trait Convert {
    fn convert(&self, text: &str) -> anyhow::Result<ParsedDraft>;
}

/// Prompt sent to the collaborator. Today's date is included so relative
/// phrases ("tomorrow", "by Friday") resolve to concrete days.
pub fn build_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        "Convert the user's sentence into a to-do item.\n\
         Today is {today}.\n\
         Reply with JSON only, in this shape:\n\
         {{\n\
         \x20 \"title\": \"what to do\",\n\
         \x20 \"dueDate\": \"YYYY-MM-DD\" (only when a date is mentioned),\n\
         \x20 \"priority\": \"low\" | \"medium\" | \"high\" (judge from context)\n\
         }}\n\
         \n\
         Sentence: {text}\n"
    )
}

/// Parses the collaborator's reply. Tolerates a Markdown code fence around
/// the JSON, since chat-style services like to add one.
pub fn parse_reply(raw: &str) -> anyhow::Result<ParsedDraft> {
    let stripped = strip_code_fence(raw);
    let reply: RawReply =
        serde_json::from_str(stripped.trim()).context("conversion reply was not valid JSON")?;

    let title = reply.title.trim().to_string();
    if title.is_empty() {
        return Err(anyhow!("conversion reply had an empty title"));
    }

    let due_date = reply.due_date.as_deref().map(parse_ymd).transpose()?;
    let priority = reply
        .priority
        .as_deref()
        .map(|p| p.parse::<Priority>())
        .transpose()
        .context("conversion reply had an invalid priority")?;

    debug!(%title, ?due_date, ?priority, "parsed conversion reply");
    Ok(ParsedDraft {
        title,
        due_date,
        priority,
    })
}

fn strip_code_fence(raw: &str) -> String {
    let fence = match Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```") {
        Ok(re) => re,
        Err(err) => {
            warn!(error = %err, "code fence pattern failed to compile");
            return raw.to_string();
        }
    };

    match fence.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    }
}

/// Runs a user-configured command (`convert.command`), writing the prompt to
/// its stdin and reading the JSON reply from stdout. Whatever sits behind
/// that command — an API wrapper script, a local model — is the
/// collaborator's business.
#[derive(Debug, Clone)]
pub struct CommandConvert {
    command: String,
    today: NaiveDate,
}

impl CommandConvert {
    pub fn new(command: String, today: NaiveDate) -> Self {
        Self { command, today }
    }
}

impl Convert for CommandConvert {
    #[tracing::instrument(skip(self, text))]
    fn convert(&self, text: &str) -> anyhow::Result<ParsedDraft> {
        info!(command = %self.command, "running conversion command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run conversion command: {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(build_prompt(text, self.today).as_bytes())
                .context("failed writing prompt to conversion command")?;
        }

        let output = child
            .wait_with_output()
            .context("failed waiting for conversion command")?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!(command = %self.command, stderr = %stderr, "conversion command wrote stderr");
        }

        if !output.status.success() {
            return Err(anyhow!(
                "conversion command failed with status {}",
                output
                    .status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ));
        }

        parse_reply(&String::from_utf8_lossy(&output.stdout))
    }
}
