//! Review context: everything the model is shown about the change under review.
//!
//! Built once before the studio starts. After that the only field that changes
//! is [`PrunedFiles`], and only from the reducer as prune results arrive.

use crate::instruction_presets::InstructionPreset;
use crate::tokens::TokenCounter;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use strum_macros::{Display, EnumIter, EnumString};

/// Review dimensions the user can ask the model to concentrate on
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum FocusArea {
    Security,
    Performance,
    Correctness,
    Readability,
    Tests,
    Documentation,
    ErrorHandling,
}

/// What the user wants out of the review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Free-form instruction appended to the preset
    pub instruction: Option<String>,
    /// Areas to concentrate on
    pub focus: BTreeSet<FocusArea>,
    /// Things the model should not comment on
    pub avoid: Vec<String>,
    /// Whether the model may consult the web
    pub web_search: bool,
}

impl Intent {
    pub fn is_empty(&self) -> bool {
        self.instruction.as_deref().is_none_or(|i| i.trim().is_empty())
            && self.focus.is_empty()
            && self.avoid.is_empty()
            && !self.web_search
    }
}

/// A secret found in the diff by the upstream scanner.
///
/// Only the location and kind are kept; the value never reaches the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedSecret {
    pub path: String,
    pub line: usize,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("File is not part of the review context: {0}")]
    UnknownFile(String),
}

/// Path to one-sentence summary for files whose content was replaced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedFiles(BTreeMap<String, String>);

impl PrunedFiles {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Everything handed to the model for one review session
#[derive(Debug, Clone, Default)]
pub struct ReviewContext {
    pub diff: String,
    pub files: BTreeMap<String, String>,
    pub ignored: Vec<String>,
    pub secrets: Vec<DetectedSecret>,
    pub intent: Intent,
    pruned: PrunedFiles,
    preset_instructions: String,
    prompt: String,
    token_estimate: usize,
}

impl ReviewContext {
    pub fn new(diff: impl Into<String>, files: BTreeMap<String, String>) -> Self {
        Self {
            diff: diff.into(),
            files,
            ..Self::default()
        }
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<DetectedSecret>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn pruned(&self) -> &PrunedFiles {
        &self.pruned
    }

    pub fn is_pruned(&self, path: &str) -> bool {
        self.pruned.contains(path)
    }

    /// Record a summary for `path`. Only files present in the context can be pruned.
    pub fn set_pruned(
        &mut self,
        path: &str,
        summary: impl Into<String>,
    ) -> Result<(), ContextError> {
        if !self.files.contains_key(path) {
            return Err(ContextError::UnknownFile(path.to_string()));
        }
        self.pruned.0.insert(path.to_string(), summary.into());
        Ok(())
    }

    /// Reinstate a file's full content. Returns whether it was pruned.
    pub fn unprune(&mut self, path: &str) -> bool {
        self.pruned.0.remove(path).is_some()
    }

    /// The last assembled prompt
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn token_estimate(&self) -> usize {
        self.token_estimate
    }

    /// Assemble the system prompt for `preset` and refresh the token estimate
    pub fn assemble_prompt(&mut self, preset: &InstructionPreset, counter: &TokenCounter) {
        self.preset_instructions.clone_from(&preset.instructions);
        self.rebuild_prompt(counter);
    }

    /// Re-render the prompt with the current pruned set
    pub fn rebuild_prompt(&mut self, counter: &TokenCounter) {
        self.prompt = self.render_prompt();
        self.token_estimate = counter.count_tokens(&self.prompt);
    }

    fn render_prompt(&self) -> String {
        let mut out = String::new();

        out.push_str("You are an experienced code reviewer.\n");
        if !self.preset_instructions.is_empty() {
            let _ = writeln!(out, "\n{}", self.preset_instructions);
        }

        if !self.intent.is_empty() {
            out.push_str("\n## Reviewer intent\n");
            if let Some(instruction) = self
                .intent
                .instruction
                .as_deref()
                .filter(|i| !i.trim().is_empty())
            {
                let _ = writeln!(out, "{}", instruction.trim());
            }
            if !self.intent.focus.is_empty() {
                let areas: Vec<String> = self.intent.focus.iter().map(ToString::to_string).collect();
                let _ = writeln!(out, "Focus on: {}", areas.join(", "));
            }
            for avoid in &self.intent.avoid {
                let _ = writeln!(out, "Do not comment on: {avoid}");
            }
            if self.intent.web_search {
                out.push_str("You may search the web for library documentation or advisories.\n");
            }
        }

        if !self.secrets.is_empty() {
            out.push_str("\n## Possible secrets\n");
            out.push_str("The following locations look like credentials. Flag them, never repeat their values.\n");
            for secret in &self.secrets {
                let _ = writeln!(out, "- {}:{} ({})", secret.path, secret.line, secret.kind);
            }
        }

        if !self.ignored.is_empty() {
            out.push_str("\n## Ignored files\n");
            for path in &self.ignored {
                let _ = writeln!(out, "- {path}");
            }
        }

        if !self.files.is_empty() {
            out.push_str("\n## Files\n");
            for (path, content) in &self.files {
                match self.pruned.get(path) {
                    Some(summary) => {
                        let _ = writeln!(out, "\n### {path}\n[pruned] {summary}");
                    }
                    None => {
                        let _ = writeln!(out, "\n### {path}\n```\n{content}\n```");
                    }
                }
            }
        }

        if !self.diff.trim().is_empty() {
            let _ = write!(out, "\n## Diff\n```diff\n{}\n```\n", self.diff.trim_end());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_presets::get_instruction_preset_library;

    fn sample() -> ReviewContext {
        let mut files = BTreeMap::new();
        files.insert("src/a.rs".to_string(), "fn a() {}\n".repeat(50));
        files.insert("src/b.rs".to_string(), "fn b() {}".to_string());
        ReviewContext::new("+fn a() {}", files)
    }

    #[test]
    fn test_prune_unknown_file_rejected() {
        let mut ctx = sample();
        assert_eq!(
            ctx.set_pruned("missing.rs", "nothing"),
            Err(ContextError::UnknownFile("missing.rs".to_string()))
        );
        assert!(ctx.pruned().is_empty());
    }

    #[test]
    fn test_pruned_summary_replaces_content() {
        let counter = TokenCounter::new();
        let preset = get_instruction_preset_library().get_or_default("default");
        let mut ctx = sample();
        ctx.assemble_prompt(&preset, &counter);
        let full = ctx.token_estimate();
        assert!(ctx.prompt().contains("fn a() {}"));

        ctx.set_pruned("src/a.rs", "Defines a no-op function.")
            .expect("file exists");
        ctx.rebuild_prompt(&counter);

        assert!(ctx.prompt().contains("[pruned] Defines a no-op function."));
        assert!(ctx.token_estimate() < full);

        assert!(ctx.unprune("src/a.rs"));
        assert!(!ctx.unprune("src/a.rs"));
        ctx.rebuild_prompt(&counter);
        assert_eq!(ctx.token_estimate(), full);
    }

    #[test]
    fn test_secret_locations_listed() {
        let counter = TokenCounter::new();
        let preset = get_instruction_preset_library().get_or_default("security");
        let mut ctx = sample().with_secrets(vec![DetectedSecret {
            path: "src/b.rs".to_string(),
            line: 3,
            kind: "aws-access-key".to_string(),
        }]);
        ctx.assemble_prompt(&preset, &counter);
        assert!(ctx.prompt().contains("- src/b.rs:3 (aws-access-key)"));
    }

    #[test]
    fn test_focus_area_parsing() {
        assert_eq!("error-handling".parse::<FocusArea>().ok(), Some(FocusArea::ErrorHandling));
        assert_eq!("SECURITY".parse::<FocusArea>().ok(), Some(FocusArea::Security));
        assert_eq!(FocusArea::ErrorHandling.to_string(), "error-handling");
    }
}
