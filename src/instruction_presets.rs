use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named review style whose instructions go into the system prompt
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InstructionPreset {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub emoji: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstructionPresetLibrary {
    presets: HashMap<String, InstructionPreset>,
}

impl Default for InstructionPresetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn preset(name: &str, description: &str, emoji: &str, instructions: &str) -> InstructionPreset {
    InstructionPreset {
        name: name.to_string(),
        description: description.to_string(),
        instructions: instructions.to_string(),
        emoji: emoji.to_string(),
    }
}

impl InstructionPresetLibrary {
    pub fn new() -> Self {
        let mut presets = HashMap::new();

        presets.insert(
            "default".to_string(),
            preset(
                "Default",
                "Balanced, professional review",
                "📝",
                "Review the change for correctness, clarity and risk. Point out concrete problems with file and line references, and keep praise brief.",
            ),
        );

        presets.insert(
            "security".to_string(),
            preset(
                "Security",
                "Focus on vulnerabilities and unsafe patterns",
                "🔒",
                "Prioritize security issues: injection, authentication and authorization flaws, unsafe deserialization, data exposure, secrets handling and insecure defaults. Explain the exploit path for each finding.",
            ),
        );

        presets.insert(
            "performance".to_string(),
            preset(
                "Performance",
                "Look for hot paths and wasted work",
                "⚡",
                "Focus on algorithmic complexity, unnecessary allocations and copies, blocking calls on hot paths, N+1 access patterns and resource leaks. Suggest measurable improvements.",
            ),
        );

        presets.insert(
            "readability".to_string(),
            preset(
                "Readability",
                "Naming, structure and maintainability",
                "📖",
                "Focus on naming, function size, duplication, error messages and how easily a new contributor could follow the change. Suggest specific refactorings.",
            ),
        );

        presets.insert(
            "concise".to_string(),
            preset(
                "Concise",
                "Only the findings that matter",
                "🎯",
                "List only actionable findings ordered by severity. No summaries, no praise, one or two sentences per finding.",
            ),
        );

        presets.insert(
            "thorough".to_string(),
            preset(
                "Thorough",
                "Exhaustive multi-dimensional review",
                "🔍",
                "Cover correctness, security, performance, error handling, tests, documentation and API design. Group findings by dimension and rate each by severity.",
            ),
        );

        Self { presets }
    }

    pub fn get_preset(&self, key: &str) -> Option<&InstructionPreset> {
        self.presets.get(key)
    }

    /// Look up a preset, falling back to `default` for unknown keys
    pub fn get_or_default(&self, key: &str) -> InstructionPreset {
        self.get_preset(key)
            .or_else(|| self.get_preset("default"))
            .cloned()
            .unwrap_or_else(|| preset("Default", "", "📝", ""))
    }

    pub fn list_presets(&self) -> Vec<(&String, &InstructionPreset)> {
        let mut presets: Vec<_> = self.presets.iter().collect();
        presets.sort_by(|a, b| {
            if a.0 == "default" {
                std::cmp::Ordering::Less
            } else if b.0 == "default" {
                std::cmp::Ordering::Greater
            } else {
                a.1.name.cmp(&b.1.name)
            }
        });
        presets
    }
}

pub fn get_instruction_preset_library() -> InstructionPresetLibrary {
    InstructionPresetLibrary::new()
}

pub fn list_presets_formatted(library: &InstructionPresetLibrary) -> String {
    library
        .list_presets()
        .iter()
        .map(|(key, preset)| {
            format!(
                "{} - {} - {} - {}",
                key, preset.emoji, preset.name, preset.description
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}
