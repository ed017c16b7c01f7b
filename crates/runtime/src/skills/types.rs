//! Skill data model: front-matter, parsed skill, selection results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Front-matter header of a skill Markdown file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SkillFrontMatter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub pipeline: Vec<String>,
}

/// A fully parsed, in-memory skill.
#[derive(Debug, Clone)]
pub struct Skill {
    pub front_matter: SkillFrontMatter,
    pub body: String,
    pub path: PathBuf,
}

impl Skill {
    pub fn name(&self) -> &str {
        &self.front_matter.name
    }
}

/// One candidate produced by [`super::library::SkillLibrary::select_for_message`].
#[derive(Debug, Clone)]
pub struct SkillActivation {
    pub name: String,
    pub score: f64,
    pub reason: SelectionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    ExplicitMention,
    KeywordMatch,
    Dependency,
    Pipeline,
}

/// A single `skill_usage.jsonl` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillUsageRecord {
    pub ts: u64,
    pub skill: String,
    pub session_id: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SkillError {
    #[error("io error reading skill directory: {0}")]
    Io(String),

    #[error("malformed front matter in {path}: {reason}")]
    MalformedFrontMatter { path: String, reason: String },

    #[error("skill dependency cycle detected starting at '{0}'")]
    SkillCycle(String),
}
