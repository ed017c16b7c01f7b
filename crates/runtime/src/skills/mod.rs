//! Skill selection: Markdown front-matter skills selected by explicit
//! mention or keyword match, with dependency and pipeline expansion.

pub mod frontmatter;
pub mod library;
pub mod types;

pub use library::SkillLibrary;
pub use types::{SelectionReason, Skill, SkillActivation, SkillError, SkillFrontMatter, SkillUsageRecord};
