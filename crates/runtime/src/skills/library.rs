//! SkillLibrary: disk-backed, hot-reloading skill selection.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;

use super::frontmatter;
use super::types::{SelectionReason, Skill, SkillActivation, SkillError, SkillUsageRecord};

struct CachedSkill {
    skill: Skill,
    mtime: SystemTime,
}

/// Selects Markdown skills by explicit mention or keyword match, resolves
/// `requires` dependencies, and expands a primary skill's `pipeline`.
pub struct SkillLibrary {
    load_paths: Vec<PathBuf>,
    usage_log_path: PathBuf,
    cache: RwLock<HashMap<PathBuf, CachedSkill>>,
}

impl SkillLibrary {
    pub fn new(load_paths: Vec<PathBuf>, usage_log_path: PathBuf) -> Self {
        Self {
            load_paths,
            usage_log_path,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Reread disk, honoring the mtime cache — a skill file is reparsed only
    /// when its mtime has changed since the last load.
    pub fn list(&self) -> Result<Vec<Skill>, SkillError> {
        let mut found_paths = HashSet::new();

        for dir in &self.load_paths {
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(dir).map_err(|e| SkillError::Io(e.to_string()))?;
            for entry in entries {
                let entry = entry.map_err(|e| SkillError::Io(e.to_string()))?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                found_paths.insert(path.clone());
                self.load_if_stale(&path)?;
            }
        }

        let cache = self.cache.read();
        Ok(cache
            .iter()
            .filter(|(path, _)| found_paths.contains(*path))
            .map(|(_, cached)| cached.skill.clone())
            .collect())
    }

    fn load_if_stale(&self, path: &Path) -> Result<(), SkillError> {
        let metadata = std::fs::metadata(path).map_err(|e| SkillError::Io(e.to_string()))?;
        let mtime = metadata.modified().map_err(|e| SkillError::Io(e.to_string()))?;

        if let Some(cached) = self.cache.read().get(path) {
            if cached.mtime == mtime {
                return Ok(());
            }
        }

        let content = std::fs::read_to_string(path).map_err(|e| SkillError::Io(e.to_string()))?;
        let fallback_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let (front_matter, body) = frontmatter::parse(&content, &fallback_name);

        let skill = Skill {
            front_matter,
            body,
            path: path.to_path_buf(),
        };
        self.cache
            .write()
            .insert(path.to_path_buf(), CachedSkill { skill, mtime });
        Ok(())
    }

    /// Select skills relevant to `text`. Returns activations in priority
    /// order: the primary skill first, then its resolved `requires`, then
    /// any `pipeline` steps.
    pub fn select_for_message(&self, text: &str) -> Result<Vec<SkillActivation>, SkillError> {
        let skills = self.list()?;
        if skills.is_empty() {
            return Ok(Vec::new());
        }

        let lower = text.to_lowercase();

        let mut primary: Option<(&Skill, f64, SelectionReason)> = None;
        for skill in &skills {
            let mention = format!("${}", skill.name());
            if lower.contains(&mention.to_lowercase()) {
                primary = Some((skill, 1.0, SelectionReason::ExplicitMention));
                break;
            }
        }
        if primary.is_none() {
            for skill in &skills {
                if lower.contains(&skill.name().to_lowercase()) {
                    primary = Some((skill, 1.0, SelectionReason::ExplicitMention));
                    break;
                }
            }
        }

        if primary.is_none() {
            let mut best: Option<(&Skill, f64)> = None;
            for skill in &skills {
                let score = tf_idf_score(&lower, skill, &skills);
                if score > 0.0 && best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                    best = Some((skill, score));
                }
            }
            primary = best.map(|(s, score)| (s, score, SelectionReason::KeywordMatch));
        }

        let Some((primary_skill, primary_score, reason)) = primary else {
            return Ok(Vec::new());
        };

        let mut activations = vec![SkillActivation {
            name: primary_skill.name().to_string(),
            score: primary_score,
            reason,
        }];

        let by_name: HashMap<&str, &Skill> = skills.iter().map(|s| (s.name(), s)).collect();

        match resolve_requires(primary_skill, &by_name) {
            Ok(deps) => {
                for dep in deps {
                    activations.push(SkillActivation {
                        name: dep,
                        score: primary_score,
                        reason: SelectionReason::Dependency,
                    });
                }
            }
            Err(_cycle) => {
                // Fall back to the primary alone; dependencies are dropped.
            }
        }

        for step in &primary_skill.front_matter.pipeline {
            activations.push(SkillActivation {
                name: step.clone(),
                score: primary_score,
                reason: SelectionReason::Pipeline,
            });
        }

        Ok(activations)
    }

    pub async fn record_use(&self, skill_name: &str, session_id: &str, ts: u64) -> Result<(), SkillError> {
        let record = SkillUsageRecord {
            ts,
            skill: skill_name.to_string(),
            session_id: session_id.to_string(),
        };
        let mut line = serde_json::to_string(&record).map_err(|e| SkillError::Io(e.to_string()))?;
        line.push('\n');

        if let Some(parent) = self.usage_log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SkillError::Io(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.usage_log_path)
            .await
            .map_err(|e| SkillError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SkillError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| SkillError::Io(e.to_string()))?;
        Ok(())
    }
}

fn resolve_requires(root: &Skill, by_name: &HashMap<&str, &Skill>) -> Result<Vec<String>, SkillError> {
    let mut path = HashSet::new();
    let mut done = HashSet::new();
    let mut ordered = Vec::new();
    visit(root, by_name, &mut path, &mut done, &mut ordered)?;
    ordered.retain(|n| n != root.name());
    Ok(ordered)
}

/// `path` tracks the current recursion stack (cycle detection); `done`
/// tracks every skill already fully resolved (sibling dedup). A diamond —
/// two branches both requiring the same skill — hits `done` and stops
/// without error; only a skill reappearing on `path` is a true cycle.
fn visit(
    skill: &Skill,
    by_name: &HashMap<&str, &Skill>,
    path: &mut HashSet<String>,
    done: &mut HashSet<String>,
    ordered: &mut Vec<String>,
) -> Result<(), SkillError> {
    if !path.insert(skill.name().to_string()) {
        return Err(SkillError::SkillCycle(skill.name().to_string()));
    }
    if !done.contains(skill.name()) {
        for dep_name in &skill.front_matter.requires {
            if let Some(dep) = by_name.get(dep_name.as_str()) {
                visit(dep, by_name, path, done, ordered)?;
            }
            if !ordered.iter().any(|n| n == dep_name) {
                ordered.push(dep_name.clone());
            }
        }
        done.insert(skill.name().to_string());
    }
    path.remove(skill.name());
    Ok(())
}

/// A simple TF-IDF-style relevance score of `query` tokens against a skill's
/// description and tags, with IDF computed across the full skill set.
fn tf_idf_score(query: &str, skill: &Skill, corpus: &[Skill]) -> f64 {
    let query_tokens: Vec<String> = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let doc_text = format!("{} {}", skill.front_matter.description, skill.front_matter.tags.join(" "));
    let doc_tokens = tokenize(&doc_text.to_lowercase());
    if doc_tokens.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    for term in &query_tokens {
        let tf = doc_tokens.iter().filter(|t| *t == term).count() as f64 / doc_tokens.len() as f64;
        if tf == 0.0 {
            continue;
        }
        let containing = corpus
            .iter()
            .filter(|s| {
                let text = format!("{} {}", s.front_matter.description, s.front_matter.tags.join(" ")).to_lowercase();
                tokenize(&text).contains(term)
            })
            .count()
            .max(1);
        let idf = ((corpus.len() as f64 + 1.0) / containing as f64).ln() + 1.0;
        score += tf * idf;
    }
    score
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_skill(dir: &Path, filename: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(filename)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn explicit_mention_wins_over_keyword_match() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "weather.md",
            "---\nname: weather\ndescription: get the weather forecast\n---\nBody",
        );
        write_skill(
            dir.path(),
            "notes.md",
            "---\nname: notes\ndescription: take notes\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("please use $notes for weather today").unwrap();
        assert_eq!(activations[0].name, "notes");
        assert_eq!(activations[0].reason, SelectionReason::ExplicitMention);
    }

    #[test]
    fn keyword_match_picks_highest_scoring_skill() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "weather.md",
            "---\nname: weather\ndescription: get the weather forecast\ntags: [weather, forecast]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "notes.md",
            "---\nname: notes\ndescription: take personal notes\ntags: [notes]\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("what is the weather forecast").unwrap();
        assert_eq!(activations[0].name, "weather");
    }

    #[test]
    fn requires_are_resolved_after_primary() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "weather.md",
            "---\nname: weather\ndescription: weather\nrequires: [geocoding]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "geocoding.md",
            "---\nname: geocoding\ndescription: geocoding\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("$weather please").unwrap();
        assert_eq!(activations[0].name, "weather");
        assert!(activations.iter().any(|a| a.name == "geocoding"));
    }

    #[test]
    fn cycle_falls_back_to_primary_alone() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "a.md",
            "---\nname: a\ndescription: a\nrequires: [b]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "b.md",
            "---\nname: b\ndescription: b\nrequires: [a]\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("$a now").unwrap();
        assert_eq!(activations.len(), 1);
        assert_eq!(activations[0].name, "a");
    }

    #[test]
    fn diamond_requires_resolve_without_false_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "top.md",
            "---\nname: top\ndescription: top\nrequires: [left, right]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "left.md",
            "---\nname: left\ndescription: left\nrequires: [shared]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "right.md",
            "---\nname: right\ndescription: right\nrequires: [shared]\n---\nBody",
        );
        write_skill(
            dir.path(),
            "shared.md",
            "---\nname: shared\ndescription: shared\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("$top now").unwrap();
        assert_eq!(activations[0].name, "top");
        assert!(activations.iter().any(|a| a.name == "left"));
        assert!(activations.iter().any(|a| a.name == "right"));
        assert_eq!(activations.iter().filter(|a| a.name == "shared").count(), 1);
    }

    #[test]
    fn pipeline_steps_follow_primary() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "report.md",
            "---\nname: report\ndescription: report\npipeline: [fetch, summarize]\n---\nBody",
        );

        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let activations = lib.select_for_message("$report").unwrap();
        assert_eq!(activations.len(), 3);
        assert_eq!(activations[1].name, "fetch");
        assert_eq!(activations[2].name, "summarize");
    }

    #[tokio::test]
    async fn record_use_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("skill_usage.jsonl");
        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], log_path.clone());
        lib.record_use("weather", "sess-1", 100).await.unwrap();
        lib.record_use("weather", "sess-1", 200).await.unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn hot_reload_picks_up_changed_mtime() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "x.md", "---\nname: x\ndescription: old\n---\nBody");
        let lib = SkillLibrary::new(vec![dir.path().to_path_buf()], dir.path().join("usage.jsonl"));
        let first = lib.list().unwrap();
        assert_eq!(first[0].front_matter.description, "old");

        std::thread::sleep(std::time::Duration::from_millis(20));
        write_skill(dir.path(), "x.md", "---\nname: x\ndescription: new\n---\nBody");
        let second = lib.list().unwrap();
        assert_eq!(second[0].front_matter.description, "new");
    }
}
