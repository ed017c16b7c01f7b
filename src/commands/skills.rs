use std::path::Path;

use picoagent_runtime::config;
use picoagent_runtime::SkillLibrary;

use super::setup::{skill_usage_path, skills_dir};
use crate::{EXIT_CONFIG_ERROR, EXIT_OK, EXIT_USER_ERROR};

fn library(config: &picoagent_runtime::Config, home: &Path) -> SkillLibrary {
    SkillLibrary::new(vec![skills_dir(config)], skill_usage_path(home))
}

pub async fn import(path: &str) -> i32 {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let source = Path::new(path);
    let target_dir = skills_dir(&config);
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("error: could not create skills directory: {e}");
        return EXIT_CONFIG_ERROR;
    }

    let entries: Vec<std::path::PathBuf> = if source.is_dir() {
        match std::fs::read_dir(source) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
                .collect(),
            Err(e) => {
                eprintln!("error: {e}");
                return EXIT_USER_ERROR;
            }
        }
    } else if source.extension().and_then(|e| e.to_str()) == Some("md") {
        vec![source.to_path_buf()]
    } else {
        eprintln!("error: '{path}' is neither a Markdown file nor a directory of them");
        return EXIT_USER_ERROR;
    };

    if entries.is_empty() {
        println!("no Markdown skill files found at '{path}'");
        return EXIT_USER_ERROR;
    }

    let mut copied = 0;
    for entry in &entries {
        let Some(name) = entry.file_name() else { continue };
        if let Err(e) = std::fs::copy(entry, target_dir.join(name)) {
            eprintln!("error copying {}: {e}", entry.display());
            continue;
        }
        copied += 1;
    }
    println!("imported {copied} skill(s) into {}", target_dir.display());
    EXIT_OK
}

/// Installing a skill from a `user/repo` reference requires network access
/// to a skill registry, out of scope for this build.
pub async fn install(repo: &str) -> i32 {
    println!("install-skill: not implemented in this build (contract-only).");
    println!("Fetch '{repo}' manually and run: picoagent import-skills <path>");
    EXIT_OK
}

pub async fn reload() -> i32 {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let library = library(&config, &home);
    match library.list() {
        Ok(skills) => {
            println!("reloaded {} skill(s) from {}", skills.len(), skills_dir(&config).display());
            for skill in skills {
                println!("  {} - {}", skill.name(), skill.front_matter.description);
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_USER_ERROR
        }
    }
}
