use picoagent_runtime::config;
use picoagent_runtime::memory::{PruneCriteria, DEFAULT_HALF_LIFE_SECS, DEFAULT_MAX_RECORDS};
use picoagent_runtime::{MemoryRecord, VectorMemory, VectorMemoryStore};

use super::setup::memory_path;
use crate::{EXIT_CONFIG_ERROR, EXIT_OK};

pub async fn prune(older_than_days: Option<u64>, min_score: Option<f32>) -> i32 {
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let path = memory_path(&home);
    if !path.exists() {
        println!("no memory file at {}; nothing to prune", path.display());
        return EXIT_OK;
    }

    let store = match VectorMemoryStore::load(&path, None, DEFAULT_HALF_LIFE_SECS, DEFAULT_MAX_RECORDS).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let before = store.len().await;
    let mut pruned = 0;

    if let Some(days) = older_than_days {
        pruned += store.prune(PruneCriteria::OlderThanSecs(days * 24 * 3600)).await;
    }
    if let Some(min_score) = min_score {
        pruned += store
            .prune(PruneCriteria::MinDecayedScore {
                min_score,
                now: MemoryRecord::now_secs(),
                half_life_secs: DEFAULT_HALF_LIFE_SECS,
            })
            .await;
    }

    if older_than_days.is_none() && min_score.is_none() {
        println!("nothing to do: pass --older-than and/or --min-score");
        return EXIT_OK;
    }

    if let Err(e) = store.save(&path).await {
        eprintln!("error: could not save pruned memory: {e}");
        return EXIT_CONFIG_ERROR;
    }

    println!("pruned {pruned} record(s); {} remain (was {before})", store.len().await);
    EXIT_OK
}
