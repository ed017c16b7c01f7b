use picoagent_runtime::config;

use super::setup::load_threshold;
use crate::{EXIT_CONFIG_ERROR, EXIT_OK};

pub async fn run() -> i32 {
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let threshold = load_threshold(&home);
    let stats = threshold.stats();
    println!("tau:          {:.4}", stats.tau);
    println!("win_rate:     {:.4}", stats.win_rate);
    println!("sample_count: {}", stats.sample_count);
    EXIT_OK
}
