use picoagent_runtime::config;
use picoagent_runtime::{SessionState, SessionStore};

use super::setup::sessions_path;
use crate::{EXIT_CONFIG_ERROR, EXIT_OK, EXIT_USER_ERROR};

pub async fn export(session_id: &str) -> i32 {
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let store = match SessionStore::load(sessions_path(&home)).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    match store.get(session_id).await {
        Some(session) => {
            println!("{}", serde_json::to_string_pretty(&session).expect("SessionState always serializes"));
            EXIT_OK
        }
        None => {
            eprintln!("error: no session '{session_id}'");
            EXIT_USER_ERROR
        }
    }
}

pub async fn import(file: &str) -> i32 {
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let contents = match std::fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_USER_ERROR;
        }
    };

    let session: SessionState = match serde_json::from_str(&contents) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: invalid session JSON: {e}");
            return EXIT_USER_ERROR;
        }
    };

    let store = match SessionStore::load(sessions_path(&home)).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let session_id = session.session_id.clone();
    match store.put(session).await {
        Ok(()) => {
            println!("imported session '{session_id}'");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_CONFIG_ERROR
        }
    }
}
