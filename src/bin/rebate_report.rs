//! Print the current rebate page and dashboard as JSON.
//!
//! Usage: `rebate_report [config.json]`. Without an argument the config is
//! read from `~/.rebatedesk/config.json`; with no config file the local store
//! is used.

use std::path::PathBuf;
use std::process::ExitCode;

use rebatedesk_lib::session::RecoverySession;
use rebatedesk_lib::state::{build_collaborators, load_config, load_config_from, PreferenceStore};

async fn run() -> Result<serde_json::Value, String> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config_from(&PathBuf::from(path))?,
        None => load_config()?,
    };
    let collaborators = build_collaborators(&config)?;
    let preferences = PreferenceStore::new(PreferenceStore::default_path()?);

    let mut session = RecoverySession::new(
        collaborators,
        preferences,
        &config.user_key,
        config.batch_concurrency,
    );
    session.reload().await.map_err(|e| e.to_string())?;

    Ok(serde_json::json!({
        "page": session.get_filtered_page(),
        "dashboard": session.get_dashboard(),
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to render report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
