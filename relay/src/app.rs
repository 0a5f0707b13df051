//! Command-line application

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::core::cli::{self, Commands};
use crate::core::config::RelayConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::{LocalTraceStore, StagedTrace};
use crate::upload::UploadBridge;

pub struct RelayApp;

impl RelayApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = RelayConfig::load(&cli_config)?;
        let store = LocalTraceStore::open(&config.staging_dir, &config.last_export_path)
            .context("Failed to open staging directory")?;

        match command.unwrap_or(Commands::Status) {
            Commands::Status => Self::print_status(&store),
            Commands::Flush { trace } => Self::flush(&config, &store, trace.as_deref()),
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    fn print_status(store: &LocalTraceStore) -> Result<()> {
        let staged = store.list_staged()?;

        println!("Staging directory: {}", store.root().display());
        println!("Last export file:  {}", store.last_export_path().display());
        println!();

        if staged.is_empty() {
            println!("No staged traces.");
            return Ok(());
        }

        for trace in &staged {
            println!("{}", format_staged(trace));
        }
        println!();
        println!("{} staged trace(s)", staged.len());
        Ok(())
    }

    fn flush(config: &RelayConfig, store: &LocalTraceStore, trace: Option<&str>) -> Result<()> {
        let targets = flush_targets(store, trace)?;
        if targets.is_empty() {
            println!("Nothing to flush.");
            return Ok(());
        }

        let bridge = UploadBridge::spawn_http(&config.upload, config.project_name.clone())
            .context("Failed to start upload worker")?;

        let mut incomplete = 0usize;
        for path in &targets {
            match bridge.upload_and_wait(path) {
                Ok(outcome) => {
                    if !outcome.is_uploaded() {
                        incomplete += 1;
                    }
                    println!("{}: {}", path.display(), outcome);
                }
                Err(e) => {
                    bridge.shutdown();
                    return Err(e).context("Upload aborted");
                }
            }
        }
        bridge.shutdown();

        if incomplete > 0 {
            bail!("{} of {} uploads did not complete", incomplete, targets.len());
        }
        Ok(())
    }
}

fn format_staged(trace: &StagedTrace) -> String {
    let modified = trace
        .modified
        .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let snapshot = trace
        .snapshot_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no snapshot)".to_string());
    format!(
        "{}  {} envelope(s)  {}  {}",
        trace.trace_id, trace.envelopes, modified, snapshot
    )
}

/// Snapshot files to upload: one trace when given, otherwise every staged snapshot
fn flush_targets(store: &LocalTraceStore, trace: Option<&str>) -> Result<Vec<PathBuf>> {
    match trace {
        Some(trace_id) => {
            let path = store.snapshot_path(trace_id)?;
            if !path.exists() {
                bail!("No staged snapshot for trace {}", trace_id);
            }
            Ok(vec![path])
        }
        None => Ok(store
            .list_staged()?
            .into_iter()
            .filter_map(|t| t.snapshot_path)
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn staged_store() -> (tempfile::TempDir, LocalTraceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            LocalTraceStore::open(dir.path().join("staging"), dir.path().join("tracer.json"))
                .unwrap();
        let doc = json!({"trace_id": "A"});
        store.append_line("A", &doc).unwrap();
        store.append_or_create_snapshot("A", &doc).unwrap();
        store.append_line("B", &doc).unwrap();
        (dir, store)
    }

    #[test]
    fn test_flush_targets_all_snapshots() {
        let (_dir, store) = staged_store();
        let targets = flush_targets(&store, None).unwrap();
        assert_eq!(targets, vec![store.snapshot_path("A").unwrap()]);
    }

    #[test]
    fn test_flush_targets_single_trace() {
        let (_dir, store) = staged_store();
        assert_eq!(
            flush_targets(&store, Some("A")).unwrap(),
            vec![store.snapshot_path("A").unwrap()]
        );
        let err = flush_targets(&store, Some("B")).unwrap_err();
        assert!(err.to_string().contains("No staged snapshot for trace B"));
        assert!(flush_targets(&store, Some("../x")).is_err());
    }

    #[test]
    fn test_format_staged() {
        let (_dir, store) = staged_store();
        let staged = store.list_staged().unwrap();
        let b = staged.iter().find(|t| t.trace_id == "B").unwrap();
        let line = format_staged(b);
        assert!(line.starts_with("B  1 envelope(s)"));
        assert!(line.ends_with("(no snapshot)"));
    }
}
