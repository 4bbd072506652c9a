//! `ota apply`: run a full update session against the real collaborators.

use crate::ui::TerminalReporter;
use anyhow::{Context, Result, bail};
use ota_core::engine::ClientProcessEngine;
use ota_core::legacy::RecoveryCommandInstaller;
use ota_core::{Config, UpdateOrchestrator};
use ota_schema::{Outcome, UpdatePackage};
use std::path::Path;
use std::sync::Arc;

pub async fn apply(package: &Path, extract: bool, engine: Option<String>, quiet: bool) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if extract {
        config.extract_before_apply = true;
    }
    if let Some(program) = engine {
        config.engine.program = program;
    }
    tracing::debug!("Effective configuration: {config:?}");

    let package = UpdatePackage::from_path(package)
        .with_context(|| format!("Failed to open {}", package.display()))?;

    let engine = ClientProcessEngine::from_config(&config.engine)?;
    let installer = RecoveryCommandInstaller::from_config(&config.recovery);
    let reporter = Arc::new(TerminalReporter::new(quiet));

    let orchestrator =
        UpdateOrchestrator::new(config, Arc::new(engine), Arc::new(installer), reporter);
    let handle = orchestrator.start(package)?;

    match handle.wait().await {
        Some(Outcome::Success { .. }) => Ok(()),
        Some(Outcome::Failure { code, message }) => bail!("update failed ({code}): {message}"),
        None => bail!("engine stopped reporting before the update completed"),
    }
}
