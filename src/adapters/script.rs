// src/adapters/script.rs

//! External script adapter.
//!
//! Runs the per-council collection script in a child process, one per
//! request, bounded by the configured timeout. The script receives the
//! council name, then the plan's arguments, and prints a bins document.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use super::SourceAdapter;
use crate::error::{AppError, Result};
use crate::models::{AdapterConfig, DispatchPlan, RawCollection};
use crate::services::parse_adapter_output;

const FAILURE_CONTEXT: &str = "Script failed";

pub struct ScriptAdapter {
    config: AdapterConfig,
}

impl ScriptAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    fn command(&self, council: &str, plan: &DispatchPlan) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(council)
            .args(plan.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl SourceAdapter for ScriptAdapter {
    fn name(&self) -> &str {
        "script"
    }

    async fn execute(&self, council: &str, plan: &DispatchPlan) -> Result<Vec<RawCollection>> {
        let secs = self.config.timeout_secs;
        let started = Instant::now();
        log::debug!("Running script for {} with {:?}", council, plan.to_args());

        let output = tokio::time::timeout(
            Duration::from_secs(secs),
            self.command(council, plan).output(),
        )
        .await
        .map_err(|_| AppError::Timeout {
            context: format!("Script for {council}"),
            secs,
        })?
        .map_err(|e| {
            AppError::adapter(
                FAILURE_CONTEXT,
                format!("could not start {}: {}", self.config.program, e),
            )
        })?;

        log::info!(
            "Script for {} exited with {} in {:.1}s",
            council,
            output.status,
            started.elapsed().as_secs_f64()
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(AppError::adapter(FAILURE_CONTEXT, diagnostic));
        }

        parse_adapter_output(&stdout)
    }
}
