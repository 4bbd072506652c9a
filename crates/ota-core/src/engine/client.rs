//! Engine adapter backed by an `update_engine_client`-style child process.
//!
//! The client prints one line per callback:
//!
//! ```text
//! onStatusUpdate(UPDATE_STATUS_DOWNLOADING (3), 0.421)
//! onPayloadApplicationComplete(ErrorCode::kSuccess (0))
//! ```
//!
//! Only the numeric codes are trusted; names are informational. A process
//! that exits without a completion line is reported as a generic `Error`
//! completion so the session always terminates.

use super::{ApplyRequest, EngineCallback, PayloadEngine};
use crate::config::EngineConfig;
use crate::error::OtaError;
use async_trait::async_trait;
use ota_schema::{EngineErrorCode, EngineStatus};
use regex::Regex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Parses client output lines into engine callbacks.
#[derive(Debug, Clone)]
pub struct LineParser {
    status: Regex,
    complete: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, OtaError> {
        let status = Regex::new(r"onStatusUpdate\(\s*[^()]*\(\s*(-?\d+)\s*\)\s*,\s*([-+0-9.eE]+)\s*\)")
            .map_err(|e| OtaError::Config(e.to_string()))?;
        let complete =
            Regex::new(r"onPayloadApplicationComplete\(\s*[^()]*\(\s*(-?\d+)\s*\)\s*\)")
                .map_err(|e| OtaError::Config(e.to_string()))?;
        Ok(Self { status, complete })
    }

    pub fn parse_status(&self, line: &str) -> Option<(EngineStatus, f32)> {
        let caps = self.status.captures(line)?;
        let code = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let fraction = caps.get(2)?.as_str().parse::<f32>().ok()?;
        Some((EngineStatus::from_code(code), fraction))
    }

    pub fn parse_complete(&self, line: &str) -> Option<EngineErrorCode> {
        let caps = self.complete.captures(line)?;
        let code = caps.get(1)?.as_str().parse::<i32>().ok()?;
        Some(EngineErrorCode::from_code(code))
    }
}

/// Drives the engine by spawning its command-line client.
#[derive(Debug, Clone)]
pub struct ClientProcessEngine {
    program: String,
    args: Vec<String>,
    parser: Arc<LineParser>,
}

impl ClientProcessEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self, OtaError> {
        Ok(Self {
            program: program.into(),
            args,
            parser: Arc::new(LineParser::new()?),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, OtaError> {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Full argument list for one apply call.
    pub fn command_args(&self, request: &ApplyRequest) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("--payload={}", request.source_uri));
        args.push(format!("--offset={}", request.offset));
        args.push(format!("--size={}", request.size));
        args.push(format!("--headers={}", request.headers.join("\n")));
        args
    }
}

#[async_trait]
impl PayloadEngine for ClientProcessEngine {
    async fn apply_payload(
        &self,
        request: ApplyRequest,
        callback: EngineCallback,
    ) -> Result<(), OtaError> {
        let args = self.command_args(&request);
        tracing::debug!("Spawning {} {:?}", self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| {
                OtaError::context("Failed to start engine client", format!("{}: {e}", self.program))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OtaError::context("Failed to start engine client", "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OtaError::context("Failed to start engine client", "stderr not captured"))?;

        let parser = Arc::clone(&self.parser);
        tokio::spawn(async move {
            let mut out_lines = BufReader::new(stdout).lines();
            let mut err_lines = BufReader::new(stderr).lines();
            let mut out_open = true;
            let mut err_open = true;
            let mut completed = false;

            // One task reads both streams so callbacks stay serialized.
            while out_open || err_open {
                let line = tokio::select! {
                    line = out_lines.next_line(), if out_open => match line {
                        Ok(Some(line)) => line,
                        _ => {
                            out_open = false;
                            continue;
                        }
                    },
                    line = err_lines.next_line(), if err_open => match line {
                        Ok(Some(line)) => line,
                        _ => {
                            err_open = false;
                            continue;
                        }
                    },
                };

                if completed {
                    continue;
                }
                if let Some((status, fraction)) = parser.parse_status(&line) {
                    callback.on_status_update(status, fraction).await;
                } else if let Some(code) = parser.parse_complete(&line) {
                    completed = true;
                    callback.on_payload_application_complete(code).await;
                } else {
                    tracing::trace!("engine client: {line}");
                }
            }

            match child.wait().await {
                Ok(status) if !completed => {
                    tracing::warn!("Engine client exited ({status}) without reporting completion");
                    callback
                        .on_payload_application_complete(EngineErrorCode::Error)
                        .await;
                }
                Err(e) if !completed => {
                    tracing::warn!("Failed to reap engine client: {e}");
                    callback
                        .on_payload_application_complete(EngineErrorCode::Error)
                        .await;
                }
                Ok(status) => tracing::debug!("Engine client exited ({status})"),
                Err(e) => tracing::debug!("Failed to reap engine client: {e}"),
            }
        });

        Ok(())
    }
}
