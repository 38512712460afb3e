//! Detects, starts, and monitors a local embedding backend and its model
//! (spec.md §4.4).
//!
//! Grounded in the teacher's `daemon::service::ContextDaemon` for the
//! spawn-detached-and-own-the-handle shape, and in
//! `adapters::providers::embedding::ollama` for the backend's HTTP surface
//! (`/api/tags`, `/api/show`, `/api/pull`) that this manager drives directly
//! instead of treating as an embedding call.

mod ndjson;
mod state_machine;

pub use ndjson::{PullProgress, PullRecord};
pub use state_machine::{ensure_running, wait_healthy};

use crate::adapters::http_client::SharedHttpClient;
use crate::infrastructure::constants::{MODEL_LIFECYCLE_HEALTH_POLL_INTERVAL, MODEL_LIFECYCLE_HEALTH_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Backend detection/start failures (spec.md §4.4, §7).
#[derive(Error, Debug)]
pub enum ModelLifecycleError {
    #[error("auto_start is disabled and no backend is running at {base_url}")]
    NotRunningAndAutoStartDisabled { base_url: String },

    #[error(
        "no embedding backend is available: neither a running service at {base_url}, a native \
         binary on PATH, nor a working container runtime were found. Install the native backend \
         or a container runtime (e.g. Docker/Podman) and retry."
    )]
    NoBackendAvailable { base_url: String },

    #[error("backend at {base_url} did not become healthy within {timeout_ms}ms")]
    HealthTimeout { base_url: String, timeout_ms: u64 },

    #[error("failed to spawn native backend binary {binary}: {source}")]
    SpawnFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start backend container: {0}")]
    ContainerStartFailed(String),

    #[error("model pull failed: {0}")]
    PullFailed(String),

    #[error("model metadata request failed: {0}")]
    MetadataFailed(String),
}

/// How aggressively the accelerator flag is applied when starting a
/// container backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GpuMode {
    /// Probe for an accelerator and add the flag only if one is found.
    #[default]
    Auto,
    /// Always add the accelerator flag, regardless of probe result.
    ExplicitAccelerator,
    /// Never add the accelerator flag.
    None,
}

/// Enumerated `ModelLifecycleManager` configuration (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub model: String,
    pub auto_start: bool,
    pub auto_stop: bool,
    pub backend_image: String,
    pub gpu: GpuMode,
    pub health_timeout_ms: u64,
    pub health_interval_ms: u64,
    pub base_url: String,
    /// Name of the native backend binary looked up via the OS's
    /// program-search command (`which`/`where`).
    pub native_binary: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            auto_start: true,
            auto_stop: true,
            backend_image: "backend/embeddings:latest".to_string(),
            gpu: GpuMode::Auto,
            health_timeout_ms: MODEL_LIFECYCLE_HEALTH_TIMEOUT.as_millis() as u64,
            health_interval_ms: MODEL_LIFECYCLE_HEALTH_POLL_INTERVAL.as_millis() as u64,
            base_url: "http://127.0.0.1:11434".to_string(),
            native_binary: "ollama".to_string(),
        }
    }
}

/// How the embedding backend is currently hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Native,
    Containerized,
}

/// The owned handle to whatever this manager started, if anything.
enum OwnedHandle {
    None,
    Process(Child),
    Container(String),
}

/// Current lifecycle state: which backend is active and whether this
/// manager owns its process/container handle.
pub struct ActiveBackend {
    pub kind: BackendKind,
    pub base_url: String,
    pub managed_by_us: bool,
}

/// Singleton-per-engine owner of at most one child process or container
/// handle (spec.md §3, §5). Transitions are linearised behind a single
/// mutex guarding the owned handle.
pub struct ModelLifecycleManager {
    config: LifecycleConfig,
    http_client: SharedHttpClient,
    handle: Mutex<OwnedHandle>,
}

impl ModelLifecycleManager {
    pub fn new(config: LifecycleConfig, http_client: SharedHttpClient) -> Self {
        Self {
            config,
            http_client,
            handle: Mutex::new(OwnedHandle::None),
        }
    }

    /// Detection priority 1: a backend already responds at `base_url`.
    pub async fn is_running(&self) -> bool {
        let client = self
            .http_client
            .client_with_timeout(Duration::from_secs(3))
            .unwrap_or_else(|_| self.http_client.client().clone());
        client
            .get(format!("{}/api/tags", self.config.base_url.trim_end_matches('/')))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    /// Detection priority 2: the native binary is discoverable on PATH.
    pub async fn native_available(&self) -> bool {
        let binary = self.config.native_binary.clone();
        tokio::task::spawn_blocking(move || which(&binary))
            .await
            .unwrap_or(false)
    }

    /// Detection priority 3: a container runtime is operational.
    pub async fn container_runtime_available(&self) -> bool {
        tokio::task::spawn_blocking(|| {
            for runtime in ["docker", "podman"] {
                if std::process::Command::new(runtime)
                    .arg("info")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .is_ok_and(|s| s.success())
                {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }

    /// Whether a GPU/accelerator is available, used when `gpu = auto`.
    async fn accelerator_available(&self) -> bool {
        tokio::task::spawn_blocking(|| {
            std::process::Command::new("nvidia-smi")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|s| s.success())
        })
        .await
        .unwrap_or(false)
    }

    /// Run the ensure-running state machine (spec.md §4.4 diagram).
    pub async fn ensure_running(&self) -> Result<ActiveBackend, ModelLifecycleError> {
        state_machine::run(self).await
    }

    /// Spawn the native binary detached, so it outlives this process if the
    /// parent exits uncleanly (spec.md §4.4: "must not prevent the parent
    /// from exiting").
    async fn spawn_native(&self) -> Result<(), ModelLifecycleError> {
        let child = Command::new(&self.config.native_binary)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| ModelLifecycleError::SpawnFailed {
                binary: self.config.native_binary.clone(),
                source,
            })?;
        *self.handle.lock().await = OwnedHandle::Process(child);
        Ok(())
    }

    async fn start_container(&self) -> Result<(), ModelLifecycleError> {
        let use_accelerator = match self.config.gpu {
            GpuMode::None => false,
            GpuMode::ExplicitAccelerator => true,
            GpuMode::Auto => self.accelerator_available().await,
        };

        let image = self.config.backend_image.clone();
        let name = format!("coderag-embed-{}", uuid::Uuid::new_v4());
        let base_url = self.config.base_url.clone();

        let output = {
            let name = name.clone();
            tokio::task::spawn_blocking(move || {
                let mut cmd = std::process::Command::new("docker");
                cmd.args(["run", "-d", "--name", &name, "-p", "11434:11434"]);
                if use_accelerator {
                    cmd.args(["--gpus", "all"]);
                }
                cmd.arg(&image);
                cmd.output()
            })
            .await
            .map_err(|e| ModelLifecycleError::ContainerStartFailed(e.to_string()))?
        };

        let output = output.map_err(|e| ModelLifecycleError::ContainerStartFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ModelLifecycleError::ContainerStartFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        let _ = base_url;
        *self.handle.lock().await = OwnedHandle::Container(name);
        Ok(())
    }

    /// Check whether `model` is present; if absent, pull it, invoking
    /// `on_progress` for every successfully parsed NDJSON record.
    pub async fn ensure_model(
        &self,
        model: &str,
        mut on_progress: impl FnMut(&PullRecord),
    ) -> Result<(), ModelLifecycleError> {
        let client = self
            .http_client
            .client_with_timeout(Duration::from_secs(5))
            .unwrap_or_else(|_| self.http_client.client().clone());
        let base = self.config.base_url.trim_end_matches('/');

        let show = client
            .post(format!("{base}/api/show"))
            .json(&serde_json::json!({ "name": model }))
            .send()
            .await;
        if let Ok(response) = show {
            if response.status().is_success() {
                tracing::debug!("model_lifecycle: model '{model}' already present");
                return Ok(());
            }
        }

        tracing::info!("model_lifecycle: pulling model '{model}'");
        let client = self
            .http_client
            .client_with_timeout(Duration::from_secs(600))
            .unwrap_or_else(|_| self.http_client.client().clone());
        let response = client
            .post(format!("{base}/api/pull"))
            .json(&serde_json::json!({ "name": model, "stream": true }))
            .send()
            .await
            .map_err(|e| ModelLifecycleError::MetadataFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModelLifecycleError::PullFailed(format!(
                "pull request returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ModelLifecycleError::PullFailed(e.to_string()))?;
        for record in ndjson::parse_stream(&body) {
            if let Some(error) = &record.error {
                tracing::error!("model_lifecycle: pull of '{model}' failed: {error}");
                return Err(ModelLifecycleError::PullFailed(error.clone()));
            }
            on_progress(&record);
        }
        tracing::info!("model_lifecycle: pull of '{model}' complete");
        Ok(())
    }

    /// If this manager started the backend, terminate it. Errors are
    /// swallowed per spec.md §4.4 ("the backend may already be gone").
    pub async fn stop(&self) {
        let mut handle = self.handle.lock().await;
        match std::mem::replace(&mut *handle, OwnedHandle::None) {
            OwnedHandle::None => {}
            OwnedHandle::Process(mut child) => {
                tracing::info!("model_lifecycle: stopping managed native process");
                let _ = child.kill().await;
            }
            OwnedHandle::Container(name) => {
                tracing::info!("model_lifecycle: stopping managed container {name}");
                let _ = tokio::task::spawn_blocking(move || {
                    std::process::Command::new("docker")
                        .args(["stop", &name])
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .status()
                })
                .await;
            }
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

fn which(binary: &str) -> bool {
    let search_cmd = if cfg!(windows) { "where" } else { "which" };
    std::process::Command::new(search_cmd)
        .arg(binary)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Shared-ownership handle suitable for injection into `HybridSearch` and
/// the MCP server builder.
pub type SharedModelLifecycleManager = Arc<ModelLifecycleManager>;
