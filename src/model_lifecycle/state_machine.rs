//! The ensure-running state machine (spec.md §4.4 diagram).

use super::{ActiveBackend, BackendKind, ModelLifecycleError, ModelLifecycleManager};
use std::time::Duration;

pub async fn run(manager: &ModelLifecycleManager) -> Result<ActiveBackend, ModelLifecycleError> {
    let cfg = manager.config();

    if manager.is_running().await {
        tracing::info!("model_lifecycle: backend already healthy at {}", cfg.base_url);
        return Ok(ActiveBackend {
            kind: BackendKind::Native,
            base_url: cfg.base_url.clone(),
            managed_by_us: false,
        });
    }

    if !cfg.auto_start {
        tracing::warn!(
            "model_lifecycle: backend unreachable at {} and auto_start is disabled",
            cfg.base_url
        );
        return Err(ModelLifecycleError::NotRunningAndAutoStartDisabled {
            base_url: cfg.base_url.clone(),
        });
    }

    if manager.native_available().await {
        tracing::info!("model_lifecycle: spawning native backend binary");
        manager.spawn_native().await?;
        wait_healthy(manager).await?;
        tracing::info!("model_lifecycle: native backend healthy at {}", cfg.base_url);
        return Ok(ActiveBackend {
            kind: BackendKind::Native,
            base_url: cfg.base_url.clone(),
            managed_by_us: true,
        });
    }

    if manager.container_runtime_available().await {
        tracing::info!("model_lifecycle: starting containerized backend");
        manager.start_container().await?;
        wait_healthy(manager).await?;
        tracing::info!("model_lifecycle: containerized backend healthy at {}", cfg.base_url);
        return Ok(ActiveBackend {
            kind: BackendKind::Containerized,
            base_url: cfg.base_url.clone(),
            managed_by_us: true,
        });
    }

    tracing::error!(
        "model_lifecycle: no native binary or container runtime available for {}",
        cfg.base_url
    );
    Err(ModelLifecycleError::NoBackendAvailable {
        base_url: cfg.base_url.clone(),
    })
}

/// Poll `is_running` at `health_interval_ms` cadence until it succeeds or
/// `health_timeout_ms` elapses.
pub async fn wait_healthy(manager: &ModelLifecycleManager) -> Result<(), ModelLifecycleError> {
    let cfg = manager.config();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(cfg.health_timeout_ms);
    let interval = Duration::from_millis(cfg.health_interval_ms.max(1));

    loop {
        if manager.is_running().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ModelLifecycleError::HealthTimeout {
                base_url: cfg.base_url.clone(),
                timeout_ms: cfg.health_timeout_ms,
            });
        }
        tokio::time::sleep(interval).await;
    }
}
