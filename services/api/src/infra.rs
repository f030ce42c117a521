use citation_core::config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared state for the status routes. The service only reads the files a
/// run writes; it never holds a run's in-memory store.
#[derive(Clone)]
pub struct StatusState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) progress_path: PathBuf,
    pub(crate) ledger_path: PathBuf,
}

impl StatusState {
    pub fn new(
        metrics: PrometheusHandle,
        progress_path: impl Into<PathBuf>,
        ledger_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
            progress_path: progress_path.into(),
            ledger_path: ledger_path.into(),
        }
    }

    pub fn from_config(metrics: PrometheusHandle, config: &AppConfig) -> Self {
        Self::new(
            metrics,
            config.storage.progress_path.clone(),
            config.storage.ledger_path.clone(),
        )
    }

    pub fn mark_ready(&self) {
        self.readiness.store(true, Ordering::Release);
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.readiness.load(Ordering::Acquire)
    }
}
