//! Entry store metrics.

use std::time::Instant;

/// Times one entry store call and records it on [`finish`](Self::finish).
///
/// Emits `skillvault_store_operations_total` and
/// `skillvault_store_operation_duration_ms`, labelled by backend, operation
/// and `success`/`error`.
#[must_use = "a timer records nothing until finished"]
pub struct StoreTimer {
    backend: &'static str,
    operation: &'static str,
    start: Instant,
}

impl StoreTimer {
    /// Starts timing `operation` on `backend`.
    pub fn start(backend: &'static str, operation: &'static str) -> Self {
        Self {
            backend,
            operation,
            start: Instant::now(),
        }
    }

    /// Records the call and hands `result` back.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "skillvault_store_operations_total",
            "backend" => self.backend,
            "operation" => self.operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "skillvault_store_operation_duration_ms",
            "backend" => self.backend,
            "operation" => self.operation
        )
        .record(self.start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}
