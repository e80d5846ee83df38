use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Allows a single analysis in flight; further submissions are rejected until it settles.
#[derive(Clone, Default)]
pub struct AnalysisGate {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of one analysis. Dropping it reopens the gate.
pub struct AnalysisPermit {
    busy: Arc<AtomicBool>,
}

impl AnalysisGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<AnalysisPermit, String> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                "an analysis is already in progress: wait for it to finish before resubmitting"
                    .to_string()
            })?;
        Ok(AnalysisPermit {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for AnalysisPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submission_is_rejected_while_first_runs() {
        let gate = AnalysisGate::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_busy());

        let err = gate.clone().try_acquire().err().unwrap();
        assert!(err.contains("already in progress"));

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn permit_is_released_when_task_fails() {
        let gate = AnalysisGate::new();
        let task_gate = gate.clone();
        let result = tokio::spawn(async move {
            let _permit = task_gate.try_acquire()?;
            Err::<(), String>("upstream failed".to_string())
        })
        .await
        .unwrap();
        assert!(result.is_err());
        assert!(!gate.is_busy());
    }
}
