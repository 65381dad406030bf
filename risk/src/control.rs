//! Cooperative cancellation for long-running estimates
//!
//! A `Cancellation` is cheap to clone; all clones share one flag. Estimators
//! check it before simulation-heavy work and between Monte Carlo chunks.

use crate::error::{Result, VarError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip automatically once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` if cancelled or past the deadline
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(VarError::Cancelled(format!("cancelled before {}", stage)));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(VarError::Cancelled(format!(
                    "deadline exceeded before {}",
                    stage
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clones_share_flag() {
        let token = Cancellation::new();
        let handle = token.clone();
        assert!(token.check("work").is_ok());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check("work"), Err(VarError::Cancelled(_))));
    }

    #[test]
    fn test_expired_deadline() {
        let token = Cancellation::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(token.is_cancelled());
        assert!(token.check("simulation").is_err());

        let token = Cancellation::with_deadline(Instant::now() + Duration::from_secs(3600));
        assert!(token.check("simulation").is_ok());
    }
}
