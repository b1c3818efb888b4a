//! In-memory recording notifier.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{Notice, Notifier, NotifyError};

/// Notifier that records notices instead of delivering them.
///
/// Tests assert on the recorded notices; `fail_next` flips the next send
/// into a delivery error to exercise the log-and-continue path in callers.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    sent: Vec<Notice>,
    fail_next: bool,
}

impl RecordingNotifier {
    /// Create an empty recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far, in send order.
    pub fn sent(&self) -> Vec<Notice> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of recorded notices.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().sent.len()
    }

    /// Whether no notice has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().sent.is_empty()
    }

    /// Make the next send fail with a delivery error.
    pub fn fail_next(&self) {
        self.inner.lock().unwrap().fail_next = true;
    }

    /// Clear recorded notices.
    pub fn clear(&self) {
        self.inner.lock().unwrap().sent.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_next {
            state.fail_next = false;
            return Err(NotifyError::Delivery("simulated delivery failure".to_string()));
        }
        state.sent.push(notice.clone());
        Ok(())
    }
}
