use std::sync::{Mutex, PoisonError};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient notification, the service-side stand-in for a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Generic message shown when a status update could not reach the server.
    #[must_use]
    pub fn remote_update_failed() -> Self {
        Self::error("Could not save your workout status. Please try again.")
    }

    /// Generic message shown when assignments could not be refreshed.
    #[must_use]
    pub fn sync_failed() -> Self {
        Self::error("Could not refresh your workouts. Please try again.")
    }
}

/// Receives notifications for display.
pub trait NoticeSink: Send + Sync {
    fn push(&self, notice: Notice);
}

/// Buffers notices until the caller drains them.
#[derive(Debug, Default)]
pub struct VecNoticeSink {
    notices: Mutex<Vec<Notice>>,
}

impl VecNoticeSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        let mut guard = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl NoticeSink for VecNoticeSink {
    fn push(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
