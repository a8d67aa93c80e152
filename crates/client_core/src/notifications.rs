//! Transient success/warning/error notifications with auto-dismiss.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use shared::domain::NotificationId;

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
}

#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    next_id: i64,
    active: VecDeque<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            active: VecDeque::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> Notification {
        self.push_at(kind, message, Instant::now())
    }

    pub fn push_at(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: Instant,
    ) -> Notification {
        let notification = Notification {
            id: NotificationId(self.next_id),
            kind,
            message: message.into(),
            created_at: now,
        };
        self.next_id += 1;
        self.active.push_back(notification.clone());
        notification
    }

    /// Removes and returns every notification older than the ttl.
    pub fn expire(&mut self, now: Instant) -> Vec<Notification> {
        let mut expired = Vec::new();
        while let Some(front) = self.active.front() {
            if now.saturating_duration_since(front.created_at) < self.ttl {
                break;
            }
            if let Some(n) = self.active.pop_front() {
                expired.push(n);
            }
        }
        expired
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.active.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.back()
    }
}
