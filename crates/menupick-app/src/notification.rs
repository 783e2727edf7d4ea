// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use crate::{NotificationKind, TimerToken};

pub const DEFAULT_AUTO_DISMISS: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationState {
    pub visible: bool,
    pub message: String,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArmedTimer {
    token: TimerToken,
    due: Instant,
}

/// Single-slot notification with an owned auto-dismiss deadline.
///
/// At most one deadline is armed. Showing a new notification or dismissing
/// the current one disarms it, so an old deadline can never hide a newer
/// notification.
#[derive(Debug, Clone)]
pub struct NotificationScheduler {
    auto_dismiss: Duration,
    last: Notification,
    visible: bool,
    timer: Option<ArmedTimer>,
    last_token: TimerToken,
}

impl Default for NotificationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_DISMISS)
    }
}

impl NotificationScheduler {
    pub fn new(auto_dismiss: Duration) -> Self {
        Self {
            auto_dismiss,
            last: Notification {
                message: String::new(),
                kind: NotificationKind::Success,
            },
            visible: false,
            timer: None,
            last_token: TimerToken::new(0),
        }
    }

    pub fn auto_dismiss(&self) -> Duration {
        self.auto_dismiss
    }

    /// Replaces whatever is showing. Returns the token of the newly armed
    /// deadline, or `None` for progress notifications.
    pub fn show(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> Option<TimerToken> {
        self.last = Notification {
            message: message.into(),
            kind,
        };
        self.visible = true;
        self.timer = None;

        if !kind.auto_dismisses() {
            return None;
        }
        self.last_token = self.last_token.next();
        self.timer = Some(ArmedTimer {
            token: self.last_token,
            due: now + self.auto_dismiss,
        });
        Some(self.last_token)
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
        self.timer = None;
    }

    /// Fires the armed deadline if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.timer {
            Some(timer) if now >= timer.due => self.expire(timer.token),
            _ => false,
        }
    }

    /// Fires the deadline identified by `token`. Tokens of superseded
    /// deadlines are ignored.
    pub fn expire(&mut self, token: TimerToken) -> bool {
        match self.timer {
            Some(timer) if timer.token == token => {
                self.dismiss();
                true
            }
            _ => false,
        }
    }

    pub fn armed_token(&self) -> Option<TimerToken> {
        self.timer.map(|timer| timer.token)
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.timer.map(|timer| timer.due)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn current(&self) -> Option<&Notification> {
        self.visible.then_some(&self.last)
    }

    pub fn state(&self) -> NotificationState {
        NotificationState {
            visible: self.visible,
            message: self.last.message.clone(),
            kind: self.last.kind,
        }
    }
}
