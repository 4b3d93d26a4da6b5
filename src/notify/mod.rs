// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! # Notification Queue
//!
//! Emails are sent off the request path. Handlers enqueue a [`Notification`]
//! through a [`Notifier`] after the response has been decided; a single
//! [`NotificationWorker`] drains the bounded channel and hands rendered
//! messages to a [`MailTransport`].
//!
//! Delivery is best effort and at most once. A full or closed queue, or a
//! failed send, is logged and never reaches the client.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub mod mailer;
pub mod templates;
pub mod worker;

pub use mailer::{DisabledMailer, MailError, MailTransport, OutgoingEmail, SmtpMailer};
pub use worker::NotificationWorker;

/// Capacity of the notification channel.
pub const QUEUE_CAPACITY: usize = 256;

/// An email to be rendered and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Temporary credentials for a newly registered staff member.
    TempPassword {
        to: String,
        username: String,
        institution_code: String,
        temp_password: String,
    },
    /// Password-reset link.
    PasswordReset { to: String, token: String },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::TempPassword { to, .. } | Notification::PasswordReset { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TempPassword { .. } => "temp_password",
            Notification::PasswordReset { .. } => "password_reset",
        }
    }
}

/// Producer half of the notification queue.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    /// Create the queue, returning the producer and the receiver for the worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns whether the notification was accepted.
    pub fn dispatch(&self, notification: Notification) -> bool {
        let kind = notification.kind();
        match self.tx.try_send(notification) {
            Ok(()) => {
                debug!(kind, "notification queued");
                true
            }
            Err(TrySendError::Full(n)) => {
                warn!(kind, to = %n.recipient(), "notification queue full; dropping");
                false
            }
            Err(TrySendError::Closed(n)) => {
                warn!(kind, to = %n.recipient(), "notification queue closed; dropping");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset(to: &str) -> Notification {
        Notification::PasswordReset {
            to: to.into(),
            token: "ab".repeat(32),
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_order() {
        let (notifier, mut rx) = Notifier::channel(4);
        assert!(notifier.dispatch(reset("a@example.com")));
        assert!(notifier.dispatch(reset("b@example.com")));
        assert_eq!(rx.recv().await.unwrap().recipient(), "a@example.com");
        assert_eq!(rx.recv().await.unwrap().recipient(), "b@example.com");
    }

    #[test]
    fn full_queue_drops() {
        let (notifier, _rx) = Notifier::channel(1);
        assert!(notifier.dispatch(reset("a@example.com")));
        assert!(!notifier.dispatch(reset("b@example.com")));
    }

    #[test]
    fn closed_queue_drops() {
        let (notifier, rx) = Notifier::channel(1);
        drop(rx);
        assert!(!notifier.dispatch(reset("a@example.com")));
    }
}
