// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Background task that drains the notification queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{templates::EmailRenderer, MailTransport, Notification};

pub struct NotificationWorker {
    rx: mpsc::Receiver<Notification>,
    mailer: Arc<dyn MailTransport>,
    renderer: EmailRenderer,
}

impl NotificationWorker {
    pub fn new(
        rx: mpsc::Receiver<Notification>,
        mailer: Arc<dyn MailTransport>,
        renderer: EmailRenderer,
    ) -> Self {
        Self { rx, mailer, renderer }
    }

    /// Send queued emails until cancelled or every producer is dropped.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Notification worker starting");

        loop {
            let notification = tokio::select! {
                next = self.rx.recv() => match next {
                    Some(n) => n,
                    None => {
                        info!("Notification queue closed; worker exiting");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("Notification worker shutting down");
                    return;
                }
            };

            self.deliver(notification).await;
        }
    }

    async fn deliver(&self, notification: Notification) {
        let kind = notification.kind();
        let to = notification.recipient().to_string();
        let email = match self.renderer.render(notification) {
            Ok(email) => email,
            Err(e) => {
                warn!(kind, to = %to, error = %e, "email rendering failed");
                return;
            }
        };
        match self.mailer.send(email).await {
            Ok(()) => info!(kind, to = %to, "email sent"),
            Err(e) => warn!(kind, to = %to, error = %e, "email delivery failed"),
        }
    }
}
