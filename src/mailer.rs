//! Background delivery queue for fire-and-forget email.
//!
//! Messages go into a bounded channel drained by a single task that hands each
//! one to the [`EmailSender`], with at most [`MAIL_WORKERS`] deliveries in
//! flight. Submitters never learn the outcome: failures are logged and dropped.

use crate::email_sender::EmailSender;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, mpsc::error::TrySendError};

/// Concurrent deliveries allowed per outbox.
pub const MAIL_WORKERS: usize = 4;

/// One queued plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Handle to the delivery queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<OutgoingEmail>,
}

impl Outbox {
    /// Start the drain task. Must be called from within a Tokio runtime.
    ///
    /// The task ends once every `Outbox` clone has been dropped and the queue
    /// is empty.
    pub fn spawn<E: EmailSender>(sender: E, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<OutgoingEmail>(capacity.max(1));
        let permits = Arc::new(Semaphore::new(MAIL_WORKERS));

        tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let sender = sender.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = sender.send(&email.to, &email.subject, &email.body).await {
                        tracing::error!(
                            error = %e,
                            to = %email.to,
                            subject = %email.subject,
                            "background email delivery failed"
                        );
                    }
                });
            }
            tracing::debug!("outbox drained, delivery task exiting");
        });

        Self { tx }
    }

    /// Queue an email without waiting. Drops it if the queue is full.
    pub fn submit(&self, email: OutgoingEmail) {
        match self.tx.try_send(email) {
            Ok(()) => {}
            Err(TrySendError::Full(email)) => {
                tracing::error!(to = %email.to, "outbox full, email dropped");
            }
            Err(TrySendError::Closed(email)) => {
                tracing::error!(to = %email.to, "outbox closed, email dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email_sender::EmailSendError;
    use std::{sync::Mutex, time::Duration};

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl EmailSender for Recorder {
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), EmailSendError> {
            if to.starts_with("fail") {
                return Err(EmailSendError::SmtpError("relay down".to_string()));
            }
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
        }
    }

    async fn wait_for(recorder: &Recorder, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let sent = recorder.sent.lock().unwrap().clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        recorder.sent.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn submitted_emails_are_delivered() {
        let recorder = Recorder::default();
        let outbox = Outbox::spawn(recorder.clone(), 8);

        outbox.submit(email("a@x.com"));
        outbox.submit(email("b@y.com"));

        let mut sent = wait_for(&recorder, 2).await;
        sent.sort();
        assert_eq!(sent, vec!["a@x.com".to_string(), "b@y.com".to_string()]);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_the_queue() {
        let recorder = Recorder::default();
        let outbox = Outbox::spawn(recorder.clone(), 8);

        outbox.submit(email("fail@x.com"));
        outbox.submit(email("ok@x.com"));

        assert_eq!(wait_for(&recorder, 1).await, vec!["ok@x.com".to_string()]);
    }
}
