//! Shared harness for HTTP-level tests.
//!
//! Each test spawns its own server on an ephemeral port over a fresh
//! [`MemoryBackend`] and a [`Recorder`] that keeps every email it is asked to
//! deliver.

#![allow(dead_code)]

use pasulol_core::{Core, CoreConfig, EmailSendError, EmailSender, MemoryBackend};
use reqwest::Client;
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

/// One delivered email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email sender that records instead of delivering.
#[derive(Clone, Default)]
pub struct Recorder {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failing: bool,
}

impl Recorder {
    /// A recorder whose every send fails after being recorded.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("recorder lock").clone()
    }

    /// Wait for the background queue to deliver a verification link to
    /// `email` and return its token.
    pub async fn token_for(&self, email: &str) -> String {
        for _ in 0..200 {
            let found = self.sent().into_iter().rev().find_map(|mail| {
                (mail.to == email)
                    .then(|| token_from_body(&mail.body))
                    .flatten()
            });
            if let Some(token) = found {
                return token;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no verification email for {email}");
    }

    /// Count of emails sent to `email` whose subject matches.
    pub fn count(&self, email: &str, subject: &str) -> usize {
        self.sent()
            .iter()
            .filter(|mail| mail.to == email && mail.subject == subject)
            .count()
    }
}

impl EmailSender for Recorder {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailSendError> {
        self.sent.lock().expect("recorder lock").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.failing {
            return Err(EmailSendError::SmtpError("relay refused".to_string()));
        }
        Ok(())
    }
}

fn token_from_body(body: &str) -> Option<String> {
    let link = body
        .split_whitespace()
        .find(|word| word.contains("/verify-email?"))?;
    let url = url::Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

/// A running test server.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub core: Core<MemoryBackend, Recorder>,
    pub mail: Recorder,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(CoreConfig::default(), Recorder::default()).await
    }

    pub async fn spawn_with(config: CoreConfig, mail: Recorder) -> Self {
        let core = Core::new(config, MemoryBackend::new(), mail.clone()).expect("core");
        let app = core.routes::<()>();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            core,
            mail,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a result and return its id.
    pub async fn result_create(&self, accept_email: bool) -> String {
        let resp = self
            .client
            .post(self.url("/result/create"))
            .json(&result_body(accept_email))
            .send()
            .await
            .expect("create request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.expect("create body");
        body["id"].as_str().expect("id").to_string()
    }

    pub async fn send_verification(&self, id: &str, email: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/result/{id}/send-verification")))
            .query(&[("email", email)])
            .send()
            .await
            .expect("send-verification request")
    }

    pub async fn verify_email(&self, id: &str, email: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/result/{id}/verify-email")))
            .query(&[("email", email), ("token", token)])
            .send()
            .await
            .expect("verify-email request")
    }
}

/// A complete submission body with distinct scores.
pub fn result_body(accept_email: bool) -> Value {
    json!({
        "accept_email": accept_email,
        "extroversion": 12, "introversion": 8,
        "sensing": 5, "intuition": 15,
        "thinking": 9, "feeling": 11,
        "judging": 14, "perceiving": 6,
        "enneagram_1": 1, "enneagram_2": 2, "enneagram_3": 3,
        "enneagram_4": 4, "enneagram_5": 5, "enneagram_6": 6,
        "enneagram_7": 7, "enneagram_8": 8, "enneagram_9": 9,
        "gut_center": 10, "heart_center": 20, "head_center": 30
    })
}
