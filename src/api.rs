//! REST client for the pull/fallback endpoints.
//!
//! Thin wrapper around `reqwest` covering the endpoints the core
//! consumes. Callers decide what a failure means: the poller treats
//! every error as transient and retries on the next tick, while
//! mark-read write-through logs and keeps local state.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Notification, PresenceStatus};

/// Shape of `GET /notifications/unread-count`.
#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    count: usize,
}

/// HTTP client for the notification and presence endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    server_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for the given server and session credential.
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server_url: server_url.into(),
            token: token.into(),
        }
    }

    /// `GET /notifications?limit=N` — most recent N, newest first.
    pub async fn recent_notifications(&self, limit: usize) -> Result<Vec<Notification>> {
        let url = format!("{}/notifications?limit={limit}", self.server_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("notifications fetch failed")?;

        if !response.status().is_success() {
            bail!("notifications fetch returned {}", response.status());
        }

        response
            .json::<Vec<Notification>>()
            .await
            .context("failed to parse notifications response")
    }

    /// `GET /notifications/unread-count` — authoritative unread count.
    pub async fn unread_count(&self) -> Result<usize> {
        let url = format!("{}/notifications/unread-count", self.server_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("unread-count fetch failed")?;

        if !response.status().is_success() {
            bail!("unread-count fetch returned {}", response.status());
        }

        let body: UnreadCountResponse = response
            .json()
            .await
            .context("failed to parse unread-count response")?;
        Ok(body.count)
    }

    /// `PUT /notifications/{id}/read`.
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let url = format!("{}/notifications/{id}/read", self.server_url);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("mark-read request failed")?;

        if !response.status().is_success() {
            bail!("mark-read returned {}", response.status());
        }
        Ok(())
    }

    /// `PUT /notifications/read-all`.
    pub async fn mark_all_read(&self) -> Result<()> {
        let url = format!("{}/notifications/read-all", self.server_url);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("read-all request failed")?;

        if !response.status().is_success() {
            bail!("read-all returned {}", response.status());
        }
        Ok(())
    }

    /// `POST /notifications/test` — manual trigger for verification.
    /// Returns the synthetic notification the server created.
    pub async fn trigger_test(&self) -> Result<Notification> {
        let url = format!("{}/notifications/test", self.server_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("test-notification request failed")?;

        if !response.status().is_success() {
            bail!("test-notification returned {}", response.status());
        }

        response
            .json::<Notification>()
            .await
            .context("failed to parse test notification")
    }

    /// `POST /users/heartbeat` — presence liveness ping for the current
    /// user. The server decides whether this user's online-ness is
    /// broadcast to others.
    pub async fn heartbeat(&self) -> Result<()> {
        let url = format!("{}/users/heartbeat", self.server_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("heartbeat request failed")?;

        if !response.status().is_success() {
            bail!("heartbeat returned {}", response.status());
        }
        Ok(())
    }

    /// `GET /users/pe-status` — current privileged-operator presence.
    pub async fn pe_status(&self) -> Result<PresenceStatus> {
        let url = format!("{}/users/pe-status", self.server_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("pe-status fetch failed")?;

        if !response.status().is_success() {
            bail!("pe-status fetch returned {}", response.status());
        }

        response
            .json::<PresenceStatus>()
            .await
            .context("failed to parse pe-status response")
    }
}
