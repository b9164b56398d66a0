//! Push notification config store and webhook fan-out sender.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::A2AError;
use crate::types::config::{AuthenticationInfo, PushNotificationConfig};
use crate::types::core::Task;

/// Header carrying the config's verification token on webhook deliveries.
pub const NOTIFICATION_TOKEN_HEADER: &str = "X-A2A-Notification-Token";

// ---------------------------------------------------------------------------
// PushNotificationConfigStore trait
// ---------------------------------------------------------------------------

/// Per-task registry of webhook configurations, unique by config id within
/// one task.
#[async_trait]
pub trait PushNotificationConfigStore: Send + Sync {
    /// Insert or replace a config. A config without an id gets the owning
    /// task id; an existing config with the same id is replaced in place.
    async fn set_info(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<PushNotificationConfig, A2AError>;

    /// All configs registered for the task; empty when none.
    async fn get_info(&self, task_id: &str) -> Result<Vec<PushNotificationConfig>, A2AError>;

    /// Remove one config. `config_id` defaults to the task id; removing the
    /// last config drops the task's entry entirely.
    async fn delete_info(&self, task_id: &str, config_id: Option<&str>) -> Result<(), A2AError>;
}

// ---------------------------------------------------------------------------
// InMemoryPushNotificationConfigStore
// ---------------------------------------------------------------------------

/// In-memory config store guarded by a single mutex.
#[derive(Clone, Default)]
pub struct InMemoryPushNotificationConfigStore {
    // task_id -> configs, unique by config id
    inner: Arc<Mutex<HashMap<String, Vec<PushNotificationConfig>>>>,
}

impl InMemoryPushNotificationConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushNotificationConfigStore for InMemoryPushNotificationConfigStore {
    async fn set_info(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<PushNotificationConfig, A2AError> {
        let mut config = config;
        if config.id.is_none() {
            config.id = Some(task_id.to_string());
        }

        let mut store = self.inner.lock().await;
        let configs = store.entry(task_id.to_string()).or_default();
        configs.retain(|existing| existing.id != config.id);
        configs.push(config.clone());
        Ok(config)
    }

    async fn get_info(&self, task_id: &str) -> Result<Vec<PushNotificationConfig>, A2AError> {
        let store = self.inner.lock().await;
        Ok(store.get(task_id).cloned().unwrap_or_default())
    }

    async fn delete_info(&self, task_id: &str, config_id: Option<&str>) -> Result<(), A2AError> {
        let config_id = config_id.unwrap_or(task_id);
        let mut store = self.inner.lock().await;
        if let Some(configs) = store.get_mut(task_id) {
            configs.retain(|config| config.id.as_deref() != Some(config_id));
            if configs.is_empty() {
                store.remove(task_id);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PushNotificationSender
// ---------------------------------------------------------------------------

/// Best-effort fan-out of task snapshots to registered webhooks.
#[async_trait]
pub trait PushNotificationSender: Send + Sync {
    /// Deliver `task` to every webhook configured for `task.id`. Never fails
    /// the caller; delivery errors are logged per dispatch.
    async fn send_notification(&self, task: &Task);
}

/// Sender that POSTs the serialized task to each configured webhook.
///
/// All dispatches for one call run concurrently and all are attempted even
/// when some fail.
#[derive(Clone)]
pub struct BasePushNotificationSender {
    client: reqwest::Client,
    config_store: Arc<dyn PushNotificationConfigStore>,
}

impl BasePushNotificationSender {
    pub fn new(config_store: Arc<dyn PushNotificationConfigStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config_store,
        }
    }

    pub fn with_client(
        client: reqwest::Client,
        config_store: Arc<dyn PushNotificationConfigStore>,
    ) -> Self {
        Self {
            client,
            config_store,
        }
    }

    async fn dispatch(&self, task: &Task, config: &PushNotificationConfig) -> bool {
        let mut request = self.client.post(&config.url).json(task);

        if let Some(ref auth) = config.authentication {
            request = apply_auth(request, auth);
        }
        if let Some(ref token) = config.token {
            request = request.header(NOTIFICATION_TOKEN_HEADER, token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(task_id = %task.id, url = %config.url, "push notification delivered");
                true
            }
            Ok(response) => {
                error!(
                    task_id = %task.id,
                    url = %config.url,
                    status = %response.status(),
                    "push notification rejected by webhook"
                );
                false
            }
            Err(e) => {
                error!(
                    task_id = %task.id,
                    url = %config.url,
                    error = %e,
                    "push notification delivery failed"
                );
                false
            }
        }
    }
}

#[async_trait]
impl PushNotificationSender for BasePushNotificationSender {
    async fn send_notification(&self, task: &Task) {
        let configs = match self.config_store.get_info(&task.id).await {
            Ok(configs) => configs,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "failed to read push notification configs");
                return;
            }
        };
        if configs.is_empty() {
            return;
        }

        let dispatches = configs.iter().map(|config| self.dispatch(task, config));
        let results = futures::future::join_all(dispatches).await;

        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            warn!(
                task_id = %task.id,
                failed,
                total = results.len(),
                "some push notification deliveries failed"
            );
        }
    }
}

fn apply_auth(
    request: reqwest::RequestBuilder,
    auth: &AuthenticationInfo,
) -> reqwest::RequestBuilder {
    match auth.scheme.to_lowercase().as_str() {
        "bearer" => {
            if let Some(ref creds) = auth.credentials {
                request.bearer_auth(creds)
            } else {
                request
            }
        }
        "basic" => {
            if let Some(ref creds) = auth.credentials {
                // credentials in "user:pass" format
                let parts: Vec<&str> = creds.splitn(2, ':').collect();
                if parts.len() == 2 {
                    request.basic_auth(parts[0], Some(parts[1]))
                } else {
                    request.basic_auth(creds, Option::<&str>::None)
                }
            } else {
                request
            }
        }
        _ => {
            if let Some(ref creds) = auth.credentials {
                request.header("Authorization", format!("{} {}", auth.scheme, creds))
            } else {
                request
            }
        }
    }
}
