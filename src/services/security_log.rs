use crate::db::Store;
use crate::domain::events::SecurityEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Subscribes to the security event bus and persists every event to the
/// `security_events` table.
pub struct SecurityLogService {
    store: Store,
    event_bus: broadcast::Sender<SecurityEvent>,
}

impl SecurityLogService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<SecurityEvent>) -> Self {
        Self { store, event_bus }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to persist security event");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Security event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Security event bus closed");
                        break;
                    }
                }
            }
        });
    }

    /// Deletes persisted events older than the retention window, once a day.
    /// The first tick fires immediately, so backlog is cleared on startup.
    pub fn start_retention_task(self: Arc<Self>, retention_days: i64) {
        let service = self;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));

            loop {
                ticker.tick().await;
                match service.store.prune_security_events(retention_days).await {
                    Ok(0) => {}
                    Ok(pruned) => {
                        info!(event = "job_finished", job_name = "prune_security_events", pruned, "Pruned old security events");
                    }
                    Err(e) => {
                        error!(event = "job_failed", job_name = "prune_security_events", error = %e, "Failed to prune security events");
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: SecurityEvent) -> anyhow::Result<()> {
        let (kind, severity, message) = match &event {
            SecurityEvent::DuplicateRegistration { field, email } => (
                "DuplicateRegistration",
                "warn",
                format!("Registration rejected: {field} already in use ({email})"),
            ),
            SecurityEvent::FailedLogin { email } => (
                "FailedLogin",
                "warn",
                format!("Failed login attempt for {email}"),
            ),
            SecurityEvent::DisabledAccountLogin { email } => (
                "DisabledAccountLogin",
                "warn",
                format!("Login attempt against disabled account {email}"),
            ),
        };

        let details = serde_json::to_string(&event)?;

        self.store
            .add_security_event(kind, severity, &message, Some(details))
            .await?;

        Ok(())
    }
}
