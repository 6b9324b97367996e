//! Security-relevant domain events.
//!
//! Identity operations emit these on the event bus. Listeners persist them
//! to the audit table and stream them to connected clients; emitting is
//! always fire-and-forget and never fails the operation that raised it.

use serde::Serialize;
use tokio::sync::broadcast;

/// Noteworthy moments in the life of an account, as seen by the identity
/// service. Deliberately coarse: no credential material, no internal keys.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SecurityEvent {
    /// A registration collided with an existing account.
    DuplicateRegistration { field: String, email: String },

    /// A login attempt failed (unknown email or wrong password).
    FailedLogin { email: String },

    /// A login attempt presented valid credentials for a deactivated account.
    DisabledAccountLogin { email: String },
}

/// Where the identity service drops its events.
pub trait SecurityEventSink: Send + Sync {
    fn record(&self, event: SecurityEvent);
}

/// The production sink is the broadcast bus itself. A send with no live
/// receivers is fine; the persisting listener normally holds one open.
impl SecurityEventSink for broadcast::Sender<SecurityEvent> {
    fn record(&self, event: SecurityEvent) {
        let _ = self.send(event);
    }
}
