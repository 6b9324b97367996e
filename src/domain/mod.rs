//! Domain events shared across the identity system.

pub mod events;

pub use events::{SecurityEvent, SecurityEventSink};
