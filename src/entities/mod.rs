pub mod prelude;

pub mod accounts;
pub mod security_events;
