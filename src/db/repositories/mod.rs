pub mod account;
pub mod security_event;
