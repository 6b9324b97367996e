pub mod directory;
pub use directory::{AccountDirectory, ConflictField, DirectoryError};

pub mod identity_service;
pub use identity_service::{IdentityError, IdentityService};

pub mod identity_service_impl;
pub use identity_service_impl::DefaultIdentityService;

pub mod security_log;
pub use security_log::SecurityLogService;
