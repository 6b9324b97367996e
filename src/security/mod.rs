//! Identity primitives: public id allocation, credential hashing, and
//! session token signing. Everything here is storage-free; the service
//! layer composes these with the account directory.

pub mod ids;
pub mod password;
pub mod token;

pub use ids::ExternalId;
pub use password::CredentialHasher;
pub use token::{Claims, SessionToken, TokenError, TokenIssuer};
