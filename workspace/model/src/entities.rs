//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the IP Intelligence platform here: the
//! accounts, the role-elevation requests with their identity-proof
//! documents, and the bearer sessions issued at login.

pub mod elevation_request;
pub mod proof_document;
pub mod session_token;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::elevation_request::Entity as ElevationRequest;
    pub use super::proof_document::Entity as ProofDocument;
    pub use super::session_token::Entity as SessionToken;
    pub use super::user::Entity as User;
}
