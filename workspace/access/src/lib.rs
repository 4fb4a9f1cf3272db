//! Access control and request lifecycle for the IP Intelligence platform.
//!
//! This crate owns the set of accounts, their roles, and the lifecycle of
//! role-elevation requests. All mutation goes through [`AccessManager`];
//! nothing else writes account or request state. The manager is defined
//! against the abstract persistence contract in [`store`], with an
//! in-memory implementation for tests and a SeaORM-backed one for real
//! deployments.

pub mod error;
pub mod manager;
pub mod memory;
pub mod orm;
pub mod role;
pub mod store;

pub use error::{AccessError, Result};
pub use manager::{AccessManager, AccessPolicy, DocumentUpload, RegisterInput};
pub use memory::MemoryStore;
pub use orm::OrmStore;
pub use role::{can_access, Role, Session};
pub use store::{
    Account, Directory, ElevationRequest, NewAccount, NewElevationRequest, NewProofDocument,
    Profile, ProfileUpdate, ProofDocument, RequestStatus, ReviewUpdate, SessionCarrier,
    StoredSession,
};
