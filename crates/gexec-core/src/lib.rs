//! Core abstractions for gexec: the entity model, secret carriers and their
//! cascade, project grants and access decisions, and the row store contract.
//! This crate carries no cipher; AES-GCM lives in `gexec-storage`.

pub mod access;
pub mod cascade;
pub mod grants;
pub mod model;
pub mod rows;
pub mod secret;
