//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients and adapters for the object store and the identity provider.

pub mod identity;
pub mod storage;
