//! ScanBook: multi-tenant invoice storage.
//!
//! The API server (`scanbook-api`) accepts invoice uploads, stores the file in
//! an S3-compatible bucket and its metadata in Postgres. The `client` module
//! and the `scanbook` CLI resolve the signed-in user's role and talk to it.

pub mod client;
pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
