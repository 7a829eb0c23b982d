//! Kubernetes access for writing secrets.
//!
//! This module talks to the API server directly using kube-rs,
//! avoiding the need to shell out to kubectl.

pub mod client;
pub mod secret;
pub mod upsert;
