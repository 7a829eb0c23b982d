//! Mock Kubernetes API server for testing.
//!
//! Provides an HTTP server that can be used with kubeconfig-based connections.

mod helpers;
pub mod http;

pub use helpers::decode_secret_data;
pub use http::{HttpMockK8sServer, RecordedRequest, RunningHttpMockK8sServer};
