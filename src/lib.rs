//! Resolution of Kubernetes cluster connection settings.
//!
//! Given the ambient environment (a kubeconfig file, an in-cluster service
//! account mount, or explicit overrides), this crate produces one immutable
//! [`ClusterConfig`]: endpoint URL, authentication method, and TLS trust
//! policy, ready for an HTTP transport to consume.

pub mod auth;
pub mod cluster;
pub mod exec;
pub mod key_source;
pub mod kubeconfig;

pub use auth::{Auth, CredentialError};
pub use cluster::{ClientSettings, ClusterConfig, ClusterConfigError, ServerCertificate};
pub use exec::{ExecConfig, ExecCredentials, ExecError};
pub use key_source::{KeySource, KeySourceError};
pub use kubeconfig::{Kubeconfig, KubeconfigError};
