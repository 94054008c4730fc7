//! Kubeconfig file model
//!
//! Parses kubeconfig files (typically ~/.kube/config) into named clusters,
//! users, and contexts, and resolves the lookups between them. The file is
//! parsed fresh on every resolution; nothing is cached.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::exec::ExecConfig;

#[derive(Debug, Error)]
pub enum KubeconfigError {
    #[error("No kubeconfig found")]
    NotFound,

    #[error("Failed to read kubeconfig: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse kubeconfig: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("No context selected and current-context is not set")]
    NoCurrentContext,

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// Parsed kubeconfig
#[derive(Debug, Clone, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    /// Where this kubeconfig was loaded from; relative exec plugin commands
    /// resolve against its parent directory.
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

/// A Kubernetes cluster entry
#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub server: String,
    #[serde(rename = "certificate-authority", default)]
    pub certificate_authority: Option<PathBuf>,
    #[serde(rename = "certificate-authority-data", default)]
    pub certificate_authority_data: Option<String>,
    #[serde(rename = "insecure-skip-tls-verify", default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

/// A named pairing of a cluster and a user
#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: User,
}

/// Credential fields of a user entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "client-certificate", default)]
    pub client_certificate: Option<PathBuf>,
    #[serde(rename = "client-certificate-data", default)]
    pub client_certificate_data: Option<String>,
    #[serde(rename = "client-key", default)]
    pub client_key: Option<PathBuf>,
    #[serde(rename = "client-key-data", default)]
    pub client_key_data: Option<String>,
    #[serde(default)]
    pub exec: Option<ExecConfig>,
}

impl Kubeconfig {
    /// Locate the kubeconfig file for this process.
    ///
    /// `KUBECONFIG` takes precedence when set; otherwise `~/.kube/config`.
    /// Fails with [`KubeconfigError::NotFound`] when no readable path can be
    /// determined.
    pub fn locate() -> Result<PathBuf, KubeconfigError> {
        let path = match std::env::var("KUBECONFIG") {
            // First entry of a ':'-separated list
            Ok(value) if !value.is_empty() => {
                PathBuf::from(value.split(':').next().unwrap_or(&value))
            }
            _ => dirs::home_dir()
                .ok_or(KubeconfigError::NotFound)?
                .join(".kube")
                .join("config"),
        };

        if path.exists() {
            Ok(path)
        } else {
            Err(KubeconfigError::NotFound)
        }
    }

    /// Load the kubeconfig from its default location
    pub fn load_default() -> Result<Self, KubeconfigError> {
        Self::load(&Self::locate()?)
    }

    /// Load a kubeconfig from a specific path
    pub fn load(path: &Path) -> Result<Self, KubeconfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, path.to_path_buf())?;
        tracing::debug!(
            "Loaded kubeconfig from {} ({} contexts, {} clusters, {} users)",
            path.display(),
            config.contexts.len(),
            config.clusters.len(),
            config.users.len()
        );
        Ok(config)
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self, KubeconfigError> {
        let mut config: Kubeconfig = serde_yaml_ng::from_str(content)?;
        config.path = path;
        Ok(config)
    }

    /// The directory containing this kubeconfig
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Select a context: an explicit name wins over `current-context`.
    pub fn select_context(&self, name: Option<&str>) -> Result<&NamedContext, KubeconfigError> {
        let name = name
            .or(self.current_context.as_deref())
            .ok_or(KubeconfigError::NoCurrentContext)?;
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| KubeconfigError::ContextNotFound(name.to_string()))
    }

    /// Look up a cluster by name
    pub fn cluster(&self, name: &str) -> Result<&Cluster, KubeconfigError> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.cluster)
            .ok_or_else(|| KubeconfigError::ClusterNotFound(name.to_string()))
    }

    /// Look up a user by name
    pub fn user(&self, name: &str) -> Result<&NamedUser, KubeconfigError> {
        self.users
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| KubeconfigError::UserNotFound(name.to_string()))
    }
}
