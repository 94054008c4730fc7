//! Cluster connection resolution
//!
//! Assembles the immutable connection descriptor an HTTP transport consumes:
//! endpoint URL, authentication method, and TLS trust policy. Resolution is
//! a single synchronous pass; concurrent resolutions are fully independent.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::auth::{self, Auth, CredentialError};
use crate::key_source::{KeySource, KeySourceError};
use crate::kubeconfig::{Kubeconfig, KubeconfigError};

/// In-cluster service account mount
const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const IN_CLUSTER_HOST: &str = "https://kubernetes.default.svc";

#[derive(Debug, Error)]
pub enum ClusterConfigError {
    #[error(transparent)]
    Kubeconfig(#[from] KubeconfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Invalid cluster certificate authority: {0}")]
    CertificateAuthority(#[from] KeySourceError),

    #[error("Invalid server URL `{url}`: {source}")]
    InvalidServerUrl { url: String, source: url::ParseError },
}

/// TLS trust policy for the API server connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCertificate {
    /// Skip server certificate verification entirely
    Insecure,
    /// Verify against the given certificate authority
    Secure {
        certificate: KeySource,
        disable_hostname_verification: bool,
    },
}

/// Transport-level settings carried alongside the endpoint and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub debug: bool,
    pub server_certificate: ServerCertificate,
}

/// Immutable cluster connection descriptor.
///
/// Holds everything a transport needs to reach one API server: the endpoint
/// URL, the authentication method, and the TLS trust policy. Key material is
/// carried as [`KeySource`] descriptors; bytes are only read when the
/// transport opens them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub host: Url,
    pub auth: Auth,
    pub client: ClientSettings,
}

impl ClusterConfig {
    /// Resolve from the ambient environment.
    ///
    /// Attempts full kubeconfig resolution first; any failure in that path
    /// falls back to the in-cluster service account strategy. The kubeconfig
    /// error is logged and discarded, so callers only see a failure when the
    /// fallback itself cannot be built.
    pub fn resolve_default() -> Result<Self, ClusterConfigError> {
        match Self::from_kubeconfig(None) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!(
                    "Kubeconfig resolution failed ({err}), falling back to in-cluster service account"
                );
                Self::in_cluster()
            }
        }
    }

    /// Resolve from the located kubeconfig, optionally overriding the context.
    pub fn from_kubeconfig(context: Option<&str>) -> Result<Self, ClusterConfigError> {
        let kubeconfig = Kubeconfig::load_default()?;
        Self::from_parsed_kubeconfig(&kubeconfig, context)
    }

    /// Resolve against an already-parsed kubeconfig.
    pub fn from_parsed_kubeconfig(
        kubeconfig: &Kubeconfig,
        context: Option<&str>,
    ) -> Result<Self, ClusterConfigError> {
        let named_context = kubeconfig.select_context(context)?;
        let cluster = kubeconfig.cluster(&named_context.context.cluster)?;
        let named_user = kubeconfig.user(&named_context.context.user)?;

        let host = Url::parse(&cluster.server).map_err(|source| {
            ClusterConfigError::InvalidServerUrl {
                url: cluster.server.clone(),
                source,
            }
        })?;

        let auth = auth::resolve(&named_user.name, &named_user.user, kubeconfig.dir())?;

        let server_certificate = if cluster.insecure_skip_tls_verify {
            ServerCertificate::Insecure
        } else {
            ServerCertificate::Secure {
                certificate: KeySource::from_options(
                    cluster.certificate_authority.clone(),
                    cluster.certificate_authority_data.clone(),
                    "certificate-authority",
                )?,
                disable_hostname_verification: false,
            }
        };

        tracing::debug!(
            "Resolved context {} -> {}",
            named_context.name,
            host
        );

        Ok(Self {
            host,
            auth,
            client: ClientSettings {
                debug: false,
                server_certificate,
            },
        })
    }

    /// Connection descriptor for a workload running inside the cluster.
    ///
    /// Points at the fixed service account mount for both the bearer token
    /// and the cluster certificate authority.
    pub fn in_cluster() -> Result<Self, ClusterConfigError> {
        let host =
            Url::parse(IN_CLUSTER_HOST).map_err(|source| ClusterConfigError::InvalidServerUrl {
                url: IN_CLUSTER_HOST.to_string(),
                source,
            })?;

        Ok(Self {
            host,
            auth: Auth::Token(KeySource::File(PathBuf::from(SERVICE_ACCOUNT_TOKEN))),
            client: ClientSettings {
                debug: false,
                server_certificate: ServerCertificate::Secure {
                    certificate: KeySource::File(PathBuf::from(SERVICE_ACCOUNT_CA)),
                    disable_hostname_verification: false,
                },
            },
        })
    }

    /// Copy of this config with a trailing dot stripped from the host name.
    ///
    /// Some DNS setups hand out the API server name with a trailing dot,
    /// which fails TLS hostname verification.
    pub fn drop_trailing_dot(&self) -> Self {
        let mut config = self.clone();
        let stripped = config
            .host
            .host_str()
            .and_then(|host| host.strip_suffix('.'))
            .map(str::to_string);
        if let Some(host) = stripped {
            if config.host.set_host(Some(&host)).is_err() {
                tracing::debug!("Could not rewrite host {} without trailing dot", self.host);
                return self.clone();
            }
        }
        config
    }
}
