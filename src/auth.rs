//! Authentication derivation
//!
//! Turns a kubeconfig user entry into exactly one authentication method.
//! Token resolution (including a configured exec plugin) happens before the
//! method is chosen, so a plugin-produced token routes the same way a static
//! one does.

use std::path::Path;

use thiserror::Error;

use crate::exec::{self, ExecError};
use crate::key_source::{KeySource, KeySourceError};
use crate::kubeconfig::User;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("User {0} has a username but no password")]
    UsernameWithoutPassword(String),

    #[error("User {0} provides both a token and a username")]
    TokenAndUsername(String),

    #[error(transparent)]
    KeySource(#[from] KeySourceError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// How the client authenticates to the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Bearer token, static or produced by a credential plugin
    Token(KeySource),
    /// HTTP basic authentication
    Basic { username: String, password: String },
    /// Mutual-TLS client certificates
    ClientCerts {
        certificate: KeySource,
        key: KeySource,
        password: Option<String>,
    },
}

/// Derive the authentication method for a user entry.
///
/// `kubeconfig_dir` anchors relative exec plugin commands. A static `token`
/// field takes precedence over a configured plugin, so the plugin is only
/// spawned when no token is present.
pub fn resolve(name: &str, user: &User, kubeconfig_dir: &Path) -> Result<Auth, CredentialError> {
    let token = match (&user.token, &user.exec) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(exec)) => Some(exec::run(exec, kubeconfig_dir)?),
        (None, None) => None,
    };

    match (token, &user.username) {
        (Some(token), None) => Ok(Auth::Token(KeySource::Literal(token))),
        (None, Some(username)) => {
            let password = user
                .password
                .clone()
                .ok_or_else(|| CredentialError::UsernameWithoutPassword(name.to_string()))?;
            Ok(Auth::Basic {
                username: username.clone(),
                password,
            })
        }
        (Some(_), Some(_)) => Err(CredentialError::TokenAndUsername(name.to_string())),
        (None, None) => {
            let certificate = KeySource::from_options(
                user.client_certificate.clone(),
                user.client_certificate_data.clone(),
                "client-certificate",
            )?;
            let key = KeySource::from_options(
                user.client_key.clone(),
                user.client_key_data.clone(),
                "client-key",
            )?;
            Ok(Auth::ClientCerts {
                certificate,
                key,
                password: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dir() -> &'static Path {
        Path::new("/tmp")
    }

    #[test]
    fn test_static_token() {
        let user = User {
            token: Some("abc".to_string()),
            ..Default::default()
        };
        let auth = resolve("dev", &user, dir()).unwrap();
        assert_eq!(auth, Auth::Token(KeySource::Literal("abc".to_string())));
    }

    #[test]
    fn test_basic_auth() {
        let user = User {
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let auth = resolve("dev", &user, dir()).unwrap();
        assert_eq!(
            auth,
            Auth::Basic {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            }
        );
    }

    #[test]
    fn test_username_without_password() {
        let user = User {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        let err = resolve("dev", &user, dir()).unwrap_err();
        assert!(matches!(err, CredentialError::UsernameWithoutPassword(name) if name == "dev"));
    }

    #[test]
    fn test_token_and_username_rejected() {
        let user = User {
            token: Some("abc".to_string()),
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let err = resolve("dev", &user, dir()).unwrap_err();
        assert!(matches!(err, CredentialError::TokenAndUsername(_)));
    }

    #[test]
    fn test_client_certificates_from_paths() {
        let user = User {
            client_certificate: Some(PathBuf::from("/pki/client.crt")),
            client_key: Some(PathBuf::from("/pki/client.key")),
            ..Default::default()
        };
        let auth = resolve("dev", &user, dir()).unwrap();
        assert_eq!(
            auth,
            Auth::ClientCerts {
                certificate: KeySource::File(PathBuf::from("/pki/client.crt")),
                key: KeySource::File(PathBuf::from("/pki/client.key")),
                password: None,
            }
        );
    }

    #[test]
    fn test_client_certificates_validated_independently() {
        // Certificate is fine, key has both path and data set.
        let user = User {
            client_certificate: Some(PathBuf::from("/pki/client.crt")),
            client_key: Some(PathBuf::from("/pki/client.key")),
            client_key_data: Some("aGVsbG8=".to_string()),
            ..Default::default()
        };
        let err = resolve("dev", &user, dir()).unwrap_err();
        assert!(matches!(
            err,
            CredentialError::KeySource(KeySourceError::Ambiguous("client-key"))
        ));
    }

    #[test]
    fn test_empty_user_entry() {
        let user = User::default();
        let err = resolve("dev", &user, dir()).unwrap_err();
        assert!(matches!(
            err,
            CredentialError::KeySource(KeySourceError::Missing("client-certificate"))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_plugin_token() {
        use crate::exec::ExecConfig;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let plugin = dir.path().join("plugin.sh");
        let mut file = std::fs::File::create(&plugin).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(
            file,
            r#"echo '{{"kind":"ExecCredential","apiVersion":"client.authentication.k8s.io/v1beta1","status":{{"token":"abc"}}}}'"#
        )
        .unwrap();
        drop(file);
        std::fs::set_permissions(&plugin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let user = User {
            exec: Some(ExecConfig {
                api_version: "client.authentication.k8s.io/v1beta1".to_string(),
                command: plugin.to_str().unwrap().to_string(),
                args: Vec::new(),
                env: Vec::new(),
                install_hint: None,
            }),
            ..Default::default()
        };

        let auth = resolve("cloud", &user, dir.path()).unwrap();
        assert_eq!(auth, Auth::Token(KeySource::Literal("abc".to_string())));
    }
}
