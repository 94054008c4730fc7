//! Exec credential plugin support
//!
//! Runs external credential plugins following the portable
//! `client.authentication.k8s.io` convention: spawn the configured command,
//! capture its stdout, and validate the JSON response before trusting the
//! token it carries.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

/// API versions a plugin response may carry
const SUPPORTED_API_VERSIONS: [&str; 3] = [
    "client.authentication.k8s.io/v1alpha1",
    "client.authentication.k8s.io/v1beta1",
    "client.authentication.k8s.io/v1",
];

/// Errors that can occur while running a credential plugin
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to launch credential plugin `{command}`: {source}{}", remediation(.hint))]
    Launch {
        command: String,
        hint: Option<String>,
        source: std::io::Error,
    },

    #[error("Credential plugin `{command}` failed ({status}): {stderr}{}", remediation(.hint))]
    Exited {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
        hint: Option<String>,
    },

    #[error("Failed to parse credential plugin output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported credential plugin api version: {0}")]
    UnsupportedApiVersion(String),

    #[error("Credential plugin returned api version {returned}, but {declared} was requested")]
    ApiVersionMismatch { declared: String, returned: String },
}

fn remediation(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" ({hint})"),
        None => String::new(),
    }
}

/// The `exec` section of a kubeconfig user entry
#[derive(Debug, Clone, Deserialize)]
pub struct ExecConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<ExecEnvVar>,
    #[serde(rename = "installHint", default)]
    pub install_hint: Option<String>,
}

/// An environment variable handed to the plugin process
#[derive(Debug, Clone, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

/// Response a plugin writes to stdout
#[derive(Debug, Deserialize)]
pub struct ExecCredentials {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub status: ExecStatus,
}

#[derive(Debug, Deserialize)]
pub struct ExecStatus {
    pub token: String,
}

/// Invoke the plugin described by `config` and return the bearer token it
/// produced.
///
/// A relative command containing a path separator resolves against the
/// directory of the kubeconfig that configured it, not the process working
/// directory. Every call spawns the plugin afresh; nothing is cached.
pub fn run(config: &ExecConfig, kubeconfig_dir: &Path) -> Result<String, ExecError> {
    let command = resolve_command(&config.command, kubeconfig_dir);
    tracing::debug!("Running credential plugin {}", command.display());

    let output = Command::new(&command)
        .args(&config.args)
        .envs(config.env.iter().map(|var| (&var.name, &var.value)))
        .output()
        .map_err(|source| ExecError::Launch {
            command: command.display().to_string(),
            hint: config.install_hint.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ExecError::Exited {
            command: command.display().to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            hint: config.install_hint.clone(),
        });
    }

    let credentials: ExecCredentials = serde_json::from_slice(&output.stdout)?;

    if !SUPPORTED_API_VERSIONS.contains(&credentials.api_version.as_str()) {
        return Err(ExecError::UnsupportedApiVersion(credentials.api_version));
    }
    if credentials.api_version != config.api_version {
        return Err(ExecError::ApiVersionMismatch {
            declared: config.api_version.clone(),
            returned: credentials.api_version,
        });
    }

    tracing::debug!("Credential plugin produced a token");
    Ok(credentials.status.token)
}

/// Resolve a configured command to the path that gets spawned.
fn resolve_command(command: &str, kubeconfig_dir: &Path) -> PathBuf {
    let path = Path::new(command);
    if path.is_relative() && command.contains(std::path::MAIN_SEPARATOR) {
        kubeconfig_dir.join(path)
    } else {
        path.to_path_buf()
    }
}
