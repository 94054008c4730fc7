use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubetarget::{Auth, ClusterConfig, ServerCertificate};

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let context = std::env::args().nth(1);
    let result = match context.as_deref() {
        Some(context) => ClusterConfig::from_kubeconfig(Some(context)),
        None => ClusterConfig::resolve_default(),
    };

    match result {
        Ok(config) => {
            println!("server: {}", config.host);
            println!("auth:   {}", describe_auth(&config.auth));
            println!("tls:    {}", describe_tls(&config.client.server_certificate));
        }
        Err(err) => {
            tracing::error!("Resolution failed: {err}");
            std::process::exit(1);
        }
    }
}

fn describe_auth(auth: &Auth) -> String {
    match auth {
        Auth::Token(source) => format!("bearer token ({source})"),
        Auth::Basic { username, .. } => format!("basic auth as {username}"),
        Auth::ClientCerts { certificate, .. } => format!("client certificates ({certificate})"),
    }
}

fn describe_tls(certificate: &ServerCertificate) -> String {
    match certificate {
        ServerCertificate::Insecure => "insecure, verification disabled".to_string(),
        ServerCertificate::Secure {
            certificate,
            disable_hostname_verification,
        } => {
            if *disable_hostname_verification {
                format!("verified against {certificate}, hostname check disabled")
            } else {
                format!("verified against {certificate}")
            }
        }
    }
}
