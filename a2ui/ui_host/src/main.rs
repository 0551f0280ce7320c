use a2ui_ui_host_runtime::HostConfig;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = a2ui_ui_host_runtime::run(HostConfig::from_env()) {
        error!(%err, "ui_host fatal error");
        process::exit(1);
    }
}
