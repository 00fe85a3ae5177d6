use std::sync::Arc;
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use mdns_scan::config::Config;
use mdns_scan::interface::LocalInterface;
use mdns_scan::report;
use mdns_scan::scan::{MulticastProber, Scanner};

fn list_interfaces() -> Result<()> {
    println!("Available network interfaces:");
    for iface in LocalInterface::list()? {
        match iface.default_cidr() {
            Some(cidr) => println!("  {:<12} {:<40} -> {}", iface.name, iface.ip, cidr),
            None => println!("  {:<12} {} (index {})", iface.name, iface.ip, iface.index),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mdns_scan=info"))
        )
        .init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--list") {
        return list_interfaces();
    }

    let config_path = arg.unwrap_or_else(|| "mdns-scan.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    let interface = LocalInterface::resolve(&config.scan.interface, config.scan.family)?;
    let cidr = match &config.scan.cidr {
        Some(cidr) => cidr.clone(),
        None => interface
            .default_cidr()
            .with_context(|| {
                format!("No cidr configured and {} is not an IPv4 address", interface.ip)
            })?
            .to_string(),
    };

    let scanner = Scanner::new(Arc::new(MulticastProber::new(config.scan.port)))
        .with_concurrency(config.scan.concurrency);

    // Ctrl-C stops the sweep but still reports what was found
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let registry = scanner
        .scan(&interface, &config.scan.services, &cidr, config.scan.timeout(), cancel)
        .await
        .with_context(|| format!("Scan of {} failed", cidr))?;

    if config.output.print {
        print!("{}", report::render(&registry));
    }

    if let Some(path) = &config.output.json_path {
        report::write_json(path, &registry)?;
        tracing::info!("Wrote {} devices to {}", registry.len(), path.display());
    }

    Ok(())
}
