use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use relaychat_netd::net::tcp::run_tcp_listener_with_listener;
use relaychat_netd::{run_server, ServerConfig};

/// Instant-messaging relay server
#[derive(Parser, Debug)]
#[command(name = "relaychat-netd")]
#[command(about = "Instant-messaging relay server", long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(default_value_t = 8888)]
    port: u16,

    /// Bind address
    #[arg(default_value = "0.0.0.0")]
    bind_ip: IpAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Maximum number of logged-in clients
    #[arg(long, default_value_t = 1024)]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Bind before anything is spawned so a bad address fails the process
    // with exit code 1 instead of dying inside a task.
    let bind = SocketAddr::new(args.bind_ip, args.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;

    // Network layer -> dispatch loop events.
    let (event_tx, event_rx) = mpsc::channel(1024);
    tokio::spawn(async move {
        let _ = run_tcp_listener_with_listener(listener, event_tx).await;
    });

    // SIGINT / SIGTERM -> clean shutdown.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("signal received, stopping server"),
            Err(e) => error!(error = %e, "signal handler failed, stopping server"),
        }
        let _ = shutdown_tx.send(()).await;
    });

    info!("relay server started on {}", bind);
    info!("log level: {}", args.log_level);

    let config = ServerConfig {
        max_clients: args.max_clients,
        ..ServerConfig::default()
    };

    // Run dispatch loop
    run_server(event_rx, shutdown_rx, config).await
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut term =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
