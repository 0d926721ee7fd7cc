//! `opframe` command line client.
//!
//! Dials the first reachable endpoint, authenticates and logs every reply
//! until interrupted or the connection closes.

mod cli;

use clap::Parser;
use opframe::{
    client::{Client, ClientConfig, CloseReason, DispatchTable},
    proto::op,
};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();

    #[cfg(feature = "metrics")]
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "serving metrics");
    }
    #[cfg(not(feature = "metrics"))]
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature; ignoring --metrics-addr");
    }

    let (auth_tx, mut auth_rx) = mpsc::unbounded_channel();
    let dispatch = DispatchTable::new()
        .route(op::AUTH_REPLY, move |msg| {
            info!(body = %String::from_utf8_lossy(msg.payload()), "auth reply");
            // The receiver only goes away once main is shutting down.
            let _ = auth_tx.send(());
            Ok(())
        })?
        .route(op::HEARTBEAT_REPLY, |msg| {
            info!(bytes = msg.payload().len(), "heartbeat reply");
            Ok(())
        })?
        .route(op::SEND_MSG_REPLY, |msg| {
            info!(body = %String::from_utf8_lossy(msg.payload()), "message");
            Ok(())
        })?;

    let client = Client::builder()
        .dispatch(dispatch)
        .config(ClientConfig {
            auth_timeout: cli.auth_timeout(),
            heartbeat_interval: cli.heartbeat_interval(),
            ..ClientConfig::default()
        })
        .on_close(|_, reason| info!(%reason, "connection closed"))
        .build();

    client.dial(cli.addrs.as_slice()).await?;
    client.run()?;
    match cli.auth_body {
        Some(body) => client.send_auth(body).await?,
        None => client.auth_success(),
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!(error = %err, "listening for ctrl-c failed");
                }
                client.close(CloseReason::Actively).await?;
                break;
            }
            Some(()) = auth_rx.recv() => client.auth_success(),
            () = client.closed() => {
                // Teardown already began elsewhere; wait for its outcome.
                client.close(CloseReason::Unknown).await?;
                break;
            }
        }
    }
    Ok(())
}
