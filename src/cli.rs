//! Command line interface for the `opframe` binary.
//!
//! Shared with `build.rs`, which renders the man page from it.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;

/// Connect to one of several endpoints, authenticate and log every message.
#[derive(Debug, Parser)]
#[command(
    name = "opframe",
    version,
    about = "Operation-routed WebSocket client with heartbeats"
)]
pub struct Cli {
    /// Candidate endpoint URLs, tried in order.
    #[arg(required = true, value_name = "URL")]
    pub addrs: Vec<String>,

    /// Body of the authentication request. Without it the connection is
    /// treated as authenticated immediately.
    #[arg(long, env = "OPFRAME_AUTH_BODY")]
    pub auth_body: Option<String>,

    /// Seconds between heartbeats.
    #[arg(long, default_value_t = 15)]
    pub heartbeat_secs: u64,

    /// Seconds to wait for an authentication reply.
    #[arg(long, default_value_t = 10)]
    pub auth_timeout_secs: u64,

    /// Serve Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

#[cfg_attr(not(test), allow(dead_code, reason = "build.rs includes this module"))]
impl Cli {
    /// Heartbeat interval as a duration.
    pub fn heartbeat_interval(&self) -> Duration { Duration::from_secs(self.heartbeat_secs) }

    /// Authentication timeout as a duration.
    pub fn auth_timeout(&self) -> Duration { Duration::from_secs(self.auth_timeout_secs) }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_addresses_and_defaults() {
        let cli = Cli::parse_from(["opframe", "wss://a.example/sub", "wss://b.example/sub"]);
        assert_eq!(cli.addrs, ["wss://a.example/sub", "wss://b.example/sub"]);
        assert_eq!(cli.heartbeat_secs, 15);
        assert_eq!(cli.auth_timeout_secs, 10);
        assert!(cli.metrics_addr.is_none());
    }

    #[test]
    fn parses_timing_and_metrics_options() {
        let cli = Cli::parse_from([
            "opframe",
            "--heartbeat-secs",
            "30",
            "--metrics-addr",
            "127.0.0.1:9000",
            "ws://localhost:8080",
        ]);
        assert_eq!(cli.heartbeat_interval().as_secs(), 30);
        assert_eq!(
            cli.metrics_addr.map(|addr| addr.port()),
            Some(9000)
        );
    }

    #[test]
    fn requires_an_address() {
        assert!(Cli::try_parse_from(["opframe"]).is_err());
    }
}
