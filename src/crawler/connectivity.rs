//! Pause gate that blocks while the machine is offline
//!
//! Long scans outlive flaky connections. Rather than burning through the
//! sample with connection errors, the gate opens a TCP connection to a
//! well-known host and sleeps until it succeeds.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Google public DNS, reachable from almost anywhere
const DEFAULT_PROBE_ADDR: ([u8; 4], u16) = ([8, 8, 8, 8], 53);

/// Blocks callers until an external host answers
#[derive(Debug, Clone)]
pub struct ConnectivityGate {
    probe_addr: Option<SocketAddr>,
    connect_timeout: Duration,
    retry_interval: Duration,
}

impl Default for ConnectivityGate {
    fn default() -> Self {
        Self {
            probe_addr: Some(SocketAddr::from(DEFAULT_PROBE_ADDR)),
            connect_timeout: Duration::from_secs(3),
            retry_interval: Duration::from_secs(60),
        }
    }
}

impl ConnectivityGate {
    /// A gate that never blocks
    pub fn disabled() -> Self {
        Self {
            probe_addr: None,
            ..Self::default()
        }
    }

    /// A gate probing a custom address
    pub fn with_probe(probe_addr: SocketAddr, connect_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            probe_addr: Some(probe_addr),
            connect_timeout,
            retry_interval,
        }
    }

    /// Whether the probe address accepts a connection right now
    pub async fn is_online(&self) -> bool {
        let Some(addr) = self.probe_addr else {
            return true;
        };
        matches!(
            timeout(self.connect_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    /// Wait until the probe address accepts a connection
    pub async fn wait_until_online(&self) {
        while !self.is_online().await {
            warn!(
                "Internet connection lost. Pausing scan, retrying in {}s",
                self.retry_interval.as_secs()
            );
            tokio::time::sleep(self.retry_interval).await;
        }
        debug!("Connectivity check passed");
    }
}
