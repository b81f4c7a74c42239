//! Per-request connection establishment.
//!
//! The gateway does not pool or share connections: each external request
//! opens one connection, uses it, and drops it, including on every failure
//! path. Establishment is bounded by the configured connect timeout.

use std::time::Duration;

use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{GatewayError, Result};

/// A single authenticated TDS connection.
pub type Connection = Client<Compat<TcpStream>>;

fn build_config(config: &ConnectionConfig) -> Config {
    let mut tds = Config::new();
    tds.host(&config.host);
    tds.port(config.port);
    tds.database(&config.database);
    tds.authentication(AuthMethod::sql_server(&config.user, &config.password));

    if config.encrypt {
        if config.trust_server_cert {
            tds.trust_cert();
        }
        tds.encryption(EncryptionLevel::Required);
    } else {
        tds.encryption(EncryptionLevel::NotSupported);
    }

    tds
}

/// Open an authenticated connection, bounded by `connect_timeout`.
pub async fn open(config: &ConnectionConfig, connect_timeout: Duration) -> Result<Connection> {
    let tds = build_config(config);
    let addr = tds.get_addr();

    let client = tokio::time::timeout(connect_timeout, async {
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| GatewayError::connection(format!("cannot reach {}: {}", addr, e)))?;
        tcp.set_nodelay(true).ok();

        Client::connect(tds, tcp.compat_write())
            .await
            .map_err(|e| GatewayError::connection(format!("login to {} failed: {}", addr, e)))
    })
    .await
    .map_err(|_| {
        GatewayError::connection(format!(
            "connection to {} not established within {:?}",
            addr, connect_timeout
        ))
    })??;

    debug!(
        "Connected to {}:{}/{}",
        config.host, config.port, config.database
    );
    Ok(client)
}
