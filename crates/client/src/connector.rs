//! Transport seam between the session loop and the arbiter.

use crate::error::ClientError;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{error, info};

/// Opens a line-oriented connection to the arbiter.
#[async_trait]
pub trait Connector: Send + Sync {
    type Reader: AsyncBufRead + Unpin + Send;
    type Writer: AsyncWrite + Unpin + Send;

    /// Open a connection and split it into buffered reader and writer halves.
    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(Self::Reader, Self::Writer), ClientError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Reader = BufReader<OwnedReadHalf>;
    type Writer = OwnedWriteHalf;

    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(Self::Reader, Self::Writer), ClientError> {
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            error!("Failed to connect to {}:{}: {}", host, port, e);
            ClientError::ConnectionLost(format!("connect to {}:{} failed: {}", host, port, e))
        })?;
        stream.set_nodelay(true)?;
        info!("Connected to arbiter at {}:{}", host, port);

        let (reader, writer) = stream.into_split();
        Ok((BufReader::new(reader), writer))
    }
}
