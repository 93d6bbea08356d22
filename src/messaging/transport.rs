// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Message transport contract and the pooled TCP broker transport.
//!
//! The notification and indexing services only see `MessageTransport` and
//! `MessageReceiver`; tests substitute in-memory implementations.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::messaging::codec::{Frame, FrameCodec};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection
    #[error("Connection closed by peer")]
    Disconnected,

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Operation timed out")]
    Timeout,
}

/// Returns true if `err` or any error in its source chain is a lost connection.
pub fn is_connection_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(TransportError::Disconnected) = e.downcast_ref::<TransportError>() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, destination: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Open a subscription on `destination`.
    async fn open_receiver(
        &self,
        destination: &str,
    ) -> Result<Box<dyn MessageReceiver>, TransportError>;

    /// Close every pooled outbound connection.
    fn destroy_connections(&self);
}

#[async_trait]
pub trait MessageReceiver: Send {
    /// Next message, or `None` if nothing arrived within `timeout`.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>, TransportError>;
}

type FramedConnection = Framed<TcpStream, FrameCodec>;

/// Broker transport over TCP with a pool of idle outbound connections.
pub struct TcpMessageTransport {
    address: String,
    pool: Mutex<Vec<FramedConnection>>,
}

impl TcpMessageTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            pool: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn idle_connections(&self) -> usize {
        self.pool.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn connect(&self) -> Result<FramedConnection, TransportError> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        debug!(address = %self.address, "Opened broker connection");
        Ok(Framed::new(stream, FrameCodec::new()))
    }

    async fn checkout(&self) -> Result<FramedConnection, TransportError> {
        let pooled = self.pool.lock().unwrap_or_else(|e| e.into_inner()).pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => self.connect().await,
        }
    }

    fn checkin(&self, conn: FramedConnection) {
        self.pool.lock().unwrap_or_else(|e| e.into_inner()).push(conn);
    }
}

#[async_trait]
impl MessageTransport for TcpMessageTransport {
    async fn send(&self, destination: &str, payload: Bytes) -> Result<(), TransportError> {
        let mut conn = self.checkout().await?;
        // A failed send drops the connection instead of returning it to the pool
        conn.send(Frame::send(destination, payload)).await?;
        self.checkin(conn);
        Ok(())
    }

    async fn open_receiver(
        &self,
        destination: &str,
    ) -> Result<Box<dyn MessageReceiver>, TransportError> {
        let mut conn = self.connect().await?;
        conn.send(Frame::subscribe(destination)).await?;
        info!(address = %self.address, destination, "Subscribed to broker destination");
        Ok(Box::new(TcpMessageReceiver { conn }))
    }

    fn destroy_connections(&self) {
        let closed = {
            let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
            let n = pool.len();
            pool.clear();
            n
        };
        debug!(closed, "Destroyed pooled broker connections");
    }
}

struct TcpMessageReceiver {
    conn: FramedConnection,
}

#[async_trait]
impl MessageReceiver for TcpMessageReceiver {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>, TransportError> {
        match tokio::time::timeout(timeout, self.conn.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(TransportError::Disconnected),
            Ok(Some(frame)) => Ok(Some(frame?.body)),
        }
    }
}
