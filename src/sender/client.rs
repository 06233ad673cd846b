//! TCP sender delivering snapshot frames to a remote collector.

use std::io::Write;
use std::net::TcpStream;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::model::NodeMonitoringData;
use crate::monitor::{MonitoringSender, SendError};
use crate::sender::frame;

/// Connect timeout for a fresh collector connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sender that frames each snapshot and writes it to a collector socket.
///
/// Connects lazily on the first send and keeps the connection across cycles.
/// Any transport failure drops the connection; the next cycle reconnects.
/// Failed snapshots are never retried or buffered.
pub struct CollectorClient {
    addr: String,
    conn: Mutex<Option<TcpStream>>,
}

impl CollectorClient {
    /// Creates a client for the collector at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<TcpStream, SendError> {
        let mut last_err = None;
        for resolved in std::net::ToSocketAddrs::to_socket_addrs(&self.addr)? {
            match TcpStream::connect_timeout(&resolved, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    info!("connected to collector at {}", self.addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(SendError::Io(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no address resolved for {}", self.addr),
            )
        })))
    }
}

impl MonitoringSender for CollectorClient {
    fn send_monitoring_data(&self, data: &NodeMonitoringData) -> Result<(), SendError> {
        let frame = frame::encode(data)?;

        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stream = match conn.take() {
            Some(stream) => stream,
            None => self.connect()?,
        };

        // On failure the stream is not put back; the next cycle reconnects.
        stream.write_all(&frame)?;
        stream.flush()?;
        *conn = Some(stream);

        debug!("sent snapshot frame ({} bytes)", frame.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_send_delivers_decodable_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let decoded = frame::decode(&mut socket).unwrap();
            tx.send(decoded).unwrap();
        });

        let client = CollectorClient::new(addr.to_string());
        let snapshot = NodeMonitoringData {
            node_id: "node1".to_string(),
            timestamp: 1_700_000_000,
            ..Default::default()
        };
        client.send_monitoring_data(&snapshot).unwrap();

        let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received, snapshot);
    }

    #[test]
    fn test_unreachable_collector_is_an_error() {
        // Port 1 on localhost is essentially never listening.
        let client = CollectorClient::new("127.0.0.1:1");
        let err = client.send_monitoring_data(&NodeMonitoringData::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_connection_reused_across_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // A single accepted connection serves both frames.
            let (mut socket, _) = listener.accept().unwrap();
            for _ in 0..2 {
                let decoded = frame::decode(&mut socket).unwrap();
                tx.send(decoded).unwrap();
            }
        });

        let client = CollectorClient::new(addr.to_string());
        for _ in 0..2 {
            client
                .send_monitoring_data(&NodeMonitoringData::default())
                .unwrap();
        }

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
