//! Adapts a [`tokio::net::UdpSocket`] shared with RTP/RTCP traffic into a
//! [`webrtc_util::Conn`] the DTLS handshake can run over, demultiplexed by the
//! first byte of each datagram (RFC 5764 §5.1.2: DTLS content types start at
//! 20..63, RTP/RTCP versions start at 128..191).

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use webrtc_util::{Conn, Error, Result};

/// True if the leading byte of a datagram marks it as a DTLS record.
pub fn looks_like_dtls(first_byte: u8) -> bool {
    (20..=63).contains(&first_byte)
}

/// Feeds DTLS datagrams handed to it by the session's receive loop into the
/// handshake, and lets the handshake send datagrams back out over the shared socket.
pub struct DemuxedConn {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl DemuxedConn {
    /// `inbound` is fed by the session's read loop: every datagram whose first byte
    /// satisfies [`looks_like_dtls`] is routed here instead of to the RTP/RTCP path.
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr, inbound: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { socket, peer, inbound: tokio::sync::Mutex::new(inbound) }
    }
}

/// Create the channel pair a session wires between its receive loop and a later
/// [`DemuxedConn`]: the sender is fed datagrams, the receiver is handed to `new`.
pub fn channel() -> (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
    mpsc::channel(64)
}

#[async_trait]
impl Conn for DemuxedConn {
    async fn connect(&self, _addr: SocketAddr) -> Result<()> {
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.inbound.lock().await;
        match rx.recv().await {
            Some(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None => Err(Error::Other("dtls demux channel closed".to_string())),
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let n = self.recv(buf).await?;
        Ok((n, self.peer))
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        Ok(self.socket.send_to(buf, self.peer).await?)
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(self.socket.send_to(buf, target).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
