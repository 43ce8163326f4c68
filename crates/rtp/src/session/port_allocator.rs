//! Even-port RTP/RTCP pair allocation within a configured range, with a rotating
//! offset so repeated allocations spread across the range instead of always
//! starting from `start`.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::UdpSocket;

use crate::config::PortRange;
use crate::error::{Error, Result};

/// Tracks the rotating offset for one port range. Cheap to clone; the offset is
/// shared via an `Arc` so every session drawn from the same range advances it.
#[derive(Clone)]
pub struct PortAllocator {
    range: PortRange,
    offset: std::sync::Arc<AtomicU32>,
}

impl PortAllocator {
    pub fn new(range: PortRange) -> Self {
        Self { range, offset: std::sync::Arc::new(AtomicU32::new(0)) }
    }

    fn even_ports(&self) -> Vec<u16> {
        (self.range.start..=self.range.end).step_by(2).collect()
    }

    /// Bind an RTP/RTCP socket pair at consecutive even/odd ports somewhere in the
    /// range, scanning from the rotating offset. Returns the bound sockets.
    pub async fn bind_pair(&self, ip: IpAddr) -> Result<(UdpSocket, UdpSocket)> {
        let ports = self.even_ports();
        if ports.is_empty() {
            return Err(Error::PortRangeExhausted { start: self.range.start, end: self.range.end });
        }
        let start_index = self.offset.fetch_add(1, Ordering::Relaxed) as usize % ports.len();

        for i in 0..ports.len() {
            let port = ports[(start_index + i) % ports.len()];
            if let Ok(rtp) = UdpSocket::bind(SocketAddr::new(ip, port)).await {
                match UdpSocket::bind(SocketAddr::new(ip, port + 1)).await {
                    Ok(rtcp) => return Ok((rtp, rtcp)),
                    Err(_) => continue, // rtp socket drops here, freeing the port for the next attempt
                }
            }
        }
        Err(Error::PortRangeExhausted { start: self.range.start, end: self.range.end })
    }
}

/// Bind a specific RTP/RTCP port pair, retrying up to ten times to absorb bind
/// races against other processes on the same host.
pub async fn bind_pair_at(ip: IpAddr, rtp_port: u16) -> Result<(UdpSocket, UdpSocket)> {
    const ATTEMPTS: usize = 10;
    let mut last_err = None;
    for _ in 0..ATTEMPTS {
        match UdpSocket::bind(SocketAddr::new(ip, rtp_port)).await {
            Ok(rtp) => match UdpSocket::bind(SocketAddr::new(ip, rtp_port + 1)).await {
                Ok(rtcp) => return Ok((rtp, rtcp)),
                Err(e) => last_err = Some(e),
            },
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.map(Error::Io).unwrap_or(Error::PortRangeExhausted { start: rtp_port, end: rtp_port }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn allocates_distinct_even_ports_across_calls() {
        let allocator = PortAllocator::new(PortRange::new(41000, 41020));
        let (a, _) = allocator.bind_pair(IpAddr::from([127, 0, 0, 1])).await.unwrap();
        let (b, _) = allocator.bind_pair(IpAddr::from([127, 0, 0, 1])).await.unwrap();
        assert_ne!(a.local_addr().unwrap().port(), b.local_addr().unwrap().port());
        assert_eq!(a.local_addr().unwrap().port() % 2, 0);
    }

    #[tokio::test]
    #[serial]
    async fn exhausted_range_is_a_distinct_error() {
        let allocator = PortAllocator::new(PortRange::new(41100, 41100));
        let _held = allocator.bind_pair(IpAddr::from([127, 0, 0, 1])).await.unwrap();
        let err = allocator.bind_pair(IpAddr::from([127, 0, 0, 1])).await.unwrap_err();
        assert!(matches!(err, Error::PortRangeExhausted { .. }));
    }
}
