//! Two-party RTP bridge: once both legs are present and codec-compatible, pumps
//! packets from each leg's reader to the other's writer until either side ends
//!.

use std::sync::Arc;

use parking_lot::Mutex;
use sipmedia_rtp::codec::Codec;
use sipmedia_rtp::session::RtpSession;

use crate::error::{Error, Result};

const MAX_PARTICIPANTS: usize = 2;

/// A session added to a bridge, remembering the codec it negotiated so a later
/// `add_session` can be rejected on mismatch.
struct Participant {
    session: Arc<RtpSession>,
    codec: Codec,
}

/// Bridges up to two dialog sessions together, proxying RTP in both directions
/// once both are present.
pub struct Bridge {
    allow_transcoding: bool,
    participants: Mutex<Vec<Participant>>,
}

impl Bridge {
    pub fn new(allow_transcoding: bool) -> Self {
        Self { allow_transcoding, participants: Mutex::new(Vec::new()) }
    }

    /// Add a dialog session, identified by the single codec it negotiated.
    /// Fails if the bridge is full, or if a codec already present differs and
    /// transcoding isn't allowed.
    pub fn add_dialog_session(&self, session: Arc<RtpSession>, codec: Codec) -> Result<()> {
        let mut participants = self.participants.lock();
        if participants.len() >= MAX_PARTICIPANTS {
            return Err(Error::BridgeFull);
        }
        if !self.allow_transcoding {
            if let Some(existing) = participants.first() {
                if existing.codec != codec {
                    return Err(Error::BridgeCodecMismatch(format!(
                        "{} vs {}",
                        existing.codec.rtpmap_name(),
                        codec.rtpmap_name()
                    )));
                }
            }
        }
        participants.push(Participant { session, codec });
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.participants.lock().len() >= MAX_PARTICIPANTS
    }

    /// Run the proxy loop: blocks until both legs are bridged and then copies
    /// RTP in both directions until either side ends, returning the first
    /// non-EOF error encountered (if any).
    pub async fn run(&self) -> Result<()> {
        let (a, b) = {
            let participants = self.participants.lock();
            if participants.len() < MAX_PARTICIPANTS {
                return Ok(());
            }
            (participants[0].session.clone(), participants[1].session.clone())
        };

        let a_to_b = Self::copy_loop(a.clone(), b.clone());
        let b_to_a = Self::copy_loop(b, a);

        tokio::select! {
            result = a_to_b => result,
            result = b_to_a => result,
        }
    }

    async fn copy_loop(from: Arc<RtpSession>, to: Arc<RtpSession>) -> Result<()> {
        loop {
            let packet = match from.read_rtp().await {
                Ok(packet) => packet,
                Err(err) if err.is_closed() => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            to.write_rtp(&packet).await?;
        }
    }

    /// Remove a session from the bridge, terminating both copy directions the
    /// next time they observe the session closed.
    pub fn remove(&self, session: &Arc<RtpSession>) {
        self.participants.lock().retain(|p| !Arc::ptr_eq(&p.session, session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipmedia_rtp::config::{MediaConfig, PortRange};
    use sipmedia_rtp::session::MediaSession;
    use sipmedia_rtp::codec::CodecEntry;
    use std::net::IpAddr;

    fn pcmu_entry() -> CodecEntry {
        CodecEntry::well_known(Codec::Pcmu).unwrap()
    }

    fn config_with_range(start: u16, end: u16) -> MediaConfig {
        let mut config = MediaConfig::default();
        config.local_ip = IpAddr::from([127, 0, 0, 1]);
        config.port_range = Some(PortRange::new(start, end));
        config
    }

    async fn session(start: u16, end: u16) -> Arc<RtpSession> {
        let media = MediaSession::new(config_with_range(start, end), vec![pcmu_entry()], 0).await.unwrap();
        Arc::new(RtpSession::new(Arc::new(media)))
    }

    #[tokio::test]
    async fn rejects_codec_mismatch_without_transcoding() {
        let bridge = Bridge::new(false);
        let s1 = session(42000, 42020).await;
        bridge.add_dialog_session(s1, Codec::Pcmu).unwrap();

        let s2 = session(42030, 42050).await;
        let err = bridge.add_dialog_session(s2, Codec::Pcma).unwrap_err();
        assert!(matches!(err, Error::BridgeCodecMismatch(_)));
    }

    #[tokio::test]
    async fn rejects_a_third_session() {
        let bridge = Bridge::new(true);
        bridge.add_dialog_session(session(42060, 42080).await, Codec::Pcmu).unwrap();
        bridge.add_dialog_session(session(42090, 42110).await, Codec::Pcma).unwrap();
        let err = bridge.add_dialog_session(session(42120, 42140).await, Codec::Pcmu).unwrap_err();
        assert!(matches!(err, Error::BridgeFull));
    }
}
