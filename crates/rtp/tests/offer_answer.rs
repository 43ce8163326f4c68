//! SDP offer/answer round trip between two plain-RTP sessions (RFC 3264 basic flow).

use std::net::IpAddr;

use sipmedia_rtp::codec::{Codec, CodecEntry};
use sipmedia_rtp::config::{MediaConfig, PortRange};
use sipmedia_rtp::session::MediaSession;

fn config(start: u16, end: u16) -> MediaConfig {
    let mut config = MediaConfig::default();
    config.local_ip = IpAddr::from([127, 0, 0, 1]);
    config.port_range = Some(PortRange::new(start, end));
    config
}

#[tokio::test]
async fn offer_answer_negotiates_the_common_codec_and_peer_address() {
    let caller = MediaSession::new(
        config(45000, 45020),
        vec![CodecEntry::well_known(Codec::Pcmu).unwrap(), CodecEntry::well_known(Codec::Pcma).unwrap()],
        0,
    )
    .await
    .unwrap();
    let callee =
        MediaSession::new(config(45000, 45020), vec![CodecEntry::well_known(Codec::Pcma).unwrap()], 0).await.unwrap();

    let offer = caller.local_sdp().await.unwrap();
    assert!(offer.starts_with("v=0\r\n"));
    assert!(offer.contains("m=audio"));

    callee.remote_sdp(&offer).await.unwrap();
    let answer = callee.local_sdp().await.unwrap();
    caller.remote_sdp(&answer).await.unwrap();

    let caller_codecs = caller.negotiated_codecs();
    let callee_codecs = callee.negotiated_codecs();
    assert_eq!(caller_codecs.len(), 1);
    assert_eq!(caller_codecs[0].codec, Codec::Pcma);
    assert_eq!(callee_codecs.len(), 1);
    assert_eq!(callee_codecs[0].codec, Codec::Pcma);

    let callee_rtp_addr = callee.local_rtp_addr().unwrap();
    assert_eq!(caller.peer_rtp_addr(), Some(callee_rtp_addr));
}

#[tokio::test]
async fn answering_session_regenerates_sdp_after_accepting_a_new_offer() {
    let caller = MediaSession::new(config(45030, 45050), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();
    let callee = MediaSession::new(config(45030, 45050), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();

    let cached = callee.local_sdp().await.unwrap();
    let offer = caller.local_sdp().await.unwrap();
    callee.remote_sdp(&offer).await.unwrap();
    let fresh = callee.local_sdp().await.unwrap();

    // Accepting an offer invalidates whatever SDP body was cached before negotiation.
    assert_ne!(cached, fresh);
}
