//! DTLS-SRTP (RFC 5764) handshake between two sessions sharing one UDP socket pair
//! with RTP, followed by an SRTP-protected round trip once both sides finalize.

use std::net::IpAddr;

use bytes::Bytes;
use sipmedia_rtp::codec::{Codec, CodecEntry};
use sipmedia_rtp::config::{MediaConfig, PortRange, SecureMode};
use sipmedia_rtp::rtp::{PacketHeader, RtpPacket, RtpReader, RtpWriter};
use sipmedia_rtp::session::MediaSession;

fn dtls_config(start: u16, end: u16) -> MediaConfig {
    let mut config = MediaConfig::default();
    config.local_ip = IpAddr::from([127, 0, 0, 1]);
    config.port_range = Some(PortRange::new(start, end));
    config.secure_mode = SecureMode::Dtls;
    config
}

#[tokio::test]
async fn dtls_handshake_derives_matching_srtp_contexts_and_protects_rtp() {
    let offerer = MediaSession::new(dtls_config(45200, 45230), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();
    let answerer = MediaSession::new(dtls_config(45200, 45230), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();

    let offer = offerer.local_sdp().await.unwrap();
    assert!(offer.contains("a=fingerprint:"));
    assert!(offer.contains("a=setup:"));
    answerer.remote_sdp(&offer).await.unwrap();
    let answer = answerer.local_sdp().await.unwrap();
    offerer.remote_sdp(&answer).await.unwrap();

    // Offerer proposed `active`/`actpass`, so the answerer resolved to the DTLS
    // server role and the offerer drives the handshake as client; both run
    // `finalize` concurrently since each blocks on the other's first flight.
    let (offerer_result, answerer_result) = tokio::join!(offerer.finalize(), answerer.finalize());
    offerer_result.unwrap();
    answerer_result.unwrap();

    let header = PacketHeader::new(0, 1, 160, 0x1357);
    let packet = RtpPacket::new(header, Bytes::from_static(b"dtls-srtp-audio"));
    offerer.write_rtp(&packet).await.unwrap();

    let received = answerer.read_rtp().await.unwrap();
    assert_eq!(received.payload, Bytes::from_static(b"dtls-srtp-audio"));
}
