//! SDES-keyed SRTP: offer/answer carries `a=crypto:` lines, and the resulting
//! RTP/RTCP traffic round-trips once both sides have derived matching contexts.

use std::net::IpAddr;

use bytes::Bytes;
use sipmedia_rtp::codec::{Codec, CodecEntry};
use sipmedia_rtp::config::{MediaConfig, PortRange, SecureMode};
use sipmedia_rtp::rtp::{PacketHeader, RtpPacket, RtpReader, RtpWriter};
use sipmedia_rtp::session::MediaSession;
use sipmedia_rtp::srtp::SrtpProfile;

fn sdes_config(start: u16, end: u16) -> MediaConfig {
    let mut config = MediaConfig::default();
    config.local_ip = IpAddr::from([127, 0, 0, 1]);
    config.port_range = Some(PortRange::new(start, end));
    config.secure_mode = SecureMode::Sdes;
    config
}

#[tokio::test]
async fn sdes_offer_answer_protects_rtp_both_ways() {
    let a = MediaSession::new(sdes_config(45100, 45120), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();
    let b = MediaSession::new(sdes_config(45100, 45120), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();

    let offer = a.local_sdp().await.unwrap();
    assert!(offer.contains("a=crypto:"));
    b.remote_sdp(&offer).await.unwrap();
    let answer = b.local_sdp().await.unwrap();
    assert!(answer.contains("a=crypto:"));
    a.remote_sdp(&answer).await.unwrap();

    let header = PacketHeader::new(0, 1, 160, 0x5EED);
    let packet = RtpPacket::new(header, Bytes::from_static(b"secure-audio"));
    a.write_rtp(&packet).await.unwrap();

    let received = b.read_rtp().await.unwrap();
    assert_eq!(received.payload, Bytes::from_static(b"secure-audio"));
    assert_eq!(received.header.ssrc, 0x5EED);

    // The far side must also be able to answer back over the same pair of contexts.
    let reply_header = PacketHeader::new(0, 1, 160, 0xBEEF);
    let reply = RtpPacket::new(reply_header, Bytes::from_static(b"reply-audio"));
    b.write_rtp(&reply).await.unwrap();
    let received_reply = a.read_rtp().await.unwrap();
    assert_eq!(received_reply.payload, Bytes::from_static(b"reply-audio"));
}

#[tokio::test]
async fn sdes_rejects_peer_offer_with_no_matching_crypto_profile() {
    // Swap the offered profile tag for one `b` isn't looking for; the two never
    // share a crypto line, so `b` must refuse the secure offer rather than fall
    // back to cleartext.
    let a = MediaSession::new(sdes_config(45130, 45150), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();
    let b = MediaSession::new(sdes_config(45130, 45150), vec![CodecEntry::well_known(Codec::Pcmu).unwrap()], 0)
        .await
        .unwrap();

    let offer = a.local_sdp().await.unwrap();
    assert!(offer.contains(SrtpProfile::AesCm128HmacSha1_80.sdes_name()));
    let retagged = offer.replace(
        SrtpProfile::AesCm128HmacSha1_80.sdes_name(),
        SrtpProfile::AesCm256HmacSha1_80.sdes_name(),
    );

    let err = b.remote_sdp(&retagged).await.unwrap_err();
    assert!(matches!(err, sipmedia_rtp::Error::SecureRequiredNoContext));
}
