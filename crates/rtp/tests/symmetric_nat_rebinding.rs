//! Symmetric-NAT handling: once a valid RTP packet arrives from an address other
//! than the one negotiated in SDP, the session must retarget outbound packets to
//! wherever that packet actually came from.

use std::net::IpAddr;

use bytes::Bytes;
use sipmedia_rtp::codec::{Codec, CodecEntry};
use sipmedia_rtp::config::{MediaConfig, NatPolicy, PortRange};
use sipmedia_rtp::rtp::{PacketHeader, RtpPacket, RtpReader, RtpWriter};
use sipmedia_rtp::session::MediaSession;
use tokio::net::UdpSocket;

fn config(start: u16, end: u16, local_ip: [u8; 4], nat_policy: NatPolicy) -> MediaConfig {
    let mut config = MediaConfig::default();
    config.local_ip = IpAddr::from(local_ip);
    config.port_range = Some(PortRange::new(start, end));
    config.nat_policy = nat_policy;
    config
}

fn pcmu_entry() -> CodecEntry {
    CodecEntry::well_known(Codec::Pcmu).unwrap()
}

#[tokio::test]
async fn inbound_packet_from_a_new_address_latches_the_send_target() {
    // `a` negotiates against a peer that appears to live on 127.0.0.2, then the
    // far side's actual traffic arrives from 127.0.0.3 instead (a symmetric NAT
    // rewriting the source port/address underneath it).
    let a = MediaSession::new(config(46000, 46020, [127, 0, 0, 1], NatPolicy::Symmetric), vec![pcmu_entry()], 0)
        .await
        .unwrap();
    let negotiated_peer =
        MediaSession::new(config(46000, 46020, [127, 0, 0, 2], NatPolicy::Fixed), vec![pcmu_entry()], 0).await.unwrap();

    let offer = a.local_sdp().await.unwrap();
    negotiated_peer.remote_sdp(&offer).await.unwrap();
    let answer = negotiated_peer.local_sdp().await.unwrap();
    a.remote_sdp(&answer).await.unwrap();

    let originally_negotiated_addr = negotiated_peer.local_rtp_addr().unwrap();
    assert_eq!(a.peer_rtp_addr(), Some(originally_negotiated_addr));

    // A raw socket on a third address stands in for the NAT-rewritten source.
    let nat_socket = UdpSocket::bind((IpAddr::from([127, 0, 0, 3]), 0)).await.unwrap();
    let nat_addr = nat_socket.local_addr().unwrap();

    let header = PacketHeader::new(0, 1, 160, 0x9009);
    let packet = RtpPacket::new(header, Bytes::from_static(b"from-behind-nat"));
    nat_socket.send_to(&packet.marshal(), a.local_rtp_addr().unwrap()).await.unwrap();

    let received = a.read_rtp().await.unwrap();
    assert_eq!(received.payload, Bytes::from_static(b"from-behind-nat"));
    assert_eq!(a.peer_rtp_addr(), Some(nat_addr));

    // The next outbound packet must follow the NAT rebinding, not the original offer.
    let reply_header = PacketHeader::new(0, 1, 160, 0xAAAA);
    let reply = RtpPacket::new(reply_header, Bytes::from_static(b"reply"));
    a.write_rtp(&reply).await.unwrap();

    let mut buf = [0u8; 2048];
    let (n, from) = nat_socket.recv_from(&mut buf).await.unwrap();
    assert_eq!(from, nat_addr);
    let reply_packet = RtpPacket::unmarshal(Bytes::copy_from_slice(&buf[..n])).unwrap();
    assert_eq!(reply_packet.payload, Bytes::from_static(b"reply"));
}

#[tokio::test]
async fn fixed_nat_policy_never_rebinds() {
    let a = MediaSession::new(config(46030, 46050, [127, 0, 0, 1], NatPolicy::Fixed), vec![pcmu_entry()], 0)
        .await
        .unwrap();
    let negotiated_peer =
        MediaSession::new(config(46030, 46050, [127, 0, 0, 2], NatPolicy::Fixed), vec![pcmu_entry()], 0).await.unwrap();

    let offer = a.local_sdp().await.unwrap();
    negotiated_peer.remote_sdp(&offer).await.unwrap();
    let answer = negotiated_peer.local_sdp().await.unwrap();
    a.remote_sdp(&answer).await.unwrap();
    let original_peer = a.peer_rtp_addr().unwrap();

    let other_socket = UdpSocket::bind((IpAddr::from([127, 0, 0, 4]), 0)).await.unwrap();
    let header = PacketHeader::new(0, 1, 160, 0x2222);
    let packet = RtpPacket::new(header, Bytes::from_static(b"x"));
    other_socket.send_to(&packet.marshal(), a.local_rtp_addr().unwrap()).await.unwrap();

    let _ = a.read_rtp().await.unwrap();
    assert_eq!(a.peer_rtp_addr(), Some(original_peer));
}
