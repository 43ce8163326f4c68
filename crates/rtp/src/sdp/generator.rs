//! Canonical-order SDP generation.

use std::fmt::Write as _;
use std::net::IpAddr;

use crate::codec::{Codec, CodecEntry};

use super::types::{AddrType, Crypto, Fingerprint, Mode, Setup, TransportProfile};

/// Everything the generator needs that isn't already implied by the codec list.
pub struct GenerateParams<'a> {
    pub session_id: u64,
    pub session_version: u64,
    pub origin_address: IpAddr,
    pub connection_address: IpAddr,
    pub port: u16,
    pub profile: TransportProfile,
    pub codecs: &'a [CodecEntry],
    pub mode: Mode,
    pub crypto: Option<&'a Crypto>,
    pub setup: Option<Setup>,
    pub fingerprints: &'a [Fingerprint],
}

/// Render one `m=audio` SDP body in the canonical field order.
pub fn generate(p: &GenerateParams) -> String {
    let mut out = String::new();
    let origin_type = AddrType::of(p.origin_address);
    let conn_type = AddrType::of(p.connection_address);

    let _ = writeln!(out, "v=0");
    let _ = writeln!(
        out,
        "o=- {} {} IN {} {}",
        p.session_id,
        p.session_version,
        origin_type.as_str(),
        p.origin_address
    );
    let _ = writeln!(out, "s=Sip Go Media");
    let _ = writeln!(out, "c=IN {} {}", conn_type.as_str(), p.connection_address);
    let _ = writeln!(out, "t=0 0");

    let pts: Vec<String> = p.codecs.iter().map(|e| e.payload_type.to_string()).collect();
    let _ = writeln!(out, "m=audio {} {} {}", p.port, p.profile.as_str(), pts.join(" "));

    for entry in p.codecs {
        let _ = writeln!(out, "a=rtpmap:{}", rtpmap_line(entry));
        if let Some(fmtp) = entry.codec.fmtp() {
            let _ = writeln!(out, "a=fmtp:{} {}", entry.payload_type, fmtp);
        }
    }

    let _ = writeln!(out, "a=ptime:20");
    let _ = writeln!(out, "a=maxptime:20");
    let _ = writeln!(out, "a={}", p.mode.as_str());

    if let Some(crypto) = p.crypto {
        let _ = writeln!(out, "a=crypto:{} {} inline:{}", crypto.tag, crypto.profile, crypto.inline_base64);
    }

    if let Some(setup) = p.setup {
        let _ = writeln!(out, "a=setup:{}", setup.as_str());
        let _ = writeln!(out, "a=connection:new");
        for fp in p.fingerprints {
            let _ = writeln!(out, "a=fingerprint:{} {}", fp.algorithm, fp.hex);
        }
    }

    out
}

fn rtpmap_line(entry: &CodecEntry) -> String {
    let name = entry.codec.rtpmap_name();
    let rate = entry.codec.clock_rate();
    match &entry.codec {
        Codec::Opus { channels } => format!("{} {}/{}/{}", entry.payload_type, name, rate, channels),
        _ if entry.codec.channels() > 1 => {
            format!("{} {}/{}/{}", entry.payload_type, name, rate, entry.codec.channels())
        }
        _ => format!("{} {}/{}", entry.payload_type, name, rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn emits_well_known_rtpmap_lines() {
        let codecs = vec![
            CodecEntry { payload_type: 0, codec: Codec::Pcmu },
            CodecEntry { payload_type: 8, codec: Codec::Pcma },
            CodecEntry { payload_type: 96, codec: Codec::Opus { channels: 2 } },
            CodecEntry { payload_type: 101, codec: Codec::TelephoneEvent },
        ];
        let params = GenerateParams {
            session_id: 1,
            session_version: 1,
            origin_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            connection_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 40000,
            profile: TransportProfile::RtpAvp,
            codecs: &codecs,
            mode: Mode::SendRecv,
            crypto: None,
            setup: None,
            fingerprints: &[],
        };
        let body = generate(&params);
        assert!(body.contains("m=audio 40000 RTP/AVP 0 8 96 101\n"));
        assert!(body.contains("a=rtpmap:0 PCMU/8000\n"));
        assert!(body.contains("a=rtpmap:96 opus/48000/2\n"));
        assert!(body.contains("a=fmtp:101 0-16\n"));
        assert!(body.contains("a=ptime:20\n"));
        assert!(body.contains("a=maxptime:20\n"));
        assert!(body.contains("a=sendrecv\n"));
    }
}
