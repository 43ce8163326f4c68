//! Line-oriented SDP parser for the audio subset this engine negotiates.

use std::net::IpAddr;

use super::types::*;
use crate::error::{Error, Result};

/// Parse an SDP body (CRLF- or LF-delimited) into the single audio [`SdpSession`] it
/// describes.
pub fn parse(body: &str) -> Result<SdpSession> {
    let mut origin: Option<Origin> = None;
    let mut connection: Option<Connection> = None;
    let mut port = None;
    let mut profile = None;
    let mut payload_types = Vec::new();
    let mut rtpmaps = Vec::new();
    let mut fmtps = Vec::new();
    let mut ptime = None;
    let mut maxptime = None;
    let mut mode = Mode::SendRecv;
    let mut crypto = Vec::new();
    let mut setup = None;
    let mut fingerprints = Vec::new();
    let mut in_audio_media = false;

    for (lineno, raw) in body.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let line_no = lineno + 1;
        let (kind, value) = split_line(line, line_no)?;

        match kind {
            'v' => { /* version; only "0" is supported and unchecked beyond parse */ }
            'o' => {
                origin = Some(parse_origin(value, line_no)?);
            }
            's' | 't' => { /* session name / timing: carried but not modeled */ }
            'c' => {
                connection = Some(parse_connection(value, line_no)?);
            }
            'm' => {
                let (kind_word, p, prof, pts) = parse_media(value, line_no)?;
                if kind_word == "audio" {
                    in_audio_media = true;
                    port = Some(p);
                    profile = Some(prof);
                    payload_types = pts;
                } else {
                    in_audio_media = false;
                }
            }
            'a' if in_audio_media => {
                parse_attribute(
                    value,
                    line_no,
                    &mut rtpmaps,
                    &mut fmtps,
                    &mut ptime,
                    &mut maxptime,
                    &mut mode,
                    &mut crypto,
                    &mut setup,
                    &mut fingerprints,
                )?;
            }
            _ => { /* ignore lines we don't model (session-level a=, b=, z=, k=, ...) */ }
        }
    }

    let origin = origin.ok_or_else(|| Error::SdpParse {
        line: 0,
        reason: "missing o= line".into(),
    })?;
    let connection = connection.ok_or_else(|| Error::SdpParse {
        line: 0,
        reason: "missing c= line".into(),
    })?;
    let port = port.ok_or(Error::NoAudioMedia)?;
    let profile = profile.ok_or(Error::NoAudioMedia)?;

    Ok(SdpSession {
        origin,
        connection,
        port,
        profile,
        payload_types,
        rtpmaps,
        fmtps,
        ptime,
        maxptime,
        mode,
        crypto,
        setup,
        fingerprints,
    })
}

fn split_line(line: &str, lineno: usize) -> Result<(char, &str)> {
    let mut chars = line.chars();
    let kind = chars.next().ok_or_else(|| Error::SdpParse { line: lineno, reason: "empty line".into() })?;
    let rest = &line[kind.len_utf8()..];
    let rest = rest.strip_prefix('=').ok_or_else(|| Error::SdpParse {
        line: lineno,
        reason: "missing '=' after type letter".into(),
    })?;
    Ok((kind, rest))
}

fn parse_origin(value: &str, lineno: usize) -> Result<Origin> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(Error::SdpParse { line: lineno, reason: "malformed o= line".into() });
    }
    let session_id: u64 = parts[1].parse().map_err(|_| Error::SdpParse {
        line: lineno,
        reason: "non-numeric session id".into(),
    })?;
    let session_version: u64 = parts[2].parse().map_err(|_| Error::SdpParse {
        line: lineno,
        reason: "non-numeric session version".into(),
    })?;
    if parts[3] != "IN" {
        return Err(Error::SdpParse { line: lineno, reason: "unsupported network type".into() });
    }
    let addr_type = match parts[4] {
        "IP4" => AddrType::Ip4,
        "IP6" => AddrType::Ip6,
        other => return Err(Error::SdpParse { line: lineno, reason: format!("unknown addrtype {other}") }),
    };
    let address: IpAddr = parts[5]
        .parse()
        .map_err(|_| Error::InvalidConnectionAddress(parts[5].to_string()))?;
    Ok(Origin {
        username: parts[0].to_string(),
        session_id,
        session_version,
        addr_type,
        address,
    })
}

fn parse_connection(value: &str, lineno: usize) -> Result<Connection> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 || parts[0] != "IN" {
        return Err(Error::SdpParse { line: lineno, reason: "malformed c= line".into() });
    }
    let addr_type = match parts[1] {
        "IP4" => AddrType::Ip4,
        "IP6" => AddrType::Ip6,
        other => return Err(Error::SdpParse { line: lineno, reason: format!("unknown addrtype {other}") }),
    };
    let address: IpAddr = parts[2]
        .parse()
        .map_err(|_| Error::InvalidConnectionAddress(parts[2].to_string()))?;
    Ok(Connection { addr_type, address })
}

type MediaLine = (String, Option<u16>, Option<TransportProfile>, Vec<u8>);

fn parse_media(value: &str, lineno: usize) -> Result<MediaLine> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(Error::SdpParse { line: lineno, reason: "malformed m= line".into() });
    }
    let kind = parts[0].to_string();
    if kind != "audio" {
        return Ok((kind, None, None, Vec::new()));
    }
    let port: u16 = parts[1].parse().map_err(|_| Error::SdpParse {
        line: lineno,
        reason: "non-numeric port".into(),
    })?;
    let profile = TransportProfile::parse(parts[2])
        .ok_or_else(|| Error::UnsupportedProfile(parts[2].to_string()))?;
    let payload_types = parts[3..]
        .iter()
        .map(|p| p.parse::<u8>().map_err(|_| Error::SdpParse {
            line: lineno,
            reason: format!("non-numeric payload type {p}"),
        }))
        .collect::<Result<Vec<_>>>()?;
    Ok((kind, Some(port), Some(profile), payload_types))
}

#[allow(clippy::too_many_arguments)]
fn parse_attribute(
    value: &str,
    lineno: usize,
    rtpmaps: &mut Vec<RtpMap>,
    fmtps: &mut Vec<Fmtp>,
    ptime: &mut Option<u32>,
    maxptime: &mut Option<u32>,
    mode: &mut Mode,
    crypto: &mut Vec<Crypto>,
    setup: &mut Option<Setup>,
    fingerprints: &mut Vec<Fingerprint>,
) -> Result<()> {
    if let Some(m) = Mode::parse(value) {
        *mode = m;
        return Ok(());
    }

    let (name, rest) = match value.split_once(':') {
        Some((n, r)) => (n, Some(r)),
        None => (value, None),
    };

    match (name, rest) {
        ("rtpmap", Some(rest)) => {
            let (pt_str, spec) = rest.split_once(' ').ok_or_else(|| Error::SdpParse {
                line: lineno,
                reason: "malformed a=rtpmap".into(),
            })?;
            let payload_type: u8 = pt_str.parse().map_err(|_| Error::SdpParse {
                line: lineno,
                reason: "non-numeric rtpmap payload type".into(),
            })?;
            let mut segs = spec.split('/');
            let name = segs.next().unwrap_or_default().to_string();
            let clock_rate: u32 = segs
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::SdpParse { line: lineno, reason: "malformed rtpmap clock rate".into() })?;
            let channels = segs.next().and_then(|s| s.parse().ok());
            rtpmaps.push(RtpMap { payload_type, name, clock_rate, channels });
        }
        ("fmtp", Some(rest)) => {
            let (pt_str, params) = rest.split_once(' ').ok_or_else(|| Error::SdpParse {
                line: lineno,
                reason: "malformed a=fmtp".into(),
            })?;
            let payload_type: u8 = pt_str.parse().map_err(|_| Error::SdpParse {
                line: lineno,
                reason: "non-numeric fmtp payload type".into(),
            })?;
            fmtps.push(Fmtp { payload_type, params: params.to_string() });
        }
        ("ptime", Some(v)) => {
            *ptime = Some(v.parse().map_err(|_| Error::SdpParse {
                line: lineno,
                reason: "non-numeric ptime".into(),
            })?);
        }
        ("maxptime", Some(v)) => {
            *maxptime = Some(v.parse().map_err(|_| Error::SdpParse {
                line: lineno,
                reason: "non-numeric maxptime".into(),
            })?);
        }
        ("setup", Some(v)) => {
            *setup = Some(Setup::parse(v).ok_or_else(|| Error::SdpParse {
                line: lineno,
                reason: format!("unsupported a=setup value {v}"),
            })?);
        }
        ("fingerprint", Some(v)) => {
            let (alg, hex) = v.split_once(' ').ok_or_else(|| Error::SdpParse {
                line: lineno,
                reason: "malformed a=fingerprint".into(),
            })?;
            fingerprints.push(Fingerprint { algorithm: alg.to_string(), hex: hex.to_string() });
        }
        ("crypto", Some(v)) => {
            crypto.push(parse_crypto(v, lineno)?);
        }
        _ => { /* unrecognized attribute: ignored */ }
    }
    Ok(())
}

fn parse_crypto(v: &str, lineno: usize) -> Result<Crypto> {
    let parts: Vec<&str> = v.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(Error::SdpParse { line: lineno, reason: "malformed a=crypto".into() });
    }
    let tag: u32 = parts[0].parse().map_err(|_| Error::SdpParse {
        line: lineno,
        reason: "non-numeric crypto tag".into(),
    })?;
    let profile = parts[1].to_string();
    let inline_base64 = parts[2]
        .strip_prefix("inline:")
        .ok_or_else(|| Error::SdpParse { line: lineno, reason: "crypto key material missing inline:".into() })?
        .split('|')
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(Crypto { tag, profile, inline_base64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "v=0\r\n\
o=- 123 1 IN IP4 192.168.178.54\r\n\
s=Sip Go Media\r\n\
c=IN IP4 192.168.178.54\r\n\
t=0 0\r\n\
m=audio 34391 RTP/AVP 0 8 96 101\r\n\
a=rtpmap:0 PCMU/8000\r\n\
a=rtpmap:8 PCMA/8000\r\n\
a=rtpmap:96 opus/48000/2\r\n\
a=rtpmap:101 telephone-event/8000\r\n\
a=fmtp:101 0-16\r\n\
a=sendrecv\r\n";

    #[test]
    fn parses_happy_path_offer() {
        let sdp = parse(SAMPLE).unwrap();
        assert_eq!(sdp.port, 34391);
        assert_eq!(sdp.profile, TransportProfile::RtpAvp);
        assert_eq!(sdp.payload_types, vec![0, 8, 96, 101]);
        assert_eq!(sdp.mode, Mode::SendRecv);
        assert_eq!(sdp.rtpmap_for(96).unwrap().channels, Some(2));
        assert_eq!(sdp.fmtp_for(101).unwrap().params, "0-16");
    }

    #[test]
    fn missing_audio_media_is_an_error() {
        let body = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\nc=IN IP4 127.0.0.1\r\nt=0 0\r\n";
        assert!(matches!(parse(body), Err(Error::NoAudioMedia)));
    }

    #[test]
    fn malformed_connection_address_is_an_error() {
        let body = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\nc=IN IP4 not-an-ip\r\nt=0 0\r\nm=audio 1000 RTP/AVP 0\r\n";
        assert!(matches!(parse(body), Err(Error::InvalidConnectionAddress(_))));
    }

    #[test]
    fn parses_sdes_crypto_line() {
        let body = format!(
            "{}a=crypto:1 AES_CM_128_HMAC_SHA1_80 inline:{}\r\n",
            SAMPLE,
            "A".repeat(40)
        );
        let sdp = parse(&body).unwrap();
        assert_eq!(sdp.crypto.len(), 1);
        assert_eq!(sdp.crypto[0].profile, "AES_CM_128_HMAC_SHA1_80");
    }
}
