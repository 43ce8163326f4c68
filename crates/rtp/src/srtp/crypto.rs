//! AES_CM_128_HMAC_SHA1_80 packet protection (RFC 3711 §4.1-4.3).
//!
//! This is the only SRTP profile with a working cipher implementation; the others are
//! recognized on the wire (see [`super::profile::SrtpProfile`]) but rejected at context
//! construction.

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};

use super::profile::SrtpProfile;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha1 = Hmac<Sha1>;

/// Truncated HMAC-SHA1 authentication tag length for this suite, in bytes.
pub const AUTH_TAG_LEN: usize = 10;

const LABEL_RTP_ENCRYPTION: u8 = 0x00;
const LABEL_RTP_AUTH: u8 = 0x01;
const LABEL_RTP_SALT: u8 = 0x02;
const LABEL_RTCP_ENCRYPTION: u8 = 0x03;
const LABEL_RTCP_AUTH: u8 = 0x04;
const LABEL_RTCP_SALT: u8 = 0x05;

/// One direction's worth of derived SRTP session keys (covers both RTP and RTCP,
/// which in this engine always share a master key/salt).
#[derive(Clone)]
pub struct SrtpContext {
    rtp_key: Vec<u8>,
    rtp_salt: Vec<u8>,
    rtp_auth_key: Vec<u8>,
    rtcp_key: Vec<u8>,
    rtcp_salt: Vec<u8>,
    rtcp_auth_key: Vec<u8>,
    rtcp_index: u32,
}

impl SrtpContext {
    /// Derive an encrypt/decrypt context from a master key and salt for the given
    /// profile. Only [`SrtpProfile::AesCm128HmacSha1_80`] is implemented.
    pub fn new(profile: SrtpProfile, master_key: &[u8], master_salt: &[u8]) -> Result<Self> {
        if !profile.is_implemented() {
            return Err(Error::Config(format!("srtp profile {:?} has no cipher implementation", profile)));
        }
        if master_key.len() != profile.key_len() || master_salt.len() != profile.salt_len() {
            return Err(Error::InvalidKeyMaterial {
                profile: profile.sdes_name().to_string(),
                expected: profile.key_material_len(),
                actual: master_key.len() + master_salt.len(),
            });
        }

        let auth_key_len = 20; // HMAC-SHA1 key size per RFC 3711 §4.2.1.

        Ok(Self {
            rtp_key: derive(master_key, master_salt, LABEL_RTP_ENCRYPTION, master_key.len()),
            rtp_salt: derive(master_key, master_salt, LABEL_RTP_SALT, master_salt.len()),
            rtp_auth_key: derive(master_key, master_salt, LABEL_RTP_AUTH, auth_key_len),
            rtcp_key: derive(master_key, master_salt, LABEL_RTCP_ENCRYPTION, master_key.len()),
            rtcp_salt: derive(master_key, master_salt, LABEL_RTCP_SALT, master_salt.len()),
            rtcp_auth_key: derive(master_key, master_salt, LABEL_RTCP_AUTH, auth_key_len),
            rtcp_index: 0,
        })
    }

    /// Encrypt an RTP payload in place and append the 10-byte auth tag. `roc` is the
    /// caller-tracked rollover counter (high 32 bits of the extended sequence number).
    pub fn encrypt_rtp(&self, ssrc: u32, seq: u16, roc: u32, header_and_payload: &mut Vec<u8>) -> Result<()> {
        let counter = rtp_counter(seq, roc, ssrc, &self.rtp_salt);
        let header_len = crate::rtp::header::FIXED_HEADER_SIZE.min(header_and_payload.len());
        let mut cipher = Aes128Ctr::new_from_slices(&self.rtp_key, &counter)
            .map_err(|e| Error::SrtpDecrypt(e.to_string()))?;
        cipher.apply_keystream(&mut header_and_payload[header_len..]);

        let tag = auth_tag(&self.rtp_auth_key, header_and_payload, roc);
        header_and_payload.extend_from_slice(&tag);
        Ok(())
    }

    /// Verify the trailing auth tag and decrypt the payload in place, returning the
    /// packet with the tag stripped.
    pub fn decrypt_rtp(&self, ssrc: u32, seq: u16, roc: u32, packet: &mut Vec<u8>) -> Result<()> {
        if packet.len() < AUTH_TAG_LEN {
            return Err(Error::ShortBuffer { required: AUTH_TAG_LEN, available: packet.len() });
        }
        let body_len = packet.len() - AUTH_TAG_LEN;
        let expected = auth_tag(&self.rtp_auth_key, &packet[..body_len], roc);
        if !constant_time_eq(&expected, &packet[body_len..]) {
            return Err(Error::SrtpDecrypt("authentication failed".into()));
        }
        packet.truncate(body_len);

        let header_len = crate::rtp::header::FIXED_HEADER_SIZE.min(packet.len());
        let counter = rtp_counter(seq, roc, ssrc, &self.rtp_salt);
        let mut cipher = Aes128Ctr::new_from_slices(&self.rtp_key, &counter)
            .map_err(|e| Error::SrtpDecrypt(e.to_string()))?;
        cipher.apply_keystream(&mut packet[header_len..]);
        Ok(())
    }

    /// Encrypt a compound RTCP packet (header + body), appending the SRTCP index
    /// word and the auth tag.
    pub fn encrypt_rtcp(&mut self, ssrc: u32, packet: &mut Vec<u8>) -> Result<()> {
        let index = self.rtcp_index;
        self.rtcp_index = self.rtcp_index.wrapping_add(1);

        let counter = rtcp_counter(index, ssrc, &self.rtcp_salt);
        let mut cipher = Aes128Ctr::new_from_slices(&self.rtcp_key, &counter)
            .map_err(|e| Error::SrtpDecrypt(e.to_string()))?;
        cipher.apply_keystream(&mut packet[8..]);

        // E-bit set (encrypted) plus the 31-bit index.
        packet.extend_from_slice(&(index | 0x8000_0000).to_be_bytes());
        let tag = auth_tag(&self.rtcp_auth_key, packet, 0);
        packet.extend_from_slice(&tag);
        Ok(())
    }

    /// Verify and decrypt a compound SRTCP packet, returning the plaintext RTCP bytes.
    pub fn decrypt_rtcp(&self, ssrc: u32, packet: &mut Vec<u8>) -> Result<()> {
        if packet.len() < AUTH_TAG_LEN + 4 {
            return Err(Error::ShortBuffer { required: AUTH_TAG_LEN + 4, available: packet.len() });
        }
        let body_len = packet.len() - AUTH_TAG_LEN;
        let expected = auth_tag(&self.rtcp_auth_key, &packet[..body_len], 0);
        if !constant_time_eq(&expected, &packet[body_len..]) {
            return Err(Error::SrtpDecrypt("srtcp authentication failed".into()));
        }
        let index_word = u32::from_be_bytes(packet[body_len - 4..body_len].try_into().unwrap());
        let index = index_word & 0x7fff_ffff;
        packet.truncate(body_len - 4);

        let counter = rtcp_counter(index, ssrc, &self.rtcp_salt);
        let mut cipher = Aes128Ctr::new_from_slices(&self.rtcp_key, &counter)
            .map_err(|e| Error::SrtpDecrypt(e.to_string()))?;
        cipher.apply_keystream(&mut packet[8..]);
        Ok(())
    }
}

/// AES-CM based key derivation function (RFC 3711 §4.3.1, `kdr = 0`): XOR the label
/// into byte 7 of the master salt, pad to a 16-byte IV, and take the AES-CTR
/// keystream of that many zero bytes as the derived key material.
fn derive(master_key: &[u8], master_salt: &[u8], label: u8, out_len: usize) -> Vec<u8> {
    let mut iv = [0u8; 16];
    iv[..master_salt.len()].copy_from_slice(master_salt);
    iv[7] ^= label;

    let key = pad_key(master_key);
    let mut cipher = Aes128Ctr::new_from_slices(&key, &iv).expect("16-byte key and iv");
    let mut out = vec![0u8; out_len];
    cipher.apply_keystream(&mut out);
    out
}

/// AES-128-CTR is the only cipher wired up; longer master keys (AES-256 profiles)
/// are rejected at `SrtpContext::new` before this is reached, but we still guard here.
fn pad_key(key: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let n = key.len().min(16);
    out[..n].copy_from_slice(&key[..n]);
    out
}

fn rtp_counter(seq: u16, roc: u32, ssrc: u32, salt: &[u8]) -> [u8; 16] {
    let mut counter = [0u8; 16];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..12].copy_from_slice(&roc.to_be_bytes());
    counter[12..14].copy_from_slice(&seq.to_be_bytes());
    for (c, s) in counter.iter_mut().zip(salt.iter()) {
        *c ^= s;
    }
    counter
}

fn rtcp_counter(index: u32, ssrc: u32, salt: &[u8]) -> [u8; 16] {
    let mut counter = [0u8; 16];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..12].copy_from_slice(&index.to_be_bytes());
    for (c, s) in counter.iter_mut().zip(salt.iter()) {
        *c ^= s;
    }
    counter
}

fn auth_tag(auth_key: &[u8], authenticated_portion: &[u8], roc: u32) -> [u8; AUTH_TAG_LEN] {
    let mut mac = HmacSha1::new_from_slice(auth_key).expect("hmac accepts any key length");
    mac.update(authenticated_portion);
    mac.update(&roc.to_be_bytes());
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; AUTH_TAG_LEN];
    tag.copy_from_slice(&full[..AUTH_TAG_LEN]);
    tag
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_pair() -> (SrtpContext, SrtpContext) {
        let key = [0x11u8; 16];
        let salt = [0x22u8; 14];
        (
            SrtpContext::new(SrtpProfile::AesCm128HmacSha1_80, &key, &salt).unwrap(),
            SrtpContext::new(SrtpProfile::AesCm128HmacSha1_80, &key, &salt).unwrap(),
        )
    }

    #[test]
    fn rtp_round_trip_recovers_plaintext() {
        let (enc, dec) = ctx_pair();
        let header = crate::rtp::header::PacketHeader::new(96, 1234, 56789, 0xDEAD_BEEF);
        let mut wire = {
            let mut buf = bytes::BytesMut::new();
            header.marshal(&mut buf);
            buf.extend_from_slice(b"Hello SRTP!");
            buf.to_vec()
        };
        enc.encrypt_rtp(header.ssrc, header.sequence_number, 0, &mut wire).unwrap();
        assert_ne!(&wire[12..23], b"Hello SRTP!");
        dec.decrypt_rtp(header.ssrc, header.sequence_number, 0, &mut wire).unwrap();
        assert_eq!(&wire[12..], b"Hello SRTP!");
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let (enc, dec) = ctx_pair();
        let header = crate::rtp::header::PacketHeader::new(0, 1, 160, 1);
        let mut wire = {
            let mut buf = bytes::BytesMut::new();
            header.marshal(&mut buf);
            buf.extend_from_slice(b"payload");
            buf.to_vec()
        };
        enc.encrypt_rtp(header.ssrc, header.sequence_number, 0, &mut wire).unwrap();
        *wire.last_mut().unwrap() ^= 0xff;
        assert!(dec.decrypt_rtp(header.ssrc, header.sequence_number, 0, &mut wire).is_err());
    }
}
