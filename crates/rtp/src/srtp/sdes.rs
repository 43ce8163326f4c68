//! SDES key exchange: generating and parsing the base64 key+salt blob carried in
//! SDP `a=crypto:` lines (RFC 4568).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::sdp::Crypto;

use super::profile::SrtpProfile;

/// A freshly generated master key + salt for one `a=crypto:` line.
pub struct SdesKey {
    pub profile: SrtpProfile,
    pub key: Vec<u8>,
    pub salt: Vec<u8>,
}

impl SdesKey {
    /// Generate random key material sized for `profile` using the OS RNG.
    pub fn generate(profile: SrtpProfile) -> Result<Self> {
        if !profile.is_implemented() {
            return Err(Error::UnsupportedProfile(profile.sdes_name().to_string()));
        }
        let mut key = vec![0u8; profile.key_len()];
        let mut salt = vec![0u8; profile.salt_len()];
        rand::thread_rng().fill_bytes(&mut key);
        rand::thread_rng().fill_bytes(&mut salt);
        Ok(Self { profile, key, salt })
    }

    /// Render as the `inline:<base64>` value of an `a=crypto:` line.
    pub fn to_crypto_line(&self, tag: u32) -> Crypto {
        let mut material = Vec::with_capacity(self.key.len() + self.salt.len());
        material.extend_from_slice(&self.key);
        material.extend_from_slice(&self.salt);
        Crypto {
            tag,
            profile: self.profile.sdes_name().to_string(),
            inline_base64: BASE64.encode(material),
        }
    }

    /// Decode an offered/answered `a=crypto:` line into key material, validating
    /// length against the named profile.
    pub fn from_crypto_line(crypto: &Crypto) -> Result<Self> {
        let profile = SrtpProfile::from_sdes_name(&crypto.profile)
            .ok_or_else(|| Error::UnsupportedProfile(crypto.profile.clone()))?;
        if !profile.is_implemented() {
            return Err(Error::UnsupportedProfile(crypto.profile.clone()));
        }
        let material = BASE64.decode(&crypto.inline_base64).map_err(|_| Error::InvalidKeyMaterial {
            profile: crypto.profile.clone(),
            expected: profile.key_material_len(),
            actual: 0,
        })?;
        if material.len() != profile.key_material_len() {
            return Err(Error::InvalidKeyMaterial {
                profile: crypto.profile.clone(),
                expected: profile.key_material_len(),
                actual: material.len(),
            });
        }
        let (key, salt) = material.split_at(profile.key_len());
        Ok(Self { profile, key: key.to_vec(), salt: salt.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_round_trips_through_crypto_line() {
        let generated = SdesKey::generate(SrtpProfile::AesCm128HmacSha1_80).unwrap();
        let line = generated.to_crypto_line(1);
        let parsed = SdesKey::from_crypto_line(&line).unwrap();
        assert_eq!(parsed.key, generated.key);
        assert_eq!(parsed.salt, generated.salt);
        assert_eq!(parsed.profile, SrtpProfile::AesCm128HmacSha1_80);
    }

    #[test]
    fn wrong_length_material_is_rejected() {
        let line = Crypto {
            tag: 1,
            profile: "AES_CM_128_HMAC_SHA1_80".into(),
            inline_base64: BASE64.encode([0u8; 10]),
        };
        assert!(SdesKey::from_crypto_line(&line).is_err());
    }
}
