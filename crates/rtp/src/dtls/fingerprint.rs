//! Certificate fingerprints carried in SDP `a=fingerprint:` lines (RFC 8122).

use sha2::{Digest, Sha256};

use crate::sdp::Fingerprint;

/// Hash a DER-encoded certificate with SHA-256 and format it the way SDP expects:
/// uppercase hex octets separated by colons.
pub fn sha256(der: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(der);
    let hex = digest.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":");
    Fingerprint { algorithm: "sha-256".to_string(), hex }
}

/// Check a peer's certificate against the fingerprint it advertised in SDP.
pub fn verify(der: &[u8], expected: &Fingerprint) -> bool {
    if expected.algorithm != "sha-256" {
        return false;
    }
    sha256(der).hex.eq_ignore_ascii_case(&expected.hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_recomputed_fingerprint() {
        let der = b"not a real certificate, just bytes to hash";
        let fp = sha256(der);
        assert!(verify(der, &fp));
    }

    #[test]
    fn detects_mismatch() {
        let fp = sha256(b"cert a");
        assert!(!verify(b"cert b", &fp));
    }
}
