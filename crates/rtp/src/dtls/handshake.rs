//! DTLS-SRTP handshake orchestration (RFC 5764), multiplexed on the RTP socket.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use webrtc_dtls::conn::DTLSConn;
use webrtc_dtls::config::{ClientAuthType, Config as DtlsConfig, ExtendedMasterSecretType};
use webrtc_dtls::crypto::Certificate;
use webrtc_dtls::extension::extension_use_srtp::SrtpProtectionProfile;
use webrtc_util::KeyingMaterialExporter;

use crate::error::{Error, Result};
use crate::sdp::Fingerprint;
use crate::srtp::SrtpProfile;

use super::fingerprint;
use super::mux::DemuxedConn;
use super::role::Role;

/// A self-signed identity presented during the handshake and advertised via
/// `a=fingerprint:` in SDP. Regenerated per [`crate::session::MediaSession`]; this
/// engine never reuses a long-lived certificate across sessions.
#[derive(Clone)]
pub struct DtlsIdentity {
    certificate: Certificate,
}

impl DtlsIdentity {
    pub fn generate() -> Result<Self> {
        let certificate = Certificate::generate_self_signed(vec!["sipmedia".to_string()])
            .map_err(|e| Error::DtlsHandshake(e.to_string()))?;
        Ok(Self { certificate })
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let der = self
            .certificate
            .certificate
            .first()
            .ok_or_else(|| Error::DtlsHandshake("generated certificate chain is empty".into()))?;
        Ok(fingerprint::sha256(der.as_ref()))
    }
}

/// Master key/salt pairs for both directions, split out of the DTLS-SRTP exported
/// keying material per RFC 5764 §4.2.
pub struct DtlsSrtpKeys {
    pub local_key: Vec<u8>,
    pub local_salt: Vec<u8>,
    pub remote_key: Vec<u8>,
    pub remote_salt: Vec<u8>,
}

const LABEL_EXTRACTOR_DTLS_SRTP: &str = "EXTRACTOR-dtls_srtp";

/// Run the handshake over `socket`, exchanging datagrams with `peer` and pulling
/// DTLS records handed in from the session's demultiplexing receive loop via `inbound`.
/// Returns the negotiated SRTP keys once the handshake completes.
pub async fn run(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    identity: &DtlsIdentity,
    role: Role,
    profile: SrtpProfile,
    inbound: mpsc::Receiver<Vec<u8>>,
) -> Result<DtlsSrtpKeys> {
    let is_client = matches!(role, Role::Client);

    let conn = DemuxedConn::new(socket, peer, inbound);

    let srtp_profile = match profile {
        SrtpProfile::AesCm128HmacSha1_80 => SrtpProtectionProfile::Srtp_Aes128_Cm_Hmac_Sha1_80,
        other => return Err(Error::UnsupportedProfile(other.sdes_name().to_string())),
    };

    let config = DtlsConfig {
        certificates: vec![identity.certificate.clone()],
        insecure_skip_verify: true,
        client_auth: ClientAuthType::RequireAnyClientCert,
        srtp_protection_profiles: vec![srtp_profile],
        extended_master_secret: ExtendedMasterSecretType::Require,
        ..Default::default()
    };

    let dtls_conn = DTLSConn::new(Arc::new(conn), config, is_client, None)
        .await
        .map_err(|e| Error::DtlsHandshake(e.to_string()))?;

    let key_len = profile.key_len();
    let salt_len = profile.salt_len();
    let export_len = 2 * key_len + 2 * salt_len;

    let state = dtls_conn.connection_state().await;
    let keying_material = state
        .export_keying_material(LABEL_EXTRACTOR_DTLS_SRTP, &[], export_len)
        .await
        .map_err(|e| Error::DtlsHandshake(e.to_string()))?;

    let mut offset = 0;
    let client_key = keying_material[offset..offset + key_len].to_vec();
    offset += key_len;
    let server_key = keying_material[offset..offset + key_len].to_vec();
    offset += key_len;
    let client_salt = keying_material[offset..offset + salt_len].to_vec();
    offset += salt_len;
    let server_salt = keying_material[offset..offset + salt_len].to_vec();

    Ok(if is_client {
        DtlsSrtpKeys { local_key: client_key, local_salt: client_salt, remote_key: server_key, remote_salt: server_salt }
    } else {
        DtlsSrtpKeys { local_key: server_key, local_salt: server_salt, remote_key: client_key, remote_salt: client_salt }
    })
}
