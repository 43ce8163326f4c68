//! DTLS-SRTP role negotiation (RFC 5763 §5): deciding which side drives the
//! handshake as the DTLS client from the offered/answered `a=setup:` values.

use crate::error::{Error, Result};
use crate::sdp::Setup;

/// Which side initiates the DTLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Resolve the local role given what we offered and what the remote answered.
///
/// The offerer SHOULD send `actpass` and let the answerer pick a concrete role;
/// the answerer then sets up as the opposite of whatever the offerer ends up being.
/// `holdconn` is never produced by [`Setup::parse`], so it never reaches here.
pub fn resolve(local_offered: Setup, remote_answered: Setup) -> Result<Role> {
    match (local_offered, remote_answered) {
        (Setup::ActPass, Setup::Active) => Ok(Role::Server),
        (Setup::ActPass, Setup::Passive) => Ok(Role::Client),
        (Setup::ActPass, Setup::ActPass) => {
            Err(Error::DtlsHandshake("both sides offered actpass with no resolution".into()))
        }
        (Setup::Active, Setup::Passive) => Ok(Role::Client),
        (Setup::Passive, Setup::Active) => Ok(Role::Server),
        (local, remote) => Err(Error::DtlsHandshake(format!(
            "incompatible dtls setup negotiation: local={local:?} remote={remote:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actpass_offer_with_active_answer_makes_us_the_server() {
        assert_eq!(resolve(Setup::ActPass, Setup::Active).unwrap(), Role::Server);
    }

    #[test]
    fn actpass_offer_with_passive_answer_makes_us_the_client() {
        assert_eq!(resolve(Setup::ActPass, Setup::Passive).unwrap(), Role::Client);
    }

    #[test]
    fn double_actpass_is_unresolved() {
        assert!(resolve(Setup::ActPass, Setup::ActPass).is_err());
    }

    #[test]
    fn both_sides_active_is_a_conflict() {
        assert!(resolve(Setup::Active, Setup::Active).is_err());
    }
}
