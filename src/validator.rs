//! CandidateValidator (C6): pure-function policy check on remote candidates.
//! Ported rule-for-rule from `Transport::VerifyCandidate` in the original
//! `transport.cc` — the ordering below is normative; tie-breaks follow it.

use std::net::IpAddr;

use crate::candidate::Candidate;
use crate::error::ParseError;

trait IpAddrPolicy {
    fn is_local_ip(&self) -> bool;
    fn is_any(&self) -> bool;
    fn is_private_ip(&self) -> bool;
}

impl IpAddrPolicy for IpAddr {
    fn is_local_ip(&self) -> bool {
        match self {
            IpAddr::V4(v4) => v4.is_loopback() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback(),
        }
    }

    fn is_any(&self) -> bool {
        self.is_unspecified()
    }

    fn is_private_ip(&self) -> bool {
        match self {
            IpAddr::V4(v4) => v4.is_private(),
            IpAddr::V6(_) => false,
        }
    }
}

/// `validate(candidate) -> ok | parse_error(reason)`.
pub fn validate(candidate: &Candidate, allow_local_ips: bool) -> Result<(), ParseError> {
    let ip = candidate.address.ip();

    if ip.is_local_ip() && !allow_local_ips {
        return Err(ParseError::new("candidate has local IP address"));
    }

    if ip.is_any() {
        return Err(ParseError::new("candidate has address of zero"));
    }

    let port = candidate.address.port();
    if port < 1024 {
        if port != 80 && port != 443 {
            return Err(ParseError::new(
                "candidate has port below 1024, but not 80 or 443",
            ));
        }
        if ip.is_private_ip() {
            return Err(ParseError::new(
                "candidate has port of 80 or 443 with private IP address",
            ));
        }
    }

    Ok(())
}
