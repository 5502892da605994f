//! AddressCodec (C8): parses/emits an (IP, port) pair from a structured
//! attribute carrier. No stable wire format is defined at this layer beyond
//! attribute presence (spec.md §6) — callers choose the attribute names.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use crate::error::ParseError;

/// A structured attribute carrier, generalized over whatever the caller's
/// signaling element type looks like (an XML element, a SDP attribute map,
/// ...). Only attribute lookup by name is required by this layer.
pub trait ElementAttributes {
    fn attr(&self, name: &str) -> Option<&str>;
}

/// An in-memory attribute carrier, mostly useful for tests and for
/// `emit_address`'s round-trip counterpart.
#[derive(Debug, Default, Clone)]
pub struct AttributeMap(HashMap<String, String>);

impl AttributeMap {
    pub fn new() -> Self {
        AttributeMap(HashMap::new())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl ElementAttributes for AttributeMap {
    fn attr(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Requires both attributes present; sets the IP from the address attribute
/// verbatim (IP-format validation deferred to `IpAddr::parse`), parses the
/// port as a decimal integer with no further range check beyond what the
/// integer parser enforces.
pub fn parse_address<E: ElementAttributes>(
    elem: &E,
    address_attr: &str,
    port_attr: &str,
) -> Result<SocketAddr, ParseError> {
    let address = elem
        .attr(address_attr)
        .ok_or_else(|| ParseError::new(format!("address does not have {address_attr}")))?;
    let port = elem
        .attr(port_attr)
        .ok_or_else(|| ParseError::new(format!("address does not have {port_attr}")))?;

    let ip: IpAddr = address
        .parse()
        .map_err(|_| ParseError::new(format!("{address_attr} '{address}' is not a valid address")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| ParseError::new(format!("{port_attr} '{port}' is not a valid port")))?;

    Ok(SocketAddr::new(ip, port))
}

/// Supplements spec.md §8's round-trip testable property: emits an
/// `AttributeMap` an application would hand to `parse_address` to recover
/// `addr`.
pub fn emit_address(addr: &SocketAddr, address_attr: &str, port_attr: &str) -> AttributeMap {
    let mut map = AttributeMap::new();
    map.set(address_attr, addr.ip().to_string());
    map.set(port_attr, addr.port().to_string());
    map
}

#[cfg(test)]
mod address_test {
    use super::*;

    #[test]
    fn parse_address_requires_both_attributes() {
        let mut elem = AttributeMap::new();
        elem.set("ip", "203.0.113.5");
        let err = parse_address(&elem, "ip", "port").unwrap_err();
        assert!(err.message.contains("port"));

        let mut elem = AttributeMap::new();
        elem.set("port", "5000");
        let err = parse_address(&elem, "ip", "port").unwrap_err();
        assert!(err.message.contains("ip"));
    }

    #[test]
    fn round_trip() {
        let addr: SocketAddr = "203.0.113.5:5000".parse().unwrap();
        let elem = emit_address(&addr, "ip", "port");
        let parsed = parse_address(&elem, "ip", "port").unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn malformed_address_is_reported_distinctly_from_missing() {
        let mut elem = AttributeMap::new();
        elem.set("ip", "not-an-ip");
        elem.set("port", "5000");
        let err = parse_address(&elem, "ip", "port").unwrap_err();
        assert!(!err.message.contains("does not have"));
        assert!(err.message.contains("not-an-ip"));
    }

    #[test]
    fn malformed_port_is_reported_distinctly_from_missing() {
        let mut elem = AttributeMap::new();
        elem.set("ip", "203.0.113.5");
        elem.set("port", "not-a-port");
        let err = parse_address(&elem, "ip", "port").unwrap_err();
        assert!(!err.message.contains("does not have"));
        assert!(err.message.contains("not-a-port"));
    }
}
