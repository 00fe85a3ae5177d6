//! Folds decoded resource records into per-host [`Device`] entries.

use std::net::IpAddr;
use tracing::debug;
use shared::types::{Device, SrvRecord, TxtRecord};
use crate::dns::{self, rdata, DnsError, ResourceRecord};

/// A typed fact derived from one record's rdata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Service(String),
    Locator(SrvRecord),
    Attributes(TxtRecord),
    Address(IpAddr),
}

/// Interpret a record. `Ok(None)` means the type is not one we collect.
pub fn interpret(record: &ResourceRecord<'_>) -> Result<Option<Fact>, DnsError> {
    let fact = match record.rtype {
        dns::TYPE_PTR => Fact::Service(rdata::parse_ptr(record)?),
        dns::TYPE_SRV => Fact::Locator(rdata::parse_srv(record)?),
        dns::TYPE_TXT => Fact::Attributes(rdata::parse_txt(record.rdata)),
        dns::TYPE_A | dns::TYPE_AAAA => {
            Fact::Address(rdata::parse_address(record.rtype, record.rdata)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(fact))
}

/// Fold `record` into `device`. Returns true if the device gained an entry.
///
/// Malformed rdata and unknown types are logged and leave the device untouched.
pub fn apply(device: &mut Device, record: &ResourceRecord<'_>) -> bool {
    match interpret(record) {
        Ok(Some(Fact::Service(name))) => device.add_service(name),
        Ok(Some(Fact::Locator(srv))) => device.add_srv(srv),
        Ok(Some(Fact::Attributes(txt))) if txt.is_empty() => false,
        Ok(Some(Fact::Attributes(txt))) => device.add_txt(txt),
        Ok(Some(Fact::Address(addr))) => device.add_address(addr),
        Ok(None) => {
            debug!(
                "Ignoring {} record for {}",
                dns::type_name(record.rtype),
                record.name
            );
            false
        }
        Err(e) => {
            debug!(
                "Malformed {} record for {}: {}",
                dns::type_name(record.rtype),
                record.name,
                e
            );
            false
        }
    }
}
