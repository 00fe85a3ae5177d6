use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use shared::types::{SrvRecord, TxtRecord};
use super::message::ResourceRecord;
use super::name::read_name_within;
use super::{DnsError, TYPE_A, TYPE_AAAA};

const SRV_FIXED_LEN: usize = 6;

/// Name carried in a PTR record
pub fn parse_ptr(record: &ResourceRecord<'_>) -> Result<String, DnsError> {
    read_name_within(record.packet, record.rdata_offset, rdata_end(record)).map(|(name, _)| name)
}

fn rdata_end(record: &ResourceRecord<'_>) -> usize {
    record.rdata_offset + record.rdata.len()
}

/// Priority, weight and port, then the target name at offset 6 of the rdata
pub fn parse_srv(record: &ResourceRecord<'_>) -> Result<SrvRecord, DnsError> {
    let rdata = record.rdata;
    if rdata.len() < SRV_FIXED_LEN {
        return Err(DnsError::Truncated(record.rdata_offset + rdata.len()));
    }
    let field = |at: usize| u16::from_be_bytes([rdata[at], rdata[at + 1]]);
    let (target, _) = read_name_within(
        record.packet,
        record.rdata_offset + SRV_FIXED_LEN,
        rdata_end(record),
    )?;

    Ok(SrvRecord {
        priority: field(0),
        weight: field(2),
        port: field(4),
        target,
    })
}

/// Length-prefixed `key=value` strings.
///
/// A length byte that runs past the end of the rdata stops parsing and keeps the
/// pairs read so far. Entries without `=` become keys with an empty value, empty
/// strings are skipped, and a repeated key keeps its last value.
pub fn parse_txt(rdata: &[u8]) -> TxtRecord {
    let mut txt = TxtRecord::new();
    let mut pos = 0;

    while pos < rdata.len() {
        let len = usize::from(rdata[pos]);
        let start = pos + 1;
        let Some(entry) = rdata.get(start..start + len) else {
            break;
        };
        pos = start + len;
        if entry.is_empty() {
            continue;
        }

        let entry = String::from_utf8_lossy(entry);
        let (key, value) = entry.split_once('=').unwrap_or((&*entry, ""));
        txt.insert(key.to_string(), value.to_string());
    }

    txt
}

/// Four bytes for A, sixteen for AAAA; anything else is malformed
pub fn parse_address(rtype: u16, rdata: &[u8]) -> Result<IpAddr, DnsError> {
    let bad_length = |expected| DnsError::BadRdataLength {
        rtype,
        expected,
        actual: rdata.len(),
    };
    match rtype {
        TYPE_A => {
            let octets: [u8; 4] = rdata.try_into().map_err(|_| bad_length(4))?;
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        TYPE_AAAA => {
            let octets: [u8; 16] = rdata.try_into().map_err(|_| bad_length(16))?;
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => Err(bad_length(0)),
    }
}
