use tracing::debug;
use super::name::{read_name, write_name};
use super::{DnsError, CLASS_IN, TYPE_ANY};

pub const HEADER_LEN: usize = 12;

/// Flags for a standard query: QR=0, opcode=0, no other bits set
pub const FLAGS_STANDARD_QUERY: u16 = 0x0000;

const FLAG_RESPONSE: u16 = 0x8000;

/// The fixed 12-byte message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub questions: u16,
    pub answers: u16,
    pub authority: u16,
    pub additional: u16,
}

impl Header {
    pub fn parse(packet: &[u8]) -> Result<Self, DnsError> {
        Ok(Self {
            id: read_u16(packet, 0)?,
            flags: read_u16(packet, 2)?,
            questions: read_u16(packet, 4)?,
            answers: read_u16(packet, 6)?,
            authority: read_u16(packet, 8)?,
            additional: read_u16(packet, 10)?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        for field in [
            self.id,
            self.flags,
            self.questions,
            self.answers,
            self.authority,
            self.additional,
        ] {
            out.extend_from_slice(&field.to_be_bytes());
        }
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_RESPONSE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// One answer, authority or additional entry.
///
/// The rdata is borrowed from the packet it was parsed from, together with its
/// offset, so that compressed names inside rdata can be resolved against the
/// whole packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord<'a> {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: &'a [u8],
    pub rdata_offset: usize,
    pub packet: &'a [u8],
}

fn read_u16(packet: &[u8], at: usize) -> Result<u16, DnsError> {
    packet
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(DnsError::Truncated(at))
}

fn read_u32(packet: &[u8], at: usize) -> Result<u32, DnsError> {
    packet
        .get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DnsError::Truncated(at))
}

/// Build one query packet asking for `ANY` records of every service name.
pub fn encode_query<S: AsRef<str>>(service_names: &[S]) -> Result<Vec<u8>, DnsError> {
    let questions = u16::try_from(service_names.len())
        .map_err(|_| DnsError::TooManyQuestions(service_names.len()))?;
    let header = Header {
        id: rand::random(),
        flags: FLAGS_STANDARD_QUERY,
        questions,
        ..Default::default()
    };

    let mut out = Vec::with_capacity(HEADER_LEN + service_names.len() * 32);
    header.write(&mut out);
    for name in service_names {
        write_name(&mut out, name.as_ref())?;
        out.extend_from_slice(&TYPE_ANY.to_be_bytes());
        out.extend_from_slice(&CLASS_IN.to_be_bytes());
    }
    Ok(out)
}

fn read_question(packet: &[u8], offset: usize) -> Result<(Question, usize), DnsError> {
    let (name, pos) = read_name(packet, offset)?;
    let qtype = read_u16(packet, pos)?;
    let qclass = read_u16(packet, pos + 2)?;
    Ok((Question { name, qtype, qclass }, pos + 4))
}

fn read_record(packet: &[u8], offset: usize) -> Result<(ResourceRecord<'_>, usize), DnsError> {
    let (name, pos) = read_name(packet, offset)?;
    let rtype = read_u16(packet, pos)?;
    let class = read_u16(packet, pos + 2)?;
    let ttl = read_u32(packet, pos + 4)?;
    let rdlength = usize::from(read_u16(packet, pos + 8)?);
    let rdata_offset = pos + 10;
    let rdata = packet
        .get(rdata_offset..rdata_offset + rdlength)
        .ok_or(DnsError::Truncated(rdata_offset))?;

    let record = ResourceRecord {
        name,
        rtype,
        class,
        ttl,
        rdata,
        rdata_offset,
        packet,
    };
    Ok((record, rdata_offset + rdlength))
}

/// Decode the question section of a packet.
pub fn decode_questions(packet: &[u8]) -> Result<Vec<Question>, DnsError> {
    let header = Header::parse(packet)?;
    let mut pos = HEADER_LEN;
    let mut questions = Vec::with_capacity(usize::from(header.questions));
    for _ in 0..header.questions {
        let (question, next) = read_question(packet, pos)?;
        questions.push(question);
        pos = next;
    }
    Ok(questions)
}

/// Decode every answer, authority and additional record of a packet.
///
/// Only a truncated header fails the whole message. The question section is
/// skipped; a record that fails to parse ends decoding, and every record parsed
/// before it is still returned. Later sections cannot be located once a record
/// has failed, so they are dropped along with the rest of the failing section.
pub fn decode_message(packet: &[u8]) -> Result<Vec<ResourceRecord<'_>>, DnsError> {
    let header = Header::parse(packet)?;
    let mut pos = HEADER_LEN;

    for _ in 0..header.questions {
        match read_question(packet, pos) {
            Ok((_, next)) => pos = next,
            Err(e) => {
                debug!("Skipping malformed question section: {}", e);
                return Ok(Vec::new());
            }
        }
    }

    let sections = [
        ("answer", header.answers),
        ("authority", header.authority),
        ("additional", header.additional),
    ];
    let total: usize = sections.iter().map(|(_, n)| usize::from(*n)).sum();
    let mut records = Vec::with_capacity(total.min(64));

    for (section, count) in sections {
        for index in 0..count {
            match read_record(packet, pos) {
                Ok((record, next)) => {
                    records.push(record);
                    pos = next;
                }
                Err(e) => {
                    debug!("Stopped at {} record {}/{}: {}", section, index + 1, count, e);
                    return Ok(records);
                }
            }
        }
    }

    Ok(records)
}
