//! Wire format for mDNS discovery queries and responses.
//!
//! All multi-byte fields are big-endian. Names may use the standard
//! compression scheme, where a two-byte pointer refers back to an earlier
//! name in the same packet.

pub mod message;
pub mod name;
pub mod rdata;

use thiserror::Error;

pub use message::{decode_message, decode_questions, encode_query, Header, Question, ResourceRecord};

pub const TYPE_A: u16 = 1;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const TYPE_SRV: u16 = 33;
pub const TYPE_ANY: u16 = 255;

pub const CLASS_IN: u16 = 1;

/// Decode or encode failure. Each variant is scoped to the smallest unit that
/// failed (a name, a record, or a header) and never to the whole scan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("packet truncated at offset {0}")]
    Truncated(usize),

    #[error("name pointer at offset {at} does not point backwards (target {target})")]
    PointerNotBackward { at: usize, target: usize },

    #[error("name at offset {0} exceeds the pointer indirection limit")]
    TooManyPointers(usize),

    #[error("reserved label type 0x{0:02x}")]
    ReservedLabelType(u8),

    #[error("label at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("label '{0}' is longer than 63 bytes")]
    LabelTooLong(String),

    #[error("{0} questions do not fit in one message")]
    TooManyQuestions(usize),

    #[error("record type {rtype} expects {expected} bytes of rdata, got {actual}")]
    BadRdataLength { rtype: u16, expected: usize, actual: usize },
}

/// Human-readable record type for log lines
pub fn type_name(rtype: u16) -> String {
    match rtype {
        TYPE_A => "A".to_string(),
        TYPE_PTR => "PTR".to_string(),
        TYPE_TXT => "TXT".to_string(),
        TYPE_AAAA => "AAAA".to_string(),
        TYPE_SRV => "SRV".to_string(),
        TYPE_ANY => "ANY".to_string(),
        other => format!("TYPE{}", other),
    }
}
