use super::DnsError;

/// Maximum number of compression pointers followed while reading one name
pub const MAX_POINTER_HOPS: usize = 10;

/// Largest label a length byte can express without colliding with the pointer bits
pub const MAX_LABEL_LEN: usize = 63;

/// Read a possibly-compressed name starting at `offset` within `packet`.
///
/// Returns the dotted name and the offset just past the name as it appears at
/// `offset` (i.e. past the first pointer, if one was followed). Each pointer
/// must target an offset strictly before both itself and the previous pointer
/// target, and at most [`MAX_POINTER_HOPS`] are followed.
pub fn read_name(packet: &[u8], offset: usize) -> Result<(String, usize), DnsError> {
    read_name_within(packet, offset, packet.len())
}

/// Like [`read_name`], but the name as written at `offset` must end by `end`.
///
/// Labels and the first pointer are bounded by `end`; once a pointer has been
/// followed the rest of the name may lie anywhere earlier in the packet.
pub fn read_name_within(
    packet: &[u8],
    offset: usize,
    end: usize,
) -> Result<(String, usize), DnsError> {
    let mut labels: Vec<&str> = Vec::new();
    let mut pos = offset;
    let mut bound = end.min(packet.len());
    let mut ceiling = pos;
    let mut resume: Option<usize> = None;
    let mut hops = 0;

    loop {
        if pos >= bound {
            return Err(DnsError::Truncated(pos));
        }
        let len = packet[pos];

        if len == 0 {
            pos += 1;
            break;
        }

        match len & 0xC0 {
            0xC0 => {
                if pos + 1 >= bound {
                    return Err(DnsError::Truncated(pos + 1));
                }
                let target = (usize::from(len & 0x3F) << 8) | usize::from(packet[pos + 1]);
                if target >= pos || (hops > 0 && target >= ceiling) {
                    return Err(DnsError::PointerNotBackward { at: pos, target });
                }
                if hops == MAX_POINTER_HOPS {
                    return Err(DnsError::TooManyPointers(offset));
                }
                hops += 1;
                resume.get_or_insert(pos + 2);
                bound = packet.len();
                ceiling = target;
                pos = target;
            }
            0x00 => {
                let start = pos + 1;
                let label_end = start + usize::from(len);
                if label_end > bound {
                    return Err(DnsError::Truncated(bound));
                }
                let raw = &packet[start..label_end];
                let label = std::str::from_utf8(raw).map_err(|_| DnsError::InvalidUtf8(start))?;
                labels.push(label);
                pos = label_end;
            }
            _ => return Err(DnsError::ReservedLabelType(len)),
        }
    }

    Ok((labels.join("."), resume.unwrap_or(pos)))
}

/// Append `name` as uncompressed labels followed by the root label.
pub fn write_name(out: &mut Vec<u8>, name: &str) -> Result<(), DnsError> {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::LabelTooLong(label.to_string()));
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        write_name(&mut out, name).unwrap();
        out
    }

    #[test]
    fn test_plain_name() {
        let buf = encoded("_http._tcp.local");
        let (name, end) = read_name(&buf, 0).unwrap();
        assert_eq!(name, "_http._tcp.local");
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_trailing_dot_is_ignored_on_write() {
        assert_eq!(encoded("host.local."), encoded("host.local"));
    }

    #[test]
    fn test_pointer_to_earlier_name() {
        let mut buf = encoded("A.local");
        let pointer_at = buf.len();
        buf.extend_from_slice(&[0xC0, 0x00]);

        let (name, end) = read_name(&buf, pointer_at).unwrap();
        assert_eq!(name, "A.local");
        assert_eq!(end, pointer_at + 2, "offset should resume after the pointer");
    }

    #[test]
    fn test_labels_then_pointer() {
        let mut buf = encoded("local");
        let at = buf.len();
        buf.extend_from_slice(&[4, b'h', b'o', b's', b't', 0xC0, 0x00]);

        let (name, end) = read_name(&buf, at).unwrap();
        assert_eq!(name, "host.local");
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_self_pointer_is_rejected() {
        let buf = [0xC0, 0x00];
        assert_eq!(
            read_name(&buf, 0),
            Err(DnsError::PointerNotBackward { at: 0, target: 0 })
        );
    }

    #[test]
    fn test_forward_pointer_is_rejected() {
        let mut buf = vec![0xC0, 0x02];
        buf.extend(encoded("x"));
        assert!(matches!(
            read_name(&buf, 0),
            Err(DnsError::PointerNotBackward { .. })
        ));
    }

    /// Label "a" at offset 0, then a chain of pointers each pointing at the previous one.
    fn pointer_chain(len: usize) -> (Vec<u8>, usize) {
        let mut buf = encoded("a");
        let mut previous = 0usize;
        let mut last = 0usize;
        for _ in 0..len {
            last = buf.len();
            buf.push(0xC0 | (previous >> 8) as u8);
            buf.push(previous as u8);
            previous = last;
        }
        (buf, last)
    }

    #[test]
    fn test_pointer_chain_within_limit() {
        let (buf, start) = pointer_chain(MAX_POINTER_HOPS);
        let (name, _) = read_name(&buf, start).unwrap();
        assert_eq!(name, "a");
    }

    #[test]
    fn test_pointer_chain_over_limit_fails() {
        let (buf, start) = pointer_chain(MAX_POINTER_HOPS + 1);
        assert_eq!(read_name(&buf, start), Err(DnsError::TooManyPointers(start)));
    }

    #[test]
    fn test_pointer_back_into_followed_name_is_rejected() {
        // "x" "y" then a pointer at 4 back to "y" at 2, entered through a pointer to 0
        let mut buf = vec![1, b'x', 1, b'y', 0xC0, 0x02];
        let start = buf.len();
        buf.extend_from_slice(&[0xC0, 0x00]);
        assert_eq!(
            read_name(&buf, start),
            Err(DnsError::PointerNotBackward { at: 4, target: 2 })
        );
    }

    #[test]
    fn test_bounded_name_must_end_in_bounds() {
        let buf = encoded("a.local");
        assert!(read_name_within(&buf, 0, buf.len()).is_ok());
        assert_eq!(
            read_name_within(&buf, 0, buf.len() - 1),
            Err(DnsError::Truncated(buf.len() - 1))
        );
        assert_eq!(read_name_within(&buf, 0, 0), Err(DnsError::Truncated(0)));
    }

    #[test]
    fn test_bounded_pointer_must_fit_but_target_may_not() {
        let mut buf = encoded("a");
        let at = buf.len();
        buf.extend_from_slice(&[0xC0, 0x00]);

        assert_eq!(read_name_within(&buf, at, at + 1), Err(DnsError::Truncated(at + 1)));
        let (name, end) = read_name_within(&buf, at, at + 2).unwrap();
        assert_eq!(name, "a");
        assert_eq!(end, at + 2);
    }

    #[test]
    fn test_truncated_label() {
        let buf = [5, b'a', b'b'];
        assert!(matches!(read_name(&buf, 0), Err(DnsError::Truncated(_))));
    }

    #[test]
    fn test_missing_terminator() {
        let buf = [1, b'a'];
        assert_eq!(read_name(&buf, 0), Err(DnsError::Truncated(2)));
    }

    #[test]
    fn test_invalid_utf8_label() {
        let buf = [2, 0xFF, 0xFE, 0];
        assert_eq!(read_name(&buf, 0), Err(DnsError::InvalidUtf8(1)));
    }

    #[test]
    fn test_reserved_label_type() {
        let buf = [0x40, 0];
        assert_eq!(read_name(&buf, 0), Err(DnsError::ReservedLabelType(0x40)));
    }

    #[test]
    fn test_label_too_long() {
        let long = "x".repeat(64);
        let mut out = Vec::new();
        assert!(matches!(
            write_name(&mut out, &format!("{}.local", long)),
            Err(DnsError::LabelTooLong(_))
        ));
    }
}
