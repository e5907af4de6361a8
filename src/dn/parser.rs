use thiserror::Error;

use super::{Ava, Rdn, Value};

/// Failure to parse a DN string, with the byte offset at which it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DnError {
    #[error("empty attribute type at offset {0}")]
    EmptyAttributeType(usize),
    #[error("unterminated escape sequence at offset {0}")]
    UnterminatedEscape(usize),
    #[error("invalid hex pair in escape at offset {0}")]
    InvalidHexPair(usize),
    #[error("unexpected character at offset {0}")]
    UnexpectedCharacter(usize),
    #[error("invalid hex string value at offset {0}")]
    InvalidHexString(usize),
}

const SPECIAL_CHARS: &[u8] = b",=+<>#;\\\"";

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!("caller must check is_hex first"),
    }
}

fn skip_spaces(bytes: &[u8], pos: usize) -> usize {
    let mut p = pos;
    while p < bytes.len() && bytes[p] == b' ' {
        p += 1;
    }
    p
}

pub(super) fn parse_dn(input: &str) -> Result<Vec<Rdn>, DnError> {
    let bytes = input.as_bytes();
    let mut pos = skip_spaces(bytes, 0);
    if pos >= bytes.len() {
        return Ok(Vec::new());
    }
    let mut rdns = Vec::new();
    loop {
        let (rdn, new_pos) = parse_rdn(bytes, pos)?;
        rdns.push(rdn);
        pos = skip_spaces(bytes, new_pos);
        match bytes.get(pos) {
            Some(b',') | Some(b';') => pos = skip_spaces(bytes, pos + 1),
            None => break,
            Some(_) => return Err(DnError::UnexpectedCharacter(pos)),
        }
    }
    Ok(rdns)
}

fn parse_rdn(bytes: &[u8], pos: usize) -> Result<(Rdn, usize), DnError> {
    let (first, mut pos) = parse_ava(bytes, pos)?;
    let mut avas = vec![first];
    loop {
        let after_spaces = skip_spaces(bytes, pos);
        if bytes.get(after_spaces) == Some(&b'+') {
            let next = skip_spaces(bytes, after_spaces + 1);
            let (ava, new_pos) = parse_ava(bytes, next)?;
            avas.push(ava);
            pos = new_pos;
        } else {
            pos = after_spaces;
            break;
        }
    }
    Ok((Rdn { avas }, pos))
}

fn parse_ava(bytes: &[u8], pos: usize) -> Result<(Ava, usize), DnError> {
    let pos = skip_spaces(bytes, pos);
    let (attribute_type, pos) = parse_attribute_type(bytes, pos)?;
    let pos = skip_spaces(bytes, pos);
    if bytes.get(pos) != Some(&b'=') {
        return Err(DnError::UnexpectedCharacter(pos));
    }
    let pos = skip_spaces(bytes, pos + 1);
    let (value, pos) = parse_value(bytes, pos)?;
    Ok((
        Ava {
            attribute_type,
            value,
        },
        pos,
    ))
}

fn parse_attribute_type(bytes: &[u8], pos: usize) -> Result<(String, usize), DnError> {
    let start = pos;
    let mut p = pos;
    if bytes.len() >= p + 4 && bytes[p..p + 4].eq_ignore_ascii_case(b"oid.") {
        p += 4;
    }
    let ident_start = p;
    while p < bytes.len() {
        let c = bytes[p];
        if c.is_ascii_alphanumeric() || c == b'-' || c == b'.' {
            p += 1;
        } else {
            break;
        }
    }
    if p == ident_start {
        return Err(DnError::EmptyAttributeType(start));
    }
    let ident = std::str::from_utf8(&bytes[ident_start..p])
        .expect("ASCII subset of a &str is always valid UTF-8");
    Ok((ident.to_owned(), p))
}

fn parse_value(bytes: &[u8], pos: usize) -> Result<(Value, usize), DnError> {
    if bytes.get(pos) == Some(&b'#') {
        let (raw, p) = parse_hex_string(bytes, pos + 1)?;
        return Ok((Value::Binary(raw), p));
    }
    let (s, p) = parse_string_value(bytes, pos)?;
    Ok((Value::String(s), p))
}

fn parse_hex_string(bytes: &[u8], pos: usize) -> Result<(Vec<u8>, usize), DnError> {
    let mut out = Vec::new();
    let mut p = pos;
    loop {
        match (bytes.get(p), bytes.get(p + 1)) {
            (Some(&h1), Some(&h2)) if is_hex(h1) && is_hex(h2) => {
                out.push(hex_val(h1) * 16 + hex_val(h2));
                p += 2;
            }
            _ => break,
        }
    }
    if p == pos {
        return Err(DnError::InvalidHexString(pos));
    }
    Ok((out, p))
}

/// Parses one `\XX` escape starting at the backslash; returns the decoded
/// byte and the position just past the escape.
fn parse_escape(bytes: &[u8], pos: usize) -> Result<(u8, usize), DnError> {
    let p = pos + 1;
    match bytes.get(p) {
        None => Err(DnError::UnterminatedEscape(pos)),
        Some(&c) if is_hex(c) => match bytes.get(p + 1) {
            Some(&c2) if is_hex(c2) => Ok((hex_val(c) * 16 + hex_val(c2), p + 2)),
            _ => Err(DnError::InvalidHexPair(p)),
        },
        Some(&c) if SPECIAL_CHARS.contains(&c) || c == b' ' => Ok((c, p + 1)),
        Some(_) => Err(DnError::InvalidHexPair(p)),
    }
}

fn parse_string_value(bytes: &[u8], pos: usize) -> Result<(String, usize), DnError> {
    let mut out: Vec<u8> = Vec::new();
    let mut trailing_trimmable = 0usize;
    let mut p = pos;
    loop {
        match bytes.get(p) {
            None | Some(b',') | Some(b';') | Some(b'+') => break,
            Some(&b'\\') => {
                let (byte, np) = parse_escape(bytes, p)?;
                out.push(byte);
                trailing_trimmable = 0;
                p = np;
            }
            Some(&c) => {
                out.push(c);
                trailing_trimmable = if c == b' ' { trailing_trimmable + 1 } else { 0 };
                p += 1;
            }
        }
    }
    out.truncate(out.len() - trailing_trimmable);
    let s = String::from_utf8(out).map_err(|_| DnError::InvalidHexString(pos))?;
    Ok((s, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multivalued_rdn() {
        let rdns = parse_dn("cn=Sales+ou=East,dc=example,dc=com").unwrap();
        assert_eq!(rdns.len(), 3);
        assert_eq!(rdns[0].avas.len(), 2);
    }

    #[test]
    fn rejects_empty_attribute_type() {
        assert_eq!(parse_dn("=value"), Err(DnError::EmptyAttributeType(0)));
    }

    #[test]
    fn decodes_hex_escape_in_value() {
        let rdns = parse_dn(r"cn=Lu\c4\8dić").unwrap();
        match &rdns[0].avas[0].value {
            Value::String(s) => assert!(s.starts_with("Lu")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
