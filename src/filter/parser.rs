use thiserror::Error;

use super::Filter;

/// Failure to parse an RFC 4515 filter string, with the byte offset at which
/// it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("expected '(' at offset {0}")]
    ExpectedOpenParen(usize),
    #[error("expected ')' at offset {0}")]
    ExpectedCloseParen(usize),
    #[error("'&'/'|' filter needs at least one child at offset {0}")]
    EmptyAndOr(usize),
    #[error("missing comparison operator at offset {0}")]
    MissingOperator(usize),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("unexpected trailing data at offset {0}")]
    TrailingData(usize),
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

pub(super) fn parse_filter_string(input: &str) -> Result<Filter, FilterError> {
    let bytes = input.as_bytes();
    let (filter, pos) = parse_filter(bytes, 0)?;
    if pos != bytes.len() {
        return Err(FilterError::TrailingData(pos));
    }
    Ok(filter)
}

fn parse_filter(bytes: &[u8], pos: usize) -> Result<(Filter, usize), FilterError> {
    if bytes.get(pos) != Some(&b'(') {
        return Err(FilterError::ExpectedOpenParen(pos));
    }
    let pos = pos + 1;
    let (filter, pos) = match bytes.get(pos) {
        Some(&b'&') => parse_and_or(bytes, pos + 1, true)?,
        Some(&b'|') => parse_and_or(bytes, pos + 1, false)?,
        Some(&b'!') => {
            let (child, p) = parse_filter(bytes, pos + 1)?;
            (Filter::Not(Box::new(child)), p)
        }
        Some(_) => parse_item(bytes, pos)?,
        None => return Err(FilterError::UnexpectedEnd),
    };
    if bytes.get(pos) != Some(&b')') {
        return Err(FilterError::ExpectedCloseParen(pos));
    }
    Ok((filter, pos + 1))
}

fn parse_and_or(bytes: &[u8], pos: usize, is_and: bool) -> Result<(Filter, usize), FilterError> {
    let mut children = Vec::new();
    let mut pos = pos;
    while bytes.get(pos) == Some(&b'(') {
        let (child, new_pos) = parse_filter(bytes, pos)?;
        children.push(child);
        pos = new_pos;
    }
    if children.is_empty() {
        return Err(FilterError::EmptyAndOr(pos));
    }
    let filter = if is_and {
        Filter::And(children)
    } else {
        Filter::Or(children)
    };
    Ok((filter, pos))
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Equal,
    Approx,
    Greater,
    Less,
    Extensible,
}

/// Finds the comparison operator starting at `pos`, returning the end offset
/// of the attribute/options part and the operator kind, plus the offset of
/// the first byte of the assertion value.
fn find_operator(bytes: &[u8], pos: usize) -> Result<(usize, Op, usize), FilterError> {
    let mut i = pos;
    while i < bytes.len() && bytes[i] != b'=' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(FilterError::MissingOperator(pos));
    }
    if i > pos {
        let prev = bytes[i - 1];
        let op = match prev {
            b'~' => Some(Op::Approx),
            b'>' => Some(Op::Greater),
            b'<' => Some(Op::Less),
            b':' => Some(Op::Extensible),
            _ => None,
        };
        if let Some(op) = op {
            return Ok((i - 1, op, i + 1));
        }
    }
    Ok((i, Op::Equal, i + 1))
}

fn find_close_paren(bytes: &[u8], pos: usize) -> Result<usize, FilterError> {
    let mut i = pos;
    while i < bytes.len() && bytes[i] != b')' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(FilterError::ExpectedCloseParen(i));
    }
    Ok(i)
}

fn parse_item(bytes: &[u8], pos: usize) -> Result<(Filter, usize), FilterError> {
    let (attr_end, op, value_start) = find_operator(bytes, pos)?;
    let value_end = find_close_paren(bytes, value_start)?;
    let raw_value = &bytes[value_start..value_end];
    let attr_part = std::str::from_utf8(&bytes[pos..attr_end])
        .map_err(|_| FilterError::InvalidEscape(pos))?;

    let filter = match op {
        Op::Approx => Filter::Approx(attr_part.to_owned(), unescape(raw_value, value_start)?),
        Op::Greater => Filter::Greater(attr_part.to_owned(), unescape(raw_value, value_start)?),
        Op::Less => Filter::Less(attr_part.to_owned(), unescape(raw_value, value_start)?),
        Op::Extensible => parse_extensible(attr_part, raw_value, value_start)?,
        Op::Equal => parse_equality_like(attr_part, raw_value, value_start)?,
    };
    Ok((filter, value_end))
}

fn parse_equality_like(
    attr: &str,
    raw_value: &[u8],
    value_start: usize,
) -> Result<Filter, FilterError> {
    if raw_value == b"*" {
        return Ok(Filter::Presence(attr.to_owned()));
    }
    if !raw_value.contains(&b'*') {
        return Ok(Filter::Equality(
            attr.to_owned(),
            unescape(raw_value, value_start)?,
        ));
    }

    let mut segments = raw_value.split(|&b| b == b'*');
    let first = segments.next().unwrap_or(&[]);
    let rest: Vec<&[u8]> = segments.collect();
    let (any_segments, final_segment) = match rest.split_last() {
        Some((last, init)) => (init, Some(*last)),
        None => (&[][..], None),
    };

    let initial = if first.is_empty() {
        None
    } else {
        Some(unescape(first, value_start)?)
    };
    let mut any = Vec::with_capacity(any_segments.len());
    for seg in any_segments {
        any.push(unescape(seg, value_start)?);
    }
    let final_ = match final_segment {
        Some(seg) if !seg.is_empty() => Some(unescape(seg, value_start)?),
        _ => None,
    };

    Ok(Filter::Substring {
        attr: attr.to_owned(),
        initial,
        any,
        final_,
    })
}

fn parse_extensible(
    attr_part: &str,
    raw_value: &[u8],
    value_start: usize,
) -> Result<Filter, FilterError> {
    let mut parts = attr_part.split(':');
    let mut attr = parts.next().filter(|s| !s.is_empty()).map(str::to_owned);
    let mut dn_attributes = false;
    let mut matching_rule = None;
    for part in parts {
        if part.eq_ignore_ascii_case("dn") {
            dn_attributes = true;
        } else if !part.is_empty() {
            matching_rule = Some(part.to_owned());
        }
    }
    if attr.as_deref() == Some("") {
        attr = None;
    }
    Ok(Filter::Extensible {
        attr,
        matching_rule,
        value: unescape(raw_value, value_start)?,
        dn_attributes,
    })
}

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

/// Decodes `\HH` escapes in an assertion value; every other octet passes
/// through literally.
fn unescape(bytes: &[u8], offset: usize) -> Result<String, FilterError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&h1), Some(&h2)) if is_hex(h1) && is_hex(h2) => {
                    out.push(hex_val(h1) * 16 + hex_val(h2));
                    i += 3;
                }
                _ => return Err(FilterError::InvalidEscape(offset + i)),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| FilterError::InvalidEscape(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_vs_substring() {
        assert_eq!(
            parse_filter_string("(objectClass=*)").unwrap(),
            Filter::Presence("objectClass".to_owned())
        );
        assert_eq!(
            parse_filter_string("(cn=a*)").unwrap(),
            Filter::Substring {
                attr: "cn".to_owned(),
                initial: Some("a".to_owned()),
                any: vec![],
                final_: None,
            }
        );
    }

    #[test]
    fn extensible_match_parses_components() {
        let f = parse_filter_string("(cn:dn:2.5.13.2:=value)").unwrap();
        assert_eq!(
            f,
            Filter::Extensible {
                attr: Some("cn".to_owned()),
                matching_rule: Some("2.5.13.2".to_owned()),
                value: "value".to_owned(),
                dn_attributes: true,
            }
        );
    }

    #[test]
    fn rejects_empty_and() {
        assert_eq!(parse_filter_string("(&)"), Err(FilterError::EmptyAndOr(2)));
    }
}
