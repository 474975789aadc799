/// Low-level scanners over inline text. Positions are byte offsets.
use std::borrow::Cow;

/// Longest allowed link label, in characters
const MAX_LABEL_LENGTH: usize = 999;

/// Check if a character is Unicode punctuation (for emphasis flanking rules).
/// Covers ASCII punctuation and the common P/S ranges outside ASCII.
pub fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(c as u32,
        // Latin-1 punctuation and symbols
        0x00A1..=0x00BF | 0x00D7 | 0x00F7 |
        // General Punctuation
        0x2000..=0x206F |
        // Currency symbols
        0x20A0..=0x20CF |
        // Arrows, math operators, technical, box drawing, shapes, symbols
        0x2190..=0x23FF | 0x2500..=0x27BF |
        // Supplemental math and arrows
        0x27C0..=0x2BFF |
        // Supplemental Punctuation
        0x2E00..=0x2E7F |
        // CJK punctuation
        0x3000..=0x303F |
        // Fullwidth ASCII punctuation
        0xFF01..=0xFF0F | 0xFF1A..=0xFF20 | 0xFF3B..=0xFF40 | 0xFF5B..=0xFF65
    )
}

/// Character immediately before `pos`
pub fn char_before(input: &str, pos: usize) -> Option<char> {
    input[..pos].chars().next_back()
}

pub fn char_at(input: &str, pos: usize) -> Option<char> {
    input.get(pos..).and_then(|s| s.chars().next())
}

/// Resolve backslash escapes and entity references
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '&']) {
        return Cow::Borrowed(text);
    }
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => {
                result.push(bytes[i + 1] as char);
                i += 2;
            }
            b'&' => match decode_entity(text, i) {
                Some((decoded, end)) => {
                    result.push_str(&decoded);
                    i = end;
                }
                None => {
                    result.push('&');
                    i += 1;
                }
            },
            _ => {
                // Copy the whole char
                let c = char_at(text, i).unwrap_or('\u{FFFD}');
                result.push(c);
                i += c.len_utf8();
            }
        }
    }
    Cow::Owned(result)
}

/// Try to decode an entity or numeric character reference at `start`
/// (which holds `&`). Returns the decoded text and the offset after `;`.
pub fn decode_entity(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    if bytes.get(i) == Some(&b'#') {
        i += 1;
        let hex = matches!(bytes.get(i), Some(b'x' | b'X'));
        if hex {
            i += 1;
        }
        let digits_start = i;
        let max_digits = if hex { 6 } else { 7 };
        while i < bytes.len()
            && i - digits_start < max_digits
            && (if hex {
                bytes[i].is_ascii_hexdigit()
            } else {
                bytes[i].is_ascii_digit()
            })
        {
            i += 1;
        }
        if i == digits_start || bytes.get(i) != Some(&b';') {
            return None;
        }
        let radix = if hex { 16 } else { 10 };
        let code_point = u32::from_str_radix(&input[digits_start..i], radix).ok()?;
        // Invalid and null code points become the replacement character
        let c = match code_point {
            0 => '\u{FFFD}',
            _ => char::from_u32(code_point).unwrap_or('\u{FFFD}'),
        };
        return Some((c.to_string(), i + 1));
    }

    let name_start = i;
    while i < bytes.len() && i - name_start < 32 && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == name_start || bytes.get(i) != Some(&b';') {
        return None;
    }
    let entity = &input[start..=i];
    let decoded = html_escape::decode_html_entities(entity);
    if decoded == entity {
        return None;
    }
    Some((decoded.into_owned(), i + 1))
}

/// Skip spaces and tabs, at most one line ending, then spaces and tabs again.
/// Fails when a blank line follows.
pub fn skip_spaces_and_newline(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = skip_spaces(input, pos);
    if bytes.get(i) == Some(&b'\n') {
        i = skip_spaces(input, i + 1);
        if bytes.get(i) == Some(&b'\n') {
            return None;
        }
    }
    Some(i)
}

pub fn skip_spaces(input: &str, mut pos: usize) -> usize {
    let bytes = input.as_bytes();
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    pos
}

/// Scan a link label starting at `[`. Returns the raw label text and the
/// offset after `]`.
pub fn scan_link_label(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }
    let mut i = start + 1;
    let mut chars = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => i += 2,
            b'[' => return None,
            b']' => {
                if chars > MAX_LABEL_LENGTH {
                    return None;
                }
                return Some((input[start + 1..i].to_string(), i + 1));
            }
            _ => i += 1,
        }
        chars += 1;
    }
    None
}

/// Scan a link destination, either `<...>` or a run of non-space characters
/// with balanced parentheses. Returns the unescaped destination and the
/// offset after it; a bare destination may be empty.
pub fn scan_link_destination(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) == Some(&b'<') {
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => return Some((unescape(&input[start + 1..i]).into_owned(), i + 1)),
                b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => i += 2,
                b'<' | b'\n' => return None,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = start;
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => i += 2,
            b'(' => {
                depth += 1;
                if depth > 32 {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            b if b == b' ' || b.is_ascii_control() => break,
            _ => i += 1,
        }
    }
    if depth != 0 {
        return None;
    }
    Some((unescape(&input[start..i]).into_owned(), i))
}

/// Scan a link title in `"..."`, `'...'` or `(...)`
pub fn scan_link_title(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let close = match bytes.get(start)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => i += 2,
            b if b == close => {
                return Some((unescape(&input[start + 1..i]).into_owned(), i + 1));
            }
            b'(' if close == b')' => return None,
            b'\n' if bytes.get(skip_spaces(input, i + 1)) == Some(&b'\n') => return None,
            _ => i += 1,
        }
    }
    None
}

/// Find the end of a code span opened by the backtick run at `start`.
/// Returns the span content and the offset after the closing run.
pub fn scan_code_span(input: &str, start: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let open_len = run_length(bytes, start, b'`');
    let content_start = start + open_len;
    let mut i = content_start;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let close_len = run_length(bytes, i, b'`');
            if close_len == open_len {
                let content = input[content_start..i].replace('\n', " ");
                let content = if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.bytes().all(|b| b == b' ')
                {
                    content[1..content.len() - 1].to_string()
                } else {
                    content
                };
                return Some((content, i + close_len));
            }
            i += close_len;
        } else {
            i += 1;
        }
    }
    None
}

pub fn run_length(bytes: &[u8], start: usize, b: u8) -> usize {
    bytes[start..].iter().take_while(|&&c| c == b).count()
}

/// An autolink at `<`: returns the destination, the link text and the
/// offset after `>`
pub fn scan_autolink(input: &str, start: usize) -> Option<(String, String, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b'>' {
        if bytes[i] == b'<' || bytes[i] <= b' ' {
            return None;
        }
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    let content = &input[start + 1..i];
    if is_absolute_uri(content) {
        return Some((content.to_string(), content.to_string(), i + 1));
    }
    if is_email_address(content) {
        return Some((format!("mailto:{}", content), content.to_string(), i + 1));
    }
    None
}

/// Scheme of 2 to 32 characters followed by `:`
fn is_absolute_uri(text: &str) -> bool {
    let Some(colon) = text.find(':') else {
        return false;
    };
    let scheme = &text[..colon];
    (2..=32).contains(&scheme.len())
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

fn is_email_address(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c));
    local_ok
        && !domain.is_empty()
        && domain.split('.').all(|part| {
            !part.is_empty()
                && part.len() <= 63
                && !part.starts_with('-')
                && !part.ends_with('-')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Raw inline HTML at `<`: open and closing tags, comments, processing
/// instructions, declarations and CDATA. Returns the offset after it.
pub fn scan_html_inline(input: &str, start: usize) -> Option<usize> {
    let rest = &input[start..];
    if let Some(comment) = rest.strip_prefix("<!--") {
        if comment.starts_with('>') {
            return Some(start + 5);
        }
        if comment.starts_with("->") {
            return Some(start + 6);
        }
        return comment.find("-->").map(|end| start + 4 + end + 3);
    }
    if rest.starts_with("<?") {
        return rest[2..].find("?>").map(|end| start + 2 + end + 2);
    }
    if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
        return cdata.find("]]>").map(|end| start + 9 + end + 3);
    }
    if let Some(declaration) = rest.strip_prefix("<!") {
        if declaration.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return declaration.find('>').map(|end| start + 2 + end + 1);
        }
        return None;
    }
    if let Some(closing) = rest.strip_prefix("</") {
        let name_len = tag_name_length(closing)?;
        let i = skip_whitespace(closing, name_len);
        return (closing.as_bytes().get(i) == Some(&b'>')).then_some(start + 2 + i + 1);
    }
    scan_open_tag(input, start)
}

fn tag_name_length(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    Some(
        1 + bytes[1..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
            .count(),
    )
}

fn skip_whitespace(s: &str, mut i: usize) -> usize {
    let bytes = s.as_bytes();
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n') {
        i += 1;
    }
    i
}

fn scan_open_tag(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = start + 1 + tag_name_length(&input[start + 1..])?;
    loop {
        let after_space = skip_whitespace(input, i);
        match bytes.get(after_space)? {
            b'>' => return Some(after_space + 1),
            b'/' => {
                return (bytes.get(after_space + 1) == Some(&b'>')).then_some(after_space + 2);
            }
            _ => {}
        }
        // Attributes must be separated by whitespace
        if after_space == i {
            return None;
        }
        i = scan_attribute(input, after_space)?;
    }
}

fn scan_attribute(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b':') {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'.' | b':' | b'-'))
    {
        i += 1;
    }

    let before_value = skip_whitespace(input, i);
    if bytes.get(before_value) != Some(&b'=') {
        return Some(i);
    }
    let value_start = skip_whitespace(input, before_value + 1);
    match *bytes.get(value_start)? {
        quote @ (b'"' | b'\'') => {
            let end = input[value_start + 1..].find(quote as char)?;
            Some(value_start + 1 + end + 1)
        }
        _ => {
            let len = bytes[value_start..]
                .iter()
                .take_while(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'))
                .count();
            (len > 0).then_some(value_start + len)
        }
    }
}
