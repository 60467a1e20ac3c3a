//! Quote- and comment-aware text helpers for SQL scripts
//!
//! Nothing here understands SQL grammar. The scanner only knows where string
//! literals, quoted identifiers and comments start and end, which is enough to
//! split statements and to keep text repairs out of literals.

use crate::model::TableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    /// String literal, quoted identifier or dollar-quoted body
    Quoted,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

/// Cut `sql` into code, quoted and comment segments. Concatenating the segment texts
/// gives back the input unchanged.
pub fn segments(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\'' => Some((SegmentKind::Quoted, quoted_end(bytes, i, b'\'', true))),
            b'"' => Some((SegmentKind::Quoted, quoted_end(bytes, i, b'"', false))),
            b'`' => Some((SegmentKind::Quoted, quoted_end(bytes, i, b'`', false))),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = sql[i..].find('\n').map(|p| i + p).unwrap_or(bytes.len());
                Some((SegmentKind::Comment, end))
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..].find("*/").map(|p| i + 2 + p + 2).unwrap_or(bytes.len());
                Some((SegmentKind::Comment, end))
            }
            b'$' => dollar_tag(&sql[i..]).map(|tag| {
                let body_start = i + tag.len();
                let end = sql[body_start..]
                    .find(tag)
                    .map(|p| body_start + p + tag.len())
                    .unwrap_or(bytes.len());
                (SegmentKind::Quoted, end)
            }),
            _ => None,
        };

        match end {
            Some((kind, end)) => {
                if code_start < i {
                    out.push(Segment { kind: SegmentKind::Code, text: &sql[code_start..i] });
                }
                out.push(Segment { kind, text: &sql[i..end] });
                i = end;
                code_start = end;
            }
            None => i += 1,
        }
    }
    if code_start < bytes.len() {
        out.push(Segment { kind: SegmentKind::Code, text: &sql[code_start..] });
    }
    out
}

/// End (exclusive) of a quoted run starting at `start`; doubled quotes escape
fn quoted_end(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if backslash_escapes => i += 2,
            b if b == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `$$` or `$tag$` at the start of `s`
fn dollar_tag(s: &str) -> Option<&str> {
    let rest = &s[1..];
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let tag_body = &rest[..len];
    if rest.as_bytes().get(len) == Some(&b'$') && !tag_body.starts_with(|c: char| c.is_ascii_digit()) {
        Some(&s[..len + 2])
    } else {
        None
    }
}

/// One `;`-terminated statement with comments blanked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub text: String,
    /// 1-based line of the statement's first character in the script
    pub line: usize,
}

/// Split a script on `;` outside literals and comments.
///
/// Comments are replaced by their newlines so that line numbers inside a statement
/// still line up with the script.
pub fn split_statements(sql: &str) -> Vec<RawStatement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line: Option<usize> = None;
    let mut line = 1;

    let mut finish = |current: &mut String, start_line: &mut Option<usize>| {
        if let Some(first) = start_line.take() {
            let text = current.trim_end().to_string();
            if !text.is_empty() {
                statements.push(RawStatement { text, line: first });
            }
        }
        current.clear();
    };

    for segment in segments(sql) {
        match segment.kind {
            SegmentKind::Comment => {
                let newlines = segment.text.matches('\n').count();
                if start_line.is_some() {
                    if newlines == 0 {
                        current.push(' ');
                    } else {
                        current.push_str(&"\n".repeat(newlines));
                    }
                }
                line += newlines;
            }
            SegmentKind::Quoted => {
                start_line.get_or_insert(line);
                current.push_str(segment.text);
                line += segment.text.matches('\n').count();
            }
            SegmentKind::Code => {
                for ch in segment.text.chars() {
                    if ch == ';' {
                        finish(&mut current, &mut start_line);
                    } else if start_line.is_none() && ch.is_whitespace() {
                        // leading whitespace between statements
                    } else {
                        start_line.get_or_insert(line);
                        current.push(ch);
                    }
                    if ch == '\n' {
                        line += 1;
                    }
                }
            }
        }
    }
    finish(&mut current, &mut start_line);
    statements
}

/// Split on `separator` at parenthesis depth zero, outside literals
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for segment in segments(text) {
        if segment.kind != SegmentKind::Code {
            current.push_str(segment.text);
            continue;
        }
        for ch in segment.text.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                c if c == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Contents of the parenthesised group opening at byte `open`, and the byte index
/// just past its closing parenthesis
pub fn balanced_group(text: &str, open: usize) -> Option<(&str, usize)> {
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    let mut offset = 0;
    for segment in segments(text) {
        let seg_start = offset;
        offset += segment.text.len();
        if offset <= open || segment.kind != SegmentKind::Code {
            continue;
        }
        for (i, ch) in segment.text.char_indices() {
            let pos = seg_start + i;
            if pos < open {
                continue;
            }
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((&text[open + 1..pos], pos + 1));
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Strip identifier quoting: `"x"`, `` `x` ``, `[x]`
pub fn unquote(ident: &str) -> String {
    let t = ident.trim();
    let stripped = if t.len() >= 2
        && ((t.starts_with('"') && t.ends_with('"'))
            || (t.starts_with('`') && t.ends_with('`'))
            || (t.starts_with('[') && t.ends_with(']')))
    {
        &t[1..t.len() - 1]
    } else {
        t
    };
    stripped.replace("\"\"", "\"").replace("``", "`")
}

/// Split a dotted name on dots outside quotes, unquoting each part
pub fn split_name(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in name.trim().chars() {
        match (quote, ch) {
            (None, '"' | '`') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                quote = Some(']');
                current.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (None, '.') => parts.push(unquote(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    parts.push(unquote(&current));
    parts
}

/// `[catalog.][schema.]table` as a table reference; the catalog is dropped
pub fn table_ref(name: &str) -> TableRef {
    let mut parts = split_name(name);
    let table = parts.pop().unwrap_or_default();
    TableRef::new(parts.pop(), table)
}

/// Column name from an index or key element: unquoted, without sort order,
/// operator class or MySQL prefix length
pub fn key_column(element: &str) -> Option<(String, crate::models::SortDirection)> {
    let mut words: Vec<&str> = element.split_whitespace().collect();
    let mut direction = crate::models::SortDirection::Asc;
    while let Some(last) = words.last() {
        let upper = last.to_ascii_uppercase();
        if upper == "ASC" || upper == "DESC" {
            direction = crate::models::SortDirection::parse(&upper);
            words.pop();
        } else if upper == "NULLS" || upper == "FIRST" || upper == "LAST" {
            words.pop();
        } else {
            break;
        }
    }
    let name = match words.as_slice() {
        [name] => *name,
        // `col text_pattern_ops`
        [name, opclass] if !opclass.contains('(') => *name,
        _ => return None,
    };
    let name = match name.find('(') {
        Some(p) if name.ends_with(')') && name[p + 1..name.len() - 1].chars().all(|c| c.is_ascii_digit()) => &name[..p],
        Some(_) => return None,
        None => name,
    };
    let name = unquote(name);
    (!name.is_empty()).then_some((name, direction))
}

/// Undo `''` escaping inside a single-quoted literal body
pub fn unescape_literal(body: &str) -> String {
    body.replace("''", "'")
}
