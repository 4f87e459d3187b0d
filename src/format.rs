// Format templates: one user-supplied string such as `{id} - {title}`
// compiles into a renderer (Record -> line) and a parser (line -> Record).
//
// The compiled form is a list of segments, literal text and field
// placeholders in template order. Rendering walks the segments; parsing
// matches the literal segments against the line and captures the spans in
// between. The matcher is a `regex` built from the escaped literals; when
// a field repeats and the lazy split disagrees, a backtracking search finds
// a split where every repeat captures the same text.

use crate::error::{Error, Result};
use crate::record::{Field, Record};
use regex::Regex;
use std::collections::HashMap;

/// Line terminator appended by `render`.
pub const TERMINATOR: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A compiled format template.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    template: String,
    segments: Vec<Segment>,
    matcher: Regex,
}

impl FormatSpec {
    /// Compile a template as typed by the user. Escape sequences such as
    /// `\t` are decoded first, and trailing line terminators are dropped
    /// (`render` appends its own).
    pub fn compile(raw: &str) -> Result<Self> {
        let decoded = decode_escapes(raw);
        let template = decoded.trim_end_matches(['\n', '\r']).to_string();
        let segments = tokenize(&template)?;

        let mut pattern = String::from("(?is)^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(_) => pattern.push_str("(.*?)"),
            }
        }
        pattern.push('$');
        let matcher = Regex::new(&pattern).map_err(|e| Error::InvalidFormat(e.to_string()))?;

        tracing::debug!(template = %template, pattern = %pattern, "compiled format");
        Ok(FormatSpec {
            template,
            segments,
            matcher,
        })
    }

    /// The decoded template, without its trailing terminator.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholders in template order (repeats included).
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(field) => Some(*field),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, record: &Record) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Field(field) => line.push_str(&record.text(*field)),
            }
        }
        line.push_str(TERMINATOR);
        line
    }

    /// Parse one line back into a Record. Only the fields named in the
    /// template are populated.
    pub fn parse(&self, line: &str) -> Result<Record> {
        let line = line.trim_end_matches(['\n', '\r']);
        let unparsable = || Error::UnparsableLine {
            template: self.template.clone(),
            line: line.to_string(),
        };

        let captures = self.matcher.captures(line).ok_or_else(&unparsable)?;
        let spans: Vec<(Field, &str)> = self
            .fields()
            .enumerate()
            .map(|(group, field)| (field, captures.get(group + 1).map_or("", |m| m.as_str())))
            .collect();

        let mut record = Record::default();
        if repeats_agree(&spans) {
            // Reversed so the first capture of a repeated field wins.
            for (field, text) in spans.into_iter().rev() {
                record.set_text(field, text);
            }
            return Ok(record);
        }

        // The lazy split put different text under a repeated field; look for
        // a split where every repeat captures the same text.
        let mut bound = Vec::new();
        if !split_consistent(&self.segments, line, &mut bound) {
            return Err(unparsable());
        }
        for (field, text) in bound {
            record.set_text(field, text);
        }
        Ok(record)
    }
}

fn repeats_agree(spans: &[(Field, &str)]) -> bool {
    let mut seen: HashMap<Field, &str> = HashMap::new();
    spans.iter().all(|&(field, text)| match seen.insert(field, text) {
        Some(previous) => eq_ignore_case(previous, text),
        None => true,
    })
}

/// Backtracking match of `segments` against `line`. Each field takes the
/// shortest span that lets the rest of the line match, and a repeated field
/// must reproduce its first capture. On success `bound` holds one span per
/// distinct field.
fn split_consistent<'l>(
    segments: &[Segment],
    line: &'l str,
    bound: &mut Vec<(Field, &'l str)>,
) -> bool {
    match segments.split_first() {
        None => line.is_empty(),
        Some((Segment::Literal(text), rest)) => match strip_prefix_ignore_case(line, text) {
            Some(tail) => split_consistent(rest, tail, bound),
            None => false,
        },
        Some((Segment::Field(field), rest)) => {
            let earlier = bound.iter().find(|(f, _)| f == field).map(|&(_, text)| text);
            if let Some(text) = earlier {
                return match strip_prefix_ignore_case(line, text) {
                    Some(tail) => split_consistent(rest, tail, bound),
                    None => false,
                };
            }
            let ends = line
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(line.len()));
            for end in ends {
                bound.push((*field, &line[..end]));
                if split_consistent(rest, &line[end..], bound) {
                    return true;
                }
                bound.pop();
            }
            false
        }
    }
}

fn strip_prefix_ignore_case<'l>(line: &'l str, prefix: &str) -> Option<&'l str> {
    let mut rest = line.chars();
    for expected in prefix.chars() {
        let actual = rest.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
    }
    Some(rest.as_str())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars().zip(b.chars()).all(|(x, y)| chars_eq_ignore_case(x, y))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn tokenize(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(Error::InvalidFormat(format!(
                        "unclosed placeholder '{{{}'",
                        name
                    )));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(placeholder(&name)?));
            }
            '}' => {
                return Err(Error::InvalidFormat(
                    "single '}' encountered in format string".into(),
                ))
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn placeholder(name: &str) -> Result<Field> {
    if name.is_empty() {
        return Err(Error::InvalidFormat(
            "positional placeholder '{}' is not supported".into(),
        ));
    }
    if name.contains([':', '!']) {
        return Err(Error::InvalidFormat(format!(
            "conversions and format specs are not supported in '{{{}}}'",
            name
        )));
    }
    name.parse::<Field>().map_err(Error::InvalidFormat)
}

/// Interpret backslash escapes the way a shell user expects them to work
/// inside a quoted template. Unknown escapes are kept as typed.
pub fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('n') => push_escape(&mut out, &mut chars, '\n'),
            Some('t') => push_escape(&mut out, &mut chars, '\t'),
            Some('r') => push_escape(&mut out, &mut chars, '\r'),
            Some('0') => push_escape(&mut out, &mut chars, '\0'),
            Some('\\') => push_escape(&mut out, &mut chars, '\\'),
            Some('\'') => push_escape(&mut out, &mut chars, '\''),
            Some('"') => push_escape(&mut out, &mut chars, '"'),
            Some(kind @ ('x' | 'u')) => {
                let rest: String = chars.clone().skip(1).collect();
                match hex_escape(kind, &rest) {
                    Some((decoded, consumed)) => {
                        out.push(decoded);
                        // The kind character plus the digits (and braces).
                        for _ in 0..=consumed {
                            chars.next();
                        }
                    }
                    None => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

fn push_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    decoded: char,
) {
    chars.next();
    out.push(decoded);
}

// `\xNN`, `\uNNNN` or `\u{N..}`. Returns the char and the number of chars
// consumed after the kind character.
fn hex_escape(kind: char, rest: &str) -> Option<(char, usize)> {
    let (digits, consumed) = match kind {
        'x' => (rest.get(..2)?, 2),
        'u' if rest.starts_with('{') => {
            let end = rest.find('}')?;
            (&rest[1..end], end + 1)
        }
        _ => (rest.get(..4)?, 4),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let code = u32::from_str_radix(digits, 16).ok()?;
    Some((char::from_u32(code)?, consumed))
}
