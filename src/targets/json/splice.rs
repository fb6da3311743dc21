//! In-place edits of JSON text.
//!
//! Callers parse the document with serde_json first. The scanner here only
//! locates where members sit, so an update can replace one value or append
//! members while every other byte of the file stays as it was.

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Serializer, Value};
use std::io;
use std::ops::Range;

/// One `"key": value` pair of an object literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub key: String,
    pub key_start: usize,
    pub value: Range<usize>,
}

impl Member {
    pub fn value_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.value.clone()]
    }

    pub fn is_object(&self, text: &str) -> bool {
        self.value_text(text).starts_with('{')
    }

    pub fn is_null(&self, text: &str) -> bool {
        self.value_text(text) == "null"
    }
}

/// Positions of an object literal's braces and members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpan {
    pub open: usize,
    pub close: usize,
    pub members: Vec<Member>,
}

impl ObjectSpan {
    /// The member named `key`. With duplicate keys the last one wins, as in serde_json.
    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.iter().rev().find(|m| m.key == key)
    }

    /// Layout new members of this object should follow.
    fn style(&self, text: &str) -> Style {
        let unit = indent_unit(text);
        match self.members.first() {
            Some(first) if starts_line(text, first.key_start) => {
                Style::Pretty { indent: line_indent(text, first.key_start).to_string(), unit }
            },
            Some(_) => Style::Inline,
            None if text.trim_end().contains('\n') => {
                Style::Pretty { indent: format!("{}{unit}", line_indent(text, self.open)), unit }
            },
            None => Style::Inline,
        }
    }
}

/// Replace `range` of the text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Style {
    /// One member per line at `indent`, nested levels stepping by `unit`.
    Pretty { indent: String, unit: String },
    /// Everything on one line.
    Inline,
}

/// Apply edits that do not overlap.
pub fn apply(text: &str, mut edits: Vec<Edit>) -> String {
    // Back to front so earlier offsets stay valid.
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut output = text.to_string();
    for edit in edits {
        output.replace_range(edit.range, &edit.text);
    }
    output
}

/// Edit replacing `member`'s value with `value`, laid out like its siblings.
///
/// # Errors
///
/// Returns a message if `value` cannot be serialized.
pub fn replace_value(
    text: &str,
    object: &ObjectSpan,
    member: &Member,
    value: &Value,
) -> Result<Edit, String> {
    Ok(Edit { range: member.value.clone(), text: value_text(value, &object.style(text))? })
}

/// Edit appending `members` after the last member of `object`.
///
/// # Errors
///
/// Returns a message if a key or value cannot be serialized.
pub fn append_members(
    text: &str,
    object: &ObjectSpan,
    members: &[(String, Value)],
) -> Result<Edit, String> {
    let style = object.style(text);
    let entries = members
        .iter()
        .map(|(key, value)| -> Result<String, String> {
            let key = serde_json::to_string(key).map_err(|e| e.to_string())?;
            Ok(format!("{key}: {}", value_text(value, &style)?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let edit = match (&style, object.members.last()) {
        (Style::Pretty { indent, .. }, Some(last)) => Edit {
            range: last.value.end..last.value.end,
            text: entries.iter().map(|entry| format!(",\n{indent}{entry}")).collect(),
        },
        (Style::Inline, Some(last)) => Edit {
            range: last.value.end..last.value.end,
            text: entries.iter().map(|entry| format!(", {entry}")).collect(),
        },
        (Style::Pretty { indent, .. }, None) => Edit {
            range: object.open + 1..object.close,
            text: format!(
                "\n{indent}{}\n{}",
                entries.join(&format!(",\n{indent}")),
                line_indent(text, object.open)
            ),
        },
        (Style::Inline, None) => Edit { range: object.open + 1..object.close, text: entries.join(", ") },
    };
    Ok(edit)
}

/// Scan the root object of `text`.
///
/// # Errors
///
/// Returns a message if the text does not hold an object.
pub fn root_object(text: &str) -> Result<ObjectSpan, String> {
    object_at(text, skip_ws(text.as_bytes(), 0))
}

/// Scan the object literal whose `{` is at byte `open`.
///
/// # Errors
///
/// Returns a message if there is no well-formed object at `open`.
pub fn object_at(text: &str, open: usize) -> Result<ObjectSpan, String> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return Err(unexpected(open));
    }

    let mut members = Vec::new();
    let mut pos = skip_ws(bytes, open + 1);
    if bytes.get(pos) == Some(&b'}') {
        return Ok(ObjectSpan { open, close: pos, members });
    }

    loop {
        let key_start = pos;
        let key_end = skip_string(bytes, key_start)?;
        let key: String =
            serde_json::from_str(&text[key_start..key_end]).map_err(|e| e.to_string())?;

        pos = skip_ws(bytes, key_end);
        if bytes.get(pos) != Some(&b':') {
            return Err(unexpected(pos));
        }
        let value_start = skip_ws(bytes, pos + 1);
        let value_end = skip_value(bytes, value_start)?;
        members.push(Member { key, key_start, value: value_start..value_end });

        pos = skip_ws(bytes, value_end);
        match bytes.get(pos) {
            Some(b',') => pos = skip_ws(bytes, pos + 1),
            Some(b'}') => return Ok(ObjectSpan { open, close: pos, members }),
            _ => return Err(unexpected(pos)),
        }
    }
}

fn unexpected(pos: usize) -> String {
    format!("unexpected JSON at byte {pos}")
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

/// End of the string literal starting at `pos`, past the closing quote.
fn skip_string(bytes: &[u8], pos: usize) -> Result<usize, String> {
    if bytes.get(pos) != Some(&b'"') {
        return Err(unexpected(pos));
    }
    let mut i = pos + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' => i += 2,
            b'"' => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(unexpected(pos))
}

fn skip_value(bytes: &[u8], pos: usize) -> Result<usize, String> {
    match bytes.get(pos) {
        Some(b'"') => skip_string(bytes, pos),
        Some(b'{' | b'[') => skip_container(bytes, pos),
        Some(_) => {
            let mut end = pos;
            while bytes
                .get(end)
                .is_some_and(|b| !matches!(b, b',' | b'}' | b']') && !b.is_ascii_whitespace())
            {
                end += 1;
            }
            if end == pos {
                Err(unexpected(pos))
            } else {
                Ok(end)
            }
        },
        None => Err(unexpected(pos)),
    }
}

fn skip_container(bytes: &[u8], open: usize) -> Result<usize, String> {
    let mut depth = 0_usize;
    let mut pos = open;
    while let Some(&b) = bytes.get(pos) {
        match b {
            b'"' => {
                pos = skip_string(bytes, pos)?;
                continue;
            },
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(pos + 1);
                }
            },
            _ => {},
        }
        pos += 1;
    }
    Err(unexpected(open))
}

/// Leading whitespace of the line holding byte `pos`.
fn line_indent(text: &str, pos: usize) -> &str {
    let line = &text[line_start(text, pos)..];
    &line[..line.len() - line.trim_start_matches([' ', '\t']).len()]
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn starts_line(text: &str, pos: usize) -> bool {
    text[line_start(text, pos)..pos].trim().is_empty()
}

/// Indentation step of the document, taken from its first indented line.
fn indent_unit(text: &str) -> String {
    text.lines()
        .map(|line| &line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
        .find(|indent| !indent.is_empty())
        .unwrap_or("  ")
        .to_string()
}

fn value_text(value: &Value, style: &Style) -> Result<String, String> {
    let mut buf = Vec::new();
    match style {
        Style::Pretty { indent, unit } => {
            let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(unit.as_bytes()));
            value.serialize(&mut ser).map_err(|e| e.to_string())?;
            let text = String::from_utf8(buf).map_err(|e| e.to_string())?;
            Ok(text.replace('\n', &format!("\n{indent}")))
        },
        Style::Inline => {
            let mut ser = Serializer::with_formatter(&mut buf, InlineFormatter);
            value.serialize(&mut ser).map_err(|e| e.to_string())?;
            String::from_utf8(buf).map_err(|e| e.to_string())
        },
    }
}

/// One-line output with a space after `:` and `,`.
struct InlineFormatter;

impl Formatter for InlineFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
