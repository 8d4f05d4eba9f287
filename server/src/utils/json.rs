//! JSON utility functions

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

/// Compact formatter that escapes characters unsafe to embed in HTML.
///
/// `<`, `>`, `&` and the line separators U+2028 and U+2029 are written as
/// `\uXXXX` escapes. The output is still valid JSON and decodes to the
/// same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscapeFormatter;

impl Formatter for HtmlEscapeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` as compact JSON, optionally HTML-escaping string contents
pub fn to_vec<T: Serialize + ?Sized>(value: &T, escape_html: bool) -> serde_json::Result<Vec<u8>> {
    if !escape_html {
        return serde_json::to_vec(value);
    }

    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlEscapeFormatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
