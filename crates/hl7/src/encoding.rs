//! Delimiters, escaping and field joining.
//!
//! Consumers parse messages by fixed delimiter position, so every free-text value that may
//! contain a delimiter goes through [`Delimiters::escape`] before it is placed in a field.

/// Segment terminator used when none is configured.
pub const DEFAULT_SEGMENT_TERMINATOR: &str = "\r";

/// The HL7v2 delimiter set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub sub_component: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            sub_component: '&',
        }
    }
}

impl Delimiters {
    /// Returns MSH-2, the encoding characters (`^~\&` by default).
    pub fn encoding_characters(&self) -> String {
        [self.component, self.repetition, self.escape, self.sub_component]
            .iter()
            .collect()
    }

    /// Escapes component and sub-component separators, line breaks and the escape character.
    ///
    /// Both a line feed and the two-character sequence `\n` count as a line break. The input
    /// is scanned once, so escape sequences produced here are never escaped again.
    pub fn escape(&self, s: &str) -> String {
        let esc = self.escape;
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == self.component {
                push_sequence(&mut out, esc, "S");
            } else if c == self.sub_component {
                push_sequence(&mut out, esc, "T");
            } else if c == '\n' {
                push_sequence(&mut out, esc, ".br");
            } else if c == '\\' && chars.peek() == Some(&'n') {
                chars.next();
                push_sequence(&mut out, esc, ".br");
            } else if c == esc {
                push_sequence(&mut out, esc, "E");
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Turns newline-separated values into an HL7 repeated field.
    pub fn repeated(&self, s: &str) -> String {
        s.replace('\n', &self.repetition.to_string())
    }

    /// Escapes only the component separator; units such as `10^9/L` are otherwise kept as is.
    pub fn unit(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if c == self.component {
                push_sequence(&mut out, self.escape, "S");
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Joins fields with the field separator.
    pub fn fields(&self, fields: &[&str]) -> String {
        join(fields, self.field)
    }

    /// Joins components with the component separator.
    pub fn components(&self, components: &[&str]) -> String {
        join(components, self.component)
    }

    /// Joins repetitions with the repetition separator.
    pub fn repetitions<S: AsRef<str>>(&self, items: &[S]) -> String {
        let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
        join(&items, self.repetition)
    }
}

fn push_sequence(out: &mut String, esc: char, code: &str) {
    out.push(esc);
    out.push_str(code);
    out.push(esc);
}

fn join(parts: &[&str], sep: char) -> String {
    let mut buf = [0u8; 4];
    let sep: &str = sep.encode_utf8(&mut buf);
    parts.join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encoding_characters() {
        assert_eq!(Delimiters::default().encoding_characters(), "^~\\&");
    }

    #[test]
    fn escapes_reserved_characters() {
        let d = Delimiters::default();
        assert_eq!(d.escape("a^b"), "a\\S\\b");
        assert_eq!(d.escape("a&b"), "a\\T\\b");
        assert_eq!(d.escape("a\\b"), "a\\E\\b");
        assert_eq!(d.escape("line1\nline2"), "line1\\.br\\line2");
        assert_eq!(d.escape("line1\\nline2"), "line1\\.br\\line2");
        assert_eq!(d.escape("plain text"), "plain text");
    }

    #[test]
    fn escape_is_single_pass() {
        let d = Delimiters::default();
        assert_eq!(d.escape("^\\"), "\\S\\\\E\\");
    }

    #[test]
    fn escapes_with_custom_delimiters() {
        let d = Delimiters {
            component: '#',
            escape: '!',
            ..Delimiters::default()
        };
        assert_eq!(d.escape("a#b^c!"), "a!S!b^c!E!");
        assert_eq!(d.encoding_characters(), "#~!&");
    }

    #[test]
    fn repeated_field_uses_repetition_separator() {
        let d = Delimiters::default();
        assert_eq!(d.repeated("one\ntwo\nthree"), "one~two~three");
        assert_eq!(d.repeated("single"), "single");
    }

    #[test]
    fn unit_escapes_components_only() {
        let d = Delimiters::default();
        assert_eq!(d.unit("10^9/L"), "10\\S\\9/L");
        assert_eq!(d.unit("mg&dl"), "mg&dl");
    }

    #[test]
    fn joins_fields_and_components() {
        let d = Delimiters::default();
        assert_eq!(d.fields(&["NTE", "0", "", "note", ""]), "NTE|0||note|");
        assert_eq!(d.components(&["a", "", "c"]), "a^^c");
        assert_eq!(d.repetitions(&["x".to_string(), "y".to_string()]), "x~y");
    }
}
