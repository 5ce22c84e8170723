//! # Command Encoder
//!
//! Builds one command payload from an ordered table of fields.
//!
//! ## Encoding Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  field table                           payload                          │
//! │  ───────────                           ───────                          │
//! │  ("Pain",   Always,      "")     ──►   Pain                             │
//! │  ("6111",   When(false), "\n")   ──►   (skipped, no delimiter either)   │
//! │  ("A",      Always,      "\t")   ──►   Pain\tA                          │
//! │  ("200.0",  Always,      "")     ──►   Pain\tA200.0                     │
//! │  ("1.0",    Always,      "*")    ──►   Pain\tA200.0*1.0                 │
//! │                                                                         │
//! │  The first included field never carries its delimiter. A skipped field  │
//! │  leaves no trace, so it is indistinguishable from an absent one.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::RESERVED_CHARS;

/// Removes protocol-reserved characters (newline, tab) from free text.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !RESERVED_CHARS.contains(c)).collect()
}

/// When a field takes part in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Always,
    /// Only when the value is non-empty.
    NonEmpty,
    /// Only when the flag is set.
    When(bool),
}

/// One row of the field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    pub include: Inclusion,
    /// Written before the value, unless this is the first included field.
    pub delimiter: &'static str,
}

impl Field {
    fn is_included(&self) -> bool {
        match self.include {
            Inclusion::Always => true,
            Inclusion::NonEmpty => !self.value.is_empty(),
            Inclusion::When(flag) => flag,
        }
    }
}

/// Ordered field table folded into a payload string.
///
/// ## Example
/// ```rust
/// use fiscal_device::encoder::CommandEncoder;
///
/// let payload = CommandEncoder::new()
///     .field(",", "S01")
///     .optional(",", None::<&str>)
///     .text(",", "Caisse\t1")
///     .encode();
/// assert_eq!(payload, "S01,Caisse1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandEncoder {
    fields: Vec<Field>,
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw table row.
    pub fn push(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Always-included value, written as is.
    pub fn field(self, delimiter: &'static str, value: impl Into<String>) -> Self {
        self.push(Field {
            value: value.into(),
            include: Inclusion::Always,
            delimiter,
        })
    }

    /// Always-included free text, sanitized.
    pub fn text(self, delimiter: &'static str, value: &str) -> Self {
        self.field(delimiter, sanitize(value))
    }

    /// Value included only when present.
    pub fn optional(self, delimiter: &'static str, value: Option<impl Into<String>>) -> Self {
        let include = Inclusion::When(value.is_some());
        self.push(Field {
            value: value.map(Into::into).unwrap_or_default(),
            include,
            delimiter,
        })
    }

    /// Value included only when `include` is set.
    pub fn field_if(self, delimiter: &'static str, value: impl Into<String>, include: bool) -> Self {
        self.push(Field {
            value: value.into(),
            include: Inclusion::When(include),
            delimiter,
        })
    }

    /// The field table as built so far.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Folds the included fields into one payload.
    pub fn encode(&self) -> String {
        self.fields
            .iter()
            .filter(|f| f.is_included())
            .enumerate()
            .fold(String::new(), |mut out, (i, f)| {
                if i > 0 {
                    out.push_str(f.delimiter);
                }
                out.push_str(&f.value);
                out
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_reserved_chars() {
        assert_eq!(sanitize("Coca\nCola\t1L"), "CocaCola1L");
        assert_eq!(sanitize("plain"), "plain");
        assert_eq!(sanitize("\n\t"), "");
    }

    #[test]
    fn test_first_included_field_has_no_delimiter() {
        let payload = CommandEncoder::new()
            .field_if(",", "skipped", false)
            .field(";", "a")
            .field(",", "b")
            .encode();
        assert_eq!(payload, "a,b");
    }

    #[test]
    fn test_skipped_field_matches_absent_field() {
        let with_skip = CommandEncoder::new()
            .field(",", "a")
            .optional(",", None::<String>)
            .field(",", "c")
            .encode();
        let without = CommandEncoder::new().field(",", "a").field(",", "c").encode();
        assert_eq!(with_skip, without);
    }

    #[test]
    fn test_non_empty_inclusion() {
        let payload = CommandEncoder::new()
            .field(",", "a")
            .push(Field {
                value: String::new(),
                include: Inclusion::NonEmpty,
                delimiter: ",",
            })
            .push(Field {
                value: "x".into(),
                include: Inclusion::NonEmpty,
                delimiter: "|",
            })
            .encode();
        assert_eq!(payload, "a|x");
    }

    #[test]
    fn test_always_included_empty_value_keeps_position() {
        let payload = CommandEncoder::new()
            .field(",", "a")
            .field(",", "")
            .field(",", "c")
            .encode();
        assert_eq!(payload, "a,,c");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(CommandEncoder::new().encode(), "");
    }
}
