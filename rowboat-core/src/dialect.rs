//! Delimiter dialect and record-shape policies

/// Field separator and quoting convention of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Field separator byte.
    pub separator: u8,
    /// Quote byte; a doubled quote inside a quoted field is an escaped quote.
    pub quote: u8,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            separator: b',',
            quote: b'"',
        }
    }
}

impl Dialect {
    /// Dialect with an explicit separator and the default quote.
    pub fn with_separator(separator: u8) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }
}

/// How the first record of the input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Decide from the data: a first row that does not parse as numbers
    /// while the second row does is taken as a header.
    #[default]
    Auto,
    /// The first row is column names.
    Yes,
    /// All rows are data; columns are named `c0`, `c1`, ...
    No,
}

/// What to do with records whose field count differs from the schema width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaggedMode {
    /// Fail the read with a parse error.
    #[default]
    Error,
    /// Pad short records with nulls and drop extra fields from long ones.
    Permissive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dialect_is_comma_quoted() {
        let d = Dialect::default();
        assert_eq!(d.separator, b',');
        assert_eq!(d.quote, b'"');
    }

    #[test]
    fn test_with_separator_keeps_quote() {
        let d = Dialect::with_separator(b'\t');
        assert_eq!(d.separator, b'\t');
        assert_eq!(d.quote, b'"');
    }
}
