//! Security limits
//!
//! Guards against pathological inputs: a file with no newlines at all, a
//! quoted field spanning megabytes, or a row with millions of separators
//! should surface a limit error instead of degenerate behavior.

/// Hard caps applied while scanning records.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum number of columns per table (default: 4,096)
    pub max_columns: usize,
    /// Maximum length of a single field in bytes (default: 16 MiB)
    pub max_field_len: usize,
    /// Maximum length of a single record in bytes (default: 64 MiB)
    pub max_record_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_columns: 4_096,
            max_field_len: 16 * 1024 * 1024,
            max_record_len: 64 * 1024 * 1024,
        }
    }
}
