//! Account name extraction from colon-delimited record files.

/// Record delimiter.
pub const RECORD_DELIMITER: u8 = b'\n';

/// Field delimiter.
pub const FIELD_DELIMITER: u8 = b':';

/// Extract the first field of every record, in order of appearance.
///
/// Records are newline-separated and fields colon-separated, as in
/// `/etc/passwd` and `/etc/shadow`. Splitting always yields at least one
/// field, so every record contributes an entity. Blank records, including
/// the one after a trailing newline, contribute the empty string; this
/// keeps the entity list in step with the record grammar. Bytes that are
/// not valid UTF-8 are replaced with U+FFFD.
///
/// ```rust
/// use usrwatch_audit::extract;
///
/// let entities = extract(b"root:x:0:0::/root:/bin/sh\nalice:x:1000:1000::/home/alice:/bin/sh\n");
/// assert_eq!(entities, vec!["root", "alice", ""]);
/// ```
pub fn extract(content: &[u8]) -> Vec<String> {
    content
        .split(|b| *b == RECORD_DELIMITER)
        .filter_map(|record| record.split(|b| *b == FIELD_DELIMITER).next())
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}
