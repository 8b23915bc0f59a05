//! Recipient-side report verification.

use crate::report::{HASH_MARKER, SIGNED_MARKER};
use crate::signer::{AuditSigner, Tag};
use usrwatch_common_secret::SecretKey;

/// Report verification errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no ----SIGNED---- block found")]
    MissingSignedBlock,

    #[error("no ----HASH---- block found after the signed block")]
    MissingHashBlock,

    #[error("tag is not 128 hex characters")]
    MalformedTag,

    #[error("tag does not match the signed block")]
    TagMismatch,
}

/// Verify a report as received by the recipient.
///
/// Mail transport rewrites line endings, so CRLF is normalized to LF before
/// the signed block is located. Text before the first marker (mail headers,
/// for instance) is ignored.
pub fn verify_report(text: &str, secret: &SecretKey) -> Result<(), VerifyError> {
    let text = text.replace("\r\n", "\n");

    let open = format!("{SIGNED_MARKER}\n");
    let close = format!("\n{SIGNED_MARKER}\n");

    let start = find_line(&text, &open).ok_or(VerifyError::MissingSignedBlock)?;
    let close_at = text[start + open.len() - 1..]
        .find(&close)
        .map(|i| start + open.len() - 1 + i)
        .ok_or(VerifyError::MissingSignedBlock)?;
    let end = close_at + close.len();
    let body = &text[start..end];

    let mut rest = text[end..].lines();
    if rest.next() != Some(HASH_MARKER) {
        return Err(VerifyError::MissingHashBlock);
    }
    let tag_line = rest.next().ok_or(VerifyError::MissingHashBlock)?;
    if rest.next() != Some(HASH_MARKER) {
        return Err(VerifyError::MissingHashBlock);
    }

    let tag = Tag::from_hex(tag_line).ok_or(VerifyError::MalformedTag)?;
    if AuditSigner::new(secret).verify(body, &tag) {
        Ok(())
    } else {
        Err(VerifyError::TagMismatch)
    }
}

/// Byte offset of `needle` where it starts a line.
fn find_line(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .match_indices(needle)
        .map(|(i, _)| i)
        .find(|&i| i == 0 || haystack.as_bytes()[i - 1] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;
    use chrono::{TimeZone, Utc};

    fn key() -> SecretKey {
        SecretKey::from_bytes([0x5a; 64])
    }

    fn report(diff: &str) -> String {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        ReportBuilder::build(&now, diff, &key()).into_string()
    }

    #[test]
    fn test_genuine_report_verifies() {
        assert_eq!(verify_report(&report("Username added: bob\n"), &key()), Ok(()));
    }

    #[test]
    fn test_report_with_mail_headers_and_crlf_verifies() {
        let mail = format!(
            "From: usrwatch\r\nSubject: usrwatch\r\n\r\n{}",
            report("Username removed: alice\n").replace('\n', "\r\n")
        );
        assert_eq!(verify_report(&mail, &key()), Ok(()));
    }

    #[test]
    fn test_tampered_diff_is_rejected() {
        let forged = report("Username added: bob\n").replace("bob", "eve");
        assert_eq!(verify_report(&forged, &key()), Err(VerifyError::TagMismatch));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let other = SecretKey::from_bytes([0x01; 64]);
        assert_eq!(
            verify_report(&report("Username added: bob\n"), &other),
            Err(VerifyError::TagMismatch)
        );
    }

    #[test]
    fn test_missing_blocks() {
        assert_eq!(verify_report("hello", &key()), Err(VerifyError::MissingSignedBlock));

        let text = report("Username added: bob\n");
        let truncated = &text[..text.find(HASH_MARKER).unwrap()];
        assert_eq!(verify_report(truncated, &key()), Err(VerifyError::MissingHashBlock));
    }

    #[test]
    fn test_malformed_tag() {
        let text = report("Username added: bob\n");
        let lines: Vec<&str> = text.lines().collect();
        let tag_line = lines[lines.len() - 2];
        let broken = text.replace(tag_line, "not-a-tag");
        assert_eq!(verify_report(&broken, &key()), Err(VerifyError::MalformedTag));
    }
}
