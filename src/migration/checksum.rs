//! Checksum calculation for migration DDL

use sha2::{Digest, Sha256};

/// Calculate the SHA-256 checksum of a migration's forward DDL.
///
/// Migrations are compiled into the binary, so the checksum covers the
/// embedded statements rather than a file on disk. The state table stores
/// this value when a migration is applied; any later edit to the DDL is
/// detected as a mismatch.
pub fn statement_checksum(statements: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for sql in statements {
        hasher.update(sql.as_bytes());
        hasher.update(b"\n");
    }
    let hash = hasher.finalize();
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable() {
        let a = statement_checksum(&["CREATE TABLE t (id INT)"]);
        let b = statement_checksum(&["CREATE TABLE t (id INT)"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let a = statement_checksum(&["CREATE TABLE t (id INT)"]);
        let b = statement_checksum(&["CREATE TABLE t (id BIGINT)"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_statement_boundaries_matter() {
        // One statement vs. two that concatenate to the same bytes.
        let a = statement_checksum(&["AB"]);
        let b = statement_checksum(&["A", "B"]);
        assert_ne!(a, b);
    }
}
