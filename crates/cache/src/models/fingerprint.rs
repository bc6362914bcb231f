use time::UtcDateTime;

/// A cheap summary of a content pack, used to tell whether a snapshot still
/// reflects it without loading any document bodies.
///
/// Two fingerprints describe the same pack state when their document counts
/// and checksums agree. The modification time is recorded for diagnostics
/// only; hosts don't bump it reliably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFingerprint {
    pub pack_id: String,
    pub pack_label: String,
    pub last_modified: Option<UtcDateTime>,
    pub document_count: u64,
    /// CRC-32 of `"{pack_id}|{pack_label}|{document_count}"`, as 8 lowercase
    /// hex digits.
    pub checksum: String,
}

impl PackFingerprint {
    /// Fingerprint a pack from its lightweight listing.
    ///
    /// ```rust
    /// use bestiary_cache::PackFingerprint;
    /// let a = PackFingerprint::new("world.monsters", "Monsters", 12, None);
    /// let b = PackFingerprint::new("world.monsters", "Monsters", 13, None);
    /// assert_eq!(a.checksum.len(), 8);
    /// assert!(!a.matches(&b));
    /// ```
    pub fn new(
        pack_id: impl Into<String>,
        pack_label: impl Into<String>,
        document_count: u64,
        last_modified: Option<UtcDateTime>,
    ) -> Self {
        let pack_id = pack_id.into();
        let pack_label = pack_label.into();
        let checksum = checksum(&pack_id, &pack_label, document_count);
        Self { pack_id, pack_label, last_modified, document_count, checksum }
    }

    pub fn matches(&self, other: &PackFingerprint) -> bool {
        self.document_count == other.document_count && self.checksum == other.checksum
    }
}

fn checksum(pack_id: &str, pack_label: &str, document_count: u64) -> String {
    format!("{:08x}", crc32fast::hash(format!("{pack_id}|{pack_label}|{document_count}").as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_checksum_format() {
        let fingerprint = PackFingerprint::new("world.monsters", "Monsters", 3, None);
        assert_eq!(fingerprint.checksum.len(), 8);
        assert!(fingerprint.checksum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(
            fingerprint.checksum,
            format!("{:08x}", crc32fast::hash(b"world.monsters|Monsters|3"))
        );
    }

    #[test]
    fn test_timestamp_does_not_affect_matching() {
        let earlier = PackFingerprint::new("p", "Pack", 10, Some(UtcDateTime::UNIX_EPOCH));
        let later = PackFingerprint::new("p", "Pack", 10, Some(UtcDateTime::now()));
        assert!(earlier.matches(&later));
    }

    #[rstest]
    #[case(PackFingerprint::new("p", "Pack", 11, None))]
    #[case(PackFingerprint::new("p", "Renamed", 10, None))]
    #[case(PackFingerprint::new("q", "Pack", 10, None))]
    fn test_changes_break_matching(#[case] changed: PackFingerprint) {
        let original = PackFingerprint::new("p", "Pack", 10, None);
        assert!(!original.matches(&changed));
    }

    #[test]
    fn test_empty_pack() {
        let fingerprint = PackFingerprint::new("", "", 0, None);
        assert_eq!(fingerprint.document_count, 0);
        assert!(fingerprint.matches(&PackFingerprint::new("", "", 0, None)));
    }
}
