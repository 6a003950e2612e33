//! Header checksum utilities.
//!
//! Uses CRC-32 with the reflected IEEE polynomial (`0xEDB88320`), the
//! classic zlib/PNG checksum.

/// Computes a CRC-32 checksum for the given data.
///
/// # Example
///
/// ```rust
/// use pagevault_store::page::compute_checksum;
///
/// assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
/// ```
#[inline]
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Computes a CRC-32 checksum over `len` bytes starting at `offset`,
/// without copying.
pub fn compute_checksum_range(data: &[u8], offset: usize, len: usize) -> u32 {
    debug_assert!(offset + len <= data.len());

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&data[offset..offset + len]);
    hasher.finalize()
}

/// Verifies that the checksum matches the data.
#[inline]
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // The standard CRC-32 check value.
        assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_compute_checksum() {
        let data = b"hello, pagevault";
        let checksum = compute_checksum(data);

        // Deterministic
        assert_eq!(compute_checksum(data), checksum);

        // Different data, different checksum
        assert_ne!(compute_checksum(b"hello, pagevault!"), checksum);
    }

    #[test]
    fn test_range_form() {
        let data = b"xxx123456789yyy";
        assert_eq!(compute_checksum_range(data, 3, 9), 0xCBF4_3926);

        // Whole-slice range equals the plain form.
        assert_eq!(
            compute_checksum_range(data, 0, data.len()),
            compute_checksum(data)
        );
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"some header bytes";
        let checksum = compute_checksum(data);

        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }

    #[test]
    fn test_empty_data() {
        let empty: &[u8] = &[];
        assert!(verify_checksum(empty, compute_checksum(empty)));
    }
}
