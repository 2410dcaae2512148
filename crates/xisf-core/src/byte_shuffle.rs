//! Interleaved-to-planar-by-byte transpose applied before compression.

/// Transpose `input`, viewed as `floor(n/item_size)` records of
/// `item_size` bytes, into planar-by-byte order: all byte-0s, then all
/// byte-1s, …, then byte-`(item_size-1)`s. Trailing `n % item_size`
/// bytes that don't form a complete record are copied verbatim.
///
/// `item_size <= 1` is a no-op copy.
pub fn shuffle(input: &[u8], item_size: usize) -> Vec<u8> {
    if item_size <= 1 {
        return input.to_vec();
    }
    let records = input.len() / item_size;
    let shuffled_len = records * item_size;
    let mut out = Vec::with_capacity(input.len());
    for byte_pos in 0..item_size {
        for record in 0..records {
            out.push(input[record * item_size + byte_pos]);
        }
    }
    out.extend_from_slice(&input[shuffled_len..]);
    out
}

/// Inverse of [`shuffle`]: `unshuffle(shuffle(x, s), s) == x`.
pub fn unshuffle(input: &[u8], item_size: usize) -> Vec<u8> {
    if item_size <= 1 {
        return input.to_vec();
    }
    let records = input.len() / item_size;
    let shuffled_len = records * item_size;
    let mut out = vec![0u8; shuffled_len];
    let mut src = 0;
    for byte_pos in 0..item_size {
        for record in 0..records {
            out[record * item_size + byte_pos] = input[src];
            src += 1;
        }
    }
    out.extend_from_slice(&input[shuffled_len..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_groups_bytes_by_position() {
        // 3 records of 2 bytes: [A0 A1] [B0 B1] [C0 C1] -> [A0 B0 C0 A1 B1 C1]
        let input = [0xA0, 0xA1, 0xB0, 0xB1, 0xC0, 0xC1];
        assert_eq!(shuffle(&input, 2), vec![0xA0, 0xB0, 0xC0, 0xA1, 0xB1, 0xC1]);
    }

    #[test]
    fn shuffle_preserves_trailing_partial_record() {
        let input = [1u8, 2, 3, 4, 5];
        // item_size 2: 2 full records [1,2],[3,4], trailing byte 5 untouched.
        assert_eq!(shuffle(&input, 2), vec![1, 3, 2, 4, 5]);
    }

    #[test]
    fn item_size_of_zero_or_one_is_identity() {
        let input = [9u8, 8, 7, 6];
        assert_eq!(shuffle(&input, 0), input.to_vec());
        assert_eq!(shuffle(&input, 1), input.to_vec());
    }

    #[test]
    fn round_trip_for_various_sizes() {
        let input: Vec<u8> = (0..=255u8).cycle().take(401).collect();
        for item_size in 1..=16usize {
            let shuffled = shuffle(&input, item_size);
            let restored = unshuffle(&shuffled, item_size);
            assert_eq!(restored, input, "item_size={item_size}");
        }
    }

    #[test]
    fn round_trip_empty_input() {
        for item_size in 1..=16usize {
            assert_eq!(unshuffle(&shuffle(&[], item_size), item_size), Vec::<u8>::new());
        }
    }
}
