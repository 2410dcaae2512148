use proptest::prelude::*;
use xisf_core::byte_buffer::ByteBuffer;
use xisf_core::byte_shuffle::{shuffle, unshuffle};
use xisf_core::codec::Codec;

proptest! {
    #[test]
    fn shuffle_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..2048), item_size in 1usize..=16) {
        let shuffled = shuffle(&bytes, item_size);
        prop_assert_eq!(unshuffle(&shuffled, item_size), bytes);
    }

    #[test]
    fn base64_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let buf = ByteBuffer::from_slice(&bytes);
        let encoded = buf.base64_encode();
        prop_assert_eq!(encoded.len() % 4, 0);
        prop_assert_eq!(ByteBuffer::base64_decode(&encoded).as_slice(), bytes.as_slice());
    }

    #[test]
    fn base16_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let buf = ByteBuffer::from_slice(&bytes);
        let encoded = buf.base16_encode();
        prop_assert_eq!(encoded.len(), bytes.len() * 2);
        prop_assert_eq!(ByteBuffer::base16_decode(&encoded).as_slice(), bytes.as_slice());
    }

    #[test]
    fn zlib_codec_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..8192)) {
        let (compressed, subblocks) = Codec::Zlib.compress(&bytes, -1).unwrap();
        let restored = Codec::Zlib
            .decompress(&compressed, bytes.len() as u64, subblocks.as_deref())
            .unwrap();
        prop_assert_eq!(restored, bytes);
    }

    #[test]
    fn lz4_codec_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..8192)) {
        let (compressed, subblocks) = Codec::Lz4.compress(&bytes, -1).unwrap();
        let restored = Codec::Lz4
            .decompress(&compressed, bytes.len() as u64, subblocks.as_deref())
            .unwrap();
        prop_assert_eq!(restored, bytes);
    }
}
