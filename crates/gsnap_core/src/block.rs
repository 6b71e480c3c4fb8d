//! Named data block: a four-byte name and a raw payload, usually a flat
//! array of little-endian f32.

use crate::consts::{Framing, NAME_LEN};
use crate::errors::{Result, SnapError, Stage};
use crate::record::{check_announced, read_record, read_wrapper, write_record, write_wrapper};
use byteorder::{ByteOrder, LittleEndian as LE};
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    name: [u8; NAME_LEN],
    data: Vec<u8>,
}

/// Pad or truncate `name` to exactly four bytes.
pub fn pad_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [b' '; NAME_LEN];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    out
}

impl Block {
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        Self { name: pad_name(name), data }
    }

    /// Read one block. Bare (type-1) blocks carry no name on disk and get
    /// `bare_name` instead.
    pub fn decode<R: Read>(r: &mut R, framing: Framing, bare_name: &str) -> Result<Self> {
        let wrapped = if framing.has_wrapper() {
            Some(read_wrapper(r, Stage::Block)?)
        } else {
            None
        };
        let (size, data) = read_record(r, Stage::Block)?;
        let name = match wrapped {
            Some((name, next)) => {
                check_announced(Stage::Block, &name, next, size);
                name
            }
            None => pad_name(bare_name),
        };
        tracing::debug!(name = %String::from_utf8_lossy(&name), size, "block decoded");
        Ok(Self { name, data })
    }

    pub fn encode<W: Write>(&self, w: &mut W, framing: Framing) -> Result<()> {
        if framing.has_wrapper() {
            write_wrapper(w, &self.name, self.data.len())?;
        }
        write_record(w, &self.data)
    }

    pub fn from_float_sequence(name: &str, values: &[f32]) -> Self {
        let mut data = vec![0u8; values.len() * 4];
        LE::write_f32_into(values, &mut data);
        Self::new(name, data)
    }

    /// Payload as consecutive little-endian f32.
    pub fn as_float_sequence(&self) -> Result<Vec<f32>> {
        if self.data.len() % 4 != 0 {
            return Err(SnapError::Misaligned { name: self.display_name(), len: self.data.len() });
        }
        let mut out = vec![0f32; self.data.len() / 4];
        LE::read_f32_into(&self.data, &mut out);
        Ok(out)
    }

    /// `candidate` matches when it equals the stored name, or is a prefix of
    /// it followed only by spaces or NULs.
    pub fn name_matches(&self, candidate: &str) -> bool {
        let c = candidate.as_bytes();
        if c.len() > NAME_LEN {
            return false;
        }
        self.name[..c.len()] == *c && self.name[c.len()..].iter().all(|&b| b == b' ' || b == 0)
    }

    pub fn name(&self) -> &[u8; NAME_LEN] { &self.name }

    /// Name without padding, for messages and summaries.
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn len_bytes(&self) -> usize { self.data.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_padding_and_truncation() {
        assert_eq!(pad_name("POS"), *b"POS ");
        assert_eq!(pad_name("ID"), *b"ID  ");
        assert_eq!(pad_name("MASSES"), *b"MASS");
        assert_eq!(pad_name(""), *b"    ");
    }

    #[test]
    fn name_matching() {
        let b = Block::from_float_sequence("POS", &[]);
        assert!(b.name_matches("POS"));
        assert!(b.name_matches("POS "));
        assert!(!b.name_matches("POSX"));
        assert!(!b.name_matches("VEL"));
        assert!(!b.name_matches("PO"));
        assert!(!b.name_matches("POS  "));

        let nul = Block { name: *b"ID\0\0", data: vec![] };
        assert!(nul.name_matches("ID"));
        assert_eq!(nul.display_name(), "ID");
    }

    #[test]
    fn float_sequences() {
        for values in [vec![], vec![1.5f32], vec![0.0, -2.25, 1e-7, f32::MAX, 3.0, -0.0]] {
            let b = Block::from_float_sequence("VEL", &values);
            assert_eq!(b.len_bytes(), values.len() * 4);
            let back = b.as_float_sequence().unwrap();
            assert_eq!(back.len(), values.len());
            for (a, e) in back.iter().zip(&values) {
                assert_eq!(a.to_bits(), e.to_bits());
            }
        }
    }

    #[test]
    fn floats_are_little_endian() {
        let b = Block::from_float_sequence("POS", &[1.0]);
        assert_eq!(b.data(), &1.0f32.to_le_bytes());
    }

    #[test]
    fn misaligned_payload() {
        let b = Block::new("ID", vec![1, 2, 3, 4, 5, 6]);
        let err = b.as_float_sequence().unwrap_err();
        assert!(matches!(err, SnapError::Misaligned { len: 6, .. }));
        assert!(err.is_format());
    }

    #[test]
    fn roundtrip_both_framings() {
        let b = Block::from_float_sequence("MASS", &[0.5, 0.25, 0.125]);
        for framing in [Framing::Type1, Framing::Type2] {
            let mut buf = Vec::new();
            b.encode(&mut buf, framing).unwrap();
            let back = Block::decode(&mut buf.as_slice(), framing, "MASS").unwrap();
            assert_eq!(back, b);
        }
    }

    #[test]
    fn type1_takes_supplied_name() {
        let b = Block::from_float_sequence("POS", &[1.0, 2.0, 3.0]);
        let mut buf = Vec::new();
        b.encode(&mut buf, Framing::Type1).unwrap();
        assert_eq!(buf.len(), 12 + 8);
        let back = Block::decode(&mut buf.as_slice(), Framing::Type1, "VEL").unwrap();
        assert!(back.name_matches("VEL"));
        assert_eq!(back.data(), b.data());
    }

    #[test]
    fn type2_wrapper_announces_record_size() {
        let b = Block::from_float_sequence("POS", &[1.0, 2.0, 3.0]);
        let mut buf = Vec::new();
        b.encode(&mut buf, Framing::Type2).unwrap();
        assert_eq!(&buf[4..8], b"POS ");
        assert_eq!(&buf[8..12], &20u32.to_le_bytes());
        assert_eq!(&buf[16..20], &12u32.to_le_bytes());
    }

    #[test]
    fn size_mismatch_at_either_level() {
        let b = Block::from_float_sequence("POS", &[1.0, 2.0]);
        let mut buf = Vec::new();
        b.encode(&mut buf, Framing::Type2).unwrap();

        let mut outer = buf.clone();
        outer[12..16].copy_from_slice(&9u32.to_le_bytes());
        let err = Block::decode(&mut outer.as_slice(), Framing::Type2, "").unwrap_err();
        assert!(matches!(err, SnapError::SizeMismatch { stage: Stage::Block, leading: 8, trailing: 9 }));

        let mut inner = buf;
        let n = inner.len();
        inner[n - 4..].copy_from_slice(&4u32.to_le_bytes());
        let err = Block::decode(&mut inner.as_slice(), Framing::Type2, "").unwrap_err();
        assert!(matches!(err, SnapError::SizeMismatch { stage: Stage::Block, leading: 8, trailing: 4 }));
    }

    #[test]
    fn clones_are_independent() {
        let a = Block::from_float_sequence("POS", &[1.0]);
        let mut b = a.clone();
        b.data[0] ^= 0xff;
        assert_ne!(a, b);
        assert_eq!(a.as_float_sequence().unwrap(), vec![1.0]);
    }
}
