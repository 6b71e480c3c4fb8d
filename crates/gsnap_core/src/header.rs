//! Snapshot header record.
//!
//! Payload (LE, 256 bytes):
//!   npart[6]       u32  particles of each species in this file
//!   mass[6]        f64  per-species mass (0 = per-particle masses in MASS)
//!   rsv1[24]           opaque
//!   npart_total[6] u32  particles of each species in the whole simulation
//!   rsv2[136]          opaque

use crate::consts::{Framing, HEADER_BYTES, HEADER_NAME, HEADER_RESERVED1, HEADER_RESERVED2, NAME_LEN, NSPECIES};
use crate::errors::{Result, SnapError, Stage};
use crate::record::{check_announced, read_record, read_wrapper, write_record, write_wrapper};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    name: [u8; NAME_LEN],
    npart: [u32; NSPECIES],
    mass: [f64; NSPECIES],
    reserved1: [u8; HEADER_RESERVED1],
    npart_total: [u32; NSPECIES],
    reserved2: [u8; HEADER_RESERVED2],
}

impl Default for Header {
    fn default() -> Self {
        Self {
            name: *HEADER_NAME,
            npart: [0; NSPECIES],
            mass: [0.0; NSPECIES],
            reserved1: [0; HEADER_RESERVED1],
            npart_total: [0; NSPECIES],
            reserved2: [0; HEADER_RESERVED2],
        }
    }
}

impl Header {
    /// Header for a single-file snapshot: totals equal the per-file counts.
    pub fn new(npart: [u32; NSPECIES], mass: [f64; NSPECIES]) -> Self {
        Self { npart, mass, npart_total: npart, ..Self::default() }
    }

    pub fn decode<R: Read>(r: &mut R, framing: Framing) -> Result<Self> {
        let name = if framing.has_wrapper() {
            let (name, next) = read_wrapper(r, Stage::Header)?;
            check_announced(Stage::Header, &name, next, HEADER_BYTES);
            name
        } else {
            *HEADER_NAME
        };

        let (size, payload) = read_record(r, Stage::Header)?;
        if size != HEADER_BYTES {
            return Err(SnapError::HeaderSize(size));
        }

        let mut c = Cursor::new(payload.as_slice());
        let mut h = Header { name, ..Self::default() };
        c.read_u32_into::<LE>(&mut h.npart)?;
        c.read_f64_into::<LE>(&mut h.mass)?;
        c.read_exact(&mut h.reserved1)?;
        c.read_u32_into::<LE>(&mut h.npart_total)?;
        c.read_exact(&mut h.reserved2)?;
        tracing::debug!(npart = ?h.npart, mass = ?h.mass, "header decoded");
        Ok(h)
    }

    pub fn encode<W: Write>(&self, w: &mut W, framing: Framing) -> Result<()> {
        let payload = self.payload()?;
        if framing.has_wrapper() {
            write_wrapper(w, &self.name, payload.len())?;
        }
        write_record(w, &payload)
    }

    fn payload(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_BYTES as usize);
        for n in self.npart { buf.write_u32::<LE>(n)?; }
        for m in self.mass { buf.write_f64::<LE>(m)?; }
        buf.extend_from_slice(&self.reserved1);
        for n in self.npart_total { buf.write_u32::<LE>(n)?; }
        buf.extend_from_slice(&self.reserved2);
        debug_assert_eq!(buf.len(), HEADER_BYTES as usize);
        Ok(buf)
    }

    /// Wrapper name (type-2 files), conventionally `HEAD`.
    pub fn name(&self) -> &[u8; NAME_LEN] { &self.name }

    pub fn particle_counts(&self) -> [u32; NSPECIES] { self.npart }

    pub fn total_particle_counts(&self) -> [u32; NSPECIES] { self.npart_total }

    pub fn masses(&self) -> [f64; NSPECIES] { self.mass }

    pub fn mass(&self, species: usize) -> Option<f64> { self.mass.get(species).copied() }

    pub fn reserved(&self) -> (&[u8; HEADER_RESERVED1], &[u8; HEADER_RESERVED2]) {
        (&self.reserved1, &self.reserved2)
    }

    /// Simulation-wide particle count of the species whose mass is stored
    /// per particle (header mass of zero).
    pub fn total_particle_counts_with_zero_mass(&self) -> u64 {
        self.mass
            .iter()
            .zip(self.npart_total)
            .filter(|(m, _)| **m == 0.0)
            .map(|(_, n)| u64::from(n))
            .sum()
    }

    /// Fold species `from` into species `into`: counts and totals are added,
    /// `into` takes over `from`'s mass, and `from` is emptied.
    pub fn merge_species(&mut self, into: usize, from: usize) -> Result<()> {
        if into >= NSPECIES || from >= NSPECIES || into == from {
            return Err(SnapError::InvalidInput(format!(
                "cannot merge species {from} into {into}"
            )));
        }
        if self.npart[into] > 0 && self.npart[from] > 0 && self.mass[into] != self.mass[from] {
            tracing::warn!(
                into,
                from,
                mass_into = self.mass[into],
                mass_from = self.mass[from],
                "merging populated species with different header masses"
            );
        }
        let overflow = || SnapError::InvalidInput(format!("merging species {from} into {into} overflows a u32 count"));
        let npart = self.npart[into].checked_add(self.npart[from]).ok_or_else(overflow)?;
        let npart_total = self.npart_total[into].checked_add(self.npart_total[from]).ok_or_else(overflow)?;
        self.npart[into] = npart;
        self.npart_total[into] = npart_total;
        self.mass[into] = self.mass[from];
        self.npart[from] = 0;
        self.npart_total[from] = 0;
        self.mass[from] = 0.0;
        Ok(())
    }

    /// Zero every header mass so all species read masses from a MASS block.
    pub fn clear_masses(&mut self) {
        self.mass = [0.0; NSPECIES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        let mut h = Header::new([10, 20, 0, 0, 5, 0], [0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        h.npart_total = [100, 200, 0, 0, 50, 0];
        h.reserved1[3] = 0xaa;
        h.reserved2[135] = 0x55;
        h
    }

    #[test]
    fn roundtrip_both_framings() {
        let h = sample();
        for framing in [Framing::Type1, Framing::Type2] {
            let mut buf = Vec::new();
            h.encode(&mut buf, framing).unwrap();
            let expected = if framing.has_wrapper() { 16 + 264 } else { 264 };
            assert_eq!(buf.len(), expected);
            let back = Header::decode(&mut buf.as_slice(), framing).unwrap();
            assert_eq!(back, h);
        }
    }

    #[test]
    fn type2_layout() {
        let mut buf = Vec::new();
        sample().encode(&mut buf, Framing::Type2).unwrap();
        assert_eq!(&buf[0..4], &8u32.to_le_bytes());
        assert_eq!(&buf[4..8], b"HEAD");
        assert_eq!(&buf[8..12], &264u32.to_le_bytes());
        assert_eq!(&buf[12..16], &8u32.to_le_bytes());
        assert_eq!(&buf[16..20], &256u32.to_le_bytes());
        assert_eq!(&buf[buf.len() - 4..], &256u32.to_le_bytes());
        // npart[1]
        assert_eq!(&buf[24..28], &20u32.to_le_bytes());
    }

    #[test]
    fn wrong_payload_size_is_rejected() {
        let mut buf = Vec::new();
        write_record(&mut buf, &[0u8; 200]).unwrap();
        let err = Header::decode(&mut buf.as_slice(), Framing::Type1).unwrap_err();
        assert!(matches!(err, SnapError::HeaderSize(200)));
    }

    #[test]
    fn mismatched_trailer_is_rejected() {
        let mut buf = Vec::new();
        sample().encode(&mut buf, Framing::Type2).unwrap();
        let n = buf.len();
        buf[n - 4..].copy_from_slice(&255u32.to_le_bytes());
        let err = Header::decode(&mut buf.as_slice(), Framing::Type2).unwrap_err();
        assert!(matches!(err, SnapError::SizeMismatch { stage: Stage::Header, .. }));
    }

    #[test]
    fn bad_wrapper_is_rejected() {
        let mut buf = Vec::new();
        sample().encode(&mut buf, Framing::Type2).unwrap();
        buf[0..4].copy_from_slice(&12u32.to_le_bytes());
        let err = Header::decode(&mut buf.as_slice(), Framing::Type2).unwrap_err();
        assert!(matches!(err, SnapError::BadWrapper { stage: Stage::Header, found: 12 }));
    }

    #[test]
    fn zero_mass_totals() {
        let h = sample();
        // species 1 has a header mass
        assert_eq!(h.total_particle_counts_with_zero_mass(), 150);

        let mut h = h;
        h.clear_masses();
        assert_eq!(h.masses(), [0.0; NSPECIES]);
        assert_eq!(h.total_particle_counts_with_zero_mass(), 350);
    }

    #[test]
    fn clear_masses_counts_every_species() {
        let mut h = Header::new([1, 2, 3, 4, 5, 6], [1.0; NSPECIES]);
        assert_eq!(h.total_particle_counts_with_zero_mass(), 0);
        h.clear_masses();
        assert_eq!(h.total_particle_counts_with_zero_mass(), 21);
    }

    #[test]
    fn merge_first_two_species() {
        let mut h = Header::new([10, 20, 0, 0, 0, 0], [0.0, 0.25, 0.0, 0.0, 0.0, 0.0]);
        h.merge_species(0, 1).unwrap();
        assert_eq!(h.particle_counts(), [30, 0, 0, 0, 0, 0]);
        assert_eq!(h.total_particle_counts(), [30, 0, 0, 0, 0, 0]);
        assert_eq!(h.mass(0), Some(0.25));
        assert_eq!(h.mass(1), Some(0.0));
    }

    #[test]
    fn merge_rejects_bad_indices() {
        let mut h = sample();
        assert!(h.merge_species(0, 0).is_err());
        assert!(h.merge_species(0, NSPECIES).is_err());
        assert_eq!(h, sample());
    }

    #[test]
    fn merge_overflow_leaves_header_untouched() {
        let mut h = Header::new([u32::MAX, 1, 0, 0, 0, 0], [0.0; NSPECIES]);
        let before = h.clone();
        let err = h.merge_species(0, 1).unwrap_err();
        assert!(matches!(err, SnapError::InvalidInput(_)));
        assert_eq!(h, before);

        let mut h = Header::new([1, 1, 0, 0, 0, 0], [0.0; NSPECIES]);
        h.npart_total = [u32::MAX, 1, 0, 0, 0, 0];
        assert!(h.merge_species(0, 1).is_err());
        assert_eq!(h.particle_counts(), [1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn mass_out_of_range() {
        assert_eq!(sample().mass(1), Some(0.5));
        assert_eq!(sample().mass(6), None);
    }
}
