//! Whole snapshot files: one header followed by blocks.
//!
//! Files are read as header + the four mandatory blocks (positions,
//! velocities, ids, masses) and written as header + every stored block, in
//! one framing for the whole file.

use crate::block::Block;
use crate::consts::{BlockRole, Framing, MANDATORY_BLOCKS, NSPECIES};
use crate::errors::{Result, SnapError};
use crate::header::Header;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let f = std::fs::OpenOptions::new().read(true).custom_flags(libc::O_DIRECTORY).open(dir)?;
    f.sync_all()
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> { Ok(()) }

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    header: Header,
    blocks: Vec<Block>,
}

/// Serializable overview of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub particle_counts: [u32; NSPECIES],
    pub total_particle_counts: [u32; NSPECIES],
    pub masses: [f64; NSPECIES],
    pub particles_with_block_mass: u64,
    pub blocks: Vec<BlockSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub name: String,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<BlockRole>,
}

impl Snapshot {
    pub fn new(header: Header) -> Self {
        Self { header, blocks: Vec::new() }
    }

    /// Read a type-2 snapshot file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_with(path, Framing::Type2)
    }

    pub fn read_with(path: impl AsRef<Path>, framing: Framing) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)?;
        let len = f.metadata()?.len();
        let mut r = BufReader::new(f);
        let snap = Self::decode_from(&mut r, framing)?;
        let pos = r.stream_position()?;
        if pos < len {
            tracing::debug!(path = %path.display(), unread = len - pos, "ignoring bytes after mandatory blocks");
        }
        tracing::info!(path = %path.display(), ?framing, blocks = snap.blocks.len(), "snapshot read");
        Ok(snap)
    }

    /// Decode header + mandatory blocks from any reader.
    pub fn decode_from<R: Read>(r: &mut R, framing: Framing) -> Result<Self> {
        let header = Header::decode(r, framing)?;
        let mut blocks = Vec::with_capacity(MANDATORY_BLOCKS.len());
        for role in MANDATORY_BLOCKS {
            let block = Block::decode(r, framing, role.lookup_name())?;
            if !block.name_matches(role.lookup_name()) {
                tracing::debug!(?role, name = %block.display_name(), "mandatory block has a non-canonical name");
            }
            blocks.push(block);
        }
        Ok(Self { header, blocks })
    }

    /// Write the header and every block, publishing the file atomically.
    pub fn write(&self, path: impl AsRef<Path>, framing: Framing) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new().prefix(".gsnap_").tempfile_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            self.encode_to(&mut w, framing)?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        let _ = fsync_dir(path);
        tracing::info!(path = %path.display(), ?framing, blocks = self.blocks.len(), "snapshot written");
        Ok(())
    }

    pub fn encode_to<W: Write>(&self, w: &mut W, framing: Framing) -> Result<()> {
        self.header.encode(w, framing)?;
        for b in &self.blocks {
            b.encode(w, framing)?;
        }
        Ok(())
    }

    pub fn header(&self) -> &Header { &self.header }

    pub fn header_mut(&mut self) -> &mut Header { &mut self.header }

    pub fn blocks(&self) -> &[Block] { &self.blocks }

    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn append_block(&mut self, name: &str, values: &[f32]) {
        self.blocks.push(Block::from_float_sequence(name, values));
    }

    pub fn find_block(&self, name: &str) -> Result<&Block> {
        self.blocks
            .iter()
            .find(|b| b.name_matches(name))
            .ok_or_else(|| SnapError::BlockNotFound(name.to_string()))
    }

    pub fn block_for_role(&self, role: BlockRole) -> Result<&Block> {
        self.find_block(role.lookup_name())
    }

    /// Flat xyz positions from the POS block.
    pub fn positions(&self) -> Result<Vec<f32>> {
        self.block_for_role(BlockRole::Positions)?.as_float_sequence()
    }

    /// Per-particle masses from the MASS block.
    pub fn masses(&self) -> Result<Vec<f32>> {
        self.block_for_role(BlockRole::Masses)?.as_float_sequence()
    }

    /// Remove and return the first block named `name`.
    pub fn remove_block(&mut self, name: &str) -> Result<Block> {
        let idx = self
            .blocks
            .iter()
            .position(|b| b.name_matches(name))
            .ok_or_else(|| SnapError::BlockNotFound(name.to_string()))?;
        Ok(self.blocks.remove(idx))
    }

    pub fn particle_counts(&self) -> [u32; NSPECIES] { self.header.particle_counts() }

    pub fn total_particle_counts_with_zero_mass(&self) -> u64 {
        self.header.total_particle_counts_with_zero_mass()
    }

    pub fn mass(&self, species: usize) -> Option<f64> { self.header.mass(species) }

    pub fn merge_species(&mut self, into: usize, from: usize) -> Result<()> {
        self.header.merge_species(into, from)
    }

    pub fn clear_masses(&mut self) { self.header.clear_masses() }

    pub fn summary(&self) -> SnapshotSummary {
        let blocks = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| BlockSummary {
                name: b.display_name(),
                bytes: b.len_bytes(),
                role: BlockRole::from_position(i).filter(|r| b.name_matches(r.lookup_name())),
            })
            .collect();
        SnapshotSummary {
            particle_counts: self.header.particle_counts(),
            total_particle_counts: self.header.total_particle_counts(),
            masses: self.header.masses(),
            particles_with_block_mass: self.header.total_particle_counts_with_zero_mass(),
            blocks,
        }
    }
}
