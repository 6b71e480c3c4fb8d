// crates/gsnap_core/src/consts.rs

/// Particle species slots carried by every header.
pub const NSPECIES: usize = 6;

/// Block names are always stored as exactly four bytes, space padded.
pub const NAME_LEN: usize = 4;

/// Payload of the block-name wrapper: name[4] + size of the next record[4].
pub const WRAPPER_BYTES: u32 = 8;

/// Bytes of size marker on each side of a record.
pub const MARKER_BYTES: u32 = 4;

pub const HEADER_BYTES: u32 = 256;
pub const HEADER_NAME: &[u8; NAME_LEN] = b"HEAD";
pub const HEADER_RESERVED1: usize = 24;
pub const HEADER_RESERVED2: usize = 136;

const _: () = {
    // npart[6] u32 + mass[6] f64 + rsv1 + npart_total[6] u32 + rsv2
    let layout = NSPECIES * 4 + NSPECIES * 8 + HEADER_RESERVED1 + NSPECIES * 4 + HEADER_RESERVED2;
    assert!(layout == HEADER_BYTES as usize);
};

/// On-disk record layout.
///
/// `Type1` files hold bare size-framed records; `Type2` files precede every
/// record with a framed 8-byte marker naming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    Type1,
    #[default]
    Type2,
}

impl Framing {
    #[inline]
    pub fn has_wrapper(self) -> bool {
        matches!(self, Framing::Type2)
    }
}

/// Meaning of the four blocks every snapshot file carries after its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockRole {
    Positions,
    Velocities,
    Ids,
    Masses,
}

/// File order of the mandatory blocks.
pub const MANDATORY_BLOCKS: [BlockRole; 4] = [
    BlockRole::Positions,
    BlockRole::Velocities,
    BlockRole::Ids,
    BlockRole::Masses,
];

impl BlockRole {
    /// Stored four-byte name.
    pub fn canonical_name(self) -> &'static [u8; NAME_LEN] {
        match self {
            BlockRole::Positions => b"POS ",
            BlockRole::Velocities => b"VEL ",
            BlockRole::Ids => b"ID  ",
            BlockRole::Masses => b"MASS",
        }
    }

    /// Name used for lookups (canonical name without padding).
    pub fn lookup_name(self) -> &'static str {
        match self {
            BlockRole::Positions => "POS",
            BlockRole::Velocities => "VEL",
            BlockRole::Ids => "ID",
            BlockRole::Masses => "MASS",
        }
    }

    pub fn from_position(index: usize) -> Option<Self> {
        MANDATORY_BLOCKS.get(index).copied()
    }
}
