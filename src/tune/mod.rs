//! PSID/RSID Tune Files
//!
//! Descriptor types for tune metadata plus the binary header parser in
//! [`psid`]. A parsed [`Tune`] pairs the normalized [`TuneInfo`] with the
//! raw C64 program payload ready to be installed into emulated memory.

pub mod psid;

use serde::Serialize;

/// Hard ceiling on the number of songs a file can declare
pub const MAX_SONGS: u16 = 256;

/// Video clock the tune was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Clock {
    /// Not declared by the file
    Unknown,
    /// PAL (50 Hz frame, 985249 Hz CPU)
    Pal,
    /// NTSC (60 Hz frame, 1022727 Hz CPU)
    Ntsc,
    /// Plays on either
    Any,
}

/// SID chip revision a tune was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChipModel {
    /// Not declared by the file
    Unknown,
    /// Original 6581
    Mos6581,
    /// Later 8580
    Mos8580,
    /// Either model
    Any,
}

/// How faithful an environment the tune needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compatibility {
    /// Plays anywhere
    Generic,
    /// Relies on PSID-specific player behaviour
    FormatSpecific,
    /// RSID: assumes a fully initialized real machine
    RealMachineOnly,
    /// RSID with the BASIC flag: started through the BASIC interpreter
    RequiresBasic,
}

/// Per-song frame pacing source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SongTiming {
    /// Vertical blank interrupt (50/60 Hz)
    VerticalBlank,
    /// CIA 1 Timer A reload value
    CiaTimerA,
}

/// Normalized tune metadata
#[derive(Debug, Clone, Serialize)]
pub struct TuneInfo {
    /// Format version (1..=4 after normalization)
    pub version: u16,
    /// Address the payload loads at
    pub load_addr: u16,
    /// Init routine entry point
    pub init_addr: u16,
    /// Play routine entry point; 0 means "read the interrupt vector"
    pub play_addr: u16,
    /// Number of songs (1..=[`MAX_SONGS`])
    pub songs: u16,
    /// Default song, 1-based
    pub start_song: u16,
    /// Tune title
    pub name: String,
    /// Author credit
    pub author: String,
    /// Release/copyright line
    pub released: String,
    /// Declared video clock
    pub clock: Clock,
    /// Declared chip model per mapped chip
    pub models: [ChipModel; 3],
    /// Environment requirements
    pub compatibility: Compatibility,
    /// Second chip register base, already resolved to an address
    pub chip2_addr: Option<u16>,
    /// Third chip register base, already resolved to an address
    pub chip3_addr: Option<u16>,
    /// First free page for driver relocation (0 = anywhere, 0xFF = none)
    pub reloc_start_page: u8,
    /// Number of free pages for driver relocation
    pub reloc_pages: u8,
    /// The load address came from the payload's first two bytes
    pub load_addr_embedded: bool,
    /// Raw per-song speed bits (bit set = CIA timer pacing)
    #[serde(skip)]
    pub speed: u32,
}

impl TuneInfo {
    /// Pacing source for `song` (1-based). Songs past 32 share bit 31.
    pub fn song_timing(&self, song: u16) -> SongTiming {
        let index = song.saturating_sub(1).min(31);
        if self.speed & (1u32 << index) != 0 {
            SongTiming::CiaTimerA
        } else {
            SongTiming::VerticalBlank
        }
    }
}

/// A parsed tune: metadata plus the program payload
#[derive(Debug, Clone)]
pub struct Tune {
    /// Normalized metadata
    pub info: TuneInfo,
    /// C64 program bytes, load address already stripped if it was embedded
    pub payload: Vec<u8>,
}

impl Tune {
    /// Parse a PSID/RSID file image
    pub fn parse(data: &[u8]) -> crate::Result<Tune> {
        psid::parse(data)
    }
}
