//! PSID/RSID Header Parser
//!
//! Binary parser for the big-endian PSID/RSID header, versions 1 through 4,
//! including the historical quirks: the embedded load address, the v1 speed
//! word, relocation range validation and the v3/v4 extra chip base bytes.
//! Out-of-range fields are silently corrected and logged rather than
//! rejected; only a header that cannot be interpreted at all is an error.

use bitflags::bitflags;

use super::{ChipModel, Clock, Compatibility, Tune, TuneInfo, MAX_SONGS};
use crate::{Result, SidError};

/// Minimum bytes needed to read the fixed fields
const MIN_HEADER_LEN: usize = 0x48;
/// Full v2+ header length
const V2_HEADER_LEN: usize = 0x7c;

bitflags! {
    /// The v2+ `flags` word
    #[derive(Debug, Clone, Copy)]
    struct HeaderFlags: u16 {
        /// Payload is a Compute! MUS blob (unsupported, informational)
        const MUS_PLAYER = 0x0001;
        /// PSID: needs PSID-specific behaviour; RSID: started through BASIC
        const PSID_SPECIFIC_OR_BASIC = 0x0002;
        const CLOCK_PAL = 0x0004;
        const CLOCK_NTSC = 0x0008;
    }
}

#[inline]
fn read_be16(data: &[u8], offset: usize) -> u16 {
    ((data[offset] as u16) << 8) | data[offset + 1] as u16
}

#[inline]
fn read_be32(data: &[u8], offset: usize) -> u32 {
    ((read_be16(data, offset) as u32) << 16) | read_be16(data, offset + 2) as u32
}

/// Read an up-to-32-byte NUL-terminated Latin-1 string, tolerating headers
/// shorter than the nominal field end
fn read_string(data: &[u8], offset: usize) -> String {
    let end = (offset + 32).min(data.len());
    data[offset..end]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

fn model_from_bits(bits: u16) -> ChipModel {
    match bits & 0x3 {
        0x1 => ChipModel::Mos6581,
        0x2 => ChipModel::Mos8580,
        0x3 => ChipModel::Any,
        _ => ChipModel::Unknown,
    }
}

/// Validate a v3/v4 extra chip base byte and resolve it to an address.
/// Invalid bases disable the chip rather than failing the whole file.
fn resolve_chip_base(base: u8, label: &str) -> Option<u16> {
    if base == 0 {
        return None;
    }
    if base & 1 != 0 || base <= 0x41 || (0x80..=0xdf).contains(&base) {
        log::warn!("ignoring invalid {label} chip base {base:#04x}");
        return None;
    }
    Some(0xd000 | ((base as u16) << 4))
}

/// Zero out a relocation range that collides with ROM, I/O, the zero page
/// area or the load image
fn check_reloc(start_page: &mut u8, pages: &mut u8, load_addr: u16, payload_len: usize) {
    if *start_page == 0xff {
        *pages = 0;
        return;
    }
    if *pages == 0 {
        *start_page = 0;
        return;
    }
    let startp = *start_page as u32;
    let endp = startp + *pages as u32 - 1;
    let load_start = (load_addr >> 8) as u32;
    let load_end = if payload_len == 0 {
        load_start
    } else {
        ((load_addr as u32 + payload_len as u32 - 1) >> 8) & 0xff
    };

    let touches = |lo: u32, hi: u32| startp <= hi && endp >= lo;
    if endp > 0xff
        || touches(0x00, 0x03)
        || touches(0xa0, 0xbf)
        || touches(0xd0, 0xff)
        || touches(load_start, load_end)
    {
        log::warn!(
            "relocation range {startp:#04x}..{endp:#04x} collides with ROM, I/O or the load image"
        );
        *start_page = 0;
        *pages = 0;
    }
}

/// Parse a complete PSID/RSID file image into metadata and payload
pub fn parse(data: &[u8]) -> Result<Tune> {
    if data.len() < MIN_HEADER_LEN {
        return Err(SidError::MalformedHeader(format!(
            "file too short: {} bytes",
            data.len()
        )));
    }

    let rsid = match &data[0..4] {
        b"PSID" => false,
        b"RSID" => true,
        magic => {
            return Err(SidError::MalformedHeader(format!(
                "unknown magic {:02x?}",
                magic
            )))
        }
    };

    let mut version = read_be16(data, 4);
    if version == 0 {
        log::warn!("header declares version 0, treating as version 1");
        version = 1;
    }
    if version > 4 {
        log::warn!("header declares version {version}, reading the version 4 subset");
        version = 4;
    }
    if version >= 2 && data.len() < V2_HEADER_LEN {
        return Err(SidError::MalformedHeader(format!(
            "version {} header truncated at {} bytes",
            version,
            data.len()
        )));
    }

    let data_offset = read_be16(data, 6) as usize;
    let mut load_addr = read_be16(data, 8);
    let mut init_addr = read_be16(data, 10);
    let mut play_addr = read_be16(data, 12);
    let mut songs = read_be16(data, 14);
    let mut start_song = read_be16(data, 16);
    let mut speed = read_be32(data, 18);

    let name = read_string(data, 22);
    let author = read_string(data, 54);
    let released = read_string(data, 86);

    let flags = if version >= 2 {
        HeaderFlags::from_bits_retain(read_be16(data, 118))
    } else {
        HeaderFlags::empty()
    };

    let compatibility = if rsid {
        if flags.contains(HeaderFlags::PSID_SPECIFIC_OR_BASIC) {
            Compatibility::RequiresBasic
        } else {
            Compatibility::RealMachineOnly
        }
    } else if version == 1 || flags.contains(HeaderFlags::PSID_SPECIFIC_OR_BASIC) {
        Compatibility::FormatSpecific
    } else {
        Compatibility::Generic
    };

    if data_offset > data.len() {
        return Err(SidError::MalformedHeader(format!(
            "data offset {data_offset:#06x} past end of file"
        )));
    }
    let mut payload = &data[data_offset..];

    // A zero load field means the payload carries its own load address,
    // little-endian, as a program file would
    let mut load_addr_embedded = false;
    if load_addr == 0 {
        if payload.len() < 2 {
            return Err(SidError::MalformedHeader(
                "zero load address but no embedded address in payload".into(),
            ));
        }
        load_addr = payload[0] as u16 | ((payload[1] as u16) << 8);
        payload = &payload[2..];
        load_addr_embedded = true;
    }

    if compatibility == Compatibility::RequiresBasic {
        if init_addr != 0 {
            return Err(SidError::MalformedHeader(format!(
                "BASIC tune carries an init address {init_addr:#06x}"
            )));
        }
    } else if init_addr == 0 {
        init_addr = load_addr;
    }

    if play_addr == 0xffff {
        log::debug!("play address 0xFFFF normalized to 0");
        play_addr = 0;
    }

    if songs == 0 {
        songs = 1;
    }
    if songs > MAX_SONGS {
        log::warn!("header declares {songs} songs, clamping to {MAX_SONGS}");
        songs = MAX_SONGS;
    }
    if start_song == 0 || start_song > songs {
        log::warn!("start song {start_song} out of range, falling back to song 1");
        start_song = 1;
    }

    // RSID tunes always run from the CIA interrupt
    if rsid {
        speed = !0;
    }

    let clock = if version >= 2 {
        match (
            flags.contains(HeaderFlags::CLOCK_PAL),
            flags.contains(HeaderFlags::CLOCK_NTSC),
        ) {
            (true, true) => Clock::Any,
            (true, false) => Clock::Pal,
            (false, true) => Clock::Ntsc,
            (false, false) => Clock::Unknown,
        }
    } else {
        Clock::Unknown
    };

    let raw_flags = flags.bits();
    let models = [
        if version >= 2 {
            model_from_bits(raw_flags >> 4)
        } else {
            ChipModel::Unknown
        },
        if version >= 3 {
            model_from_bits(raw_flags >> 6)
        } else {
            ChipModel::Unknown
        },
        if version >= 4 {
            model_from_bits(raw_flags >> 8)
        } else {
            ChipModel::Unknown
        },
    ];

    let (mut reloc_start_page, mut reloc_pages) = if version >= 2 {
        (data[120], data[121])
    } else {
        (0, 0)
    };
    check_reloc(&mut reloc_start_page, &mut reloc_pages, load_addr, payload.len());

    let chip2_addr = if version >= 3 {
        resolve_chip_base(data[122], "second")
    } else {
        None
    };
    let chip3_addr = if version >= 4 {
        let addr = resolve_chip_base(data[123], "third");
        if addr.is_some() && addr == chip2_addr {
            log::warn!("third chip base duplicates the second, ignoring it");
            None
        } else {
            addr
        }
    } else {
        None
    };

    Ok(Tune {
        info: TuneInfo {
            version,
            load_addr,
            init_addr,
            play_addr,
            songs,
            start_song,
            name,
            author,
            released,
            clock,
            models,
            compatibility,
            chip2_addr,
            chip3_addr,
            reloc_start_page,
            reloc_pages,
            load_addr_embedded,
            speed,
        },
        payload: payload.to_vec(),
    })
}
