//! C64 Memory Image
//!
//! A flat 64 KiB byte space with up to three register-mapped SID windows.
//! The image itself is dumb storage: it answers "does this address fall in a
//! chip window?" and leaves the actual register routing to the owning
//! emulation session, which also holds the chip instances.

/// Size of the emulated address space
pub const MEMORY_SIZE: usize = 0x10000;

/// Number of bytes covered by one chip register window
pub const CHIP_WINDOW_SIZE: u16 = 0x20;

/// Maximum number of SID chips a tune can address
pub const MAX_CHIPS: usize = 3;

/// 64 KiB memory image with register-mapped chip windows
pub struct MemoryImage {
    bytes: Box<[u8; MEMORY_SIZE]>,
    windows: [Option<u16>; MAX_CHIPS],
}

impl MemoryImage {
    /// Create a zero-filled image with no chip windows registered
    pub fn new() -> Self {
        MemoryImage {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice().try_into().unwrap(),
            windows: [None; MAX_CHIPS],
        }
    }

    /// Clear all 64 KiB back to zero; window registrations survive
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Register the 32-byte window for chip `index` at `base`.
    ///
    /// Windows are expected to be disjoint; the loader validates extra chip
    /// base addresses before they get here.
    pub fn register_window(&mut self, index: usize, base: u16) {
        self.windows[index] = Some(base);
    }

    /// Drop every chip window registration
    pub fn clear_windows(&mut self) {
        self.windows = [None; MAX_CHIPS];
    }

    /// Map an address to `(chip index, register index)` if it falls inside a
    /// registered window
    pub fn window_at(&self, addr: u16) -> Option<(usize, u8)> {
        for (chip, base) in self.windows.iter().enumerate() {
            if let Some(base) = *base {
                if addr >= base && addr < base + CHIP_WINDOW_SIZE {
                    return Some((chip, (addr & 0x1f) as u8));
                }
            }
        }
        None
    }

    /// Plain byte read
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    /// Little-endian 16-bit read (vectors)
    #[inline]
    pub fn read_word(&self, addr: u16) -> u16 {
        self.read(addr) as u16 | ((self.read(addr.wrapping_add(1)) as u16) << 8)
    }

    /// Plain byte write, ignoring any window mapping
    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    /// Copy a tune payload into memory starting at `addr`, wrapping at the
    /// top of the address space the way a real load would
    pub fn load_payload(&mut self, addr: u16, payload: &[u8]) {
        let mut dest = addr;
        for &byte in payload {
            self.bytes[dest as usize] = byte;
            dest = dest.wrapping_add(1);
        }
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_routing() {
        let mut mem = MemoryImage::new();
        mem.register_window(0, 0xd400);
        mem.register_window(1, 0xd420);

        assert_eq!(mem.window_at(0xd400), Some((0, 0x00)));
        assert_eq!(mem.window_at(0xd418), Some((0, 0x18)));
        assert_eq!(mem.window_at(0xd41f), Some((0, 0x1f)));
        assert_eq!(mem.window_at(0xd420), Some((1, 0x00)));
        assert_eq!(mem.window_at(0xd43f), Some((1, 0x1f)));
        assert_eq!(mem.window_at(0xd440), None);
        assert_eq!(mem.window_at(0x1000), None);
    }

    #[test]
    fn test_payload_copy_and_wrap() {
        let mut mem = MemoryImage::new();
        mem.load_payload(0xfffe, &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(mem.read(0xfffe), 0xaa);
        assert_eq!(mem.read(0xffff), 0xbb);
        assert_eq!(mem.read(0x0000), 0xcc);
        assert_eq!(mem.read(0x0001), 0xdd);
    }

    #[test]
    fn test_read_word_little_endian() {
        let mut mem = MemoryImage::new();
        mem.write(0xfffc, 0x00);
        mem.write(0xfffd, 0x10);
        assert_eq!(mem.read_word(0xfffc), 0x1000);
    }

    #[test]
    fn test_clear_keeps_windows() {
        let mut mem = MemoryImage::new();
        mem.register_window(0, 0xd400);
        mem.write(0x1234, 0x42);
        mem.clear();
        assert_eq!(mem.read(0x1234), 0);
        assert_eq!(mem.window_at(0xd401), Some((0, 0x01)));
    }
}
