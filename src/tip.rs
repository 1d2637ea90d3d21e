use crate::checksum::tip_checksum;
use crate::error::Error;
use crate::platform::Platform;
use crate::{Geometry, Record, Store};
use alloc::vec::Vec;
use core::fmt;
#[cfg(feature = "defmt")]
use defmt::trace;

/// Length of the fixed, null padded tip name.
pub const TIP_NAME_LEN: usize = 5;

/// Encoded size of a [`Tip`].
pub const TIP_SIZE: usize = 16;

const T200_OFFSET: usize = 0;
const T260_OFFSET: usize = 2;
const T330_OFFSET: usize = 4;
const T400_OFFSET: usize = 6;
const MASK_OFFSET: usize = 8;
const AMBIENT_OFFSET: usize = 9;
const NAME_OFFSET: usize = 10;
const CRC_OFFSET: usize = NAME_OFFSET + TIP_NAME_LEN;

const _: () = assert!(CRC_OFFSET + 1 == TIP_SIZE, "Tip layout must fill TIP_SIZE");

/// Bits of [`Tip::mask`].
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TipFlag {
    Active = 0x01,
    Calibrated = 0x02,
}

/// Calibration record of a soldering tip: the raw sensor readings at the four reference
/// temperatures (200, 260, 330 and 400 degrees), the ambient temperature during calibration and a
/// short name.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tip {
    pub t200: u16,
    pub t260: u16,
    pub t330: u16,
    pub t400: u16,
    pub mask: u8,
    pub ambient: i8,
    pub name: [u8; TIP_NAME_LEN],
    /// Maintained by [`Store::save_tip`], the value passed in is ignored.
    pub crc: u8,
}

impl Tip {
    /// Creates an active, calibrated tip with the ambient temperature left at 0.
    pub const fn new(name: [u8; TIP_NAME_LEN], reference: [u16; 4]) -> Self {
        Self {
            t200: reference[0],
            t260: reference[1],
            t330: reference[2],
            t400: reference[3],
            mask: TipFlag::Active as u8 | TipFlag::Calibrated as u8,
            ambient: 0,
            name,
            crc: 0,
        }
    }

    pub fn has(&self, flag: TipFlag) -> bool {
        self.mask & flag as u8 != 0
    }

    pub fn is_active(&self) -> bool {
        self.has(TipFlag::Active)
    }

    pub fn is_calibrated(&self) -> bool {
        self.has(TipFlag::Calibrated)
    }

    /// The known flags set in the mask, unknown bits are skipped.
    pub fn flags(&self) -> impl Iterator<Item = TipFlag> + '_ {
        (0..8)
            .filter_map(|bit| TipFlag::from_repr(1 << bit))
            .filter(|flag| self.has(*flag))
    }

    /// The name up to the first null byte, `None` if it is not valid UTF-8.
    pub fn name_str(&self) -> Option<&str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TIP_NAME_LEN);
        core::str::from_utf8(&self.name[..end]).ok()
    }

    pub fn encode(&self, slot: &mut [u8]) {
        slot[T200_OFFSET..T200_OFFSET + 2].copy_from_slice(&self.t200.to_le_bytes());
        slot[T260_OFFSET..T260_OFFSET + 2].copy_from_slice(&self.t260.to_le_bytes());
        slot[T330_OFFSET..T330_OFFSET + 2].copy_from_slice(&self.t330.to_le_bytes());
        slot[T400_OFFSET..T400_OFFSET + 2].copy_from_slice(&self.t400.to_le_bytes());
        slot[MASK_OFFSET] = self.mask;
        slot[AMBIENT_OFFSET] = self.ambient as u8;
        slot[NAME_OFFSET..NAME_OFFSET + TIP_NAME_LEN].copy_from_slice(&self.name);
        slot[CRC_OFFSET] = self.crc;
    }

    pub fn decode(slot: &[u8]) -> Self {
        let u16_at = |offset: usize| u16::from_le_bytes([slot[offset], slot[offset + 1]]);
        let mut name = [0u8; TIP_NAME_LEN];
        name.copy_from_slice(&slot[NAME_OFFSET..NAME_OFFSET + TIP_NAME_LEN]);
        Self {
            t200: u16_at(T200_OFFSET),
            t260: u16_at(T260_OFFSET),
            t330: u16_at(T330_OFFSET),
            t400: u16_at(T400_OFFSET),
            mask: slot[MASK_OFFSET],
            ambient: slot[AMBIENT_OFFSET] as i8,
            name,
            crc: slot[CRC_OFFSET],
        }
    }
}

impl fmt::Debug for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tip(b\"")?;
        for &byte in &self.name {
            if byte == 0 {
                write!(f, "\\0")?;
                continue;
            }
            write!(f, "{}", core::ascii::escape_default(byte))?;
        }
        write!(
            f,
            "\", [{}, {}, {}, {}], mask: 0x{:02x}, ambient: {}, crc: 0x{:02x})",
            self.t200, self.t260, self.t330, self.t400, self.mask, self.ambient, self.crc
        )
    }
}

/// Slot size for a tip record of `tip_size` bytes: the smallest power of two in `1..=chunk_size`
/// that holds it, or the whole chunk if there is none.
pub const fn required_tip_space(tip_size: usize, chunk_size: usize) -> usize {
    let mut space = 1;
    while space <= chunk_size {
        if space >= tip_size {
            return space;
        }
        space <<= 1;
    }
    chunk_size
}

/// Where the tips live inside the tip region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TipLayout {
    pub slot_size: usize,
    pub tips_per_chunk: usize,
    pub total_slots: usize,
}

impl TipLayout {
    pub const fn new(geometry: &Geometry) -> Self {
        let chunk_size = geometry.chunk_size as usize;
        let slot_size = required_tip_space(TIP_SIZE, chunk_size);
        let tips_per_chunk = if slot_size == 0 {
            0
        } else {
            chunk_size / slot_size
        };
        Self {
            slot_size,
            tips_per_chunk,
            total_slots: geometry.tip_chunks() as usize * tips_per_chunk,
        }
    }

    /// Physical chunk and byte offset inside that chunk of a tip slot.
    pub fn locate(&self, geometry: &Geometry, index: usize) -> Result<(u16, usize), Error> {
        if index >= self.total_slots {
            return Err(Error::IndexError);
        }
        let chunk = (index / self.tips_per_chunk) as u16 + geometry.config_chunks;
        let offset = (index % self.tips_per_chunk) * self.slot_size;
        Ok((chunk, offset))
    }
}

impl<T: Platform, R: Record> Store<T, R> {
    /// Number of addressable tip slots. Every index at or above is rejected with
    /// [`Error::IndexError`].
    pub fn total_tip_slots(&self) -> usize {
        self.tip_layout.total_slots
    }

    /// Loads the tip stored at `index`.
    ///
    /// Slots that were never written fail with [`Error::ChecksumError`].
    pub fn load_tip(&mut self, index: usize) -> Result<Tip, Error> {
        let (chunk, offset) = self.tip_layout.locate(&self.geometry, index)?;

        #[cfg(feature = "defmt")]
        trace!("load_tip: #{} @chunk {}+{}", index, chunk, offset);

        #[cfg(feature = "debug-logs")]
        println!("tip: load_tip #{index} @chunk {chunk}+{offset}");

        self.cache.read(&mut self.hal, &self.geometry, chunk)?;

        let mut tip = Tip::decode(&self.cache.data()[offset..offset + TIP_SIZE]);
        if !tip_checksum(&mut tip, false) {
            #[cfg(feature = "debug-logs")]
            println!("tip: load_tip #{index}: checksum mismatch {tip:?}");

            return Err(Error::ChecksumError);
        }
        Ok(tip)
    }

    /// Saves `tip` to `index`. The chunk is read first as it's shared with the neighbouring
    /// slots, then written back as a whole.
    pub fn save_tip(&mut self, index: usize, tip: &Tip) -> Result<(), Error> {
        let (chunk, offset) = self.tip_layout.locate(&self.geometry, index)?;

        #[cfg(feature = "defmt")]
        trace!("save_tip: #{} @chunk {}+{}", index, chunk, offset);

        #[cfg(feature = "debug-logs")]
        println!("tip: save_tip #{index} @chunk {chunk}+{offset}: {tip:?}");

        self.cache.read(&mut self.hal, &self.geometry, chunk)?;

        let mut tip = *tip;
        tip_checksum(&mut tip, true);
        tip.encode(&mut self.cache.data_mut()[offset..offset + TIP_SIZE]);

        self.cache.write(&mut self.hal, &self.geometry, chunk)
    }

    /// Reads the whole tip region and returns every slot that holds a valid tip, in index order.
    /// Blank or corrupted slots are skipped, transport errors abort the scan.
    pub fn tips(&mut self) -> Result<Vec<(usize, Tip)>, Error> {
        #[cfg(feature = "defmt")]
        trace!("tips");

        let mut tips = Vec::new();
        for index in 0..self.total_tip_slots() {
            match self.load_tip(index) {
                Ok(tip) => tips.push((index, tip)),
                Err(Error::ChecksumError) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(tips)
    }
}
