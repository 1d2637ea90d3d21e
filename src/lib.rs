#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod cache;
pub mod checksum;
mod config_log;
pub mod error;
pub mod platform;
mod tip;

pub use config_log::Cursors;
pub use tip::{TIP_NAME_LEN, TIP_SIZE, Tip, TipFlag, TipLayout, required_tip_space};

extern crate alloc;

use crate::cache::ChunkCache;
use crate::error::Error;
use crate::platform::Platform;
use core::marker::PhantomData;
#[cfg(feature = "defmt")]
use defmt::trace;

/// The two disjoint parts of the chunk address space.
#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    Config,
    Tip,
}

/// Fixed chunk layout of the device: `chunks` chunks of `chunk_size` bytes, the first
/// `config_chunks` of them hold the config log, the rest the tips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub chunks: u16,
    pub chunk_size: u16,
    pub config_chunks: u16,
}

impl Geometry {
    /// 4 KiB AT24C32: 128 pages of 32 bytes, split in half.
    pub const AT24C32: Geometry = Geometry::new(128, 32, 64);

    pub const fn new(chunks: u16, chunk_size: u16, config_chunks: u16) -> Self {
        Self {
            chunks,
            chunk_size,
            config_chunks,
        }
    }

    pub const fn tip_chunks(&self) -> u16 {
        self.chunks.saturating_sub(self.config_chunks)
    }

    /// Total bytes covered by the layout.
    pub const fn size(&self) -> usize {
        self.chunks as usize * self.chunk_size as usize
    }

    pub const fn chunk_address(&self, chunk: u16) -> u32 {
        chunk as u32 * self.chunk_size as u32
    }

    pub const fn region_of(&self, chunk: u16) -> Option<Region> {
        if chunk < self.config_chunks {
            Some(Region::Config)
        } else if chunk < self.chunks {
            Some(Region::Tip)
        } else {
            None
        }
    }

    fn validate<R: Record>(&self, capacity: usize) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        if self.config_chunks == 0 || self.config_chunks > self.chunks {
            return Err(Error::InvalidConfigRegion);
        }
        let chunk_size = self.chunk_size as usize;
        if R::SIZE > chunk_size || R::CRC_OFFSET + checksum::CONFIG_CRC_LEN > R::SIZE {
            return Err(Error::RecordTooLarge);
        }
        if TIP_SIZE > chunk_size {
            return Err(Error::TipTooLarge);
        }
        if capacity < self.size() {
            return Err(Error::DeviceTooSmall);
        }
        Ok(())
    }
}

/// A config record as stored in the log: one record per chunk, identified by an ID that grows with
/// every save and protected by a 32-bit checksum.
///
/// `encode` and `decode` define the byte layout. The checksum is stored little endian in the
/// four bytes at `CRC_OFFSET`; `encode` has to write [`Record::crc`] there.
pub trait Record {
    /// Encoded size in bytes, at most one chunk.
    const SIZE: usize;
    /// Byte offset of the checksum inside the encoded record.
    const CRC_OFFSET: usize;

    fn id(&self) -> u32;
    fn set_id(&mut self, id: u32);
    fn crc(&self) -> u32;
    fn set_crc(&mut self, crc: u32);

    /// Writes the record to `buf`, which is exactly `SIZE` bytes long.
    fn encode(&self, buf: &mut [u8]);
    /// Reads the record from `buf`, which is exactly `SIZE` bytes long.
    fn decode(buf: &[u8]) -> Self;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub config: ConfigStatistics,
    pub tips: TipStatistics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStatistics {
    /// Valid records found before the scan stopped.
    pub valid_records: u16,
    pub current_id: Option<u32>,
    pub cursors: Cursors,
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TipStatistics {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

/// Owns the device and the single chunk buffer. Config records of type `R` are kept in a
/// wear-leveling log at the start of the device, tips in fixed slots behind it.
pub struct Store<T: Platform, R: Record> {
    pub(crate) hal: T,
    pub(crate) geometry: Geometry,
    pub(crate) tip_layout: TipLayout,
    pub(crate) cache: ChunkCache,

    // set by self.initialize
    pub(crate) cursors: Cursors,
    pub(crate) writable: bool,

    _record: PhantomData<R>,
}

impl<T: Platform, R: Record> Store<T, R> {
    /// Checks `geometry` against the device and the record sizes, then scans the config region
    /// to find the current record, see [`Store::initialize`].
    pub fn new(geometry: Geometry, hal: T) -> Result<Store<T, R>, Error> {
        geometry.validate::<R>(hal.capacity())?;

        #[cfg(feature = "defmt")]
        trace!("new: {}", geometry);

        let mut store = Self {
            hal,
            geometry,
            tip_layout: TipLayout::new(&geometry),
            cache: ChunkCache::new(geometry.chunk_size as usize),
            cursors: Cursors::default(),
            writable: false,
            _record: PhantomData,
        };
        store.initialize();
        Ok(store)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn tip_layout(&self) -> &TipLayout {
        &self.tip_layout
    }

    /// The chunk currently mirrored by the buffer, if any.
    pub fn cached_chunk(&self) -> Option<u16> {
        self.cache.resident()
    }

    /// Direct access to the device. Writes through it bypass the chunk buffer, so
    /// [`Store::initialize`] has to be called afterwards.
    pub fn platform(&mut self) -> &mut T {
        &mut self.hal
    }

    pub fn release(self) -> T {
        self.hal
    }

    /// Summary of both regions. Reads the whole tip region.
    pub fn statistics(&mut self) -> Result<Statistics, Error> {
        let scan = self.scan_config_region();
        if scan.io_error {
            return Err(Error::IoError);
        }

        let total = self.total_tip_slots();
        let valid = self.tips()?.len();

        Ok(Statistics {
            config: ConfigStatistics {
                valid_records: scan.records,
                current_id: scan.newest.map(|(id, _)| id),
                cursors: self.cursors,
                writable: self.writable,
            },
            tips: TipStatistics {
                total,
                valid,
                invalid: total - valid,
            },
        })
    }
}
