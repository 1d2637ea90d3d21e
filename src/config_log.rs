//! Append-only log of versioned config records in the low chunk region.
//!
//! Every save goes to the chunk after the current one, so the write cycles spread evenly over the
//! region. On startup the record with the highest ID among the valid chunks is the current one.

use crate::checksum::{config_checksum, read_u32};
use crate::error::Error;
use crate::platform::Platform;
use crate::{Record, Store};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Position of the current record and of the chunk receiving the next save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursors {
    pub read_chunk: u16,
    pub write_chunk: u16,
}

/// Outcome of a config region scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ScanResult {
    pub(crate) records: u16,
    pub(crate) oldest: Option<(u32, u16)>,
    pub(crate) newest: Option<(u32, u16)>,
    pub(crate) io_error: bool,
}

impl<T: Platform, R: Record> Store<T, R> {
    /// Scans the config region and positions the cursors. Called by [`Store::new`]; call it again
    /// after a failed load or save if the device might have recovered.
    ///
    /// The scan stops at the first chunk that can't be read or doesn't validate, so records
    /// behind a gap are not considered. A read error leaves the log not writable.
    pub fn initialize(&mut self) {
        #[cfg(feature = "defmt")]
        trace!("initialize");

        #[cfg(feature = "debug-logs")]
        println!("config: initialize");

        self.writable = false;
        let scan = self.scan_config_region();

        self.cursors = match (scan.newest, scan.oldest) {
            (Some((_, newest)), Some((_, oldest))) => {
                let write_chunk = if scan.records < self.geometry.config_chunks {
                    self.next_config_chunk(newest)
                } else {
                    // full, overwrite the oldest record
                    oldest
                };
                Cursors {
                    read_chunk: newest,
                    write_chunk,
                }
            }
            _ => Cursors::default(),
        };
        self.writable = !scan.io_error;

        #[cfg(feature = "defmt")]
        trace!(
            "initialize: records {} {} writable {}",
            scan.records, self.cursors, self.writable
        );

        #[cfg(feature = "debug-logs")]
        println!(
            "config: initialize: {scan:?} -> {:?} writable: {}",
            self.cursors, self.writable
        );
    }

    pub(crate) fn scan_config_region(&mut self) -> ScanResult {
        let mut scan = ScanResult::default();

        for chunk in 0..self.geometry.config_chunks {
            if self.cache.read(&mut self.hal, &self.geometry, chunk).is_err() {
                #[cfg(feature = "defmt")]
                warn!("scan: chunk {} unreadable", chunk);

                scan.io_error = true;
                break;
            }
            let record = &mut self.cache.data_mut()[..R::SIZE];
            if !config_checksum(record, R::CRC_OFFSET, false) {
                break;
            }
            let id = R::decode(record).id();

            scan.records += 1;
            if scan.oldest.is_none_or(|(oldest, _)| id < oldest) {
                scan.oldest = Some((id, chunk));
            }
            if scan.newest.is_none_or(|(newest, _)| id > newest) {
                scan.newest = Some((id, chunk));
            }
        }

        scan
    }

    /// Loads the current config record.
    ///
    /// There is no fallback to older records; on [`Error::ChecksumError`] the caller decides
    /// whether to re-initialize or start from defaults.
    pub fn load_config(&mut self) -> Result<R, Error> {
        let chunk = self.cursors.read_chunk;

        #[cfg(feature = "defmt")]
        trace!("load_config: @chunk {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("config: load_config @chunk {chunk}");

        self.cache.read(&mut self.hal, &self.geometry, chunk)?;

        let record = &mut self.cache.data_mut()[..R::SIZE];
        if !config_checksum(record, R::CRC_OFFSET, false) {
            return Err(Error::ChecksumError);
        }
        Ok(R::decode(record))
    }

    /// Saves `record` as the new current record. Its ID is incremented and its checksum updated
    /// in place. If the write fails both are put back and the cursors stay where they were.
    pub fn save_config(&mut self, record: &mut R) -> Result<(), Error> {
        if !self.writable {
            return Err(Error::NotWritable);
        }

        let chunk = self.cursors.write_chunk;
        let previous_id = record.id();
        let previous_crc = record.crc();
        record.set_id(previous_id.wrapping_add(1));

        #[cfg(feature = "defmt")]
        trace!("save_config: id {} @chunk {}", record.id(), chunk);

        #[cfg(feature = "debug-logs")]
        println!("config: save_config id {} @chunk {chunk}", record.id());

        let data = self.cache.data_mut();
        data.fill(0xFF);
        record.encode(&mut data[..R::SIZE]);
        config_checksum(&mut data[..R::SIZE], R::CRC_OFFSET, true);
        record.set_crc(read_u32(&data[R::CRC_OFFSET..]));

        if let Err(e) = self.cache.write(&mut self.hal, &self.geometry, chunk) {
            record.set_id(previous_id);
            record.set_crc(previous_crc);
            return Err(e);
        }

        self.cursors = Cursors {
            read_chunk: chunk,
            write_chunk: self.next_config_chunk(chunk),
        };
        Ok(())
    }

    /// Fills the config region with `0xFF`, stopping at the first failed write, and initializes
    /// the log again. Returns [`Error::IoError`] if not every chunk could be erased.
    pub fn erase_config_region(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("erase_config_region");

        #[cfg(feature = "debug-logs")]
        println!("config: erase_config_region");

        self.cache.data_mut().fill(0xFF);
        let mut result = Ok(());
        for chunk in 0..self.geometry.config_chunks {
            if let Err(e) = self.cache.write(&mut self.hal, &self.geometry, chunk) {
                result = Err(e);
                break;
            }
        }

        self.initialize();
        result
    }

    /// Current cursors of the config log.
    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    /// Whether [`Store::save_config`] will attempt a write.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn next_config_chunk(&self, chunk: u16) -> u16 {
        let next = chunk + 1;
        if next >= self.geometry.config_chunks {
            0
        } else {
            next
        }
    }
}
