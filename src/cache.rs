use crate::Geometry;
use crate::error::Error;
use crate::platform::Platform;
use alloc::vec;
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// The one chunk sized buffer every device access goes through, together with the chunk it
/// currently mirrors.
pub(crate) struct ChunkCache {
    data: Vec<u8>,
    resident: Option<u16>,
}

impl ChunkCache {
    pub(crate) fn new(chunk_size: usize) -> Self {
        Self {
            data: vec![0xFF; chunk_size],
            resident: None,
        }
    }

    pub(crate) fn resident(&self) -> Option<u16> {
        self.resident
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the buffer. Edits only reach the device through [`ChunkCache::write`].
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Loads `chunk` into the buffer unless it is already there.
    pub(crate) fn read<T: Platform>(
        &mut self,
        hal: &mut T,
        geometry: &Geometry,
        chunk: u16,
    ) -> Result<(), Error> {
        if self.resident == Some(chunk) {
            return Ok(());
        }
        if chunk >= geometry.chunks {
            #[cfg(feature = "defmt")]
            warn!("read: chunk {} out of range", chunk);

            return Err(Error::IoError);
        }

        #[cfg(feature = "defmt")]
        trace!("read: chunk {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("  cache: read chunk {chunk} ({:?})", geometry.region_of(chunk));

        // a failed read may leave the buffer half filled
        self.resident = None;
        hal.read(geometry.chunk_address(chunk), &mut self.data)
            .map_err(|_| Error::IoError)?;

        self.resident = Some(chunk);
        Ok(())
    }

    /// Writes the whole buffer to `chunk`. The buffer only counts as a mirror of `chunk` after the
    /// device confirmed the write; the write cycle is awaited in both cases.
    pub(crate) fn write<T: Platform>(
        &mut self,
        hal: &mut T,
        geometry: &Geometry,
        chunk: u16,
    ) -> Result<(), Error> {
        if chunk >= geometry.chunks {
            #[cfg(feature = "defmt")]
            warn!("write: chunk {} out of range", chunk);

            return Err(Error::IoError);
        }

        #[cfg(feature = "defmt")]
        trace!("write: chunk {}", chunk);

        #[cfg(feature = "debug-logs")]
        println!("  cache: write chunk {chunk} ({:?})", geometry.region_of(chunk));

        self.resident = None;
        let result = hal.write(geometry.chunk_address(chunk), &self.data);
        hal.wait_write_cycle();

        if result.is_err() {
            #[cfg(feature = "defmt")]
            warn!("write: chunk {} failed", chunk);

            #[cfg(feature = "debug-logs")]
            println!("  cache: write chunk {chunk} failed");

            return Err(Error::IoError);
        }

        self.resident = Some(chunk);
        Ok(())
    }
}
