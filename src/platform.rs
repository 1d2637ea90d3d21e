use embedded_storage::Storage;

/// Everything the store needs from the device: byte addressed reads and writes through
/// [`Storage`] plus the write cycle delay. See README.md for an example implementation.
///
/// Reads and writes are expected to time out on their own and report that as an error; the
/// store never retries.
pub trait Platform: WriteCycle + Storage {}

impl<T: WriteCycle + Storage> Platform for T {}

pub trait WriteCycle {
    /// Blocks until the device finished its internal write cycle. Called after every chunk
    /// write, successful or not.
    fn wait_write_cycle(&mut self);
}

/// Address width of the memory address sent before every transfer.
const MEM_ADDR_LEN: usize = 2;

/// Internal page buffer of the AT24C32/AT24C64 family. Writes must not cross a page boundary.
pub const AT24_PAGE_SIZE: usize = 32;

/// Maximum write cycle time from the AT24C32 datasheet.
pub const AT24_WRITE_CYCLE_MS: u32 = 10;

/// Splits a write into transfers that never cross an [`AT24_PAGE_SIZE`] boundary and prefixes each
/// with its big-endian memory address. `emit` receives the assembled frame and whether more
/// frames follow.
pub fn at24_frames<E>(
    offset: u32,
    bytes: &[u8],
    mut emit: impl FnMut(&[u8], bool) -> Result<(), E>,
) -> Result<(), E> {
    let mut frame = [0u8; MEM_ADDR_LEN + AT24_PAGE_SIZE];
    let mut address = offset as usize;
    let mut rest = bytes;
    while !rest.is_empty() {
        let room = AT24_PAGE_SIZE - address % AT24_PAGE_SIZE;
        let (page, tail) = rest.split_at(room.min(rest.len()));
        frame[..MEM_ADDR_LEN].copy_from_slice(&(address as u16).to_be_bytes());
        frame[MEM_ADDR_LEN..MEM_ADDR_LEN + page.len()].copy_from_slice(page);
        emit(&frame[..MEM_ADDR_LEN + page.len()], !tail.is_empty())?;
        address += page.len();
        rest = tail;
    }
    Ok(())
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
mod chip {
    use super::{AT24_WRITE_CYCLE_MS, MEM_ADDR_LEN, WriteCycle, at24_frames};
    use embedded_storage::{ReadStorage, Storage};
    use esp_hal::Blocking;
    use esp_hal::delay::Delay;
    use esp_hal::i2c::master::{Error, I2c};

    /// AT24Cxx EEPROM on an esp-hal I2C bus. The bus timeout configured on the I2C driver bounds
    /// every transfer.
    pub struct At24<'d> {
        i2c: I2c<'d, Blocking>,
        delay: Delay,
        address: u8,
        capacity: usize,
        write_cycle_ms: u32,
    }

    impl<'d> At24<'d> {
        /// `address` is the 7-bit bus address, usually `0x50`. `capacity` in bytes, 4096 for
        /// the AT24C32.
        pub fn new(i2c: I2c<'d, Blocking>, address: u8, capacity: usize) -> Self {
            Self {
                i2c,
                delay: Delay::new(),
                address,
                capacity,
                write_cycle_ms: AT24_WRITE_CYCLE_MS,
            }
        }

        pub fn with_write_cycle_ms(mut self, write_cycle_ms: u32) -> Self {
            self.write_cycle_ms = write_cycle_ms;
            self
        }

        pub fn release(self) -> I2c<'d, Blocking> {
            self.i2c
        }
    }

    impl ReadStorage for At24<'_> {
        type Error = Error;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let address: [u8; MEM_ADDR_LEN] = (offset as u16).to_be_bytes();
            self.i2c.write_read(self.address, &address, bytes)
        }

        fn capacity(&self) -> usize {
            self.capacity
        }
    }

    impl Storage for At24<'_> {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let bus_address = self.address;
            let write_cycle_ms = self.write_cycle_ms;
            let i2c = &mut self.i2c;
            let delay = &self.delay;
            at24_frames(offset, bytes, |frame, more| {
                i2c.write(bus_address, frame)?;
                // the store waits after the last page itself
                if more {
                    delay.delay_millis(write_cycle_ms);
                }
                Ok(())
            })
        }
    }

    impl WriteCycle for At24<'_> {
        fn wait_write_cycle(&mut self) {
            self.delay.delay_millis(self.write_cycle_ms);
        }
    }
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
pub use chip::*;
