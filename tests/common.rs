#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use eeprom_store::platform::WriteCycle;
use eeprom_store::{Geometry, Record};
use embedded_storage::{ReadStorage, Storage};

pub const CHUNK_SIZE: usize = 32;
pub const CHUNKS: u16 = 16;
pub const CONFIG_CHUNKS: u16 = 8;

/// 8 config chunks followed by 8 tip chunks with two tips each.
pub const GEOMETRY: Geometry = Geometry::new(CHUNKS, CHUNK_SIZE as u16, CONFIG_CHUNKS);

pub fn chunk_offset(chunk: u16) -> u32 {
    chunk as u32 * CHUNK_SIZE as u32
}

#[derive(Default)]
pub struct Eeprom {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    WriteCycle,
}

impl Eeprom {
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0xffu8; size],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn for_geometry(geometry: &Geometry) -> Self {
        Self::new(geometry.size())
    }

    pub fn new_with_fault(size: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; size],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    /// Fails every bus transfer from now on.
    pub fn fail_now(&mut self) {
        self.fail_after_operation = self.transfers();
    }

    pub fn chunk(&self, chunk: u16) -> &[u8] {
        let offset = chunk_offset(chunk) as usize;
        &self.buf[offset..offset + CHUNK_SIZE]
    }

    /// Flips every bit of a single byte behind the store's back.
    pub fn corrupt(&mut self, chunk: u16, byte: usize) {
        self.buf[chunk_offset(chunk) as usize + byte] ^= 0xFF;
    }

    /// Read and write transfers, write cycle waits are not counted.
    pub fn transfers(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| !matches!(op, Operation::WriteCycle))
            .count()
    }

    pub fn reads(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Read { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn fault(&self) -> bool {
        if self.transfers() >= self.fail_after_operation {
            println!("    eeprom: FAULT");
            return true;
        }
        false
    }
}

#[derive(Debug)]
pub struct EepromError;

impl ReadStorage for Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.fault() {
            return Err(EepromError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.fault() {
            return Err(EepromError);
        }
        assert!(!bytes.is_empty());

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl WriteCycle for Eeprom {
    fn wait_write_cycle(&mut self) {
        self.operations.push(Operation::WriteCycle);
    }
}

/// Config record used throughout the tests.
///
/// | 0..4 id | 4..8 crc | 8..10 temperature | 10..12 boost | 12 brightness | 13 flags | 14..16 timeout |
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Settings {
    pub id: u32,
    pub crc: u32,
    pub temperature: u16,
    pub boost: u16,
    pub brightness: u8,
    pub flags: u8,
    pub timeout: u16,
}

impl Settings {
    pub fn with_temperature(temperature: u16) -> Self {
        Self {
            temperature,
            boost: 50,
            brightness: 128,
            flags: 0b101,
            timeout: 300,
            ..Default::default()
        }
    }
}

impl Record for Settings {
    const SIZE: usize = 16;
    const CRC_OFFSET: usize = 4;

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn crc(&self) -> u32 {
        self.crc
    }

    fn set_crc(&mut self, crc: u32) {
        self.crc = crc;
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.crc.to_le_bytes());
        buf[8..10].copy_from_slice(&self.temperature.to_le_bytes());
        buf[10..12].copy_from_slice(&self.boost.to_le_bytes());
        buf[12] = self.brightness;
        buf[13] = self.flags;
        buf[14..16].copy_from_slice(&self.timeout.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        Self {
            id: u32_at(0),
            crc: u32_at(4),
            temperature: u16_at(8),
            boost: u16_at(10),
            brightness: buf[12],
            flags: buf[13],
            timeout: u16_at(14),
        }
    }
}

/// Record that doesn't fit into a 32 byte chunk.
pub struct Oversized;

impl Record for Oversized {
    const SIZE: usize = 40;
    const CRC_OFFSET: usize = 0;

    fn id(&self) -> u32 {
        0
    }
    fn set_id(&mut self, _id: u32) {}
    fn crc(&self) -> u32 {
        0
    }
    fn set_crc(&mut self, _crc: u32) {}
    fn encode(&self, _buf: &mut [u8]) {}
    fn decode(_buf: &[u8]) -> Self {
        Oversized
    }
}
