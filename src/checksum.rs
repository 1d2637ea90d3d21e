//! Rolling checksums for config records and tips. They only guard against random corruption.
//!
//! Both accumulators start from (or add) a non-zero seed so an all-zero record never validates.

use crate::tip::Tip;

/// Seed of both checksums.
pub(crate) const CHECKSUM_SEED: u32 = 117;

/// Size of the little endian checksum field inside an encoded config record.
pub const CONFIG_CRC_LEN: usize = 4;

#[inline(always)]
fn fold(acc: u32, value: u32) -> u32 {
    (acc << 1).wrapping_add(value)
}

/// Verifies (`write == false`) or computes and stores (`write == true`) the checksum of an encoded
/// config record. The checksum field at `crc_offset` is zeroed while summing and restored
/// afterwards when verifying.
///
/// Returns whether the stored value matched the computed one, in write mode this refers to the
/// value that was stored before.
pub fn config_checksum(record: &mut [u8], crc_offset: usize, write: bool) -> bool {
    let field = crc_offset..crc_offset + CONFIG_CRC_LEN;
    let stored = read_u32(&record[field.clone()]);
    record[field.clone()].fill(0);

    let sum = record.iter().fold(CHECKSUM_SEED, |acc, &b| fold(acc, b as u32));

    if write {
        record[field].copy_from_slice(&sum.to_le_bytes());
    } else {
        record[field].copy_from_slice(&stored.to_le_bytes());
    }
    stored == sum
}

/// Verifies (`write == false`) or computes and stores (`write == true`) the 8-bit checksum of a
/// tip. Returns whether the previous `crc` matched.
pub fn tip_checksum(tip: &mut Tip, write: bool) -> bool {
    let mut sum = tip.t200 as u32;
    sum = fold(sum, tip.t260 as u32);
    sum = fold(sum, tip.t330 as u32);
    sum = fold(sum, tip.t400 as u32);
    sum = fold(sum, tip.mask as u32);
    sum = fold(sum, tip.ambient as i32 as u32);
    for &b in &tip.name {
        sum = fold(sum, b as u32);
    }
    let sum = (sum.wrapping_add(CHECKSUM_SEED) & 0xFF) as u8;

    let matches = tip.crc == sum;
    if write {
        tip.crc = sum;
    }
    matches
}

pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}
