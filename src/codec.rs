//! Fixed-width weeklog records.
//!
//! Every record is 17 bytes, big-endian:
//! `steamid(u64) category(u8) time(u32) portals(u8) timestamp(u24)`.
//! There is no header, footer or checksum.

use crate::config::{CategoryRegistry, MAX_TIMESTAMP};
use crate::error::AppError;
use crate::models::weeklog::LogEntry;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

pub const RECORD_LEN: usize = 17;

const TIMESTAMP_OFFSET: usize = 14;

pub fn encode(entry: &LogEntry, registry: &CategoryRegistry) -> Result<[u8; RECORD_LEN], AppError> {
    let index = registry
        .index_of(&entry.category)
        .ok_or_else(|| AppError::Category(entry.category.clone()))?;
    if entry.timestamp > MAX_TIMESTAMP {
        return Err(AppError::Encode(format!(
            "timestamp {} does not fit 24 bits",
            entry.timestamp
        )));
    }

    let mut record = [0u8; RECORD_LEN];
    let mut w = &mut record[..];
    w.write_u64::<BigEndian>(entry.steamid)?;
    w.write_u8(index)?;
    w.write_u32::<BigEndian>(entry.time)?;
    w.write_u8(entry.portals)?;
    w.write_u24::<BigEndian>(entry.timestamp)?;
    Ok(record)
}

/// Decodes a whole log, applying tombstones as they are met.
pub fn decode(buffer: &[u8], registry: &CategoryRegistry) -> Result<Vec<LogEntry>, AppError> {
    check_len(buffer.len())?;

    let mut log: Vec<LogEntry> = Vec::with_capacity(buffer.len() / RECORD_LEN);
    for record in buffer.chunks_exact(RECORD_LEN) {
        let entry = decode_record(record, registry)?;
        if entry.is_tombstone() {
            // erase the latest earlier run by this player in this category
            if let Some(pos) = log
                .iter()
                .rposition(|e| e.steamid == entry.steamid && e.category == entry.category)
            {
                log.remove(pos);
            }
        } else {
            log.push(entry);
        }
    }
    Ok(log)
}

fn decode_record(record: &[u8], registry: &CategoryRegistry) -> Result<LogEntry, AppError> {
    let index = record[8];
    let category = registry
        .get(index)
        .ok_or_else(|| AppError::Category(format!("index {} of {}", index, registry.len())))?;
    Ok(LogEntry {
        steamid: BigEndian::read_u64(&record[0..8]),
        category: category.id.clone(),
        time: BigEndian::read_u32(&record[9..13]),
        portals: record[13],
        timestamp: timestamp_of(record),
    })
}

/// The raw 24-bit timestamp field of one record.
pub fn timestamp_of(record: &[u8]) -> u32 {
    BigEndian::read_u24(&record[TIMESTAMP_OFFSET..RECORD_LEN])
}

/// Byte offset of the first record whose timestamp field equals `timestamp`.
pub fn find_timestamp(buffer: &[u8], timestamp: u32) -> Option<usize> {
    buffer
        .chunks_exact(RECORD_LEN)
        .position(|record| timestamp_of(record) == timestamp)
        .map(|i| i * RECORD_LEN)
}

pub fn check_len(len: usize) -> Result<(), AppError> {
    if len % RECORD_LEN != 0 {
        return Err(AppError::Corrupt { len: len as u64 });
    }
    Ok(())
}
