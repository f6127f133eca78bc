/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 06/10/2026
Last Modified: 16/10/2026
License: MIT

Notes: The record index (.shx). The index is a table of (offset, length)
pairs, both in 16-bit words and both big-endian on disk, one per feature id
in id order. It follows the same 100-byte header as the .shp file.
*/
use super::header::ShapefileHeader;
use super::{HEADER_LENGTH_IN_BYTES, HEADER_LENGTH_IN_WORDS, RECORD_HEADER_LENGTH_IN_WORDS};
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;
use std::io::SeekFrom;
use tracing::debug;

const SLOT_LENGTH_IN_BYTES: usize = 8;

/// Where a record lives in the .shp file, in 16-bit words. `offset` points
/// at the record header and `length` counts content words only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSlot {
    pub offset: i32,
    pub length: i32,
}

impl IndexSlot {
    /// The first word past the record.
    pub fn end(&self) -> i32 {
        self.offset + RECORD_HEADER_LENGTH_IN_WORDS + self.length
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShapeFileIndex {
    slots: Vec<IndexSlot>,
    next_id: u32,
}

impl ShapeFileIndex {
    pub fn new() -> ShapeFileIndex {
        ShapeFileIndex::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Hands out the next feature id. Ids are never reused.
    pub fn allocate_next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Stores the slot for `oid`. Ids must be recorded in allocation order,
    /// so `oid` is either an existing id or the next one in sequence.
    pub fn record_slot(&mut self, oid: u32, offset_words: i32, length_words: i32) -> Result<()> {
        let slot = IndexSlot {
            offset: offset_words,
            length: length_words,
        };
        let i = oid as usize;
        if i < self.slots.len() {
            self.slots[i] = slot;
        } else if i == self.slots.len() {
            self.slots.push(slot);
            if self.next_id <= oid {
                self.next_id = oid + 1;
            }
        } else {
            return Err(ShapeError::InvalidOperation(format!(
                "cannot record slot {} while the index holds only {} slots",
                oid,
                self.slots.len()
            )));
        }
        Ok(())
    }

    pub fn slot_for(&self, oid: u32) -> Result<IndexSlot> {
        self.slots
            .get(oid as usize)
            .copied()
            .ok_or(ShapeError::FeatureNotFound(oid))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, IndexSlot)> + '_ {
        self.slots.iter().enumerate().map(|(i, s)| (i as u32, *s))
    }

    /// The .shp file length in words: the end of the furthest record, or
    /// just the header for an empty file. For a file written contiguously
    /// this is the header plus the sum of every record's header and content.
    pub fn total_length_in_words(&self) -> i32 {
        self.slots
            .iter()
            .map(|s| s.end())
            .max()
            .unwrap_or(HEADER_LENGTH_IN_WORDS)
            .max(HEADER_LENGTH_IN_WORDS)
    }

    /// The .shx file length in words.
    pub fn index_file_length_in_words(&self) -> i32 {
        HEADER_LENGTH_IN_WORDS + (self.slots.len() * SLOT_LENGTH_IN_BYTES / 2) as i32
    }

    /// Reads a .shx file. A header length that disagrees with the stream,
    /// or a slot table that is not a whole number of entries, marks the file
    /// as an `ObsoleteIndexFileFormat` to be rebuilt.
    pub fn load<R: Read + Seek>(reader: &mut R) -> Result<ShapeFileIndex> {
        let header = ShapefileHeader::read(reader).map_err(|e| match e {
            ShapeError::ShapeFileIsInvalid(msg) => ShapeError::ObsoleteIndexFileFormat(msg),
            other => other,
        })?;
        let byte_len = reader.seek(SeekFrom::End(0))? as usize;
        if header.file_length as i64 * 2 != byte_len as i64 {
            return Err(ShapeError::ObsoleteIndexFileFormat(format!(
                "index header declares {} words but the file holds {} bytes",
                header.file_length, byte_len
            )));
        }
        if (byte_len - HEADER_LENGTH_IN_BYTES) % SLOT_LENGTH_IN_BYTES != 0 {
            return Err(ShapeError::ObsoleteIndexFileFormat(
                "index slot table is not a whole number of entries".to_string(),
            ));
        }

        let mut bor = ByteOrderReader::new(reader, Endianness::BigEndian)?;
        bor.seek(HEADER_LENGTH_IN_BYTES)?;
        let num_slots = (byte_len - HEADER_LENGTH_IN_BYTES) / SLOT_LENGTH_IN_BYTES;
        let mut index = ShapeFileIndex {
            slots: Vec::with_capacity(num_slots),
            next_id: num_slots as u32,
        };
        for _ in 0..num_slots {
            let offset = bor.read_i32()?;
            let length = bor.read_i32()?;
            index.slots.push(IndexSlot { offset, length });
        }
        Ok(index)
    }

    /// Writes the whole .shx file. `header` is the .shp header; only its
    /// file length is replaced.
    pub fn save<W: Write + Seek>(&self, writer: &mut W, header: &ShapefileHeader) -> Result<()> {
        self.write_header(writer, header)?;
        let mut bow = ByteOrderWriter::new(writer, Endianness::BigEndian);
        for slot in &self.slots {
            bow.write_i32(slot.offset)?;
            bow.write_i32(slot.length)?;
        }
        Ok(())
    }

    pub fn write_header<W: Write + Seek>(&self, writer: &mut W, header: &ShapefileHeader) -> Result<()> {
        let mut h = header.clone();
        h.file_length = self.index_file_length_in_words();
        h.write(writer)
    }

    /// Writes the single entry for `oid` in place.
    pub fn write_slot<W: Write + Seek>(&self, writer: &mut W, oid: u32) -> Result<()> {
        let slot = self.slot_for(oid)?;
        writer.seek(SeekFrom::Start(
            (HEADER_LENGTH_IN_BYTES + oid as usize * SLOT_LENGTH_IN_BYTES) as u64,
        ))?;
        let mut bow = ByteOrderWriter::new(writer, Endianness::BigEndian);
        bow.write_i32(slot.offset)?;
        bow.write_i32(slot.length)
    }

    /// Rebuilds the index by walking the record headers of a .shp stream.
    ///
    /// A record number seen twice keeps its last position, which is where
    /// a record relocated by an update lives.
    pub fn rebuild_from_shp<R: Read + Seek>(reader: &mut R) -> Result<ShapeFileIndex> {
        let header = ShapefileHeader::read(reader)?;
        let byte_len = reader.seek(SeekFrom::End(0))? as usize;
        let end = byte_len.min(header.file_length.max(HEADER_LENGTH_IN_WORDS) as usize * 2);

        let mut bor = ByteOrderReader::new(reader, Endianness::BigEndian)?;
        let mut index = ShapeFileIndex::new();
        let mut pos = HEADER_LENGTH_IN_BYTES;
        while pos + 8 <= end {
            bor.seek(pos)?;
            let record_number = bor.read_i32()?;
            let length = bor.read_i32()?;
            if record_number < 1 || length < 2 {
                return Err(ShapeError::ShapeFileCorrupt(format!(
                    "bad record header (number {}, length {}) at byte {}",
                    record_number, length, pos
                )));
            }
            let oid = (record_number - 1) as u32;
            if oid as usize > index.len() {
                return Err(ShapeError::ShapeFileCorrupt(format!(
                    "record number {} is out of sequence at byte {}",
                    record_number, pos
                )));
            }
            index.record_slot(oid, (pos / 2) as i32, length)?;
            pos += 8 + length as usize * 2;
        }
        debug!("Rebuilt record index with {} entries", index.len());
        Ok(index)
    }
}

#[cfg(test)]
mod test {
    use super::{IndexSlot, ShapeFileIndex};
    use crate::shapefile::codec::{encode, write_record};
    use crate::shapefile::geometry::{ShapeRecord, ShapeType};
    use crate::shapefile::header::ShapefileHeader;
    use shapestore_common::error::ShapeError;
    use std::io::Cursor;

    #[test]
    fn test_allocation_and_lengths() {
        let mut index = ShapeFileIndex::new();
        assert_eq!(index.total_length_in_words(), 50);
        let a = index.allocate_next_id();
        index.record_slot(a, 50, 10).unwrap();
        let b = index.allocate_next_id();
        index.record_slot(b, 64, 10).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(index.total_length_in_words(), 78);
        assert_eq!(index.slot_for(1).unwrap(), IndexSlot { offset: 64, length: 10 });
        assert!(matches!(index.slot_for(2), Err(ShapeError::FeatureNotFound(2))));
        assert!(index.record_slot(5, 0, 0).is_err());

        // a relocated record extends the file; the dead bytes stay counted
        index.record_slot(0, 78, 20).unwrap();
        assert_eq!(index.total_length_in_words(), 102);
        assert_eq!(index.allocate_next_id(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let mut index = ShapeFileIndex::new();
        for i in 0..3 {
            let oid = index.allocate_next_id();
            index.record_slot(oid, 50 + i * 14, 10).unwrap();
        }
        let header = ShapefileHeader::new(ShapeType::Point);
        let mut cursor = Cursor::new(vec![]);
        index.save(&mut cursor, &header).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), 124);
        assert_eq!(&bytes[100..104], &50i32.to_be_bytes());

        let loaded = ShapeFileIndex::load(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.slot_for(2).unwrap(), IndexSlot { offset: 78, length: 10 });

        let mut short = bytes;
        short.truncate(120);
        assert!(matches!(
            ShapeFileIndex::load(&mut Cursor::new(short)),
            Err(ShapeError::ObsoleteIndexFileFormat(_))
        ));
    }

    #[test]
    fn test_rebuild_from_shp() {
        let mut cursor = Cursor::new(vec![]);
        let mut offset = 50;
        let mut expected = ShapeFileIndex::new();
        for i in 0..4u32 {
            let content = encode(&ShapeRecord::point(i as f64, 0.0), ShapeType::Point).unwrap();
            write_record(&mut cursor, offset, i, &content).unwrap();
            expected.record_slot(i, offset, 10).unwrap();
            offset += 14;
        }
        let mut header = ShapefileHeader::new(ShapeType::Point);
        header.file_length = offset;
        header.write(&mut cursor).unwrap();

        let rebuilt = ShapeFileIndex::rebuild_from_shp(&mut cursor).unwrap();
        assert_eq!(rebuilt.len(), 4);
        for (oid, slot) in expected.iter() {
            assert_eq!(rebuilt.slot_for(oid).unwrap(), slot);
        }
        assert_eq!(rebuilt.total_length_in_words(), offset);
    }
}
