/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 05/10/2026
Last Modified: 16/10/2026
License: MIT

Notes: Encodes and decodes the content of individual .shp records. Record
content is little-endian and starts with the record's shape type code. The
8-byte big-endian record header (record number, content length) is handled
by `read_record` and `write_record`.
*/
use super::geometry::{MultiPartShape, ShapeRecord, ShapeType};
use super::index::IndexSlot;
use super::RECORD_HEADER_LENGTH_IN_WORDS;
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::{Bounded, BoundingBox, Point2D};
use shapestore_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;
use std::io::{Cursor, SeekFrom};

/// Decodes the content of a record from a file of type `shape_type`.
///
/// A Null record is valid in a file of any type. Any other shape code must
/// match the file's type.
pub fn decode(shape_type: ShapeType, content: &[u8]) -> Result<ShapeRecord> {
    let mut bor = ByteOrderReader::new(Cursor::new(content), Endianness::LittleEndian)?;
    let st = ShapeType::from_int(bor.read_i32()?)?;
    if st == ShapeType::Null {
        return Ok(ShapeRecord::Null);
    }
    st.ensure_supported()?;
    if st != shape_type {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "found a {} record in a {} file",
            st, shape_type
        )));
    }

    match st {
        ShapeType::Point => Ok(ShapeRecord::Point(read_point(&mut bor)?)),

        ShapeType::MultiPoint => {
            // record bounding box
            bor.inc_pos(32)?;
            let num_points = read_count(&mut bor, "point")?;
            ensure_available(&bor, num_points * 16)?;
            let mut points = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                points.push(read_point(&mut bor)?);
            }
            Ok(ShapeRecord::MultiPoint(points))
        }

        ShapeType::PolyLine | ShapeType::Polygon => {
            bor.inc_pos(32)?;
            let num_parts = read_count(&mut bor, "part")?;
            let num_points = read_count(&mut bor, "point")?;
            ensure_available(&bor, num_parts * 4 + num_points * 16)?;
            let mut shape = MultiPartShape {
                parts: Vec::with_capacity(num_parts),
                points: Vec::with_capacity(num_points),
            };
            for _ in 0..num_parts {
                shape.parts.push(bor.read_i32()?);
            }
            for _ in 0..num_points {
                shape.points.push(read_point(&mut bor)?);
            }
            shape.validate()?;
            if st == ShapeType::Polygon {
                Ok(ShapeRecord::Polygon(shape))
            } else {
                Ok(ShapeRecord::PolyLine(shape))
            }
        }

        _ => Err(ShapeError::UnsupportedGeometryType(format!(
            "{} shapes are not supported",
            st
        ))),
    }
}

/// Encodes a concrete shape for a file of type `shape_type`. Null records
/// are written with `null_content` instead.
pub fn encode(record: &ShapeRecord, shape_type: ShapeType) -> Result<Vec<u8>> {
    shape_type.ensure_supported()?;
    if record.is_null() {
        return Err(ShapeError::UnsupportedGeometryType(
            "a Null geometry cannot be encoded as a concrete shape".to_string(),
        ));
    }
    if record.shape_type() != shape_type {
        return Err(ShapeError::UnsupportedGeometryType(format!(
            "cannot store a {} in a {} file",
            record.shape_type(),
            shape_type
        )));
    }

    let len = record_length_in_words(record) as usize * 2;
    let mut bow = ByteOrderWriter::new(Vec::with_capacity(len), Endianness::LittleEndian);
    bow.write_i32(shape_type.to_int())?;
    match record {
        ShapeRecord::Point(p) => {
            bow.write_f64(p.x)?;
            bow.write_f64(p.y)?;
        }
        ShapeRecord::MultiPoint(points) => {
            write_bbox(&mut bow, record.bounding_box())?;
            bow.write_i32(points.len() as i32)?;
            for p in points {
                bow.write_f64(p.x)?;
                bow.write_f64(p.y)?;
            }
        }
        ShapeRecord::PolyLine(shape) | ShapeRecord::Polygon(shape) => {
            shape.validate()?;
            write_bbox(&mut bow, record.bounding_box())?;
            bow.write_i32(shape.parts.len() as i32)?;
            bow.write_i32(shape.points.len() as i32)?;
            for part in &shape.parts {
                bow.write_i32(*part)?;
            }
            for p in &shape.points {
                bow.write_f64(p.x)?;
                bow.write_f64(p.y)?;
            }
        }
        ShapeRecord::Null => {}
    }
    Ok(bow.into_inner())
}

/// The content of a Null record: only its shape code.
pub fn null_content() -> Vec<u8> {
    vec![0u8; 4]
}

/// The encoded content length in 16-bit words, without the record header.
pub fn record_length_in_words(record: &ShapeRecord) -> i32 {
    match record {
        ShapeRecord::Null => 2,
        ShapeRecord::Point(_) => 10,
        ShapeRecord::MultiPoint(points) => 20 + 8 * points.len() as i32,
        ShapeRecord::PolyLine(shape) | ShapeRecord::Polygon(shape) => {
            22 + 2 * shape.parts.len() as i32 + 8 * shape.points.len() as i32
        }
    }
}

/// Reads and checks the record stored in `slot` for feature `oid`.
///
/// The record number must be `oid + 1`, the header's content length must
/// match the slot and, for a non-null shape, the length implied by its
/// vertex and part counts must match as well.
pub fn read_record<R: Read + Seek>(
    reader: &mut R,
    oid: u32,
    slot: IndexSlot,
    shape_type: ShapeType,
) -> Result<ShapeRecord> {
    if slot.length < 2 {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "record {} has an impossible content length of {} words",
            oid, slot.length
        )));
    }
    reader.seek(SeekFrom::Start(slot.offset as u64 * 2))?;
    let mut buf = vec![0u8; (RECORD_HEADER_LENGTH_IN_WORDS + slot.length) as usize * 2];
    reader.read_exact(&mut buf)?;

    let mut bor = ByteOrderReader::new(Cursor::new(&buf[0..8]), Endianness::BigEndian)?;
    let record_number = bor.read_i32()?;
    let content_length = bor.read_i32()?;
    if record_number != oid as i32 + 1 {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "expected record number {} at word offset {} but found {}",
            oid + 1,
            slot.offset,
            record_number
        )));
    }
    if content_length != slot.length {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "record {} is {} words long but the index says {}",
            oid + 1,
            content_length,
            slot.length
        )));
    }

    let record = decode(shape_type, &buf[8..])?;
    if !record.is_null() && record_length_in_words(&record) != slot.length {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "record {} decodes to {} words but the index says {}",
            oid + 1,
            record_length_in_words(&record),
            slot.length
        )));
    }
    Ok(record)
}

/// Writes a record header and content at `offset_words`.
pub fn write_record<W: Write + Seek>(
    writer: &mut W,
    offset_words: i32,
    oid: u32,
    content: &[u8],
) -> Result<()> {
    writer.seek(SeekFrom::Start(offset_words as u64 * 2))?;
    let mut bow = ByteOrderWriter::new(writer, Endianness::BigEndian);
    bow.write_i32(oid as i32 + 1)?;
    bow.write_i32((content.len() / 2) as i32)?;
    bow.write_bytes(content)
}

fn read_point<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> Result<Point2D> {
    Ok(Point2D {
        x: bor.read_f64()?,
        y: bor.read_f64()?,
    })
}

fn read_count<R: Read + Seek>(bor: &mut ByteOrderReader<R>, what: &str) -> Result<usize> {
    let n = bor.read_i32()?;
    if n < 0 {
        return Err(ShapeError::ShapeFileCorrupt(format!(
            "negative {} count ({})",
            what, n
        )));
    }
    Ok(n as usize)
}

fn ensure_available<R: Read + Seek>(bor: &ByteOrderReader<R>, needed: usize) -> Result<()> {
    if bor.remaining() < needed {
        return Err(ShapeError::TruncatedData(format!(
            "record needs {} more bytes but only {} remain",
            needed,
            bor.remaining()
        )));
    }
    Ok(())
}

fn write_bbox<W: Write>(bow: &mut ByteOrderWriter<W>, bbox: BoundingBox) -> Result<()> {
    if bbox.is_empty() {
        return bow.write_zeros(32);
    }
    bow.write_f64(bbox.min_x)?;
    bow.write_f64(bbox.min_y)?;
    bow.write_f64(bbox.max_x)?;
    bow.write_f64(bbox.max_y)
}
