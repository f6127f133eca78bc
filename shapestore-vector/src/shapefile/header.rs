/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 05/10/2026
Last Modified: 14/10/2026
License: MIT
*/
use super::geometry::ShapeType;
use super::{FILE_CODE, HEADER_LENGTH_IN_BYTES, HEADER_LENGTH_IN_WORDS, SHAPEFILE_VERSION};
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::BoundingBox;
use shapestore_common::utils::byte_codec::*;
use std::fmt;
use std::io::prelude::*;
use std::io::SeekFrom;
use tracing::warn;

/// The 100-byte header shared by .shp and .shx files.
///
/// Offsets 0 and 24 are big-endian; everything from offset 28 on is
/// little-endian. The Z and M ranges (offsets 68 to 99) are always written
/// as zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapefileHeader {
    /// File length in 16-bit words, header included.
    pub file_length: i32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Default for ShapefileHeader {
    fn default() -> ShapefileHeader {
        ShapefileHeader {
            file_length: HEADER_LENGTH_IN_WORDS,
            version: SHAPEFILE_VERSION,
            shape_type: ShapeType::Null,
            x_min: 0f64,
            y_min: 0f64,
            x_max: 0f64,
            y_max: 0f64,
        }
    }
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "file_length: {}
version: {}
shape_type: {}
x_min: {}
x_max: {}
y_min: {}
y_max: {}",
            self.file_length,
            self.version,
            self.shape_type,
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max
        )
    }
}

impl ShapefileHeader {
    pub fn new(shape_type: ShapeType) -> ShapefileHeader {
        ShapefileHeader {
            shape_type,
            ..Default::default()
        }
    }

    /// Decodes a header from the first 100 bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<ShapefileHeader> {
        if bytes.len() < HEADER_LENGTH_IN_BYTES {
            return Err(ShapeError::ShapeFileIsInvalid(format!(
                "file is {} bytes long, shorter than the {}-byte header",
                bytes.len(),
                HEADER_LENGTH_IN_BYTES
            )));
        }
        let file_code = read_i32_be(&bytes[0..])?;
        if file_code != FILE_CODE {
            return Err(ShapeError::ShapeFileIsInvalid(format!(
                "bad file code {} (expected {})",
                file_code, FILE_CODE
            )));
        }
        let version = read_i32_le(&bytes[28..])?;
        if version != SHAPEFILE_VERSION {
            warn!("Unexpected Shapefile version {}", version);
        }
        Ok(ShapefileHeader {
            file_length: read_i32_be(&bytes[24..])?,
            version,
            shape_type: ShapeType::from_int(read_i32_le(&bytes[32..])?)?,
            x_min: read_f64_le(&bytes[36..])?,
            y_min: read_f64_le(&bytes[44..])?,
            x_max: read_f64_le(&bytes[52..])?,
            y_max: read_f64_le(&bytes[60..])?,
        })
    }

    /// Reads the header from the start of a stream.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<ShapefileHeader> {
        reader.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::with_capacity(HEADER_LENGTH_IN_BYTES);
        reader
            .by_ref()
            .take(HEADER_LENGTH_IN_BYTES as u64)
            .read_to_end(&mut bytes)?;
        ShapefileHeader::parse(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; HEADER_LENGTH_IN_BYTES];
        write_i32_be(&mut bytes[0..], FILE_CODE)?;
        write_i32_be(&mut bytes[24..], self.file_length)?;
        write_i32_le(&mut bytes[28..], self.version)?;
        write_i32_le(&mut bytes[32..], self.shape_type.to_int())?;
        write_f64_le(&mut bytes[36..], self.x_min)?;
        write_f64_le(&mut bytes[44..], self.y_min)?;
        write_f64_le(&mut bytes[52..], self.x_max)?;
        write_f64_le(&mut bytes[60..], self.y_max)?;
        Ok(bytes)
    }

    /// Writes the full header at offset 0, leaving the stream just past it.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// The stored envelope as read from disk. An all-zero envelope means
    /// the file is empty, so a file whose only features sit at the origin
    /// also reads as empty.
    pub fn bounding_box(&self) -> BoundingBox {
        if self.x_min == 0f64 && self.y_min == 0f64 && self.x_max == 0f64 && self.y_max == 0f64 {
            return BoundingBox::empty();
        }
        BoundingBox::new(self.x_min, self.x_max, self.y_min, self.y_max)
    }

    pub fn set_bounding_box(&mut self, bbox: BoundingBox) {
        if bbox.is_empty() {
            self.x_min = 0f64;
            self.y_min = 0f64;
            self.x_max = 0f64;
            self.y_max = 0f64;
        } else {
            self.x_min = bbox.min_x;
            self.y_min = bbox.min_y;
            self.x_max = bbox.max_x;
            self.y_max = bbox.max_y;
        }
    }
}

#[cfg(test)]
mod test {
    use super::ShapefileHeader;
    use crate::shapefile::geometry::ShapeType;
    use shapestore_common::error::ShapeError;
    use shapestore_common::structures::BoundingBox;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let mut header = ShapefileHeader::new(ShapeType::Polygon);
        header.file_length = 1234;
        header.set_bounding_box(BoundingBox::new(-1.0, 2.0, -3.0, 4.0));
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 100);
        assert_eq!(&bytes[0..4], &[0, 0, 0x27, 0x0a]);
        assert_eq!(&bytes[24..28], &1234i32.to_be_bytes());
        assert_eq!(&bytes[28..32], &1000i32.to_le_bytes());
        assert_eq!(&bytes[32..36], &5i32.to_le_bytes());
        assert!(bytes[68..100].iter().all(|b| *b == 0));

        let mut cursor = Cursor::new(bytes);
        assert_eq!(ShapefileHeader::read(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_zero_envelope_is_empty() {
        let mut header = ShapefileHeader::new(ShapeType::Point);
        assert!(header.bounding_box().is_empty());
        header.set_bounding_box(BoundingBox::new(1.0, 1.0, 2.0, 2.0));
        assert_eq!(header.x_min, 1.0);
        assert_eq!(header.y_max, 2.0);
        header.set_bounding_box(BoundingBox::empty());
        assert_eq!((header.x_min, header.y_min, header.x_max, header.y_max), (0.0, 0.0, 0.0, 0.0));
        header.set_bounding_box(BoundingBox::new(0.0, 5.0, 0.0, 0.0));
        assert_eq!(header.bounding_box(), BoundingBox::new(0.0, 5.0, 0.0, 0.0));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = ShapefileHeader::new(ShapeType::Point).to_bytes().unwrap();
        bytes[3] = 0;
        assert!(matches!(
            ShapefileHeader::parse(&bytes),
            Err(ShapeError::ShapeFileIsInvalid(_))
        ));
        assert!(matches!(
            ShapefileHeader::parse(&bytes[..50]),
            Err(ShapeError::ShapeFileIsInvalid(_))
        ));
    }
}
