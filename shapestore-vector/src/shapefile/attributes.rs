/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 07/10/2026
Last Modified: 17/10/2026
License: MIT

NOTE: Structures and functions for handling the Shapefile attribute table
contained within the associated .dbf file. Rows are fixed-width and aligned
one-to-one with feature ids.
*/
use super::locale::{language_driver_for_code_page, resolve_encoding, TextEncoding};
use chrono::prelude::*;
use chrono::NaiveDate;
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::utils::byte_codec::{read_f64_le, read_i32_le, write_f64_le, write_i32_le};
use shapestore_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{Cursor, SeekFrom};
use std::path::Path;
use tracing::debug;

const DBASE_VERSION: u8 = 3;
const FIELD_TERMINATOR: u8 = 0x0D;
const FILE_TERMINATOR: u8 = 0x1A;
const ROW_ACTIVE: u8 = 0x20;
const ROW_DELETED: u8 = 0x2A;
const MAX_FIELD_NAME_LENGTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
    /// 4-byte little-endian binary integer.
    Integer,
    /// 8-byte little-endian binary double.
    Double,
    Memo,
    Binary,
    General,
}

impl FieldType {
    pub fn from_char(c: char) -> Result<FieldType> {
        let ft = match c.to_ascii_uppercase() {
            'C' => FieldType::Character,
            'N' => FieldType::Numeric,
            'F' => FieldType::Float,
            'L' => FieldType::Logical,
            'D' => FieldType::Date,
            'I' => FieldType::Integer,
            'O' => FieldType::Double,
            'M' => FieldType::Memo,
            'B' => FieldType::Binary,
            'G' => FieldType::General,
            _ => {
                return Err(ShapeError::ShapeFileIsInvalid(format!(
                    "unknown dBase field type '{}'",
                    c
                )))
            }
        };
        Ok(ft)
    }

    pub fn to_char(&self) -> char {
        match self {
            FieldType::Character => 'C',
            FieldType::Numeric => 'N',
            FieldType::Float => 'F',
            FieldType::Logical => 'L',
            FieldType::Date => 'D',
            FieldType::Integer => 'I',
            FieldType::Double => 'O',
            FieldType::Memo => 'M',
            FieldType::Binary => 'B',
            FieldType::General => 'G',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int(i32),
    Int64(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Bool(bool),
    Blob(Vec<u8>),
    Null,
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldData::Int(v) => write!(f, "{}", v),
            FieldData::Int64(v) => write!(f, "{}", v),
            FieldData::Real(v) => write!(f, "{}", v),
            FieldData::Text(v) => write!(f, "{}", v),
            FieldData::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            FieldData::Bool(v) => write!(f, "{}", v),
            FieldData::Blob(v) => write!(f, "<{} bytes>", v.len()),
            FieldData::Null => write!(f, "null"),
        }
    }
}

/// A field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DbaseField {
    pub name: String,
    pub field_type: FieldType,
    pub length: u8,
    pub decimals: u8,
}

impl DbaseField {
    /// Names longer than ten bytes are truncated. Binary integer, double
    /// and date fields have fixed widths that override `length`.
    pub fn new(name: &str, field_type: FieldType, length: u8, decimals: u8) -> DbaseField {
        let mut name = name.to_string();
        while name.len() > MAX_FIELD_NAME_LENGTH {
            name.pop();
        }
        let length = match field_type {
            FieldType::Integer => 4,
            FieldType::Double => 8,
            FieldType::Date => 8,
            FieldType::Logical => 1,
            _ => length,
        };
        DbaseField {
            name,
            field_type,
            length,
            decimals,
        }
    }

    pub fn character(name: &str, length: u8) -> DbaseField {
        DbaseField::new(name, FieldType::Character, length, 0)
    }

    pub fn numeric(name: &str, length: u8, decimals: u8) -> DbaseField {
        DbaseField::new(name, FieldType::Numeric, length, decimals)
    }

    /// Decodes one field of a row.
    pub fn decode(&self, bytes: &[u8], encoding: TextEncoding) -> Result<FieldData> {
        match self.field_type {
            FieldType::Integer => return Ok(FieldData::Int(read_i32_le(bytes)?)),
            FieldType::Double => return Ok(FieldData::Real(read_f64_le(bytes)?)),
            _ => {}
        }

        let text = encoding.decode(bytes);
        let s = text.trim_matches(|c: char| c == ' ' || c == '\0');
        if s.is_empty() {
            return Ok(FieldData::Null);
        }
        let value = match self.field_type {
            FieldType::Numeric | FieldType::Float => {
                if s.chars().all(|c| c == '*' || c == '?') {
                    FieldData::Null
                } else if self.decimals > 0 || self.length >= 19 {
                    s.parse::<f64>().map(FieldData::Real).unwrap_or(FieldData::Null)
                } else if self.length < 10 {
                    s.parse::<i32>().map(FieldData::Int).unwrap_or(FieldData::Null)
                } else {
                    s.parse::<i64>().map(FieldData::Int64).unwrap_or(FieldData::Null)
                }
            }
            FieldType::Logical => match s.chars().next() {
                Some('T') | Some('t') | Some('Y') | Some('y') => FieldData::Bool(true),
                Some('F') | Some('f') | Some('N') | Some('n') => FieldData::Bool(false),
                _ => FieldData::Null,
            },
            FieldType::Date => NaiveDate::parse_from_str(s, "%Y%m%d")
                .map(FieldData::Date)
                .unwrap_or(FieldData::Null),
            FieldType::Memo | FieldType::Binary | FieldType::General => {
                FieldData::Blob(bytes.to_vec())
            }
            _ => FieldData::Text(text.trim_end_matches(|c: char| c == ' ' || c == '\0').to_string()),
        };
        Ok(value)
    }

    /// Encodes a value into exactly `length` bytes.
    pub fn encode(&self, value: &FieldData, encoding: TextEncoding) -> Result<Vec<u8>> {
        let width = self.length as usize;
        let mut out = vec![b' '; width];
        match (self.field_type, value) {
            (FieldType::Integer, FieldData::Null) | (FieldType::Double, FieldData::Null) => {
                out = vec![0u8; width];
            }
            (_, FieldData::Null) => {
                if self.field_type == FieldType::Logical {
                    out[0] = b'?';
                }
            }
            (FieldType::Integer, FieldData::Int(v)) => write_i32_le(&mut out, *v)?,
            (FieldType::Integer, FieldData::Int64(v)) => {
                let v = i32::try_from(*v).map_err(|_| self.overflow(&v.to_string()))?;
                write_i32_le(&mut out, v)?
            }
            (FieldType::Double, FieldData::Real(v)) => write_f64_le(&mut out, *v)?,
            (FieldType::Double, FieldData::Int(v)) => write_f64_le(&mut out, *v as f64)?,
            (FieldType::Double, FieldData::Int64(v)) => write_f64_le(&mut out, *v as f64)?,
            (FieldType::Numeric, _) | (FieldType::Float, _) => {
                let s = match value {
                    FieldData::Int(v) if self.decimals == 0 => v.to_string(),
                    FieldData::Int64(v) if self.decimals == 0 => v.to_string(),
                    FieldData::Int(v) => format!("{:.*}", self.decimals as usize, *v as f64),
                    FieldData::Int64(v) => format!("{:.*}", self.decimals as usize, *v as f64),
                    FieldData::Real(v) => format!("{:.*}", self.decimals as usize, v),
                    _ => return Err(self.mismatch(value)),
                };
                if s.len() > width {
                    return Err(self.overflow(&s));
                }
                // numbers are right-aligned
                out[width - s.len()..].copy_from_slice(s.as_bytes());
            }
            (FieldType::Logical, FieldData::Bool(v)) => out[0] = if *v { b'T' } else { b'F' },
            (FieldType::Date, FieldData::Date(d)) => {
                let s = d.format("%Y%m%d").to_string();
                if s.len() > width {
                    return Err(self.overflow(&s));
                }
                out[..s.len()].copy_from_slice(s.as_bytes());
            }
            (FieldType::Character, FieldData::Text(s)) => {
                let bytes = encoding.encode(s);
                let n = truncated_len(&bytes, width, encoding);
                out[..n].copy_from_slice(&bytes[..n]);
            }
            (FieldType::Character, FieldData::Int(_))
            | (FieldType::Character, FieldData::Int64(_))
            | (FieldType::Character, FieldData::Real(_)) => {
                let s = value.to_string();
                if s.len() > width {
                    return Err(self.overflow(&s));
                }
                out[..s.len()].copy_from_slice(s.as_bytes());
            }
            (FieldType::Memo, FieldData::Blob(b))
            | (FieldType::Binary, FieldData::Blob(b))
            | (FieldType::General, FieldData::Blob(b)) => {
                if b.len() > width {
                    return Err(self.overflow(&format!("{} bytes", b.len())));
                }
                out[..b.len()].copy_from_slice(b);
            }
            _ => return Err(self.mismatch(value)),
        }
        Ok(out)
    }

    fn overflow(&self, text: &str) -> ShapeError {
        ShapeError::InvalidOperation(format!(
            "value {} does not fit in field {} (width {})",
            text, self.name, self.length
        ))
    }

    fn mismatch(&self, value: &FieldData) -> ShapeError {
        ShapeError::InvalidOperation(format!(
            "cannot store {:?} in {} field {}",
            value,
            self.field_type.to_char(),
            self.name
        ))
    }
}

/// Longest prefix of `bytes` fitting `width` without splitting a UTF-8
/// character.
fn truncated_len(bytes: &[u8], width: usize, encoding: TextEncoding) -> usize {
    if bytes.len() <= width {
        return bytes.len();
    }
    let mut n = width;
    if matches!(encoding, TextEncoding::Utf8 | TextEncoding::Unsupported(_)) {
        // continuation bytes look like 0b10xxxxxx
        while n > 0 && (bytes[n] & 0xC0) == 0x80 {
            n -= 1;
        }
    }
    n
}

/// The fixed part of a .dbf header plus its field descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct DbaseHeader {
    pub version: u8,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    pub header_length: u16,
    pub record_length: u16,
    pub language_driver_id: u8,
    pub fields: Vec<DbaseField>,
}

impl DbaseHeader {
    pub fn new(fields: Vec<DbaseField>, language_driver_id: u8) -> Result<DbaseHeader> {
        for (i, f) in fields.iter().enumerate() {
            if f.name.is_empty() {
                return Err(ShapeError::InvalidOperation(format!(
                    "field {} has an empty name",
                    i
                )));
            }
            if f.length == 0 {
                return Err(ShapeError::InvalidOperation(format!(
                    "field {} has zero width",
                    f.name
                )));
            }
            if fields[..i]
                .iter()
                .any(|o| o.name.eq_ignore_ascii_case(&f.name))
            {
                return Err(ShapeError::InvalidOperation(format!(
                    "duplicate field name {}",
                    f.name
                )));
            }
        }
        let record_length: usize = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
        let header_length = 32 + 32 * fields.len() + 1;
        if record_length > u16::MAX as usize || header_length > u16::MAX as usize {
            return Err(ShapeError::InvalidOperation(
                "too many attribute fields".to_string(),
            ));
        }
        let today = Local::now();
        Ok(DbaseHeader {
            version: DBASE_VERSION,
            year: today.year() as u32,
            month: today.month() as u8,
            day: today.day() as u8,
            num_records: 0,
            header_length: header_length as u16,
            record_length: record_length as u16,
            language_driver_id,
            fields,
        })
    }

    /// Reads the header and field descriptors from the start of a stream.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<DbaseHeader> {
        let mut bor = ByteOrderReader::new(reader, Endianness::LittleEndian)?;
        if bor.len() < 33 {
            return Err(ShapeError::ShapeFileIsInvalid(
                "attribute file is too short to hold a header".to_string(),
            ));
        }
        let version = bor.read_u8()?;
        let year = 1900u32 + bor.read_u8()? as u32;
        let month = bor.read_u8()?;
        let day = bor.read_u8()?;
        let num_records = bor.read_u32()?;
        let header_length = bor.read_u16()?;
        let record_length = bor.read_u16()?;
        // reserved, transaction and encryption flags, multi-user space, mdx flag
        bor.seek(29)?;
        let language_driver_id = bor.read_u8()?;
        bor.seek(32)?;

        let mut fields = vec![];
        while bor.pos() + 32 <= header_length as usize && bor.peek_u8()? != FIELD_TERMINATOR {
            let name_bytes = bor.read_bytes(11)?;
            let end = name_bytes.iter().position(|b| *b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&name_bytes[..end]).trim().to_string();
            let field_type = FieldType::from_char(bor.read_u8()? as char)?;
            bor.inc_pos(4)?;
            let length = bor.read_u8()?;
            let decimals = bor.read_u8()?;
            bor.inc_pos(14)?;
            fields.push(DbaseField {
                name,
                field_type,
                length,
                decimals,
            });
        }

        let expected: usize = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
        if expected != record_length as usize {
            return Err(ShapeError::ShapeFileIsInvalid(format!(
                "attribute record length is {} but the fields need {}",
                record_length, expected
            )));
        }
        Ok(DbaseHeader {
            version,
            year,
            month,
            day,
            num_records,
            header_length,
            record_length,
            language_driver_id,
            fields,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bow = ByteOrderWriter::new(
            Vec::with_capacity(self.header_length as usize),
            Endianness::LittleEndian,
        );
        bow.write_u8(self.version)?;
        bow.write_u8(self.year.saturating_sub(1900).min(255) as u8)?;
        bow.write_u8(self.month)?;
        bow.write_u8(self.day)?;
        bow.write_u32(self.num_records)?;
        bow.write_u16(self.header_length)?;
        bow.write_u16(self.record_length)?;
        bow.write_zeros(17)?;
        bow.write_u8(self.language_driver_id)?;
        bow.write_zeros(2)?;

        for field in &self.fields {
            let mut name = field.name.as_bytes().to_vec();
            name.resize(11, 0u8);
            bow.write_bytes(&name)?;
            bow.write_u8(field.field_type.to_char() as u8)?;
            bow.write_zeros(4)?;
            bow.write_u8(field.length)?;
            bow.write_u8(field.decimals)?;
            bow.write_zeros(14)?;
        }
        bow.write_u8(FIELD_TERMINATOR)?;

        // pad to the declared length in case other software reserved space
        let pad = (self.header_length as usize).saturating_sub(bow.len());
        bow.write_zeros(pad)?;
        Ok(bow.into_inner())
    }

    /// Case-insensitive field lookup.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn touch(&mut self) {
        let today = Local::now();
        self.year = today.year() as u32;
        self.month = today.month() as u8;
        self.day = today.day() as u8;
    }
}

/// A .dbf file opened for row-level access.
pub struct DbaseFile {
    file: File,
    header: DbaseHeader,
    encoding: TextEncoding,
    writable: bool,
}

impl DbaseFile {
    /// Creates an empty attribute file with the given schema.
    pub fn create<P: AsRef<Path>>(path: P, fields: Vec<DbaseField>, code_page: u16) -> Result<DbaseFile> {
        let header = DbaseHeader::new(fields, language_driver_for_code_page(code_page))?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.write_all(&header.to_bytes()?)?;
        file.write_all(&[FILE_TERMINATOR])?;
        Ok(DbaseFile {
            file,
            header,
            encoding: TextEncoding::from_code_page(code_page),
            writable: true,
        })
    }

    /// Opens an attribute file. `encoding` (from a .cpg side-car) overrides
    /// the header's language driver; `default_code_page` applies when
    /// neither names one.
    pub fn open<P: AsRef<Path>>(
        path: P,
        writable: bool,
        encoding: Option<TextEncoding>,
        default_code_page: u16,
    ) -> Result<DbaseFile> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path.as_ref())?;
        let header = DbaseHeader::read(&mut file)?;
        let encoding = match encoding {
            Some(e) => e,
            None => resolve_encoding(None, header.language_driver_id, default_code_page),
        };
        debug!(
            "Opened {} with {} fields, {} rows, {}",
            path.as_ref().display(),
            header.fields.len(),
            header.num_records,
            encoding
        );
        Ok(DbaseFile {
            file,
            header,
            encoding,
            writable,
        })
    }

    pub fn header(&self) -> &DbaseHeader {
        &self.header
    }

    pub fn fields(&self) -> &[DbaseField] {
        &self.header.fields
    }

    pub fn num_records(&self) -> u32 {
        self.header.num_records
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn row_offset(&self, oid: u32) -> u64 {
        self.header.header_length as u64 + oid as u64 * self.header.record_length as u64
    }

    fn check_row(&self, oid: u32) -> Result<()> {
        if oid >= self.header.num_records {
            return Err(ShapeError::FeatureNotFound(oid));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if !self.writable {
            return Err(ShapeError::InvalidOperation(
                "the attribute file was opened in read-only mode".to_string(),
            ));
        }
        Ok(())
    }

    fn read_raw_row(&self, oid: u32) -> Result<Vec<u8>> {
        self.check_row(oid)?;
        let mut f = &self.file;
        f.seek(SeekFrom::Start(self.row_offset(oid)))?;
        let mut buf = vec![0u8; self.header.record_length as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decodes row `oid`. Tombstoned rows are still returned.
    pub fn read_row(&self, oid: u32) -> Result<Vec<FieldData>> {
        let buf = self.read_raw_row(oid)?;
        let mut values = Vec::with_capacity(self.header.fields.len());
        let mut pos = 1usize;
        for field in &self.header.fields {
            let end = pos + field.length as usize;
            values.push(field.decode(&buf[pos..end], self.encoding)?);
            pos = end;
        }
        Ok(values)
    }

    pub fn is_deleted(&self, oid: u32) -> Result<bool> {
        let buf = self.read_raw_row(oid)?;
        Ok(buf[0] == ROW_DELETED)
    }

    /// Encodes a full row, deletion flag included, without writing it. An
    /// empty `values` slice encodes a row of nulls.
    pub fn encode_row(&self, values: &[FieldData]) -> Result<Vec<u8>> {
        if !values.is_empty() && values.len() != self.header.fields.len() {
            return Err(ShapeError::InvalidOperation(format!(
                "row has {} values but the table has {} fields",
                values.len(),
                self.header.fields.len()
            )));
        }
        let mut row = Vec::with_capacity(self.header.record_length as usize);
        row.push(ROW_ACTIVE);
        for (i, field) in self.header.fields.iter().enumerate() {
            let value = values.get(i).unwrap_or(&FieldData::Null);
            row.extend(field.encode(value, self.encoding)?);
        }
        Ok(row)
    }

    /// Appends a row and returns its index.
    pub fn append_row(&mut self, values: &[FieldData]) -> Result<u32> {
        self.check_writable()?;
        let row = self.encode_row(values)?;
        let oid = self.header.num_records;
        let offset = self.row_offset(oid);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&row)?;
        self.file.write_all(&[FILE_TERMINATOR])?;
        self.header.num_records += 1;
        self.flush_header()?;
        Ok(oid)
    }

    /// Overwrites the values of row `oid`, keeping its deletion flag.
    pub fn write_row(&mut self, oid: u32, values: &[FieldData]) -> Result<()> {
        self.check_writable()?;
        self.check_row(oid)?;
        let row = self.encode_row(values)?;
        let offset = self.row_offset(oid) + 1;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&row[1..])?;
        self.flush_header()
    }

    pub fn set_deleted(&mut self, oid: u32, deleted: bool) -> Result<()> {
        self.check_writable()?;
        self.check_row(oid)?;
        let offset = self.row_offset(oid);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(&[if deleted { ROW_DELETED } else { ROW_ACTIVE }])?;
        Ok(())
    }

    /// Rewrites the header with today's date and the current row count.
    pub fn flush_header(&mut self) -> Result<()> {
        self.check_writable()?;
        self.header.touch();
        let bytes = self.header.to_bytes()?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Decodes a header held in memory; used by tools that only need the schema.
pub fn read_header_from_bytes(bytes: &[u8]) -> Result<DbaseHeader> {
    DbaseHeader::read(&mut Cursor::new(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    fn schema() -> Vec<DbaseField> {
        vec![
            DbaseField::character("NAME", 12),
            DbaseField::numeric("COUNT", 6, 0),
            DbaseField::numeric("BIG", 15, 0),
            DbaseField::numeric("AREA", 10, 2),
            DbaseField::new("VISITED", FieldType::Logical, 1, 0),
            DbaseField::new("SURVEYED", FieldType::Date, 8, 0),
            DbaseField::new("CODE", FieldType::Integer, 4, 0),
        ]
    }

    fn row() -> Vec<FieldData> {
        vec![
            FieldData::Text("Lake Erie".to_string()),
            FieldData::Int(42),
            FieldData::Int64(12345678901),
            FieldData::Real(3.25),
            FieldData::Bool(true),
            FieldData::Date(NaiveDate::from_ymd_opt(2021, 7, 4).unwrap()),
            FieldData::Int(-7),
        ]
    }

    #[test]
    fn test_header_layout() {
        let header = DbaseHeader::new(schema(), 0x57).unwrap();
        assert_eq!(header.header_length, 32 + 7 * 32 + 1);
        assert_eq!(header.record_length, 1 + 12 + 6 + 15 + 10 + 1 + 8 + 4);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), header.header_length as usize);
        assert_eq!(bytes[29], 0x57);
        assert_eq!(bytes[32 + 11], b'C');
        assert_eq!(*bytes.last().unwrap(), 0x0D);

        let parsed = read_header_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.field_index("area"), Some(3));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let f = DbaseField::character("POPULATION_2020", 10);
        assert_eq!(f.name, "POPULATION");
        assert!(DbaseHeader::new(vec![f.clone(), f], 0).is_err());
    }

    #[test]
    fn test_numeric_scaling() {
        let enc = TextEncoding::Utf8;
        let small = DbaseField::numeric("A", 9, 0);
        let medium = DbaseField::numeric("B", 18, 0);
        let wide = DbaseField::numeric("C", 20, 0);
        let real = DbaseField::numeric("D", 9, 3);
        assert_eq!(small.decode(b"      123", enc).unwrap(), FieldData::Int(123));
        assert_eq!(
            medium.decode(b"       12345678901", enc).unwrap(),
            FieldData::Int64(12345678901)
        );
        assert_eq!(wide.decode(b"                   5", enc).unwrap(), FieldData::Real(5.0));
        assert_eq!(real.decode(b"    1.500", enc).unwrap(), FieldData::Real(1.5));
        assert_eq!(small.decode(b"*********", enc).unwrap(), FieldData::Null);
        assert_eq!(small.decode(b"         ", enc).unwrap(), FieldData::Null);
    }

    #[test]
    fn test_encode_values() {
        let enc = TextEncoding::Utf8;
        let real = DbaseField::numeric("D", 8, 2);
        assert_eq!(real.encode(&FieldData::Real(3.14159), enc).unwrap(), b"    3.14");
        assert_eq!(real.encode(&FieldData::Int(2), enc).unwrap(), b"    2.00");
        assert!(matches!(
            real.encode(&FieldData::Real(123456.0), enc),
            Err(ShapeError::InvalidOperation(_))
        ));
        assert!(real.encode(&FieldData::Text("x".to_string()), enc).is_err());

        let text = DbaseField::character("T", 4);
        assert_eq!(text.encode(&FieldData::Text("ab".to_string()), enc).unwrap(), b"ab  ");
        // a two-byte character is not split at the field boundary
        assert_eq!(
            text.encode(&FieldData::Text("abc\u{e9}".to_string()), enc).unwrap(),
            b"abc "
        );
        let logical = DbaseField::new("L", FieldType::Logical, 1, 0);
        assert_eq!(logical.encode(&FieldData::Null, enc).unwrap(), b"?");
        assert_eq!(logical.decode(b"?", enc).unwrap(), FieldData::Null);
    }

    #[test]
    fn test_rows_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lakes.dbf");
        let mut dbf = DbaseFile::create(&path, schema(), 1252).unwrap();
        assert_eq!(dbf.append_row(&row()).unwrap(), 0);
        assert_eq!(dbf.append_row(&[]).unwrap(), 1);
        assert!(dbf.append_row(&row()[..3]).is_err());
        drop(dbf);

        let mut dbf = DbaseFile::open(&path, true, None, 65001).unwrap();
        assert_eq!(dbf.encoding(), TextEncoding::Windows1252);
        assert_eq!(dbf.num_records(), 2);
        assert_eq!(dbf.read_row(0).unwrap(), row());
        assert!(dbf.read_row(1).unwrap().iter().all(|v| *v == FieldData::Null || *v == FieldData::Int(0)));

        let mut changed = row();
        changed[0] = FieldData::Text("Caf\u{e9}".to_string());
        dbf.write_row(1, &changed).unwrap();
        dbf.set_deleted(0, true).unwrap();
        assert!(dbf.is_deleted(0).unwrap());
        assert!(!dbf.is_deleted(1).unwrap());
        assert_eq!(dbf.read_row(0).unwrap(), row());
        assert_eq!(dbf.read_row(1).unwrap(), changed);
        assert!(matches!(dbf.read_row(2), Err(ShapeError::FeatureNotFound(2))));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(*bytes.last().unwrap(), 0x1A);
        let header = read_header_from_bytes(&bytes).unwrap();
        assert_eq!(header.num_records, 2);
        assert_eq!(
            bytes.len(),
            header.header_length as usize + 2 * header.record_length as usize + 1
        );
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbf");
        DbaseFile::create(&path, schema(), 65001).unwrap();
        let mut dbf = DbaseFile::open(&path, false, Some(TextEncoding::Utf8), 65001).unwrap();
        assert!(matches!(
            dbf.append_row(&row()),
            Err(ShapeError::InvalidOperation(_))
        ));
    }
}
