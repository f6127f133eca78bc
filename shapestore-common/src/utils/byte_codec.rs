/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 03/10/2026
Last Modified: 03/10/2026
License: MIT

Notes: Stateless slice codecs for the fixed-offset fields of Shapefile and
DBase headers. Record headers are big-endian; shape content and DBase binary
numerics are little-endian.
*/
use crate::error::{Result, ShapeError};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

fn check_len(bytes: &[u8], needed: usize) -> Result<()> {
    if bytes.len() < needed {
        return Err(ShapeError::TruncatedData(format!(
            "needed {} bytes but only {} are available",
            needed,
            bytes.len()
        )));
    }
    Ok(())
}

pub fn read_i32_be(bytes: &[u8]) -> Result<i32> {
    check_len(bytes, 4)?;
    Ok(BigEndian::read_i32(bytes))
}

pub fn read_i32_le(bytes: &[u8]) -> Result<i32> {
    check_len(bytes, 4)?;
    Ok(LittleEndian::read_i32(bytes))
}

pub fn read_u16_le(bytes: &[u8]) -> Result<u16> {
    check_len(bytes, 2)?;
    Ok(LittleEndian::read_u16(bytes))
}

pub fn read_u32_le(bytes: &[u8]) -> Result<u32> {
    check_len(bytes, 4)?;
    Ok(LittleEndian::read_u32(bytes))
}

pub fn read_f64_le(bytes: &[u8]) -> Result<f64> {
    check_len(bytes, 8)?;
    Ok(LittleEndian::read_f64(bytes))
}

pub fn write_i32_be(bytes: &mut [u8], value: i32) -> Result<()> {
    check_len(bytes, 4)?;
    BigEndian::write_i32(bytes, value);
    Ok(())
}

pub fn write_i32_le(bytes: &mut [u8], value: i32) -> Result<()> {
    check_len(bytes, 4)?;
    LittleEndian::write_i32(bytes, value);
    Ok(())
}

pub fn write_u16_le(bytes: &mut [u8], value: u16) -> Result<()> {
    check_len(bytes, 2)?;
    LittleEndian::write_u16(bytes, value);
    Ok(())
}

pub fn write_u32_le(bytes: &mut [u8], value: u32) -> Result<()> {
    check_len(bytes, 4)?;
    LittleEndian::write_u32(bytes, value);
    Ok(())
}

pub fn write_f64_le(bytes: &mut [u8], value: f64) -> Result<()> {
    check_len(bytes, 8)?;
    LittleEndian::write_f64(bytes, value);
    Ok(())
}
