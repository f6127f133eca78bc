use super::byte_order_reader::Endianness;
use crate::error::Result;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::prelude::*;

pub struct ByteOrderWriter<W: Write> {
    is_le: bool,
    writer: W,
    num_bytes_written: usize,
}

impl<W: Write> ByteOrderWriter<W> {
    pub fn new(writer: W, byte_order: Endianness) -> ByteOrderWriter<W> {
        ByteOrderWriter::<W> {
            writer,
            is_le: byte_order == Endianness::LittleEndian,
            num_bytes_written: 0,
        }
    }

    pub fn get_num_bytes_written(&self) -> usize {
        self.num_bytes_written
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.num_bytes_written += 1;
        self.writer.write_u8(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.num_bytes_written += bytes.len();
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Writes `count` zero bytes; used for reserved header space.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        self.write_bytes(&vec![0u8; count])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.num_bytes_written += 2;
        if self.is_le {
            self.writer.write_u16::<LittleEndian>(value)?;
        } else {
            self.writer.write_u16::<BigEndian>(value)?;
        }
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.num_bytes_written += 4;
        if self.is_le {
            self.writer.write_u32::<LittleEndian>(value)?;
        } else {
            self.writer.write_u32::<BigEndian>(value)?;
        }
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.num_bytes_written += 8;
        if self.is_le {
            self.writer.write_u64::<LittleEndian>(value)?;
        } else {
            self.writer.write_u64::<BigEndian>(value)?;
        }
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.num_bytes_written += 4;
        if self.is_le {
            self.writer.write_i32::<LittleEndian>(value)?;
        } else {
            self.writer.write_i32::<BigEndian>(value)?;
        }
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.num_bytes_written += 8;
        if self.is_le {
            self.writer.write_f64::<LittleEndian>(value)?;
        } else {
            self.writer.write_f64::<BigEndian>(value)?;
        }
        Ok(())
    }

    /// Returns the number of bytes written
    pub fn len(&self) -> usize {
        self.num_bytes_written
    }

    pub fn is_empty(&self) -> bool {
        self.num_bytes_written == 0
    }

    pub fn get_inner(&mut self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod test {
    use super::ByteOrderWriter;
    use crate::utils::Endianness;

    #[test]
    fn test_switching_byte_order() {
        let mut bow = ByteOrderWriter::new(Vec::<u8>::new(), Endianness::BigEndian);
        bow.write_i32(9994).unwrap();
        bow.set_byte_order(Endianness::LittleEndian);
        bow.write_i32(1000).unwrap();
        bow.write_zeros(2).unwrap();
        assert_eq!(bow.len(), 10);
        assert_eq!(
            bow.into_inner(),
            vec![0u8, 0, 0x27, 0x0a, 0xe8, 0x03, 0, 0, 0, 0]
        );
    }
}
