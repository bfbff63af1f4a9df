use std::io::Write;

use cgmath::{Point3, Vector3};

use super::FormatError;

/// Appends little-endian primitives to an output sink.
pub struct MsneWriter<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> MsneWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Number of bytes appended so far.
    pub fn position(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        self.inner.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), FormatError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), FormatError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a one-byte boolean (0 or 1).
    pub fn write_bool(&mut self, value: bool) -> Result<(), FormatError> {
        self.write_bytes(&[value as u8])
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), FormatError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32s(&mut self, values: &[f32]) -> Result<(), FormatError> {
        values.iter().try_for_each(|&v| self.write_f32(v))
    }

    /// Writes a collection length as a u32 count.
    pub fn write_count(&mut self, count: usize) -> Result<(), FormatError> {
        let count = u32::try_from(count).map_err(|_| {
            FormatError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("count {} does not fit in u32", count),
            ))
        })?;
        self.write_u32(count)
    }

    pub fn write_point3(&mut self, p: Point3<f32>) -> Result<(), FormatError> {
        self.write_f32s(&[p.x, p.y, p.z])
    }

    pub fn write_vector3(&mut self, v: Vector3<f32>) -> Result<(), FormatError> {
        self.write_f32s(&[v.x, v.y, v.z])
    }
}
