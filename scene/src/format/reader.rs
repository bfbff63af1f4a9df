//! Conforming MSNE reader.
//!
//! Parses the fixed section grammar back into plain records. Used to inspect
//! exported files and to check the encoder.

use std::io::{Cursor, Read};

use super::{FormatError, VariantKind, MAGIC};

/// Decoded texture pools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TexturePools {
    pub scalars: Vec<f32>,
    pub pairs: Vec<[f32; 2]>,
    pub triples: Vec<[f32; 3]>,
    pub dds_count: u32,
}

impl TexturePools {
    pub fn total_count(&self) -> usize {
        self.scalars.len() + self.pairs.len() + self.triples.len()
    }

    /// Looks up a constant by global texture index.
    pub fn get(&self, index: u32) -> Option<TextureValue> {
        let mut index = index as usize;
        if let Some(&v) = self.scalars.get(index) {
            return Some(TextureValue::Scalar(v));
        }
        index -= self.scalars.len();
        if let Some(&v) = self.pairs.get(index) {
            return Some(TextureValue::Pair(v));
        }
        index -= self.pairs.len();
        self.triples.get(index).map(|&v| TextureValue::Triple(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureValue {
    Scalar(f32),
    Pair([f32; 2]),
    Triple([f32; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbrRecord {
    pub color: u32,
    pub metalness: u32,
    pub roughness: u32,
    pub ior: f32,
}

/// Per-kind variant tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantTables {
    /// IOR per glass variant.
    pub glass: Vec<f32>,
    /// Colour texture per Lambert variant.
    pub lambert: Vec<u32>,
    pub mirror_count: u32,
    pub pbr: Vec<PbrRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialRecord {
    pub normal: u32,
    pub emissive: u32,
    pub kind: VariantKind,
    pub variant_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRecord {
    pub triangles: Vec<[u32; 3]>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub has_texcoords: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceRecord {
    /// Top three rows of the world transform, row-major.
    pub transform: [f32; 12],
    pub visible: bool,
    pub geometry_count: u32,
    pub mesh: u32,
    pub material: u32,
    pub sampled: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensRecord {
    pub origin: [f32; 3],
    pub forward: [f32; 3],
    pub up: [f32; 3],
    pub vfov: f32,
    pub aspect: f32,
    pub aperture: f32,
    pub focus_distance: f32,
}

/// Byte offset of each section, for inspection tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionOffsets {
    pub textures: u64,
    pub variants: u64,
    pub materials: u64,
    pub meshes: u64,
    pub instances: u64,
    pub camera: u64,
    pub end: u64,
}

/// A fully decoded MSNE file.
#[derive(Debug, Clone, PartialEq)]
pub struct MsneFile {
    pub textures: TexturePools,
    pub variants: VariantTables,
    pub materials: Vec<MaterialRecord>,
    pub meshes: Vec<MeshRecord>,
    pub instances: Vec<InstanceRecord>,
    pub camera: LensRecord,
    pub offsets: SectionOffsets,
}

/// Reads little-endian primitives, mirroring [`super::writer::MsneWriter`].
pub struct MsneReader<R: Read> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> MsneReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.bytes_read
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut bytes = [0u8; N];
        self.inner.read_exact(&mut bytes)?;
        self.bytes_read += N as u64;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        match self.read_array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(FormatError::InvalidBool(other)),
        }
    }

    pub fn read_f32x<const N: usize>(&mut self) -> Result<[f32; N], FormatError> {
        let mut values = [0.0; N];
        for value in &mut values {
            *value = self.read_f32()?;
        }
        Ok(values)
    }

    /// Reads a u32 count followed by that many elements.
    fn read_list<T>(
        &mut self,
        mut read_one: impl FnMut(&mut Self) -> Result<T, FormatError>,
    ) -> Result<Vec<T>, FormatError> {
        let count = self.read_u32()? as usize;
        // Counts are untrusted; cap the preallocation.
        let mut items = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            items.push(read_one(self)?);
        }
        Ok(items)
    }
}

/// Decodes a complete MSNE file from memory.
pub fn read_msne(bytes: &[u8]) -> Result<MsneFile, FormatError> {
    let mut reader = MsneReader::new(Cursor::new(bytes));

    if reader.read_array::<4>()? != MAGIC {
        return Err(FormatError::InvalidMagic);
    }

    let mut offsets = SectionOffsets {
        textures: reader.position(),
        ..Default::default()
    };
    let textures = read_textures(&mut reader)?;

    offsets.variants = reader.position();
    let variants = VariantTables {
        glass: reader.read_list(|r| r.read_f32())?,
        lambert: reader.read_list(|r| r.read_u32())?,
        mirror_count: reader.read_u32()?,
        pbr: reader.read_list(|r| {
            Ok(PbrRecord {
                color: r.read_u32()?,
                metalness: r.read_u32()?,
                roughness: r.read_u32()?,
                ior: r.read_f32()?,
            })
        })?,
    };

    offsets.materials = reader.position();
    let materials = reader.read_list(|r| {
        let normal = r.read_u32()?;
        let emissive = r.read_u32()?;
        let code = r.read_u64()?;
        let kind = VariantKind::try_from(code)?;
        Ok(MaterialRecord {
            normal,
            emissive,
            kind,
            variant_index: r.read_u64()?,
        })
    })?;

    offsets.meshes = reader.position();
    let meshes = reader.read_list(read_mesh)?;

    offsets.instances = reader.position();
    let instances = reader.read_list(|r| {
        Ok(InstanceRecord {
            transform: r.read_f32x()?,
            visible: r.read_bool()?,
            geometry_count: r.read_u32()?,
            mesh: r.read_u32()?,
            material: r.read_u32()?,
            sampled: r.read_u32()?,
        })
    })?;

    offsets.camera = reader.position();
    let camera = LensRecord {
        origin: reader.read_f32x()?,
        forward: reader.read_f32x()?,
        up: reader.read_f32x()?,
        vfov: reader.read_f32()?,
        aspect: reader.read_f32()?,
        aperture: reader.read_f32()?,
        focus_distance: reader.read_f32()?,
    };

    offsets.end = reader.position();
    let trailing = bytes.len() - offsets.end as usize;
    if trailing != 0 {
        return Err(FormatError::TrailingBytes(trailing));
    }

    Ok(MsneFile {
        textures,
        variants,
        materials,
        meshes,
        instances,
        camera,
        offsets,
    })
}

fn read_textures<R: Read>(reader: &mut MsneReader<R>) -> Result<TexturePools, FormatError> {
    let declared = reader.read_u32()?;
    let scalars = reader.read_list(|r| r.read_f32())?;
    let pairs = reader.read_list(|r| r.read_f32x())?;
    let triples = reader.read_list(|r| r.read_f32x())?;
    let dds_count = reader.read_u32()?;

    let pools = TexturePools {
        scalars,
        pairs,
        triples,
        dds_count,
    };
    let actual = pools.total_count() as u32;
    if declared != actual {
        return Err(FormatError::TextureCountMismatch { declared, actual });
    }
    if dds_count != 0 {
        return Err(FormatError::UnsupportedDdsTextures(dds_count));
    }
    Ok(pools)
}

fn read_mesh<R: Read>(reader: &mut MsneReader<R>) -> Result<MeshRecord, FormatError> {
    let triangles = reader.read_list(|r| {
        Ok([r.read_u32()?, r.read_u32()?, r.read_u32()?])
    })?;
    let positions = reader.read_list(|r| r.read_f32x())?;
    let normals = if reader.read_bool()? {
        let mut normals = Vec::with_capacity(positions.len());
        for _ in 0..positions.len() {
            normals.push(reader.read_f32x()?);
        }
        Some(normals)
    } else {
        None
    };
    let has_texcoords = reader.read_bool()?;

    Ok(MeshRecord {
        triangles,
        positions,
        normals,
        has_texcoords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_magic_rejected() {
        let result = read_msne(b"WGSC\0\0\0\0");
        assert!(matches!(result, Err(FormatError::InvalidMagic)));
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let result = read_msne(b"MSNE\x01\x00");
        match result {
            Err(FormatError::IoFailure(err)) => {
                assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("Expected IoFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_bool() {
        let mut reader = MsneReader::new(Cursor::new(&[2u8][..]));
        assert!(matches!(reader.read_bool(), Err(FormatError::InvalidBool(2))));
    }

    #[test]
    fn test_texture_count_mismatch() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u32.to_le_bytes()); // declared total
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // dds

        let mut reader = MsneReader::new(Cursor::new(&bytes[..]));
        assert!(matches!(
            read_textures(&mut reader),
            Err(FormatError::TextureCountMismatch { declared: 5, actual: 1 })
        ));
    }

    #[test]
    fn test_global_texture_lookup() {
        let pools = TexturePools {
            scalars: vec![0.1],
            pairs: vec![[0.5, 0.5]],
            triples: vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            dds_count: 0,
        };

        assert_eq!(pools.get(0), Some(TextureValue::Scalar(0.1)));
        assert_eq!(pools.get(1), Some(TextureValue::Pair([0.5, 0.5])));
        assert_eq!(pools.get(3), Some(TextureValue::Triple([0.0, 1.0, 0.0])));
        assert_eq!(pools.get(4), None);
    }
}
