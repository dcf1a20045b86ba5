//! Tags of the `Tiff` and `BigTiff` IFDs. Each tag entry is
//! a code, a field type, a count, and either the value itself
//! (when it fits in the entry) or a pointer to it.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use binrw::{BinRead, BinWrite, Endian};

use crate::MetricsError;

/// The tags the reader cares about. Everything else
/// is kept around as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiffTagID {
    ImageWidth,
    ImageLength,
    BitsPerSample,
    Compression,
    PhotometricInterpretation,
    ImageDescription,
    StripOffsets,
    SamplesPerPixel,
    RowsPerStrip,
    StripByteCounts,
    PlanarConfiguration,
    TileWidth,
    TileLength,
    TileOffsets,
    TileByteCounts,
    SampleFormat,
    Other(u16),
}

impl From<u16> for TiffTagID {
    fn from(code : u16) -> Self {
        match code {
            256 => TiffTagID::ImageWidth,
            257 => TiffTagID::ImageLength,
            258 => TiffTagID::BitsPerSample,
            259 => TiffTagID::Compression,
            262 => TiffTagID::PhotometricInterpretation,
            270 => TiffTagID::ImageDescription,
            273 => TiffTagID::StripOffsets,
            277 => TiffTagID::SamplesPerPixel,
            278 => TiffTagID::RowsPerStrip,
            279 => TiffTagID::StripByteCounts,
            284 => TiffTagID::PlanarConfiguration,
            322 => TiffTagID::TileWidth,
            323 => TiffTagID::TileLength,
            324 => TiffTagID::TileOffsets,
            325 => TiffTagID::TileByteCounts,
            339 => TiffTagID::SampleFormat,
            other => TiffTagID::Other(other),
        }
    }
}

impl From<TiffTagID> for u16 {
    fn from(id : TiffTagID) -> u16 {
        match id {
            TiffTagID::ImageWidth => 256,
            TiffTagID::ImageLength => 257,
            TiffTagID::BitsPerSample => 258,
            TiffTagID::Compression => 259,
            TiffTagID::PhotometricInterpretation => 262,
            TiffTagID::ImageDescription => 270,
            TiffTagID::StripOffsets => 273,
            TiffTagID::SamplesPerPixel => 277,
            TiffTagID::RowsPerStrip => 278,
            TiffTagID::StripByteCounts => 279,
            TiffTagID::PlanarConfiguration => 284,
            TiffTagID::TileWidth => 322,
            TiffTagID::TileLength => 323,
            TiffTagID::TileOffsets => 324,
            TiffTagID::TileByteCounts => 325,
            TiffTagID::SampleFormat => 339,
            TiffTagID::Other(code) => code,
        }
    }
}

impl fmt::Display for TiffTagID {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        match self {
            TiffTagID::Other(code) => write!(f, "Tag{}", code),
            named => write!(f, "{:?}", named),
        }
    }
}

/// TIFF field types, by their on-disk code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Ifd,
    Long8,
    SLong8,
    Ifd8,
}

impl FieldType {
    pub fn from_code(code : u16) -> Option<FieldType> {
        Some(match code {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            13 => FieldType::Ifd,
            16 => FieldType::Long8,
            17 => FieldType::SLong8,
            18 => FieldType::Ifd8,
            _ => return None,
        })
    }

    pub fn code(&self) -> u16 {
        match self {
            FieldType::Byte => 1,
            FieldType::Ascii => 2,
            FieldType::Short => 3,
            FieldType::Long => 4,
            FieldType::Rational => 5,
            FieldType::SByte => 6,
            FieldType::Undefined => 7,
            FieldType::SShort => 8,
            FieldType::SLong => 9,
            FieldType::SRational => 10,
            FieldType::Float => 11,
            FieldType::Double => 12,
            FieldType::Ifd => 13,
            FieldType::Long8 => 16,
            FieldType::SLong8 => 17,
            FieldType::Ifd8 => 18,
        }
    }

    /// Size of one element in bytes
    pub fn size(&self) -> u64 {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double
            | FieldType::Long8 | FieldType::SLong8 | FieldType::Ifd8 => 8,
        }
    }
}

/// Reads an unsigned integer of 1, 2, 4 or 8 bytes.
pub(crate) fn read_uint(bytes : &[u8], endian : Endian) -> u64 {
    let mut buf = [0u8; 8];
    match endian {
        Endian::Little => {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        },
        Endian::Big => {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        },
    }
}

/// Shared behavior of the classic and BigTiff tag entries.
pub trait Tag : fmt::Debug {
    fn id(&self) -> TiffTagID;
    fn field_code(&self) -> u16;
    fn count(&self) -> u64;
    /// The value-or-offset bytes exactly as stored in the entry
    fn raw_value(&self) -> &[u8];

    fn field_type(&self) -> Result<FieldType, MetricsError> {
        FieldType::from_code(self.field_code()).ok_or_else(|| MetricsError::Format(
            format!("Tag {} has unknown field type {}", self.id(), self.field_code())
        ))
    }

    /// Reads the bytes of the tag's value, following the offset
    /// if the value does not fit in the entry. Leaves the reader
    /// where it was.
    fn value_bytes<R : Read + Seek>(&self, reader : &mut R, endian : Endian)
        -> Result<Vec<u8>, MetricsError> {
        let len = self.field_type()?.size().checked_mul(self.count())
            .ok_or_else(|| MetricsError::Format(
                format!("Tag {} declares {} values", self.id(), self.count())
            ))?;
        let raw = self.raw_value();
        if len <= raw.len() as u64 {
            return Ok(raw[..len as usize].to_vec());
        }

        let pos = reader.stream_position()?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        let offset = read_uint(raw, endian);
        let bytes = if offset.checked_add(len).is_some_and(|end| end <= file_len) {
            reader.seek(SeekFrom::Start(offset))?;
            let mut bytes = vec![0u8; len as usize];
            reader.read_exact(&mut bytes).map(|_| bytes).map_err(MetricsError::from)
        } else {
            Err(MetricsError::Format(format!(
                "Tag {} runs past the end of the file ({} bytes at {})", self.id(), len, offset
            )))
        };
        reader.seek(SeekFrom::Start(pos))?;
        bytes
    }

    /// All values of an unsigned-integer tag
    fn values<R : Read + Seek>(&self, reader : &mut R, endian : Endian)
        -> Result<Vec<u64>, MetricsError> {
        let size = match self.field_type()? {
            FieldType::Byte | FieldType::Undefined => 1,
            FieldType::Short => 2,
            FieldType::Long | FieldType::Ifd => 4,
            FieldType::Long8 | FieldType::Ifd8 => 8,
            other => return Err(MetricsError::Format(
                format!("Tag {} holds {:?}, expected an unsigned integer", self.id(), other)
            )),
        };
        Ok(self.value_bytes(reader, endian)?
            .chunks_exact(size)
            .map(|chunk| read_uint(chunk, endian))
            .collect())
    }

    /// The first value of an unsigned-integer tag, if it is
    /// stored inline (always true for single-valued tags).
    fn value(&self, endian : Endian) -> Option<u64> {
        let size = match self.field_type().ok()? {
            FieldType::Byte => 1,
            FieldType::Short => 2,
            FieldType::Long => 4,
            FieldType::Long8 => 8,
            _ => return None,
        };
        if self.count() == 0 || size * self.count() > self.raw_value().len() as u64 {
            return None;
        }
        Some(read_uint(&self.raw_value()[..size as usize], endian))
    }

    /// An ASCII tag as a string, trailing NULs removed
    fn ascii<R : Read + Seek>(&self, reader : &mut R, endian : Endian)
        -> Result<String, MetricsError> {
        let bytes = self.value_bytes(reader, endian)?;
        Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\0').to_string())
    }
}

/// A classic (32-bit offset) tag entry, 12 bytes on disk
#[derive(BinRead, BinWrite, Clone)]
pub struct TiffTag {
    code : u16,
    field_type : u16,
    count : u32,
    value : [u8; 4],
}

impl TiffTag {
    /// A tag whose value (or offset to it) is `value`,
    /// laid out for a little-endian file.
    /// A single SHORT sits in the low two bytes, which is
    /// where little-endian `u32` bytes put it anyway.
    pub fn new_le(id : TiffTagID, field_type : FieldType, count : u32, value : u32) -> Self {
        TiffTag {
            code : id.into(),
            field_type : field_type.code(),
            count,
            value : value.to_le_bytes(),
        }
    }
}

impl Tag for TiffTag {
    fn id(&self) -> TiffTagID { self.code.into() }
    fn field_code(&self) -> u16 { self.field_type }
    fn count(&self) -> u64 { self.count.into() }
    fn raw_value(&self) -> &[u8] { &self.value }
}

/// A BigTiff (64-bit offset) tag entry, 20 bytes on disk
#[derive(BinRead, Clone)]
pub struct BigTag {
    code : u16,
    field_type : u16,
    count : u64,
    value : [u8; 8],
}

impl Tag for BigTag {
    fn id(&self) -> TiffTagID { self.code.into() }
    fn field_code(&self) -> u16 { self.field_type }
    fn count(&self) -> u64 { self.count }
    fn raw_value(&self) -> &[u8] { &self.value }
}

impl fmt::Debug for TiffTag {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: type {} x{} {:?}", self.id(), self.field_type, self.count, self.value)
    }
}

impl fmt::Debug for BigTag {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: type {} x{} {:?}", self.id(), self.field_type, self.count, self.value)
    }
}
