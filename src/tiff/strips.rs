//! Page layout and pixel decoding for uncompressed strips.

use binrw::{
    io::{Read, Seek, SeekFrom},
    Endian,
};

use crate::data::image::{Dimensions, DimensionsError};
use crate::tiff::{IFD, Tag, TiffTagID};
use crate::MetricsError;

/// TIFF SampleFormat values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Unsigned,
    Signed,
    Float,
}

impl SampleFormat {
    pub fn from_code(code : u64) -> Result<SampleFormat, MetricsError> {
        match code {
            1 => Ok(SampleFormat::Unsigned),
            2 => Ok(SampleFormat::Signed),
            3 => Ok(SampleFormat::Float),
            other => Err(MetricsError::Format(format!("Unsupported SampleFormat {}", other))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            SampleFormat::Unsigned => 1,
            SampleFormat::Signed => 2,
            SampleFormat::Float => 3,
        }
    }
}

/// Everything needed to turn one page's strips into samples.
/// Two pages with equal layouts can be stacked.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub dims : Dimensions,
    pub samples : usize,
    pub bits : u16,
    pub format : SampleFormat,
    /// `PlanarConfiguration == 2`: one plane per sample
    pub planar : bool,
}

/// All values of a multi-valued tag must agree (BitsPerSample,
/// SampleFormat), so collapse them to one.
fn uniform_value<I : IFD, R : Read + Seek>(
    ifd : &I,
    tag_id : TiffTagID,
    reader : &mut R,
    endian : Endian,
    default : u64,
    ) -> Result<u64, MetricsError> {
    let Some(tag) = ifd.get_tag(tag_id) else { return Ok(default) };
    let values = tag.values(reader, endian)?;
    match values.split_first() {
        None => Ok(default),
        Some((first, rest)) if rest.iter().all(|v| v == first) => Ok(*first),
        Some(_) => Err(MetricsError::Format(format!("Mixed {} values {:?}", tag_id, values))),
    }
}

impl PageLayout {
    pub fn from_ifd<I : IFD, R : Read + Seek>(ifd : &I, reader : &mut R, endian : Endian)
        -> Result<PageLayout, MetricsError> {
        let dims = ifd.dimensions(endian)
            .ok_or_else(|| MetricsError::Format("Page has no width or height".into()))?;

        if ifd.get_tag(TiffTagID::TileWidth).is_some() {
            return Err(MetricsError::Format("Tiled TIFF pages are not supported".into()));
        }
        let compression = ifd.value_or(TiffTagID::Compression, endian, 1)?;
        if compression != 1 {
            return Err(MetricsError::Format(
                format!("Compressed TIFF pages are not supported (Compression = {})", compression)
            ));
        }

        let samples = ifd.value_or(TiffTagID::SamplesPerPixel, endian, 1)? as usize;
        let bits = uniform_value(ifd, TiffTagID::BitsPerSample, reader, endian, 1)? as u16;
        let format = SampleFormat::from_code(
            uniform_value(ifd, TiffTagID::SampleFormat, reader, endian, 1)?
        )?;
        let planar = ifd.value_or(TiffTagID::PlanarConfiguration, endian, 1)? == 2 && samples > 1;

        Ok(PageLayout { dims, samples, bits, format, planar })
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Bytes of pixel data in one page. Fails on sizes that do
    /// not fit in a `u64`.
    pub fn page_bytes(&self) -> Result<u64, MetricsError> {
        self.dims.num_pixels()
            .and_then(|n| n.checked_mul(self.samples as u64))
            .and_then(|n| n.checked_mul(self.bytes_per_sample() as u64))
            .ok_or_else(|| MetricsError::Format(format!(
                "Page of {} x {} x {} samples is too large", self.dims.xdim, self.dims.ydim, self.samples
            )))
    }

    /// Shape of one page: `(Y, X)`, `(Y, X, S)` or `(S, Y, X)`
    pub fn page_shape(&self) -> Vec<usize> {
        let (y, x) = self.dims.to_tuple();
        let (y, x) = (y as usize, x as usize);
        match (self.samples > 1, self.planar) {
            (false, _) => vec![y, x],
            (true, false) => vec![y, x, self.samples],
            (true, true) => vec![self.samples, y, x],
        }
    }
}

/// Reads the strips of a page back to back. Stops at the end of
/// the stream, so the result can be shorter than `counts` claims.
///
/// ## Arguments
///
/// * `offsets` - StripOffsets of the page
/// * `counts` - StripByteCounts of the page
#[binrw::parser(reader)]
pub fn read_strips(offsets : &[u64], counts : &[u64]) -> binrw::BinResult<Vec<u8>> {
    let mut data = Vec::new();
    for (&offset, &count) in offsets.iter().zip(counts.iter()) {
        reader.seek(SeekFrom::Start(offset))?;
        let read = (&mut *reader).take(count).read_to_end(&mut data)?;
        if (read as u64) < count {
            break;
        }
    }
    Ok(data)
}

/// Decodes a run of `$t` samples in the file's byte order
macro_rules! decode_as {
    ($bytes : expr, $t : ty, $endian : expr, $out : expr) => {
        $out.extend($bytes.chunks_exact(std::mem::size_of::<$t>()).map(|chunk| {
            let mut buf = [0u8; std::mem::size_of::<$t>()];
            buf.copy_from_slice(chunk);
            (match $endian {
                Endian::Little => <$t>::from_le_bytes(buf),
                Endian::Big => <$t>::from_be_bytes(buf),
            }) as f64
        }))
    };
}

/// Decodes raw sample bytes into `f64`, appending to `out`.
pub fn decode_samples(
    bytes : &[u8],
    layout : &PageLayout,
    endian : Endian,
    out : &mut Vec<f64>,
    ) -> Result<(), MetricsError> {
    match (layout.format, layout.bits) {
        (SampleFormat::Unsigned, 8) => decode_as!(bytes, u8, endian, out),
        (SampleFormat::Unsigned, 16) => decode_as!(bytes, u16, endian, out),
        (SampleFormat::Unsigned, 32) => decode_as!(bytes, u32, endian, out),
        (SampleFormat::Unsigned, 64) => decode_as!(bytes, u64, endian, out),
        (SampleFormat::Signed, 8) => decode_as!(bytes, i8, endian, out),
        (SampleFormat::Signed, 16) => decode_as!(bytes, i16, endian, out),
        (SampleFormat::Signed, 32) => decode_as!(bytes, i32, endian, out),
        (SampleFormat::Signed, 64) => decode_as!(bytes, i64, endian, out),
        (SampleFormat::Float, 32) => decode_as!(bytes, f32, endian, out),
        (SampleFormat::Float, 64) => decode_as!(bytes, f64, endian, out),
        (format, bits) => return Err(MetricsError::Format(
            format!("Unsupported sample type: {:?} with {} bits", format, bits)
        )),
    }
    Ok(())
}

/// Reads one page into `out`. Strips may carry padding past the
/// end of the image, which is dropped.
pub fn load_page<I : IFD, R : Read + Seek>(
    ifd : &I,
    layout : &PageLayout,
    reader : &mut R,
    endian : Endian,
    out : &mut Vec<f64>,
    ) -> Result<(), MetricsError> {
    let offsets = ifd.get_tag(TiffTagID::StripOffsets)
        .ok_or_else(|| MetricsError::Format("Strip offsets not found".into()))?
        .values(reader, endian)?;
    let counts = ifd.get_tag(TiffTagID::StripByteCounts)
        .ok_or_else(|| MetricsError::Format("Strip byte counts not found".into()))?
        .values(reader, endian)?;
    if offsets.len() != counts.len() {
        return Err(MetricsError::Format(
            format!("{} strip offsets but {} byte counts", offsets.len(), counts.len())
        ));
    }

    let mut data = read_strips(reader, endian, (offsets.as_slice(), counts.as_slice()))?;
    let expected = layout.page_bytes()?;
    if (data.len() as u64) < expected {
        return Err(DimensionsError::ByteCount { expected, found : data.len() as u64 }.into());
    }
    data.truncate(expected as usize);
    decode_samples(&data, layout, endian, out)
}
