//! Writes arrays as uncompressed, little-endian ImageJ
//! hyperstacks that this crate, ImageJ/Fiji and tifffile
//! can all read back with their axes.

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::{BinWrite, Endian};
use log::debug;
use ndarray::ArrayViewD;

use crate::data::image::{conform_axes, AxesError, AxisOrder};
use crate::tiff::{
    imagej::HyperstackLayout,
    strips::SampleFormat,
    tags::{FieldType, TiffTag, TiffTagID},
    ifd::TiffIFD,
};
use crate::MetricsError;

/// The order ImageJ stores hyperstack axes in.
const IMAGEJ_AXES : &str = "TZCYX";

/// Pixel types that can be written as TIFF samples.
pub trait Sample : Copy {
    const FORMAT : SampleFormat;
    const BITS : u16;
    fn extend_le(self, out : &mut Vec<u8>);
}

macro_rules! impl_sample {
    ($t : ty, $format : expr) => {
        impl Sample for $t {
            const FORMAT : SampleFormat = $format;
            const BITS : u16 = (std::mem::size_of::<$t>() * 8) as u16;
            fn extend_le(self, out : &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_sample!(u8, SampleFormat::Unsigned);
impl_sample!(u16, SampleFormat::Unsigned);
impl_sample!(u32, SampleFormat::Unsigned);
impl_sample!(i16, SampleFormat::Signed);
impl_sample!(i32, SampleFormat::Signed);
impl_sample!(f32, SampleFormat::Float);
impl_sample!(f64, SampleFormat::Float);

fn to_u32(value : usize) -> Result<u32, MetricsError> {
    u32::try_from(value)
        .map_err(|_| MetricsError::Format("Stack too large for a classic TIFF".into()))
}

fn pad_to_word(cursor : &mut Cursor<Vec<u8>>) -> std::io::Result<()> {
    if cursor.position() % 2 == 1 {
        cursor.write_all(&[0])?;
    }
    Ok(())
}

/// `write_imagej(path, data, axes)` writes `data` as an ImageJ
/// hyperstack. `axes` names every dimension of `data`, using only
/// letters of `TZCYX`, and must include `Y` and `X`.
///
/// ## Arguments
///
/// * `path` - Where to write the file
/// * `data` - The array to write, in any layout
/// * `axes` - The axis order of `data`
///
/// ## Example
///
/// ```rust, ignore
/// let labels = Array3::<u16>::zeros((12, 256, 256)).into_dyn();
/// write_imagej("labels.tif", labels.view(), &"ZYX".parse()?)?;
/// ```
pub fn write_imagej<S : Sample, P : AsRef<Path>>(
    path : P,
    data : ArrayViewD<S>,
    axes : &AxisOrder,
    ) -> Result<(), MetricsError> {

    let canonical : AxisOrder = IMAGEJ_AXES.parse()?;
    if let Some(bad) = axes.chars().find(|&a| !canonical.contains(a)) {
        return Err(AxesError::InvalidAxis(bad).into());
    }
    if !(axes.contains('Y') && axes.contains('X')) {
        return Err(AxesError::MismatchedAxes {
            from : axes.to_string(),
            to : IMAGEJ_AXES.to_string(),
        }.into());
    }
    let (data, order) = conform_axes(data, axes, &canonical)?;

    let len_of = |axis : char| order.position(axis).map_or(1, |i| data.shape()[i]);
    let layout = HyperstackLayout {
        frames : len_of('T'),
        slices : len_of('Z'),
        channels : len_of('C'),
    };
    let (height, width) = (len_of('Y'), len_of('X'));
    let page_bytes = height * width * std::mem::size_of::<S>();

    let mut description = layout.describe().into_bytes();
    description.push(0);

    let mut cursor = Cursor::new(Vec::<u8>::new());
    cursor.write_all(b"II")?;
    42u16.write_options(&mut cursor, Endian::Little, ())?;
    // first IFD pointer, patched below
    let mut next_pointer_at = 4u64;
    0u32.write_options(&mut cursor, Endian::Little, ())?;

    let description_at = to_u32(cursor.position() as usize)?;
    cursor.write_all(&description)?;
    pad_to_word(&mut cursor)?;

    // logical iteration order is row-major over (T, Z, C, Y, X),
    // exactly the page order ImageJ expects
    let mut samples = data.iter();
    for page in 0..layout.pages() {
        let strip_at = to_u32(cursor.position() as usize)?;
        let mut bytes = Vec::with_capacity(page_bytes);
        samples.by_ref().take(height * width).for_each(|&s| s.extend_le(&mut bytes));
        cursor.write_all(&bytes)?;
        pad_to_word(&mut cursor)?;

        let ifd_at = to_u32(cursor.position() as usize)?;
        cursor.seek(SeekFrom::Start(next_pointer_at))?;
        ifd_at.write_options(&mut cursor, Endian::Little, ())?;

        let mut tags = vec![
            TiffTag::new_le(TiffTagID::ImageWidth, FieldType::Long, 1, to_u32(width)?),
            TiffTag::new_le(TiffTagID::ImageLength, FieldType::Long, 1, to_u32(height)?),
            TiffTag::new_le(TiffTagID::BitsPerSample, FieldType::Short, 1, S::BITS.into()),
            TiffTag::new_le(TiffTagID::Compression, FieldType::Short, 1, 1),
            TiffTag::new_le(TiffTagID::PhotometricInterpretation, FieldType::Short, 1, 1),
        ];
        if page == 0 {
            tags.push(TiffTag::new_le(
                TiffTagID::ImageDescription, FieldType::Ascii, to_u32(description.len())?, description_at
            ));
        }
        tags.extend([
            TiffTag::new_le(TiffTagID::StripOffsets, FieldType::Long, 1, strip_at),
            TiffTag::new_le(TiffTagID::SamplesPerPixel, FieldType::Short, 1, 1),
            TiffTag::new_le(TiffTagID::RowsPerStrip, FieldType::Long, 1, to_u32(height)?),
            TiffTag::new_le(TiffTagID::StripByteCounts, FieldType::Long, 1, to_u32(page_bytes)?),
            TiffTag::new_le(TiffTagID::SampleFormat, FieldType::Short, 1, S::FORMAT.code().into()),
        ]);

        let ifd = TiffIFD { num_tags : tags.len() as u16, tags, next_ifd : 0 };
        cursor.seek(SeekFrom::Start(ifd_at.into()))?;
        ifd.write_options(&mut cursor, Endian::Little, ())?;
        next_pointer_at = cursor.position() - 4;
        cursor.seek(SeekFrom::End(0))?;
    }

    debug!("Writing {:?} ({}) to {}", data.shape(), order, path.as_ref().display());
    std::fs::write(path, cursor.into_inner())?;
    Ok(())
}
