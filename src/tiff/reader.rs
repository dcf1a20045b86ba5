use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use binrw::io::{Read, Seek, SeekFrom};
use itertools::Itertools;
use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};

use crate::data::image::{AxisOrder, DimensionsError, ImageStack};
use crate::tiff::{
    file_format::{FileFormat, TiffVariant},
    imagej::HyperstackLayout,
    strips::{load_page, PageLayout},
    BigTiffIFD, Tag, TiffIFD, TiffTagID, IFD,
};
use crate::MetricsError;

/// Opens a TIFF or BigTiff stack and reads every page into an
/// `f64` array. See `read_stack` for the resulting shape.
pub fn open_stack<P : AsRef<Path>>(path : P) -> Result<ImageStack<f64>, MetricsError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let (data, axes) = read_stack(&mut reader)?;
    Ok(ImageStack::new(data, path).with_axes(axes))
}

/// Reads every page of a TIFF stack.
///
/// ## Returns
///
/// * The pixel array: `(Y, X)` for one page, `(pages, Y, X)` for many,
/// with a trailing (chunky) or per-page leading (planar) sample axis when
/// pages carry more than one sample. ImageJ hyperstacks are folded into
/// `(T, Z, C, Y, X)` with singleton axes left out.
/// * The axis order, when the file's metadata declares one.
pub fn read_stack<R : Read + Seek>(reader : &mut R)
    -> Result<(ArrayD<f64>, Option<AxisOrder>), MetricsError> {
    let format = FileFormat::parse_filetype(reader)?;
    debug!("TIFF header: {:?}", format);
    match format.variant {
        TiffVariant::Classic => read_pages::<TiffIFD, R>(reader, &format),
        TiffVariant::Big => read_pages::<BigTiffIFD, R>(reader, &format),
    }
}

fn read_pages<I, R>(reader : &mut R, format : &FileFormat)
    -> Result<(ArrayD<f64>, Option<AxisOrder>), MetricsError>
    where I : IFD, R : Read + Seek, for<'args> I::Args<'args> : Default {
    let endian = format.endian;
    let ifds : Vec<I> = format.get_ifd_vec(reader)?;
    let first = ifds.first().ok_or(DimensionsError::EmptyStack)?;

    let layout = PageLayout::from_ifd(first, reader, endian)?;
    debug!("{} pages of {:?}", ifds.len(), layout);

    // the pixel data has to fit in the file before anything is allocated for it
    let file_len = reader.seek(SeekFrom::End(0))?;
    let needed = layout.page_bytes()?.saturating_mul(ifds.len() as u64);
    if needed > file_len {
        return Err(DimensionsError::ByteCount { expected : needed, found : file_len }.into());
    }
    let mut data : Vec<f64> = Vec::with_capacity(
        (needed / layout.bytes_per_sample().max(1) as u64) as usize
    );
    for ifd in ifds.iter() {
        if PageLayout::from_ifd(ifd, reader, endian)? != layout {
            return Err(DimensionsError::NoConsistentDimensions.into());
        }
        load_page(ifd, &layout, reader, endian, &mut data)?;
    }

    let description = match first.get_tag(TiffTagID::ImageDescription) {
        Some(tag) => Some(tag.ascii(reader, endian)?),
        None => None,
    };
    let hyperstack = description.as_deref()
        .and_then(HyperstackLayout::parse)
        .filter(|hs| {
            let fits = hs.pages() == ifds.len() && !layout.planar;
            if !fits {
                warn!("Ignoring ImageJ metadata: {:?} does not describe {} pages", hs, ifds.len());
            }
            fits
        });

    let (shape, axes) = stack_shape(&layout, ifds.len(), hyperstack.as_ref());
    debug!("Stack shape {:?}, axes {:?}", shape, axes.as_ref().map(|a| a.to_string()));

    let array = ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|err| MetricsError::Format(err.to_string()))?;
    Ok((array, axes))
}

/// Shape (and, for ImageJ files, axis order) of a stack of
/// `n_pages` pages laid out as `layout`.
fn stack_shape(
    layout : &PageLayout,
    n_pages : usize,
    hyperstack : Option<&HyperstackLayout>,
    ) -> (Vec<usize>, Option<AxisOrder>) {
    let page_shape = layout.page_shape();

    let Some(hyperstack) = hyperstack else {
        let shape = if n_pages > 1 {
            std::iter::once(n_pages).chain(page_shape).collect()
        } else {
            page_shape
        };
        return (shape, None);
    };

    let leading = hyperstack.leading_axes();
    let sample_axis = if hyperstack.channels > 1 { 'S' } else { 'C' };
    let page_axes = if layout.samples > 1 {
        format!("YX{}", sample_axis)
    } else {
        "YX".to_string()
    };
    let letters = leading.iter().map(|&(axis, _)| axis).join("") + &page_axes;

    let shape = leading.iter().map(|&(_, len)| len).chain(page_shape).collect();
    (shape, letters.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::image::Dimensions;
    use crate::tiff::strips::SampleFormat;
    use crate::tiff::writer::write_imagej;
    use ndarray::{Array3, Array4};
    use std::io::Cursor;

    fn gray(samples : usize) -> PageLayout {
        PageLayout {
            dims : Dimensions::new(4, 3),
            samples,
            bits : 16,
            format : SampleFormat::Unsigned,
            planar : false,
        }
    }

    #[test]
    fn plain_stack_shapes() {
        assert_eq!(stack_shape(&gray(1), 1, None), (vec![3, 4], None));
        assert_eq!(stack_shape(&gray(1), 5, None), (vec![5, 3, 4], None));
        assert_eq!(stack_shape(&gray(3), 5, None), (vec![5, 3, 4, 3], None));
    }

    #[test]
    fn hyperstack_shapes() {
        let hs = HyperstackLayout { frames : 1, slices : 6, channels : 2 };
        let (shape, axes) = stack_shape(&gray(1), 12, Some(&hs));
        assert_eq!(shape, vec![6, 2, 3, 4]);
        assert_eq!(axes.unwrap().to_string(), "ZCYX");

        let rgb = HyperstackLayout { frames : 1, slices : 6, channels : 1 };
        let (shape, axes) = stack_shape(&gray(3), 6, Some(&rgb));
        assert_eq!(shape, vec![6, 3, 4, 3]);
        assert_eq!(axes.unwrap().to_string(), "ZYXC");
    }

    #[test]
    fn reads_what_the_writer_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zcyx.tif");
        let data = Array4::<u16>::from_shape_fn((3, 2, 5, 4), |(z, c, y, x)| {
            (1000 * z + 100 * c + 10 * y + x) as u16
        }).into_dyn();
        write_imagej(&path, data.view(), &"ZCYX".parse().unwrap()).unwrap();

        let stack = open_stack(&path).unwrap();
        assert_eq!(stack.shape(), &[3, 2, 5, 4]);
        assert_eq!(stack.axes.as_ref().unwrap().to_string(), "ZCYX");
        assert_eq!(stack.data[[2, 1, 4, 3]], 2143.0);
        assert_eq!(stack.data, data.mapv(|v| v as f64));
    }

    /// Hand-built single page, 2x2 u8, in big-endian BigTiff
    fn big_endian_bigtiff() -> Vec<u8> {
        let mut file = vec![b'M', b'M', 0, 43, 0, 8, 0, 0];
        file.extend_from_slice(&16u64.to_be_bytes());
        // IFD at 16: 5 tags of 20 bytes, then next pointer
        let pixel_offset = 16 + 8 + 5 * 20 + 8;
        file.extend_from_slice(&5u64.to_be_bytes());
        let mut tag = |code : u16, field : u16, value : u64| {
            file.extend_from_slice(&code.to_be_bytes());
            file.extend_from_slice(&field.to_be_bytes());
            file.extend_from_slice(&1u64.to_be_bytes());
            let mut raw = [0u8; 8];
            match field {
                3 => raw[..2].copy_from_slice(&(value as u16).to_be_bytes()),
                16 => raw.copy_from_slice(&value.to_be_bytes()),
                _ => raw[..4].copy_from_slice(&(value as u32).to_be_bytes()),
            }
            file.extend_from_slice(&raw);
        };
        tag(256, 4, 2);
        tag(257, 4, 2);
        tag(258, 3, 8);
        tag(273, 16, pixel_offset as u64);
        tag(279, 16, 4);
        file.extend_from_slice(&0u64.to_be_bytes());
        assert_eq!(file.len(), pixel_offset);
        file.extend_from_slice(&[1, 2, 3, 4]);
        file
    }

    #[test]
    fn reads_big_endian_bigtiff() {
        let (data, axes) = read_stack(&mut Cursor::new(big_endian_bigtiff())).unwrap();
        assert_eq!(data.shape(), &[2, 2]);
        assert_eq!(data.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(axes.is_none());
    }

    #[test]
    fn truncated_pixel_data_is_reported() {
        let mut file = big_endian_bigtiff();
        file.truncate(file.len() - 1);
        assert!(read_stack(&mut Cursor::new(file)).is_err());
    }

    /// Classic little-endian page claiming `u32::MAX` x `u32::MAX`
    /// 8-bit pixels with a single 4-byte strip.
    fn oversized_header() -> Vec<u8> {
        use crate::tiff::{FieldType, TiffIFD};
        use crate::tiff::tags::TiffTag;
        use binrw::{BinWrite, Endian};

        let mut cursor = Cursor::new(vec![b'I', b'I', 42, 0, 8, 0, 0, 0]);
        cursor.set_position(8);
        let strip_at = 8 + 2 + 5 * 12 + 4;
        let tags = vec![
            TiffTag::new_le(TiffTagID::ImageWidth, FieldType::Long, 1, u32::MAX),
            TiffTag::new_le(TiffTagID::ImageLength, FieldType::Long, 1, u32::MAX),
            TiffTag::new_le(TiffTagID::BitsPerSample, FieldType::Short, 1, 8),
            TiffTag::new_le(TiffTagID::StripOffsets, FieldType::Long, 1, strip_at),
            TiffTag::new_le(TiffTagID::StripByteCounts, FieldType::Long, 1, 4),
        ];
        TiffIFD { num_tags : 5, tags, next_ifd : 0 }
            .write_options(&mut cursor, Endian::Little, ())
            .unwrap();
        let mut file = cursor.into_inner();
        assert_eq!(file.len(), strip_at as usize);
        file.extend_from_slice(&[1, 2, 3, 4]);
        file
    }

    #[test]
    fn oversized_header_is_an_error_not_an_allocation() {
        let err = read_stack(&mut Cursor::new(oversized_header())).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::Dimensions(DimensionsError::ByteCount { found, .. }) if found == 78
        ));
    }

    #[test]
    fn single_page_imagej_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yx.tif");
        let data = Array3::<u8>::from_shape_fn((1, 3, 4), |(_, y, x)| (y * 4 + x) as u8).into_dyn();
        write_imagej(&path, data.view(), &"ZYX".parse().unwrap()).unwrap();

        // one page, no leading axes left
        let stack = open_stack(&path).unwrap();
        assert_eq!(stack.shape(), &[3, 4]);
        assert_eq!(stack.axes.unwrap().to_string(), "YX");
    }
}
