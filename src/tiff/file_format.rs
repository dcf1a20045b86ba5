//! The TIFF header: byte order, classic vs. BigTiff, and
//! where the first IFD lives.

use binrw::{
    io::{Read, Seek, SeekFrom},
    BinRead, Endian,
};

use crate::tiff::ifd::{IFDIterator, IFD, SeekRead};
use crate::MetricsError;

/// Which flavor of TIFF the header announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffVariant {
    /// Magic 42, 32-bit offsets
    Classic,
    /// Magic 43, 64-bit offsets
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFormat {
    pub variant : TiffVariant,
    pub endian : Endian,
    pub first_ifd : u64,
}

impl FileFormat {
    /// Reads the header from the start of the file. The reader is
    /// left just past the header.
    ///
    /// ## Errors
    ///
    /// * `MetricsError::Format` - if the byte-order mark or the magic
    /// number is not a TIFF one
    ///
    /// ## Example
    ///
    /// ```rust, ignore
    /// let mut f = std::fs::File::open("stack.tif")?;
    /// let format = FileFormat::parse_filetype(&mut f)?;
    /// let ifds : Vec<TiffIFD> = format.get_ifd_iter(&mut f).collect::<Result<_, _>>()?;
    /// ```
    pub fn parse_filetype<R : Read + Seek>(reader : &mut R) -> Result<FileFormat, MetricsError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut mark = [0u8; 2];
        reader.read_exact(&mut mark)?;
        let endian = match &mark {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return Err(MetricsError::Format("Not a TIFF file (bad byte-order mark)".into())),
        };

        match u16::read_options(reader, endian, ())? {
            42 => {
                let first_ifd = u32::read_options(reader, endian, ())?;
                Ok(FileFormat { variant : TiffVariant::Classic, endian, first_ifd : first_ifd.into() })
            },
            43 => {
                let offset_size = u16::read_options(reader, endian, ())?;
                let _reserved = u16::read_options(reader, endian, ())?;
                if offset_size != 8 {
                    return Err(MetricsError::Format(
                        format!("BigTiff offset size {} is not 8", offset_size)
                    ));
                }
                let first_ifd = u64::read_options(reader, endian, ())?;
                Ok(FileFormat { variant : TiffVariant::Big, endian, first_ifd })
            },
            magic => Err(MetricsError::Format(format!("Not a TIFF file (magic {})", magic))),
        }
    }

    /// Iterator over the IFDs of the file, in file order
    pub fn get_ifd_iter<'a, S, I>(&self, reader : &'a mut S) -> IFDIterator<'a, S, I>
        where S : SeekRead, I : IFD {
        IFDIterator::new(reader, self.endian, self.first_ifd)
    }

    /// Reads every IFD of the file
    pub fn get_ifd_vec<S, I>(&self, reader : &mut S) -> Result<Vec<I>, MetricsError>
        where S : SeekRead, I : IFD, for<'args> I::Args<'args> : Default {
        self.get_ifd_iter(reader).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn classic_little_endian() {
        let mut reader = Cursor::new(vec![b'I', b'I', 42, 0, 8, 0, 0, 0]);
        let format = FileFormat::parse_filetype(&mut reader).unwrap();
        assert_eq!(format.variant, TiffVariant::Classic);
        assert_eq!(format.endian, Endian::Little);
        assert_eq!(format.first_ifd, 8);
    }

    #[test]
    fn big_tiff_big_endian() {
        let mut header = vec![b'M', b'M', 0, 43, 0, 8, 0, 0];
        header.extend_from_slice(&16u64.to_be_bytes());
        let format = FileFormat::parse_filetype(&mut Cursor::new(header)).unwrap();
        assert_eq!(format.variant, TiffVariant::Big);
        assert_eq!(format.endian, Endian::Big);
        assert_eq!(format.first_ifd, 16);
    }

    #[test]
    fn png_is_not_a_tiff() {
        let mut reader = Cursor::new(b"\x89PNG\r\n\x1a\n".to_vec());
        assert!(matches!(
            FileFormat::parse_filetype(&mut reader),
            Err(MetricsError::Format(_))
        ));
    }
}
