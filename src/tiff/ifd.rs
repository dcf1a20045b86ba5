//! Contains the Image File Directory (IFD) data structures
//! for classic `Tiff` and `BigTiff` files, and an iterator
//! walking the chain of IFDs through a file.
//!
//! Neither struct fixes its byte order: both are read with the
//! endian found in the file header.

use std::collections::HashSet;
use std::fmt::{self, Debug};

use binrw::{
    io::{Read, Seek, SeekFrom},
    BinRead, BinWrite, Endian,
};

use crate::{
    data::image::Dimensions,
    tiff::tags::{BigTag, Tag, TiffTag, TiffTagID},
    MetricsError,
};

pub trait SeekRead : Read + Seek {}
impl<R : Read + Seek> SeekRead for R {}

/// Generic IFD trait for the `Tiff` and `BigTiff` formats
pub trait IFD : BinRead + Debug {
    type TagType : Tag;

    /// Reads an IFD from a reader pointing to its start
    fn new<T : Read + Seek>(reader : &mut T, endian : Endian) -> binrw::BinResult<Self>
        where for<'b> <Self as BinRead>::Args<'b> : Default {
        Self::read_options(reader, endian, Default::default())
    }

    /// All tags stored by the IFD
    fn tags(&self) -> &[Self::TagType];

    /// Returns the location of the next IFD in the file,
    /// `0` if this is the last one.
    fn next_ifd(&self) -> u64;

    /// First tag with this id, if any
    fn get_tag(&self, tag_id : TiffTagID) -> Option<&Self::TagType> {
        self.tags().iter().find(|tag| tag.id() == tag_id)
    }

    /// `ImageWidth` of the page
    fn width(&self, endian : Endian) -> Option<u64> {
        self.get_tag(TiffTagID::ImageWidth)?.value(endian)
    }

    /// `ImageLength` of the page
    fn height(&self, endian : Endian) -> Option<u64> {
        self.get_tag(TiffTagID::ImageLength)?.value(endian)
    }

    /// Page size, when both width and height are present
    fn dimensions(&self, endian : Endian) -> Option<Dimensions> {
        match (self.width(endian), self.height(endian)) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        }
    }

    /// Single inline value of a tag, or `default` if the tag is absent
    fn value_or(&self, tag_id : TiffTagID, endian : Endian, default : u64)
        -> Result<u64, MetricsError> {
        match self.get_tag(tag_id) {
            None => Ok(default),
            Some(tag) => tag.value(endian).ok_or_else(|| MetricsError::Format(
                format!("Tag {} is not a single unsigned value", tag_id)
            )),
        }
    }
}

/// A classic TIFF directory: 16-bit tag count, 12-byte tags,
/// 32-bit next pointer.
#[derive(BinRead, BinWrite)]
pub struct TiffIFD {
    pub(crate) num_tags : u16,

    #[br(count = num_tags)]
    pub(crate) tags : Vec<TiffTag>,

    pub(crate) next_ifd : u32,
}

impl IFD for TiffIFD {
    type TagType = TiffTag;

    fn tags(&self) -> &[TiffTag] {
        &self.tags
    }

    fn next_ifd(&self) -> u64 {
        self.next_ifd.into()
    }
}

/// A BigTIFF directory: 64-bit tag count, 20-byte tags,
/// 64-bit next pointer.
#[derive(BinRead)]
pub struct BigTiffIFD {
    num_tags : u64,

    #[br(count = num_tags)]
    tags : Vec<BigTag>,

    next_ifd : u64,
}

impl IFD for BigTiffIFD {
    type TagType = BigTag;

    fn tags(&self) -> &[BigTag] {
        &self.tags
    }

    fn next_ifd(&self) -> u64 {
        self.next_ifd
    }
}

/// Walks the IFD chain starting at `to_next`. Stops at a
/// zero pointer, and reports a pointer that loops back to
/// an IFD already visited as a format error.
pub struct IFDIterator<'reader, S, T> where S : SeekRead, T : IFD {
    reader : &'reader mut S,
    endian : Endian,
    to_next : u64,
    visited : HashSet<u64>,
    _ifd : std::marker::PhantomData<T>,
}

impl<'r, S : SeekRead, I : IFD> IFDIterator<'r, S, I> {
    /// `first_ifd` is the offset stored in the file header and
    /// `endian` the byte order it declared.
    pub fn new(reader : &'r mut S, endian : Endian, first_ifd : u64) -> Self {
        IFDIterator {
            reader,
            endian,
            to_next : first_ifd,
            visited : HashSet::new(),
            _ifd : std::marker::PhantomData,
        }
    }
}

impl<S : SeekRead, I : IFD> Iterator for IFDIterator<'_, S, I>
    where for<'b> I::Args<'b> : Default {
    type Item = Result<I, MetricsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.to_next == 0 {
            return None;
        }
        if !self.visited.insert(self.to_next) {
            self.to_next = 0;
            return Some(Err(MetricsError::Format("IFD chain loops back on itself".into())));
        }
        let read = self.reader.seek(SeekFrom::Start(self.to_next))
            .map_err(MetricsError::from)
            .and_then(|_| I::new(self.reader, self.endian).map_err(MetricsError::from));

        match read {
            Ok(ifd) => {
                self.to_next = ifd.next_ifd();
                Some(Ok(ifd))
            },
            Err(err) => {
                self.to_next = 0;
                Some(Err(err))
            }
        }
    }
}

fn fmt_ifd<T : Tag>(f : &mut fmt::Formatter, tags : &[T], next_ifd : u64) -> fmt::Result {
    let ids : Vec<String> = tags.iter().map(|tag| tag.id().to_string()).collect();
    f.debug_struct("IFD")
        .field("tags", &ids)
        .field("next_ifd", &next_ifd)
        .finish()
}

impl Debug for TiffIFD {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        fmt_ifd(f, &self.tags, self.next_ifd.into())
    }
}

impl Debug for BigTiffIFD {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        fmt_ifd(f, &self.tags, self.next_ifd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::tiff::tags::FieldType;

    fn two_ifd_file() -> Vec<u8> {
        // IFD at 8 pointing at IFD at 26, which ends the chain
        let mut cursor = Cursor::new(Vec::new());
        cursor.set_position(8);
        for (width, next) in [(5u32, 26u32), (7, 0)] {
            TiffIFD {
                num_tags : 1,
                tags : vec![TiffTag::new_le(TiffTagID::ImageWidth, FieldType::Long, 1, width)],
                next_ifd : next,
            }.write_options(&mut cursor, Endian::Little, ()).unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn walks_the_chain() {
        let mut reader = Cursor::new(two_ifd_file());
        let widths : Vec<u64> = IFDIterator::<_, TiffIFD>::new(&mut reader, Endian::Little, 8)
            .map(|ifd| ifd.unwrap().width(Endian::Little).unwrap())
            .collect();
        assert_eq!(widths, vec![5, 7]);
    }

    #[test]
    fn looping_chain_is_an_error() {
        let mut file = two_ifd_file();
        // point the second IFD back at the first
        let next_ptr = 26 + 2 + 12;
        file[next_ptr..next_ptr + 4].copy_from_slice(&8u32.to_le_bytes());

        let mut reader = Cursor::new(file);
        let results : Vec<_> = IFDIterator::<_, TiffIFD>::new(&mut reader, Endian::Little, 8).collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[2], Err(MetricsError::Format(_))));
    }

    #[test]
    fn tags_by_id() {
        let mut reader = Cursor::new(two_ifd_file());
        reader.set_position(8);
        let ifd = TiffIFD::new(&mut reader, Endian::Little).unwrap();
        assert!(ifd.get_tag(TiffTagID::ImageWidth).is_some());
        assert!(ifd.get_tag(TiffTagID::ImageLength).is_none());
        assert!(ifd.dimensions(Endian::Little).is_none());
    }
}
