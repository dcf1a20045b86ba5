use std::path::Path;

/// What a file's extension says about which reader
/// can handle it, when the TIFF reader could not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Formats the `image` crate decodes
    Raster(String),
    /// Vendor microscopy containers without a reader here
    Microscopy(String),
    Other(String),
}

const RASTER_EXTENSIONS : [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];
const MICROSCOPY_EXTENSIONS : [&str; 5] = ["czi", "nd2", "lif", "oib", "lsm"];

impl FileType {
    /// Classifies a path by its (case-insensitive) extension.
    ///
    /// ## Example
    ///
    /// ```rust, ignore
    /// assert_eq!(FileType::discern_filetype("a/B.TIF".as_ref()), FileType::Raster("tif".into()));
    /// ```
    pub fn discern_filetype(path : &Path) -> Self {
        let extension = path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if RASTER_EXTENSIONS.contains(&extension.as_str()) {
            FileType::Raster(extension)
        } else if MICROSCOPY_EXTENSIONS.contains(&extension.as_str()) {
            FileType::Microscopy(extension)
        } else {
            FileType::Other(extension)
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            FileType::Raster(ext) | FileType::Microscopy(ext) | FileType::Other(ext) => ext,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_extensions() {
        assert_eq!(FileType::discern_filetype(Path::new("x/cells.PNG")), FileType::Raster("png".into()));
        assert_eq!(FileType::discern_filetype(Path::new("cells.ome.tif")), FileType::Raster("tif".into()));
        assert_eq!(FileType::discern_filetype(Path::new("scan.czi")), FileType::Microscopy("czi".into()));
        assert_eq!(FileType::discern_filetype(Path::new("noext")), FileType::Other(String::new()));
    }
}
