//! ImageJ hyperstack descriptions: the `key=value` lines that
//! ImageJ (and Fiji, tifffile, ...) put in the first page's
//! ImageDescription to say how flat pages fold into T, Z and C.

use std::fmt::Write;

/// Page layout of an ImageJ hyperstack. Pages are stored
/// with C varying fastest, then Z, then T.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HyperstackLayout {
    pub frames : usize,
    pub slices : usize,
    pub channels : usize,
}

impl HyperstackLayout {
    pub fn pages(&self) -> usize {
        self.frames * self.slices * self.channels
    }

    /// The non-singleton leading axes, as `(letter, length)` in
    /// T, Z, C order.
    pub fn leading_axes(&self) -> Vec<(char, usize)> {
        [('T', self.frames), ('Z', self.slices), ('C', self.channels)]
            .into_iter()
            .filter(|&(_, len)| len > 1)
            .collect()
    }

    /// Reads the layout out of an ImageDescription. Returns `None`
    /// if the description is not ImageJ's.
    pub fn parse(description : &str) -> Option<HyperstackLayout> {
        if !description.starts_with("ImageJ=") {
            return None;
        }
        let mut layout = HyperstackLayout { frames : 1, slices : 1, channels : 1 };
        let mut images = None;
        for line in description.lines() {
            let Some((key, value)) = line.split_once('=') else { continue };
            let Ok(value) = value.trim().parse::<usize>() else { continue };
            match key.trim() {
                "images" => images = Some(value),
                "frames" => layout.frames = value.max(1),
                "slices" => layout.slices = value.max(1),
                "channels" => layout.channels = value.max(1),
                _ => (),
            }
        }
        // a plain ImageJ stack lists only `images`; those are slices
        if layout.pages() == 1 {
            if let Some(images) = images.filter(|&n| n > 1) {
                layout.slices = images;
            }
        }
        Some(layout)
    }

    /// The description ImageJ itself would write for this layout.
    pub fn describe(&self) -> String {
        let mut desc = String::from("ImageJ=1.11a\n");
        let _ = writeln!(desc, "images={}", self.pages());
        if self.channels > 1 {
            let _ = writeln!(desc, "channels={}", self.channels);
        }
        if self.slices > 1 {
            let _ = writeln!(desc, "slices={}", self.slices);
        }
        if self.frames > 1 {
            let _ = writeln!(desc, "frames={}", self.frames);
        }
        if self.leading_axes().len() > 1 {
            desc.push_str("hyperstack=true\n");
        }
        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hyperstack() {
        let layout = HyperstackLayout::parse(
            "ImageJ=1.54f\nimages=24\nchannels=2\nslices=12\nhyperstack=true\nmode=composite\nunit=micron\n"
        ).unwrap();
        assert_eq!(layout, HyperstackLayout { frames : 1, slices : 12, channels : 2 });
        assert_eq!(layout.leading_axes(), vec![('Z', 12), ('C', 2)]);
    }

    #[test]
    fn plain_stack_images_are_slices() {
        let layout = HyperstackLayout::parse("ImageJ=1.54f\nimages=7\n").unwrap();
        assert_eq!(layout.slices, 7);
    }

    #[test]
    fn other_descriptions_are_ignored() {
        assert!(HyperstackLayout::parse("{\"shape\": [3, 4]}").is_none());
        assert!(HyperstackLayout::parse("").is_none());
    }

    #[test]
    fn describe_parses_back() {
        let layout = HyperstackLayout { frames : 3, slices : 4, channels : 2 };
        assert_eq!(HyperstackLayout::parse(&layout.describe()), Some(layout));
    }
}
