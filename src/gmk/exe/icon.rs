//! Game icon recovery.
//!
//! Compiled games keep the icon only as a Windows resource, so the settings record of a
//! decompiled project gets it from the executable's resource table.
use crate::gmk::stream::GmkStream;
use anyhow::Result;

const ICON_DIRECTORY_SIZE: u32 = 22;
const BITMAP_HEADER_SIZE: u32 = 40;
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Something that can pull the raw icon image out of an executable image.
pub trait IconSource {
    /// Returns `None` when the executable carries no usable icon.
    fn icon_image(&self, exe: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Never finds an icon. Used when extraction is disabled.
pub struct NoIcon;

impl IconSource for NoIcon {
    fn icon_image(&self, _exe: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

#[cfg(feature = "exe-icon")]
/// Reads icon resource 2, the one the runner shows in the title bar. Accepts PE32 and PE32+.
pub struct PeIconSource;

#[cfg(feature = "exe-icon")]
impl IconSource for PeIconSource {
    fn icon_image(&self, exe: &[u8]) -> Result<Option<Vec<u8>>> {
        use pelite::PeFile;
        use pelite::resources::Name;
        const RT_ICON: Name = Name::Id(3);
        const GAME_ICON: Name = Name::Id(2);

        let file = PeFile::from_bytes(exe)?;
        let resources = match file.resources() {
            Ok(resources) => resources,
            Err(e) => {
                log::warn!("Executable has no resource table: {}", e);
                return Ok(None);
            }
        };
        match resources.find_resource(&[RT_ICON, GAME_ICON]) {
            Ok(data) => Ok(Some(data.to_vec())),
            Err(e) => {
                log::warn!("Game icon not found: {}", e);
                Ok(None)
            }
        }
    }
}

/// Icon source used when extraction is requested.
pub fn default_source(extract: bool) -> Box<dyn IconSource> {
    #[cfg(feature = "exe-icon")]
    if extract {
        return Box::new(PeIconSource);
    }
    #[cfg(not(feature = "exe-icon"))]
    if extract {
        log::warn!("Icon extraction is not available in this build");
    }
    Box::new(NoIcon)
}

fn bitmap_shape(image: &[u8]) -> Result<(u32, u32, u16)> {
    let mut header = GmkStream::from_vec(image.get(..16).unwrap_or_default().to_vec());
    if header.read_u32()? != BITMAP_HEADER_SIZE {
        anyhow::bail!("not a bitmap header");
    }
    let width = header.read_i32()?.unsigned_abs();
    // The stored height covers the colour and mask planes.
    let height = header.read_i32()?.unsigned_abs() / 2;
    let _planes = header.read_u16()?;
    let bpp = header.read_u16()?;
    Ok((width, height, bpp))
}

/// Size and depth of an icon image, taken from its header when there is one.
fn image_shape(image: &[u8]) -> (u32, u32, u16) {
    if image.starts_with(PNG_SIGNATURE) {
        let dim = |at: usize| {
            image
                .get(at..at + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_be_bytes)
        };
        return match (dim(16), dim(20)) {
            (Some(w), Some(h)) => (w, h, 32),
            _ => (32, 32, 32),
        };
    }
    bitmap_shape(image).unwrap_or((32, 32, 32))
}

/// Wraps a single icon image in an `.ico` file with one directory entry.
pub fn icon_file(image: &[u8]) -> Vec<u8> {
    let (width, height, bpp) = image_shape(image);
    let mut out = GmkStream::new();
    out.write_u16(0);
    out.write_u16(1);
    out.write_u16(1);
    // 256 is stored as 0
    out.write_u8(if width >= 256 { 0 } else { width as u8 });
    out.write_u8(if height >= 256 { 0 } else { height as u8 });
    out.write_u8(0);
    out.write_u8(0);
    out.write_u16(1);
    out.write_u16(bpp);
    out.write_u32(image.len() as u32);
    out.write_u32(ICON_DIRECTORY_SIZE);
    out.write_bytes(image);
    out.into_inner()
}

/// A plain white 32x32 icon.
pub fn blank_icon() -> Vec<u8> {
    const SIDE: u32 = 32;
    let pixels = (SIDE * SIDE * 4) as usize;
    let mask = (SIDE * SIDE / 8) as usize;
    let mut image = GmkStream::new();
    image.write_u32(BITMAP_HEADER_SIZE);
    image.write_i32(SIDE as i32);
    image.write_i32(SIDE as i32 * 2);
    image.write_u16(1);
    image.write_u16(32);
    image.write_u32(0);
    image.write_u32((pixels + mask) as u32);
    image.write_i32(0);
    image.write_i32(0);
    image.write_u32(0);
    image.write_u32(0);
    image.write_bytes(&vec![0xFF; pixels]);
    image.write_bytes(&vec![0; mask]);
    icon_file(image.as_slice())
}
