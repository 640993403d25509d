//! Finds the embedded game data inside a compiled executable image.
use crate::gmk::exe::cipher::GARBAGE_OFFSET;
use crate::gmk::stream::GmkStream;
use crate::types::{GMK_MAGIC, GmkError, GmkVersion};
use anyhow::Result;

/// Absolute offset of the 8.0 game data magic.
pub const V800_DATA_OFFSET: usize = 0x1E8480;
/// The 8.1 garbage table never runs longer than this many dwords.
pub const V810_SCAN_WORDS: usize = 1024;

const V810_SIGNATURE_MASK: (u32, u32) = (0xFF00FF00, 0x00FF00FF);
const V810_SIGNATURE: (u32, u32) = (0xF7000000, 0x00140067);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameDataLocation {
    pub version: GmkVersion,
    /// Offset just past the matched magic or signature.
    pub position: usize,
}

fn match_v800(stream: &mut GmkStream) -> Option<usize> {
    stream.set_position(V800_DATA_OFFSET).ok()?;
    (stream.read_u32().ok()? == GMK_MAGIC).then(|| stream.position())
}

/// The second word is only read after the first one matches, so a miss on it consumes two
/// words of the window.
fn match_v810(stream: &mut GmkStream) -> Option<usize> {
    stream.set_position(GARBAGE_OFFSET).ok()?;
    for _ in 0..V810_SCAN_WORDS {
        let first = stream.read_u32().ok()?;
        if first & V810_SIGNATURE_MASK.0 == V810_SIGNATURE.0 {
            let second = stream.read_u32().ok()?;
            if second & V810_SIGNATURE_MASK.1 == V810_SIGNATURE.1 {
                return Some(stream.position());
            }
        }
    }
    None
}

/// Checks for the requested version, or 8.0 then 8.1 when `version` is `None`.
///
/// On success the cursor is left at [`GameDataLocation::position`].
pub fn locate(stream: &mut GmkStream, version: Option<GmkVersion>) -> Result<GameDataLocation> {
    let candidates: &[GmkVersion] = match version {
        Some(GmkVersion::V800) => &[GmkVersion::V800],
        Some(GmkVersion::V810) => &[GmkVersion::V810],
        None => &[GmkVersion::V800, GmkVersion::V810],
    };
    for &candidate in candidates {
        let found = match candidate {
            GmkVersion::V800 => match_v800(stream),
            GmkVersion::V810 => match_v810(stream),
        };
        if let Some(position) = found {
            log::info!("Detected {} game data at {:#x}", candidate, position);
            return Ok(GameDataLocation {
                version: candidate,
                position,
            });
        }
        log::debug!("{} signature did not match", candidate);
    }
    Err(GmkError::FormatNotRecognized.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(image: &[u8], version: Option<GmkVersion>) -> Result<GameDataLocation> {
        let mut stream = GmkStream::from_vec(image.to_vec());
        let found = locate(&mut stream, version)?;
        assert_eq!(stream.position(), found.position);
        Ok(found)
    }

    fn image_with(offset: usize, words: &[u32]) -> Vec<u8> {
        let mut s = GmkStream::from_vec(vec![0; offset]);
        s.set_position(offset).unwrap();
        for &w in words {
            s.write_u32(w);
        }
        s.write_bytes(&[0; 64]);
        s.into_inner()
    }

    #[test]
    fn test_detects_v800() {
        let image = image_with(V800_DATA_OFFSET, &[GMK_MAGIC]);
        let found = run(&image, None).unwrap();
        assert_eq!(found.version, GmkVersion::V800);
        assert_eq!(found.position, V800_DATA_OFFSET + 4);
        assert_eq!(run(&image, Some(GmkVersion::V800)).unwrap(), found);
    }

    #[test]
    fn test_detects_v810() {
        let mut s = GmkStream::from_vec(vec![0; GARBAGE_OFFSET]);
        s.set_position(GARBAGE_OFFSET).unwrap();
        for _ in 0..10 {
            s.write_u32(0x12345678);
        }
        s.write_u32(0xF7AB00CD);
        s.write_u32(0xAA14BB67);
        s.write_bytes(&[0; 16]);
        let image = s.into_inner();
        let found = run(&image, None).unwrap();
        assert_eq!(found.version, GmkVersion::V810);
        assert_eq!(found.position, GARBAGE_OFFSET + 12 * 4);
        assert!(run(&image, Some(GmkVersion::V800)).is_err());
    }

    #[test]
    fn test_signature_outside_window() {
        let mut words = vec![0u32; V810_SCAN_WORDS];
        words.push(0xF7000000);
        words.push(0x00140067);
        let image = image_with(GARBAGE_OFFSET, &words);
        assert!(run(&image, Some(GmkVersion::V810)).is_err());
    }

    #[test]
    fn test_nothing_found() {
        for image in [Vec::new(), vec![0u8; 4096], vec![0u8; GARBAGE_OFFSET + 8192]] {
            let err = run(&image, None).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<GmkError>(),
                Some(GmkError::FormatNotRecognized)
            ));
        }
    }
}
