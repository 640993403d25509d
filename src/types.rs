use clap::ValueEnum;
use int_enum::IntEnum;
use serde::{Serialize, Serializer};

/// Magic number at the head of a native project archive.
pub const GMK_MAGIC: u32 = 1234321;

#[repr(u32)]
#[derive(Clone, Copy, Debug, IntEnum, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Supported project format versions
pub enum GmkVersion {
    #[value(name = "800", alias("8.0"))]
    /// GameMaker 8.0
    V800 = 800,
    #[value(name = "810", alias("8.1"))]
    /// GameMaker 8.1
    V810 = 810,
}

impl GmkVersion {
    /// Parses a raw version dword, rejecting anything but 800 and 810.
    pub fn from_raw(raw: u32) -> Result<Self, GmkError> {
        Self::try_from(raw).map_err(|_| GmkError::UnsupportedVersion(raw))
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// File extension used by the authoring tool for this version.
    pub fn extension(self) -> &'static str {
        match self {
            Self::V800 => "gmk",
            Self::V810 => "gm81",
        }
    }
}

impl Serialize for GmkVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw())
    }
}

impl std::fmt::Display for GmkVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V800 => write!(f, "GameMaker 8.0"),
            Self::V810 => write!(f, "GameMaker 8.1"),
        }
    }
}

#[derive(Clone, Debug)]
/// Options that control how an input file is loaded
pub struct LoadConfig {
    /// Executable version to assume. `None` tries 8.0 first, then 8.1.
    pub exe_version: Option<GmkVersion>,
    /// Pull the window icon out of an executable's resources.
    pub extract_icon: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            exe_version: None,
            extract_icon: true,
        }
    }
}

#[derive(Clone, Debug)]
/// Options that control how a project is saved
pub struct SaveConfig {
    /// Archive version to write
    pub version: GmkVersion,
}

#[derive(Debug)]
/// Fatal failures raised while loading or saving a project
pub enum GmkError {
    /// A read ran past the end of the buffer
    StreamTruncated {
        position: usize,
        wanted: usize,
        length: usize,
    },
    /// Unknown archive or executable version, or a failed post-decryption check
    UnsupportedVersion(u32),
    /// Neither executable signature matched
    FormatNotRecognized,
    /// A compressed block could not be inflated
    DecompressionFailed(String),
    /// A record broke a structural rule of the format
    InvalidData(String),
    /// Opening, reading or writing a file failed
    Io(std::io::Error),
}

impl std::error::Error for GmkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GmkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for GmkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GmkError::StreamTruncated {
                position,
                wanted,
                length,
            } => write!(
                f,
                "Unexpected end of stream: wanted {} bytes at {} but length is {}",
                wanted, position, length
            ),
            GmkError::UnsupportedVersion(v) => write!(f, "Unsupported or incompatible version {}", v),
            GmkError::FormatNotRecognized => write!(f, "Game data format not recognized"),
            GmkError::DecompressionFailed(e) => write!(f, "Decompression failed: {}", e),
            GmkError::InvalidData(e) => write!(f, "Invalid data: {}", e),
            GmkError::Io(e) => write!(f, "I/O failure: {}", e),
        }
    }
}

impl From<std::io::Error> for GmkError {
    fn from(e: std::io::Error) -> Self {
        GmkError::Io(e)
    }
}

#[test]
fn test_version_from_raw() {
    assert_eq!(GmkVersion::from_raw(800).unwrap(), GmkVersion::V800);
    assert_eq!(GmkVersion::from_raw(810).unwrap(), GmkVersion::V810);
    match GmkVersion::from_raw(700) {
        Err(GmkError::UnsupportedVersion(700)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}
