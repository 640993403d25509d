//! Fields whose bit layout depends on the format version.
use crate::types::GmkVersion;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FontRange {
    pub charset: u32,
    pub aa_level: u32,
    pub range_begin: u32,
}

/// Splits the font range-begin field. 8.0 stores the plain value.
pub fn unpack_font_range(raw: u32, version: GmkVersion) -> FontRange {
    match version {
        GmkVersion::V800 => FontRange {
            range_begin: raw,
            ..Default::default()
        },
        GmkVersion::V810 => FontRange {
            charset: (raw >> 24) & 0xFF,
            aa_level: (raw >> 16) & 0xFF,
            range_begin: raw & 0xFFFF,
        },
    }
}

pub fn pack_font_range(range: FontRange, version: GmkVersion) -> u32 {
    match version {
        GmkVersion::V800 => range.range_begin,
        GmkVersion::V810 => {
            ((range.charset & 0xFF) << 24)
                | ((range.aa_level & 0xFF) << 16)
                | (range.range_begin & 0xFFFF)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorFlags {
    pub treat_uninitialized_as_zero: bool,
    pub error_on_uninitialized: bool,
}

/// 8.1 packs two flags into the dword; 8.0 stores a plain boolean and always errors on
/// uninitialized arguments.
pub fn unpack_error_flags(raw: u32, version: GmkVersion) -> ErrorFlags {
    match version {
        GmkVersion::V800 => ErrorFlags {
            treat_uninitialized_as_zero: raw != 0,
            error_on_uninitialized: true,
        },
        GmkVersion::V810 => ErrorFlags {
            treat_uninitialized_as_zero: raw & 1 != 0,
            error_on_uninitialized: raw & 2 != 0,
        },
    }
}

pub fn pack_error_flags(flags: ErrorFlags, version: GmkVersion) -> u32 {
    match version {
        GmkVersion::V800 => flags.treat_uninitialized_as_zero as u32,
        GmkVersion::V810 => {
            flags.treat_uninitialized_as_zero as u32 | ((flags.error_on_uninitialized as u32) << 1)
        }
    }
}
