//! Global game settings, in both the archive and the executable layout.
use crate::gmk::packing::{ErrorFlags, pack_error_flags, unpack_error_flags};
use crate::gmk::project::Settings;
use crate::gmk::stream::GmkStream;
use crate::types::GmkVersion;
use anyhow::Result;

pub const SETTINGS_MARKER: u32 = 800;

fn read_optional_image(block: &mut GmkStream) -> Result<Option<Vec<u8>>> {
    if block.read_bool()? {
        Ok(Some(block.read_block(true)?.into_inner()))
    } else {
        Ok(None)
    }
}

fn write_optional_image(image: &Option<Vec<u8>>, block: &mut GmkStream) -> Result<()> {
    block.write_bool(image.is_some());
    if let Some(data) = image {
        GmkStream::from_vec(data.clone()).write_block(block, true)?;
    }
    Ok(())
}

/// Window, display and key fields shared by both layouts, up to freeze-on-lose-focus.
fn read_display(block: &mut GmkStream, settings: &mut Settings) -> Result<()> {
    settings.fullscreen = block.read_bool()?;
    settings.interpolate = block.read_bool()?;
    settings.dont_draw_border = block.read_bool()?;
    settings.display_cursor = block.read_bool()?;
    settings.scaling = block.read_i32()?;
    settings.allow_window_resize = block.read_bool()?;
    settings.always_on_top = block.read_bool()?;
    settings.color_outside_room = block.read_u32()?;
    settings.set_resolution = block.read_bool()?;
    settings.color_depth = block.read_u32()?;
    settings.resolution = block.read_u32()?;
    settings.frequency = block.read_u32()?;
    settings.dont_show_buttons = block.read_bool()?;
    settings.vsync = block.read_bool()?;
    settings.disable_screensaver = block.read_bool()?;
    settings.let_f4 = block.read_bool()?;
    settings.let_f1 = block.read_bool()?;
    settings.let_esc = block.read_bool()?;
    settings.let_f5 = block.read_bool()?;
    settings.let_f9 = block.read_bool()?;
    settings.treat_close_as_esc = block.read_bool()?;
    settings.priority = block.read_u32()?;
    settings.freeze_on_lose_focus = block.read_bool()?;
    Ok(())
}

fn write_display(settings: &Settings, block: &mut GmkStream) {
    block.write_bool(settings.fullscreen);
    block.write_bool(settings.interpolate);
    block.write_bool(settings.dont_draw_border);
    block.write_bool(settings.display_cursor);
    block.write_i32(settings.scaling);
    block.write_bool(settings.allow_window_resize);
    block.write_bool(settings.always_on_top);
    block.write_u32(settings.color_outside_room);
    block.write_bool(settings.set_resolution);
    block.write_u32(settings.color_depth);
    block.write_u32(settings.resolution);
    block.write_u32(settings.frequency);
    block.write_bool(settings.dont_show_buttons);
    block.write_bool(settings.vsync);
    block.write_bool(settings.disable_screensaver);
    block.write_bool(settings.let_f4);
    block.write_bool(settings.let_f1);
    block.write_bool(settings.let_esc);
    block.write_bool(settings.let_f5);
    block.write_bool(settings.let_f9);
    block.write_bool(settings.treat_close_as_esc);
    block.write_u32(settings.priority);
    block.write_bool(settings.freeze_on_lose_focus);
}

fn read_errors(block: &mut GmkStream, settings: &mut Settings, version: GmkVersion) -> Result<()> {
    settings.error_display = block.read_bool()?;
    settings.error_log = block.read_bool()?;
    settings.error_abort = block.read_bool()?;
    let flags = unpack_error_flags(block.read_u32()?, version);
    settings.treat_uninitialized_as_zero = flags.treat_uninitialized_as_zero;
    settings.error_on_uninitialized = flags.error_on_uninitialized;
    Ok(())
}

/// Reads `[marker][compressed settings block]` from an archive.
pub fn read_archive_settings(stream: &mut GmkStream, version: GmkVersion) -> Result<Settings> {
    stream.skip_fields(1)?;
    let mut block = stream.read_block(true)?;
    let mut settings = Settings::default();
    read_display(&mut block, &mut settings)?;

    settings.loading_bar = block.read_u32()?;
    settings.loading_bar_back = None;
    settings.loading_bar_front = None;
    if settings.loading_bar == 2 {
        settings.loading_bar_back = read_optional_image(&mut block)?;
        settings.loading_bar_front = read_optional_image(&mut block)?;
    }
    settings.custom_load_image = block.read_bool()?;
    settings.load_image = None;
    if settings.custom_load_image {
        settings.load_image = read_optional_image(&mut block)?;
    }
    settings.transparent = block.read_bool()?;
    settings.translucency = block.read_u32()?;
    settings.scale_progress_bar = block.read_bool()?;
    settings.icon = block.read_block(false)?.into_inner();
    read_errors(&mut block, &mut settings, version)?;

    settings.author = block.read_string()?;
    settings.version = block.read_string()?;
    settings.last_changed = block.read_timestamp()?;
    settings.information = block.read_string()?;
    settings.major_version = block.read_u32()?;
    settings.minor_version = block.read_u32()?;
    settings.release_version = block.read_u32()?;
    settings.build_version = block.read_u32()?;
    settings.company = block.read_string()?;
    settings.product = block.read_string()?;
    settings.copyright = block.read_string()?;
    settings.description = block.read_string()?;
    settings.last_settings_changed = block.read_timestamp()?;
    Ok(settings)
}

pub fn write_archive_settings(
    settings: &Settings,
    stream: &mut GmkStream,
    version: GmkVersion,
) -> Result<()> {
    stream.write_u32(SETTINGS_MARKER);
    let mut block = GmkStream::new();
    write_display(settings, &mut block);

    block.write_u32(settings.loading_bar);
    if settings.loading_bar == 2 {
        write_optional_image(&settings.loading_bar_back, &mut block)?;
        write_optional_image(&settings.loading_bar_front, &mut block)?;
    }
    block.write_bool(settings.custom_load_image);
    if settings.custom_load_image {
        write_optional_image(&settings.load_image, &mut block)?;
    }
    block.write_bool(settings.transparent);
    block.write_u32(settings.translucency);
    block.write_bool(settings.scale_progress_bar);
    GmkStream::from_vec(settings.icon.clone()).write_block(&mut block, false)?;

    block.write_bool(settings.error_display);
    block.write_bool(settings.error_log);
    block.write_bool(settings.error_abort);
    block.write_u32(pack_error_flags(
        ErrorFlags {
            treat_uninitialized_as_zero: settings.treat_uninitialized_as_zero,
            error_on_uninitialized: settings.error_on_uninitialized,
        },
        version,
    ));

    block.write_string(&settings.author);
    block.write_string(&settings.version);
    block.write_timestamp();
    block.write_string(&settings.information);
    block.write_u32(settings.major_version);
    block.write_u32(settings.minor_version);
    block.write_u32(settings.release_version);
    block.write_u32(settings.build_version);
    block.write_string(&settings.company);
    block.write_string(&settings.product);
    block.write_string(&settings.copyright);
    block.write_string(&settings.description);
    block.write_timestamp();
    block.write_block(stream, true)
}

/// Reads the settings block stored in front of a game's encrypted data.
///
/// Compiled games drop the icon, the version info and the author fields; those keep their
/// template values.
pub fn read_exe_settings(stream: &mut GmkStream, version: GmkVersion) -> Result<Settings> {
    stream.skip_fields(1)?;
    let mut block = stream.read_block(true)?;
    let mut settings = Settings::default();
    read_display(&mut block, &mut settings)?;

    settings.loading_bar = block.read_u32()?;
    if settings.loading_bar != 0 {
        settings.loading_bar_back = read_optional_image(&mut block)?;
        settings.loading_bar_front = read_optional_image(&mut block)?;
    }
    settings.custom_load_image = block.read_bool()?;
    if settings.custom_load_image {
        settings.load_image = Some(block.read_block(true)?.into_inner());
    }
    settings.transparent = block.read_bool()?;
    settings.translucency = block.read_u32()?;
    settings.scale_progress_bar = block.read_bool()?;
    read_errors(&mut block, &mut settings, version)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmk::project::GmString;

    fn sample() -> Settings {
        let mut s = Settings::default();
        s.fullscreen = true;
        s.scaling = 0;
        s.color_outside_room = 0x00FF00;
        s.priority = 2;
        s.loading_bar = 2;
        s.loading_bar_back = Some(b"BM back".to_vec());
        s.loading_bar_front = None;
        s.custom_load_image = true;
        s.load_image = Some(vec![7; 300]);
        s.translucency = 128;
        s.icon = vec![0, 0, 1, 0, 1, 0];
        s.treat_uninitialized_as_zero = true;
        s.error_on_uninitialized = true;
        s.author = GmString::from("someone");
        s.information = GmString::from("a game");
        s.major_version = 2;
        s.build_version = 17;
        s.product = GmString::from("Product");
        s
    }

    fn round_trip(settings: &Settings, version: GmkVersion) -> Settings {
        let mut s = GmkStream::new();
        write_archive_settings(settings, &mut s, version).unwrap();
        s.set_position(0).unwrap();
        let mut back = read_archive_settings(&mut s, version).unwrap();
        assert_eq!(s.remaining(), 0);
        back.last_changed = settings.last_changed;
        back.last_settings_changed = settings.last_settings_changed;
        back
    }

    #[test]
    fn test_archive_round_trip() {
        for version in [GmkVersion::V800, GmkVersion::V810] {
            let settings = sample();
            assert_eq!(round_trip(&settings, version), settings);
        }
    }

    #[test]
    fn test_uninitialized_flag_per_version() {
        let mut settings = sample();
        settings.error_on_uninitialized = false;
        assert!(!round_trip(&settings, GmkVersion::V810).error_on_uninitialized);
        assert!(round_trip(&settings, GmkVersion::V800).error_on_uninitialized);
    }

    #[test]
    fn test_loading_bar_images_only_for_custom_bar() {
        let mut settings = sample();
        settings.loading_bar = 1;
        let back = round_trip(&settings, GmkVersion::V810);
        assert_eq!(back.loading_bar_back, None);
        assert_eq!(back.loading_bar_front, None);
    }

    #[test]
    fn test_exe_settings() {
        let mut block = GmkStream::new();
        let mut expected = Settings::default();
        expected.fullscreen = true;
        expected.loading_bar = 1;
        expected.loading_bar_back = None;
        expected.loading_bar_front = Some(vec![1, 2, 3]);
        expected.custom_load_image = true;
        expected.load_image = Some(vec![9; 16]);
        expected.translucency = 200;
        expected.treat_uninitialized_as_zero = false;
        expected.error_on_uninitialized = true;
        write_display(&expected, &mut block);
        block.write_u32(1);
        block.write_bool(false);
        block.write_bool(true);
        GmkStream::from_vec(vec![1, 2, 3])
            .write_block(&mut block, true)
            .unwrap();
        block.write_bool(true);
        GmkStream::from_vec(vec![9; 16])
            .write_block(&mut block, true)
            .unwrap();
        block.write_bool(expected.transparent);
        block.write_u32(200);
        block.write_bool(expected.scale_progress_bar);
        block.write_bool(expected.error_display);
        block.write_bool(expected.error_log);
        block.write_bool(expected.error_abort);
        block.write_u32(2);

        let mut s = GmkStream::new();
        s.write_u32(SETTINGS_MARKER);
        block.write_block(&mut s, true).unwrap();
        s.set_position(0).unwrap();
        let settings = read_exe_settings(&mut s, GmkVersion::V810).unwrap();
        assert_eq!(settings, expected);
    }
}
