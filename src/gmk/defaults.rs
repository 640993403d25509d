//! Template values for a fresh project, also used to fill fields compiled games drop.
use crate::gmk::exe::icon::blank_icon;
use crate::gmk::project::{GameInfo, GmString, ProjectModel, Settings};
use crate::gmk::tree::*;
use crate::types::GmkVersion;

const DEFAULT_GAME_INFO_RTF: &str = r"{\rtf1\ansi\ansicpg1252\deff0\deflang1033{\fonttbl{\f0\fnil\fcharset0 Calibri;}}{\*\generator Msftedit 5.41.21.2509;}\viewkind4\uc1\pard\sa200\sl276\slmult1\lang9\f0\fs22\par}";

impl Default for Settings {
    fn default() -> Self {
        Self {
            fullscreen: false,
            interpolate: false,
            dont_draw_border: false,
            display_cursor: true,
            scaling: -1,
            allow_window_resize: false,
            always_on_top: false,
            color_outside_room: 0,
            set_resolution: false,
            color_depth: 0,
            resolution: 0,
            frequency: 0,
            dont_show_buttons: false,
            vsync: false,
            disable_screensaver: true,
            let_f4: true,
            let_f1: true,
            let_esc: true,
            let_f5: true,
            let_f9: true,
            treat_close_as_esc: true,
            priority: 0,
            freeze_on_lose_focus: false,
            loading_bar: 1,
            loading_bar_back: None,
            loading_bar_front: None,
            custom_load_image: false,
            load_image: None,
            transparent: false,
            translucency: 255,
            scale_progress_bar: true,
            icon: blank_icon(),
            error_display: true,
            error_log: false,
            error_abort: false,
            treat_uninitialized_as_zero: false,
            error_on_uninitialized: true,
            author: GmString::new(),
            version: GmString::from("100"),
            last_changed: 0,
            information: GmString::new(),
            major_version: 1,
            minor_version: 0,
            release_version: 0,
            build_version: 0,
            company: GmString::new(),
            product: GmString::new(),
            copyright: GmString::new(),
            description: GmString::new(),
            last_settings_changed: 0,
        }
    }
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            background_color: 0xFFFFE1,
            separate_window: false,
            caption: GmString::from("Game Information"),
            left: -1,
            top: -1,
            width: 600,
            height: 400,
            show_border: true,
            allow_resize: true,
            stay_on_top: false,
            freeze_game: true,
            last_changed: 0,
            rtf: GmString::from(DEFAULT_GAME_INFO_RTF),
        }
    }
}

/// The twelve top-level folders of an empty project, in stored order.
pub fn default_tree() -> Vec<ResourceTreeNode> {
    [
        (STATUS_PRIMARY, GROUP_SPRITES, "Sprites"),
        (STATUS_PRIMARY, GROUP_SOUNDS, "Sounds"),
        (STATUS_PRIMARY, GROUP_BACKGROUNDS, "Backgrounds"),
        (STATUS_PRIMARY, GROUP_PATHS, "Paths"),
        (STATUS_PRIMARY, GROUP_SCRIPTS, "Scripts"),
        (STATUS_PRIMARY, GROUP_FONTS, "Fonts"),
        (STATUS_PRIMARY, GROUP_TIMELINES, "Time Lines"),
        (STATUS_PRIMARY, GROUP_OBJECTS, "Objects"),
        (STATUS_PRIMARY, GROUP_ROOMS, "Rooms"),
        (STATUS_SECONDARY, GROUP_GAME_INFO, "Game Information"),
        (STATUS_SECONDARY, GROUP_SETTINGS, "Global Game Settings"),
        (STATUS_SECONDARY, GROUP_PACKAGES, "Extension Packages"),
    ]
    .into_iter()
    .map(|(status, group, name)| ResourceTreeNode::folder(status, group, name))
    .collect()
}

/// Derives the four GUID dwords the authoring tool would generate for `game_id`.
pub fn guid_for(game_id: u32) -> [u32; 4] {
    let mut guid = [0u32; 4];
    for (i, dword) in guid.iter_mut().enumerate() {
        *dword = 0x80000000u32
            .wrapping_sub(game_id.wrapping_mul(16))
            .wrapping_sub(i as u32 * 8);
    }
    guid
}

impl ProjectModel {
    /// An empty project with a random game id.
    pub fn default_template(version: GmkVersion) -> Self {
        let game_id = rand::random::<u32>() % 100_000_000;
        Self {
            version,
            game_id,
            guid: guid_for(game_id),
            settings: Settings::default(),
            triggers: Vec::new(),
            triggers_changed: 0,
            constants: Vec::new(),
            constants_changed: 0,
            sounds: Vec::new(),
            sprites: Vec::new(),
            backgrounds: Vec::new(),
            paths: Vec::new(),
            scripts: Vec::new(),
            fonts: Vec::new(),
            timelines: Vec::new(),
            objects: Vec::new(),
            rooms: Vec::new(),
            last_instance_id: 100000,
            last_tile_id: 10000000,
            includes: Vec::new(),
            packages: Vec::new(),
            game_info: GameInfo::default(),
            library_creation_code: Vec::new(),
            room_order: Vec::new(),
            tree: default_tree(),
        }
    }
}
