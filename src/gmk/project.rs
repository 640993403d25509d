//! In-memory project model shared by the archive and executable codecs.
//!
//! Collections keep deleted entries as `None` so that every index stored in another record
//! (object sprite, room instance object, room order, tree leaves) stays valid.
use crate::gmk::stream::GmkStream;
use crate::gmk::tree::{ResourceTreeNode, TreeEntry, flatten_tree};
use crate::types::GmkVersion;
use crate::utils::struct_pack::*;
use anyhow::Result;
use gmk_tool_macro::{StructPack, StructUnpack};
use serde::{Serialize, Serializer};

/// Raw text as stored in a project. No encoding conversion is ever applied.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GmString(Vec<u8>);

impl GmString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<Vec<u8>> for GmString {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for GmString {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<&str> for GmString {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for GmString {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl std::fmt::Display for GmString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl std::fmt::Debug for GmString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for GmString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Global game settings
pub struct Settings {
    pub fullscreen: bool,
    pub interpolate: bool,
    pub dont_draw_border: bool,
    pub display_cursor: bool,
    pub scaling: i32,
    pub allow_window_resize: bool,
    pub always_on_top: bool,
    pub color_outside_room: u32,
    pub set_resolution: bool,
    pub color_depth: u32,
    pub resolution: u32,
    pub frequency: u32,
    pub dont_show_buttons: bool,
    pub vsync: bool,
    pub disable_screensaver: bool,
    pub let_f4: bool,
    pub let_f1: bool,
    pub let_esc: bool,
    pub let_f5: bool,
    pub let_f9: bool,
    pub treat_close_as_esc: bool,
    pub priority: u32,
    pub freeze_on_lose_focus: bool,
    /// 0 = none, 1 = default, 2 = custom images
    pub loading_bar: u32,
    pub loading_bar_back: Option<Vec<u8>>,
    pub loading_bar_front: Option<Vec<u8>>,
    pub custom_load_image: bool,
    pub load_image: Option<Vec<u8>>,
    pub transparent: bool,
    pub translucency: u32,
    pub scale_progress_bar: bool,
    /// Raw `.ico` file contents
    pub icon: Vec<u8>,
    pub error_display: bool,
    pub error_log: bool,
    pub error_abort: bool,
    pub treat_uninitialized_as_zero: bool,
    pub error_on_uninitialized: bool,
    pub author: GmString,
    pub version: GmString,
    pub last_changed: i64,
    pub information: GmString,
    pub major_version: u32,
    pub minor_version: u32,
    pub release_version: u32,
    pub build_version: u32,
    pub company: GmString,
    pub product: GmString,
    pub copyright: GmString,
    pub description: GmString,
    pub last_settings_changed: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trigger {
    pub name: GmString,
    pub condition: GmString,
    pub check_moment: u32,
    pub constant_name: GmString,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constant {
    pub name: GmString,
    pub value: GmString,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sound {
    pub name: GmString,
    pub last_changed: i64,
    pub kind: u32,
    pub file_type: GmString,
    pub file_name: GmString,
    pub data: Option<Vec<u8>>,
    pub effects: u32,
    pub volume: f64,
    pub pan: f64,
    pub preload: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubImage {
    pub width: u32,
    pub height: u32,
    /// Raw pixel data; only stored when both dimensions are non-zero.
    pub data: Vec<u8>,
}

impl SubImage {
    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sprite {
    pub name: GmString,
    pub last_changed: i64,
    pub origin_x: i32,
    pub origin_y: i32,
    pub subimages: Vec<SubImage>,
    pub shape: u32,
    pub alpha_tolerance: u32,
    pub separate_mask: bool,
    pub bounding_box: u32,
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Background {
    pub name: GmString,
    pub last_changed: i64,
    pub tileset: bool,
    pub tile_width: u32,
    pub tile_height: u32,
    pub h_offset: u32,
    pub v_offset: u32,
    pub h_sep: u32,
    pub v_sep: u32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            name: GmString::new(),
            last_changed: 0,
            tileset: false,
            tile_width: 16,
            tile_height: 16,
            h_offset: 0,
            v_offset: 0,
            h_sep: 0,
            v_sep: 0,
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }
}

impl Background {
    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, StructPack, StructUnpack)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub name: GmString,
    pub last_changed: i64,
    pub kind: u32,
    pub closed: bool,
    pub precision: u32,
    /// Room shown behind the path in the editor, -1 for none
    pub room_index: i32,
    pub snap_x: u32,
    pub snap_y: u32,
    pub points: Vec<PathPoint>,
}

impl Default for Path {
    fn default() -> Self {
        Self {
            name: GmString::new(),
            last_changed: 0,
            kind: 0,
            closed: true,
            precision: 4,
            room_index: -1,
            snap_x: 16,
            snap_y: 16,
            points: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    pub name: GmString,
    pub last_changed: i64,
    pub code: GmString,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    pub name: GmString,
    pub last_changed: i64,
    pub font_name: GmString,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    /// 8.1 only; packed into the top byte of the range-begin field
    pub charset: u32,
    /// 8.1 only; packed into the second byte of the range-begin field
    pub aa_level: u32,
    pub range_begin: u32,
    pub range_end: u32,
}

/// Number of argument slots carried by every action record.
pub const ACTION_ARGUMENT_SLOTS: usize = 8;

#[derive(Clone, Debug, Default, PartialEq)]
/// One drag-and-drop action, shared by object events and timeline moments
pub struct Action {
    pub library_id: u32,
    pub action_id: u32,
    pub kind: u32,
    pub may_be_relative: bool,
    pub question: bool,
    pub applies_to_something: bool,
    pub exec_type: u32,
    pub function_name: GmString,
    pub function_code: GmString,
    pub arguments_used: u32,
    pub argument_kinds: [u32; ACTION_ARGUMENT_SLOTS],
    /// -1 = self, -2 = other, otherwise an object index
    pub applies_to: i32,
    pub relative: bool,
    pub argument_values: [GmString; ACTION_ARGUMENT_SLOTS],
    pub negate: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Moment {
    pub position: u32,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    pub name: GmString,
    pub last_changed: i64,
    pub moments: Vec<Moment>,
}

/// Number of event-type buckets written for every object.
pub const OBJECT_EVENT_BUCKETS: usize = 12;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectEvent {
    /// Event number inside its bucket (e.g. alarm index, key code)
    pub kind: u32,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub name: GmString,
    pub last_changed: i64,
    pub sprite_index: i32,
    pub solid: bool,
    pub visible: bool,
    pub depth: i32,
    pub persistent: bool,
    pub parent_index: i32,
    pub mask_index: i32,
    /// One list per event type, in bucket order
    pub events: Vec<Vec<ObjectEvent>>,
}

impl Default for Object {
    fn default() -> Self {
        Self {
            name: GmString::new(),
            last_changed: 0,
            sprite_index: -1,
            solid: false,
            visible: true,
            depth: 0,
            persistent: false,
            parent_index: -1,
            mask_index: -1,
            events: vec![Vec::new(); OBJECT_EVENT_BUCKETS],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, StructPack, StructUnpack)]
pub struct RoomBackground {
    pub visible: bool,
    pub foreground: bool,
    pub background_index: i32,
    pub x: i32,
    pub y: i32,
    pub tile_h: bool,
    pub tile_v: bool,
    pub h_speed: i32,
    pub v_speed: i32,
    pub stretch: bool,
}

#[derive(Clone, Debug, Default, PartialEq, StructPack, StructUnpack)]
pub struct RoomView {
    pub visible: bool,
    pub view_x: i32,
    pub view_y: i32,
    pub view_w: u32,
    pub view_h: u32,
    pub port_x: i32,
    pub port_y: i32,
    pub port_w: u32,
    pub port_h: u32,
    pub h_border: i32,
    pub v_border: i32,
    pub h_speed: i32,
    pub v_speed: i32,
    pub follow_object: i32,
}

#[derive(Clone, Debug, Default, PartialEq, StructPack, StructUnpack)]
pub struct RoomInstance {
    pub x: i32,
    pub y: i32,
    pub object_index: i32,
    pub id: u32,
    pub creation_code: GmString,
    pub locked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, StructPack, StructUnpack)]
pub struct RoomTile {
    pub x: i32,
    pub y: i32,
    pub background_index: i32,
    pub tile_x: i32,
    pub tile_y: i32,
    pub width: u32,
    pub height: u32,
    pub depth: i32,
    pub id: u32,
    pub locked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub name: GmString,
    pub last_changed: i64,
    pub caption: GmString,
    pub width: u32,
    pub height: u32,
    pub snap_x: u32,
    pub snap_y: u32,
    pub isometric: bool,
    pub speed: u32,
    pub persistent: bool,
    pub background_color: u32,
    pub draw_background_color: bool,
    pub creation_code: GmString,
    pub backgrounds: Vec<RoomBackground>,
    pub enable_views: bool,
    pub views: Vec<RoomView>,
    pub instances: Vec<RoomInstance>,
    pub tiles: Vec<RoomTile>,
    pub remember_editor_settings: bool,
    pub editor_width: u32,
    pub editor_height: u32,
    pub show_grid: bool,
    pub show_objects: bool,
    pub show_tiles: bool,
    pub show_backgrounds: bool,
    pub show_foregrounds: bool,
    pub show_views: bool,
    pub delete_underlying_objects: bool,
    pub delete_underlying_tiles: bool,
    pub tab: u32,
    pub x_scroll: i32,
    pub y_scroll: i32,
}

impl Default for Room {
    fn default() -> Self {
        Self {
            name: GmString::new(),
            last_changed: 0,
            caption: GmString::new(),
            width: 640,
            height: 480,
            snap_x: 16,
            snap_y: 16,
            isometric: false,
            speed: 30,
            persistent: false,
            background_color: 0xC0C0C0,
            draw_background_color: true,
            creation_code: GmString::new(),
            backgrounds: Vec::new(),
            enable_views: false,
            views: Vec::new(),
            instances: Vec::new(),
            tiles: Vec::new(),
            remember_editor_settings: true,
            editor_width: 640,
            editor_height: 480,
            show_grid: true,
            show_objects: true,
            show_tiles: true,
            show_backgrounds: true,
            show_foregrounds: true,
            show_views: false,
            delete_underlying_objects: true,
            delete_underlying_tiles: true,
            tab: 0,
            x_scroll: 0,
            y_scroll: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncludeFile {
    pub last_changed: i64,
    pub file_name: GmString,
    pub file_path: GmString,
    pub original_file: bool,
    pub original_size: u32,
    pub stored_in_project: bool,
    pub data: Option<Vec<u8>>,
    pub export_flags: u32,
    pub export_folder: GmString,
    pub overwrite: bool,
    pub free_memory: bool,
    pub remove_at_end: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameInfo {
    pub background_color: u32,
    pub separate_window: bool,
    pub caption: GmString,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub show_border: bool,
    pub allow_resize: bool,
    pub stay_on_top: bool,
    pub freeze_game: bool,
    pub last_changed: i64,
    pub rtf: GmString,
}

#[derive(Clone, Debug, PartialEq)]
/// A whole project, rebuilt from scratch on every load
pub struct ProjectModel {
    pub version: GmkVersion,
    pub game_id: u32,
    pub guid: [u32; 4],
    pub settings: Settings,
    pub triggers: Vec<Option<Trigger>>,
    pub triggers_changed: i64,
    pub constants: Vec<Constant>,
    pub constants_changed: i64,
    pub sounds: Vec<Option<Sound>>,
    pub sprites: Vec<Option<Sprite>>,
    pub backgrounds: Vec<Option<Background>>,
    pub paths: Vec<Option<Path>>,
    pub scripts: Vec<Option<Script>>,
    pub fonts: Vec<Option<Font>>,
    pub timelines: Vec<Option<Timeline>>,
    pub objects: Vec<Option<Object>>,
    pub rooms: Vec<Option<Room>>,
    pub last_instance_id: u32,
    pub last_tile_id: u32,
    pub includes: Vec<IncludeFile>,
    pub packages: Vec<GmString>,
    pub game_info: GameInfo,
    pub library_creation_code: Vec<GmString>,
    /// Room indices in run order
    pub room_order: Vec<u32>,
    /// The twelve top-level browser folders
    pub tree: Vec<ResourceTreeNode>,
}

#[derive(Clone, Debug, Serialize)]
/// Counts and identity of a project, for the `info` command
pub struct ProjectSummary<'a> {
    pub version: GmkVersion,
    pub game_id: u32,
    pub sounds: usize,
    pub sprites: usize,
    pub backgrounds: usize,
    pub paths: usize,
    pub scripts: usize,
    pub fonts: usize,
    pub timelines: usize,
    pub objects: usize,
    pub rooms: usize,
    pub triggers: usize,
    pub constants: usize,
    pub includes: usize,
    pub packages: &'a [GmString],
    pub room_order: &'a [u32],
    /// Browser tree in pre-order
    pub tree: Vec<TreeEntry<'a>>,
}

fn present<T>(items: &[Option<T>]) -> usize {
    items.iter().filter(|i| i.is_some()).count()
}

impl ProjectModel {
    pub fn summary(&self) -> ProjectSummary<'_> {
        ProjectSummary {
            version: self.version,
            game_id: self.game_id,
            sounds: present(&self.sounds),
            sprites: present(&self.sprites),
            backgrounds: present(&self.backgrounds),
            paths: present(&self.paths),
            scripts: present(&self.scripts),
            fonts: present(&self.fonts),
            timelines: present(&self.timelines),
            objects: present(&self.objects),
            rooms: present(&self.rooms),
            triggers: present(&self.triggers),
            constants: self.constants.len(),
            includes: self.includes.len(),
            packages: &self.packages,
            room_order: &self.room_order,
            tree: flatten_tree(&self.tree),
        }
    }
}
