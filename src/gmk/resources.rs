//! Record codecs for every resource kind.
//!
//! Each collection item is a compressed block opening with a presence flag. Named resources
//! continue with `[name][timestamp][marker]` in archives and `[name][marker]` in executables,
//! followed by a kind-specific body.
use crate::gmk::Layout;
use crate::gmk::action::{read_moments, read_object_events, write_moments, write_object_events};
use crate::gmk::packing::{FontRange, pack_font_range, unpack_font_range};
use crate::gmk::project::*;
use crate::gmk::stream::GmkStream;
use crate::gmk::tree::ResourceKind;
use crate::types::GmkVersion;
use crate::utils::struct_pack::*;
use anyhow::Result;

/// Marker written in front of every collection.
pub const COLLECTION_MARKER: u32 = 800;
pub const TRIGGER_MARKER: u32 = 800;
pub const INCLUDE_MARKER: u32 = 800;
pub const GAME_INFO_MARKER: u32 = 800;
const SUBIMAGE_MARKER: u32 = 800;
const BACKGROUND_IMAGE_MARKER: u32 = 800;

/// A named, index-addressed resource stored in its own block.
pub trait Resource: Sized {
    const KIND: ResourceKind;
    /// Version literal written after the name and timestamp.
    const MARKER: u32;

    fn name(&self) -> &GmString;
    fn set_header(&mut self, name: GmString, last_changed: i64);
    fn read_body(block: &mut GmkStream, layout: Layout, version: GmkVersion) -> Result<Self>;
    fn write_body(&self, block: &mut GmkStream, version: GmkVersion) -> Result<()>;
}

macro_rules! resource_header {
    () => {
        fn name(&self) -> &GmString {
            &self.name
        }

        fn set_header(&mut self, name: GmString, last_changed: i64) {
            self.name = name;
            self.last_changed = last_changed;
        }
    };
}

/// Reads one collection item. `None` is a deleted slot.
pub fn read_resource<T: Resource>(
    stream: &mut GmkStream,
    layout: Layout,
    version: GmkVersion,
) -> Result<Option<T>> {
    let mut block = stream.read_block(true)?;
    if !block.read_bool()? {
        return Ok(None);
    }
    let name = block.read_string()?;
    let last_changed = match layout {
        Layout::Archive => block.read_timestamp()?,
        Layout::Executable => 0,
    };
    block.skip_fields(1)?;
    let mut item = T::read_body(&mut block, layout, version)?;
    item.set_header(name, last_changed);
    Ok(Some(item))
}

pub fn write_resource<T: Resource>(
    item: Option<&T>,
    stream: &mut GmkStream,
    version: GmkVersion,
) -> Result<()> {
    let mut block = GmkStream::new();
    block.write_bool(item.is_some());
    if let Some(item) = item {
        block.write_string(item.name());
        block.write_timestamp();
        block.write_u32(T::MARKER);
        item.write_body(&mut block, version)?;
    }
    block.write_block(stream, true)
}

/// Reads `[marker][count][items…]`, calling `on_item` with the index of every present item.
pub fn read_collection<T: Resource>(
    stream: &mut GmkStream,
    layout: Layout,
    version: GmkVersion,
    mut on_item: impl FnMut(u32, &T) -> Result<()>,
) -> Result<Vec<Option<T>>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(stream.remaining() / 4));
    for index in 0..count {
        let item = read_resource::<T>(stream, layout, version)?;
        if let Some(item) = &item {
            on_item(index as u32, item)?;
        }
        items.push(item);
    }
    log::debug!("{:?}: {} slots", T::KIND, items.len());
    Ok(items)
}

pub fn write_collection<T: Resource>(
    items: &[Option<T>],
    stream: &mut GmkStream,
    version: GmkVersion,
) -> Result<()> {
    stream.write_u32(COLLECTION_MARKER);
    stream.write_u32(items.len() as u32);
    for item in items {
        write_resource(item.as_ref(), stream, version)?;
    }
    Ok(())
}

fn read_raw_blob(block: &mut GmkStream) -> Result<Vec<u8>> {
    Ok(block.read_block(false)?.into_inner())
}

fn write_raw_blob(data: &[u8], block: &mut GmkStream) -> Result<()> {
    GmkStream::from_vec(data.to_vec()).write_block(block, false)
}

impl Resource for Sound {
    const KIND: ResourceKind = ResourceKind::Sound;
    const MARKER: u32 = 800;
    resource_header!();

    fn read_body(block: &mut GmkStream, _layout: Layout, _version: GmkVersion) -> Result<Self> {
        let kind = block.read_u32()?;
        let file_type = block.read_string()?;
        let file_name = block.read_string()?;
        let data = if block.read_bool()? {
            Some(read_raw_blob(block)?)
        } else {
            None
        };
        Ok(Self {
            kind,
            file_type,
            file_name,
            data,
            effects: block.read_u32()?,
            volume: block.read_f64()?,
            pan: block.read_f64()?,
            preload: block.read_bool()?,
            ..Default::default()
        })
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        block.write_u32(self.kind);
        block.write_string(&self.file_type);
        block.write_string(&self.file_name);
        block.write_bool(self.data.is_some());
        if let Some(data) = &self.data {
            write_raw_blob(data, block)?;
        }
        block.write_u32(self.effects);
        block.write_f64(self.volume);
        block.write_f64(self.pan);
        block.write_bool(self.preload);
        Ok(())
    }
}

/// Reads one compiled collision mask and reports whether any pixel is set.
fn read_exe_mask(block: &mut GmkStream, sprite: &mut Sprite) -> Result<bool> {
    block.skip_fields(1)?;
    let width = block.read_u32()? as usize;
    let height = block.read_u32()? as usize;
    sprite.left = block.read_i32()?;
    sprite.right = block.read_i32()?;
    sprite.bottom = block.read_i32()?;
    sprite.top = block.read_i32()?;
    let mut any = false;
    for _ in 0..width.saturating_mul(height) {
        if block.read_u32()? != 0 {
            any = true;
        }
    }
    Ok(any)
}

impl Resource for Sprite {
    const KIND: ResourceKind = ResourceKind::Sprite;
    const MARKER: u32 = 800;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, _version: GmkVersion) -> Result<Self> {
        let mut sprite = Sprite {
            origin_x: block.read_i32()?,
            origin_y: block.read_i32()?,
            ..Default::default()
        };
        let count = block.read_u32()? as usize;
        for _ in 0..count {
            block.skip_fields(1)?;
            let mut image = SubImage {
                width: block.read_u32()?,
                height: block.read_u32()?,
                data: Vec::new(),
            };
            // Compiled games store every frame's pixels, even empty ones.
            if image.has_pixels() || layout == Layout::Executable {
                image.data = read_raw_blob(block)?;
            }
            sprite.subimages.push(image);
        }
        match layout {
            Layout::Archive => {
                sprite.shape = block.read_u32()?;
                sprite.alpha_tolerance = block.read_u32()?;
                sprite.separate_mask = block.read_bool()?;
                sprite.bounding_box = block.read_u32()?;
                sprite.left = block.read_i32()?;
                sprite.right = block.read_i32()?;
                sprite.bottom = block.read_i32()?;
                sprite.top = block.read_i32()?;
            }
            Layout::Executable => {
                sprite.bounding_box = 2;
                if count > 0 {
                    sprite.separate_mask = block.read_bool()?;
                    let masks = if sprite.separate_mask { count } else { 1 };
                    for _ in 0..masks {
                        if read_exe_mask(block, &mut sprite)? {
                            sprite.bounding_box = 1;
                        }
                    }
                }
            }
        }
        Ok(sprite)
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        block.write_i32(self.origin_x);
        block.write_i32(self.origin_y);
        block.write_u32(self.subimages.len() as u32);
        for image in &self.subimages {
            block.write_u32(SUBIMAGE_MARKER);
            block.write_u32(image.width);
            block.write_u32(image.height);
            if image.has_pixels() {
                write_raw_blob(&image.data, block)?;
            }
        }
        block.write_u32(self.shape);
        block.write_u32(self.alpha_tolerance);
        block.write_bool(self.separate_mask);
        block.write_u32(self.bounding_box);
        block.write_i32(self.left);
        block.write_i32(self.right);
        block.write_i32(self.bottom);
        block.write_i32(self.top);
        Ok(())
    }
}

impl Resource for Background {
    const KIND: ResourceKind = ResourceKind::Background;
    const MARKER: u32 = 710;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, _version: GmkVersion) -> Result<Self> {
        let mut background = Background::default();
        match layout {
            Layout::Archive => {
                background.tileset = block.read_bool()?;
                background.tile_width = block.read_u32()?;
                background.tile_height = block.read_u32()?;
                background.h_offset = block.read_u32()?;
                background.v_offset = block.read_u32()?;
                background.h_sep = block.read_u32()?;
                background.v_sep = block.read_u32()?;
                block.skip_fields(1)?;
            }
            Layout::Executable => block.skip_fields(1)?,
        }
        background.width = block.read_u32()?;
        background.height = block.read_u32()?;
        if background.has_pixels() {
            background.data = read_raw_blob(block)?;
        }
        Ok(background)
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        block.write_bool(self.tileset);
        block.write_u32(self.tile_width);
        block.write_u32(self.tile_height);
        block.write_u32(self.h_offset);
        block.write_u32(self.v_offset);
        block.write_u32(self.h_sep);
        block.write_u32(self.v_sep);
        block.write_u32(BACKGROUND_IMAGE_MARKER);
        block.write_u32(self.width);
        block.write_u32(self.height);
        if self.has_pixels() {
            write_raw_blob(&self.data, block)?;
        }
        Ok(())
    }
}

impl Resource for Path {
    const KIND: ResourceKind = ResourceKind::Path;
    const MARKER: u32 = 530;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, version: GmkVersion) -> Result<Self> {
        let mut path = Path {
            kind: block.read_u32()?,
            closed: block.read_bool()?,
            precision: block.read_u32()?,
            ..Default::default()
        };
        if layout == Layout::Archive {
            path.room_index = block.read_i32()?;
            path.snap_x = block.read_u32()?;
            path.snap_y = block.read_u32()?;
        }
        path.points = unpack_counted(block, version)?;
        Ok(path)
    }

    fn write_body(&self, block: &mut GmkStream, version: GmkVersion) -> Result<()> {
        block.write_u32(self.kind);
        block.write_bool(self.closed);
        block.write_u32(self.precision);
        block.write_i32(self.room_index);
        block.write_u32(self.snap_x);
        block.write_u32(self.snap_y);
        pack_counted(&self.points, block, version)
    }
}

impl Resource for Script {
    const KIND: ResourceKind = ResourceKind::Script;
    const MARKER: u32 = 800;
    resource_header!();

    fn read_body(block: &mut GmkStream, _layout: Layout, _version: GmkVersion) -> Result<Self> {
        Ok(Self {
            code: block.read_string()?,
            ..Default::default()
        })
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        block.write_string(&self.code);
        Ok(())
    }
}

impl Resource for Font {
    const KIND: ResourceKind = ResourceKind::Font;
    const MARKER: u32 = 800;
    resource_header!();

    fn read_body(block: &mut GmkStream, _layout: Layout, version: GmkVersion) -> Result<Self> {
        let font_name = block.read_string()?;
        let size = block.read_u32()?;
        let bold = block.read_bool()?;
        let italic = block.read_bool()?;
        let range = unpack_font_range(block.read_u32()?, version);
        Ok(Self {
            font_name,
            size,
            bold,
            italic,
            charset: range.charset,
            aa_level: range.aa_level,
            range_begin: range.range_begin,
            range_end: block.read_u32()?,
            ..Default::default()
        })
    }

    fn write_body(&self, block: &mut GmkStream, version: GmkVersion) -> Result<()> {
        block.write_string(&self.font_name);
        block.write_u32(self.size);
        block.write_bool(self.bold);
        block.write_bool(self.italic);
        block.write_u32(pack_font_range(
            FontRange {
                charset: self.charset,
                aa_level: self.aa_level,
                range_begin: self.range_begin,
            },
            version,
        ));
        block.write_u32(self.range_end);
        Ok(())
    }
}

impl Resource for Timeline {
    const KIND: ResourceKind = ResourceKind::Timeline;
    const MARKER: u32 = 500;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, _version: GmkVersion) -> Result<Self> {
        Ok(Self {
            moments: read_moments(block, layout)?,
            ..Default::default()
        })
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        write_moments(&self.moments, block);
        Ok(())
    }
}

impl Resource for Object {
    const KIND: ResourceKind = ResourceKind::Object;
    const MARKER: u32 = 430;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, _version: GmkVersion) -> Result<Self> {
        Ok(Self {
            sprite_index: block.read_i32()?,
            solid: block.read_bool()?,
            visible: block.read_bool()?,
            depth: block.read_i32()?,
            persistent: block.read_bool()?,
            parent_index: block.read_i32()?,
            mask_index: block.read_i32()?,
            events: read_object_events(block, layout)?,
            ..Default::default()
        })
    }

    fn write_body(&self, block: &mut GmkStream, _version: GmkVersion) -> Result<()> {
        block.write_i32(self.sprite_index);
        block.write_bool(self.solid);
        block.write_bool(self.visible);
        block.write_i32(self.depth);
        block.write_bool(self.persistent);
        block.write_i32(self.parent_index);
        block.write_i32(self.mask_index);
        write_object_events(&self.events, block);
        Ok(())
    }
}

fn read_room_archive(block: &mut GmkStream, room: &mut Room, version: GmkVersion) -> Result<()> {
    room.snap_x = block.read_u32()?;
    room.snap_y = block.read_u32()?;
    room.isometric = block.read_bool()?;
    room.speed = block.read_u32()?;
    room.persistent = block.read_bool()?;
    room.background_color = block.read_u32()?;
    room.draw_background_color = block.read_bool()?;
    room.creation_code = block.read_string()?;
    room.backgrounds = unpack_counted(block, version)?;
    room.enable_views = block.read_bool()?;
    room.views = unpack_counted(block, version)?;
    room.instances = unpack_counted(block, version)?;
    room.tiles = unpack_counted(block, version)?;
    room.remember_editor_settings = block.read_bool()?;
    room.editor_width = block.read_u32()?;
    room.editor_height = block.read_u32()?;
    room.show_grid = block.read_bool()?;
    room.show_objects = block.read_bool()?;
    room.show_tiles = block.read_bool()?;
    room.show_backgrounds = block.read_bool()?;
    room.show_foregrounds = block.read_bool()?;
    room.show_views = block.read_bool()?;
    room.delete_underlying_objects = block.read_bool()?;
    room.delete_underlying_tiles = block.read_bool()?;
    room.tab = block.read_u32()?;
    room.x_scroll = block.read_i32()?;
    room.y_scroll = block.read_i32()?;
    Ok(())
}

/// Compiled rooms drop the editor settings and the lock flags.
fn read_room_exe(block: &mut GmkStream, room: &mut Room, version: GmkVersion) -> Result<()> {
    room.speed = block.read_u32()?;
    room.persistent = block.read_bool()?;
    room.background_color = block.read_u32()?;
    room.draw_background_color = block.read_bool()?;
    room.creation_code = block.read_string()?;
    let snap = match version {
        GmkVersion::V800 => 16,
        GmkVersion::V810 => 32,
    };
    room.snap_x = snap;
    room.snap_y = snap;
    room.backgrounds = unpack_counted(block, version)?;
    room.enable_views = block.read_bool()?;
    room.views = unpack_counted(block, version)?;
    let count = block.read_u32()? as usize;
    for _ in 0..count {
        room.instances.push(RoomInstance {
            x: block.read_i32()?,
            y: block.read_i32()?,
            object_index: block.read_i32()?,
            id: block.read_u32()?,
            creation_code: block.read_string()?,
            locked: false,
        });
    }
    let count = block.read_u32()? as usize;
    for _ in 0..count {
        room.tiles.push(RoomTile {
            x: block.read_i32()?,
            y: block.read_i32()?,
            background_index: block.read_i32()?,
            tile_x: block.read_i32()?,
            tile_y: block.read_i32()?,
            width: block.read_u32()?,
            height: block.read_u32()?,
            depth: block.read_i32()?,
            id: block.read_u32()?,
            locked: false,
        });
    }
    Ok(())
}

impl Resource for Room {
    const KIND: ResourceKind = ResourceKind::Room;
    const MARKER: u32 = 541;
    resource_header!();

    fn read_body(block: &mut GmkStream, layout: Layout, version: GmkVersion) -> Result<Self> {
        let mut room = Room {
            caption: block.read_string()?,
            width: block.read_u32()?,
            height: block.read_u32()?,
            ..Default::default()
        };
        match layout {
            Layout::Archive => read_room_archive(block, &mut room, version)?,
            Layout::Executable => read_room_exe(block, &mut room, version)?,
        }
        Ok(room)
    }

    fn write_body(&self, block: &mut GmkStream, version: GmkVersion) -> Result<()> {
        block.write_string(&self.caption);
        block.write_u32(self.width);
        block.write_u32(self.height);
        block.write_u32(self.snap_x);
        block.write_u32(self.snap_y);
        block.write_bool(self.isometric);
        block.write_u32(self.speed);
        block.write_bool(self.persistent);
        block.write_u32(self.background_color);
        block.write_bool(self.draw_background_color);
        block.write_string(&self.creation_code);
        pack_counted(&self.backgrounds, block, version)?;
        block.write_bool(self.enable_views);
        pack_counted(&self.views, block, version)?;
        pack_counted(&self.instances, block, version)?;
        pack_counted(&self.tiles, block, version)?;
        block.write_bool(self.remember_editor_settings);
        block.write_u32(self.editor_width);
        block.write_u32(self.editor_height);
        block.write_bool(self.show_grid);
        block.write_bool(self.show_objects);
        block.write_bool(self.show_tiles);
        block.write_bool(self.show_backgrounds);
        block.write_bool(self.show_foregrounds);
        block.write_bool(self.show_views);
        block.write_bool(self.delete_underlying_objects);
        block.write_bool(self.delete_underlying_tiles);
        block.write_u32(self.tab);
        block.write_i32(self.x_scroll);
        block.write_i32(self.y_scroll);
        Ok(())
    }
}

/// Triggers carry their marker in front of the name in both layouts.
pub fn read_triggers(stream: &mut GmkStream) -> Result<Vec<Option<Trigger>>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut triggers = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        let mut block = stream.read_block(true)?;
        if !block.read_bool()? {
            triggers.push(None);
            continue;
        }
        block.skip_fields(1)?;
        triggers.push(Some(Trigger {
            name: block.read_string()?,
            condition: block.read_string()?,
            check_moment: block.read_u32()?,
            constant_name: block.read_string()?,
        }));
    }
    Ok(triggers)
}

pub fn write_triggers(triggers: &[Option<Trigger>], stream: &mut GmkStream) -> Result<()> {
    stream.write_u32(COLLECTION_MARKER);
    stream.write_u32(triggers.len() as u32);
    for trigger in triggers {
        let mut block = GmkStream::new();
        block.write_bool(trigger.is_some());
        if let Some(trigger) = trigger {
            block.write_u32(TRIGGER_MARKER);
            block.write_string(&trigger.name);
            block.write_string(&trigger.condition);
            block.write_u32(trigger.check_moment);
            block.write_string(&trigger.constant_name);
        }
        block.write_block(stream, true)?;
    }
    Ok(())
}

pub fn read_constants(stream: &mut GmkStream) -> Result<Vec<Constant>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut constants = Vec::with_capacity(count.min(stream.remaining() / 8));
    for _ in 0..count {
        constants.push(Constant {
            name: stream.read_string()?,
            value: stream.read_string()?,
        });
    }
    Ok(constants)
}

pub fn write_constants(constants: &[Constant], stream: &mut GmkStream) {
    stream.write_u32(COLLECTION_MARKER);
    stream.write_u32(constants.len() as u32);
    for constant in constants {
        stream.write_string(&constant.name);
        stream.write_string(&constant.value);
    }
}

/// Include files have no presence flag; every entry is live.
pub fn read_includes(stream: &mut GmkStream, layout: Layout) -> Result<Vec<IncludeFile>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut includes = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        let mut block = stream.read_block(true)?;
        let last_changed = match layout {
            Layout::Archive => block.read_timestamp()?,
            Layout::Executable => 0,
        };
        block.skip_fields(1)?;
        let mut include = IncludeFile {
            last_changed,
            file_name: block.read_string()?,
            file_path: block.read_string()?,
            original_file: block.read_bool()?,
            original_size: block.read_u32()?,
            stored_in_project: block.read_bool()?,
            ..Default::default()
        };
        let has_data = match layout {
            Layout::Archive => include.stored_in_project,
            Layout::Executable => include.original_file && include.stored_in_project,
        };
        if has_data {
            include.data = Some(read_raw_blob(&mut block)?);
        }
        include.export_flags = block.read_u32()?;
        include.export_folder = block.read_string()?;
        include.overwrite = block.read_bool()?;
        include.free_memory = block.read_bool()?;
        include.remove_at_end = block.read_bool()?;
        includes.push(include);
    }
    Ok(includes)
}

pub fn write_includes(includes: &[IncludeFile], stream: &mut GmkStream) -> Result<()> {
    stream.write_u32(COLLECTION_MARKER);
    stream.write_u32(includes.len() as u32);
    for include in includes {
        let mut block = GmkStream::new();
        block.write_timestamp();
        block.write_u32(INCLUDE_MARKER);
        block.write_string(&include.file_name);
        block.write_string(&include.file_path);
        block.write_bool(include.original_file);
        block.write_u32(include.original_size);
        block.write_bool(include.stored_in_project);
        if include.stored_in_project {
            write_raw_blob(include.data.as_deref().unwrap_or_default(), &mut block)?;
        }
        block.write_u32(include.export_flags);
        block.write_string(&include.export_folder);
        block.write_bool(include.overwrite);
        block.write_bool(include.free_memory);
        block.write_bool(include.remove_at_end);
        block.write_block(stream, true)?;
    }
    Ok(())
}

pub fn read_game_info(stream: &mut GmkStream, layout: Layout) -> Result<GameInfo> {
    stream.skip_fields(1)?;
    let mut block = stream.read_block(true)?;
    let mut info = GameInfo {
        background_color: block.read_u32()?,
        separate_window: block.read_bool()?,
        caption: block.read_string()?,
        left: block.read_i32()?,
        top: block.read_i32()?,
        width: block.read_u32()?,
        height: block.read_u32()?,
        show_border: block.read_bool()?,
        allow_resize: block.read_bool()?,
        stay_on_top: block.read_bool()?,
        freeze_game: block.read_bool()?,
        ..Default::default()
    };
    if layout == Layout::Archive {
        info.last_changed = block.read_timestamp()?;
    }
    info.rtf = block.read_string()?;
    Ok(info)
}

pub fn write_game_info(info: &GameInfo, stream: &mut GmkStream) -> Result<()> {
    stream.write_u32(GAME_INFO_MARKER);
    let mut block = GmkStream::new();
    block.write_u32(info.background_color);
    block.write_bool(info.separate_window);
    block.write_string(&info.caption);
    block.write_i32(info.left);
    block.write_i32(info.top);
    block.write_u32(info.width);
    block.write_u32(info.height);
    block.write_bool(info.show_border);
    block.write_bool(info.allow_resize);
    block.write_bool(info.stay_on_top);
    block.write_bool(info.freeze_game);
    block.write_timestamp();
    block.write_string(&info.rtf);
    block.write_block(stream, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Resource + Clone>(item: &T, version: GmkVersion) -> T {
        let mut s = GmkStream::new();
        write_resource(Some(item), &mut s, version).unwrap();
        s.set_position(0).unwrap();
        let mut back = read_resource::<T>(&mut s, Layout::Archive, version)
            .unwrap()
            .unwrap();
        assert_eq!(s.remaining(), 0);
        back.set_header(item.name().clone(), 0);
        back
    }

    /// Builds a compiled-layout item block: presence, name, marker, then `body`.
    fn exe_block(name: &str, markers: usize, body: GmkStream) -> GmkStream {
        let mut block = GmkStream::new();
        block.write_bool(true);
        block.write_string(&GmString::from(name));
        for _ in 0..markers {
            block.write_u32(800);
        }
        block.write_bytes(body.as_slice());
        let mut s = GmkStream::new();
        block.write_block(&mut s, true).unwrap();
        s.set_position(0).unwrap();
        s
    }

    #[test]
    fn test_sprite_pixels_only_when_sized() {
        let sprite = Sprite {
            name: GmString::from("spr"),
            origin_x: 8,
            origin_y: -4,
            subimages: vec![
                SubImage {
                    width: 2,
                    height: 1,
                    data: vec![1, 2, 3, 4, 5, 6, 7, 8],
                },
                SubImage {
                    width: 0,
                    height: 5,
                    data: vec![9, 9],
                },
            ],
            bounding_box: 1,
            right: 1,
            ..Default::default()
        };
        let back = round_trip(&sprite, GmkVersion::V810);
        assert_eq!(back.subimages[0], sprite.subimages[0]);
        assert_eq!(back.subimages[1].data, Vec::<u8>::new());
        assert_eq!(back.origin_y, -4);
        assert_eq!(back.bounding_box, 1);
    }

    #[test]
    fn test_font_per_version() {
        let font = Font {
            name: GmString::from("fnt_main"),
            font_name: GmString::from("Arial"),
            size: 12,
            bold: true,
            charset: 1,
            aa_level: 3,
            range_begin: 32,
            range_end: 127,
            ..Default::default()
        };
        assert_eq!(round_trip(&font, GmkVersion::V810), font);
        let old = round_trip(&font, GmkVersion::V800);
        assert_eq!((old.charset, old.aa_level, old.range_begin), (0, 0, 32));
    }

    #[test]
    fn test_room_and_path_round_trip() {
        let room = Room {
            name: GmString::from("rm"),
            caption: GmString::from("Level 1"),
            snap_x: 8,
            snap_y: 32,
            backgrounds: vec![RoomBackground {
                visible: true,
                background_index: 2,
                h_speed: 1,
                v_speed: -3,
                ..Default::default()
            }],
            views: vec![RoomView {
                view_w: 320,
                view_h: 240,
                follow_object: 4,
                ..Default::default()
            }],
            instances: vec![RoomInstance {
                x: 16,
                y: 16,
                object_index: 0,
                id: 100001,
                creation_code: GmString::new(),
                locked: true,
            }],
            tiles: vec![RoomTile {
                width: 16,
                height: 16,
                depth: 1000000,
                id: 10000001,
                ..Default::default()
            }],
            x_scroll: 64,
            ..Default::default()
        };
        assert_eq!(round_trip(&room, GmkVersion::V800), room);

        let path = Path {
            name: GmString::from("pth"),
            closed: false,
            room_index: 3,
            points: vec![
                PathPoint {
                    x: 0.0,
                    y: 0.0,
                    speed: 100.0,
                },
                PathPoint {
                    x: 64.0,
                    y: 32.5,
                    speed: 50.0,
                },
            ],
            ..Default::default()
        };
        assert_eq!(round_trip(&path, GmkVersion::V810), path);
    }

    #[test]
    fn test_collection_keeps_null_slots() {
        let scripts = vec![
            Some(Script {
                name: GmString::from("scr_a"),
                code: GmString::from("return 1;"),
                ..Default::default()
            }),
            None,
            Some(Script {
                name: GmString::from("scr_c"),
                code: GmString::from("return 3;"),
                ..Default::default()
            }),
        ];
        let mut s = GmkStream::new();
        write_collection(&scripts, &mut s, GmkVersion::V810).unwrap();
        s.set_position(0).unwrap();
        let mut seen = Vec::new();
        let back: Vec<Option<Script>> =
            read_collection(&mut s, Layout::Archive, GmkVersion::V810, |i, item: &Script| {
                seen.push((i, item.name.to_string()));
                Ok(())
            })
            .unwrap();
        assert!(back[1].is_none());
        assert_eq!(back[0].as_ref().unwrap().code, scripts[0].as_ref().unwrap().code);
        assert_eq!(back[2].as_ref().unwrap().name, GmString::from("scr_c"));
        assert_eq!(seen, vec![(0, "scr_a".to_string()), (2, "scr_c".to_string())]);
    }

    #[test]
    fn test_exe_sprite_masks() {
        let mut body = GmkStream::new();
        body.write_i32(1);
        body.write_i32(2);
        body.write_u32(2);
        for _ in 0..2 {
            body.write_u32(800);
            body.write_u32(1);
            body.write_u32(1);
            body.write_u32(4);
            body.write_bytes(&[0xFF; 4]);
        }
        body.write_bool(true);
        for set in [0u32, 1] {
            body.write_u32(800);
            body.write_u32(2);
            body.write_u32(1);
            body.write_i32(0);
            body.write_i32(1);
            body.write_i32(0);
            body.write_i32(0);
            body.write_u32(0);
            body.write_u32(set);
        }
        let mut s = exe_block("spr_exe", 1, body);
        let sprite = read_resource::<Sprite>(&mut s, Layout::Executable, GmkVersion::V800)
            .unwrap()
            .unwrap();
        assert_eq!(sprite.name, GmString::from("spr_exe"));
        assert_eq!(sprite.subimages.len(), 2);
        assert!(sprite.separate_mask);
        assert_eq!(sprite.bounding_box, 1);
        assert_eq!(sprite.right, 1);
    }

    #[test]
    fn test_exe_sprite_without_frames() {
        let mut body = GmkStream::new();
        body.write_i32(0);
        body.write_i32(0);
        body.write_u32(0);
        let mut s = exe_block("spr_empty", 1, body);
        let sprite = read_resource::<Sprite>(&mut s, Layout::Executable, GmkVersion::V810)
            .unwrap()
            .unwrap();
        assert_eq!(sprite.bounding_box, 2);
        assert!(sprite.subimages.is_empty());
    }

    #[test]
    fn test_exe_background_and_room_defaults() {
        let mut body = GmkStream::new();
        body.write_u32(2);
        body.write_u32(1);
        body.write_u32(8);
        body.write_bytes(&[0; 8]);
        let mut s = exe_block("bg", 2, body);
        let bg = read_resource::<Background>(&mut s, Layout::Executable, GmkVersion::V810)
            .unwrap()
            .unwrap();
        assert_eq!((bg.width, bg.height, bg.tile_width), (2, 1, 16));
        assert_eq!(bg.data.len(), 8);

        let mut body = GmkStream::new();
        body.write_string(&GmString::from("caption"));
        body.write_u32(800);
        body.write_u32(600);
        body.write_u32(60);
        body.write_bool(false);
        body.write_u32(0);
        body.write_bool(true);
        body.write_string(&GmString::new());
        body.write_u32(0);
        body.write_bool(false);
        body.write_u32(0);
        body.write_u32(1);
        for v in [10i32, 20, 3] {
            body.write_i32(v);
        }
        body.write_u32(100005);
        body.write_string(&GmString::from("code"));
        body.write_u32(0);
        for version in [GmkVersion::V800, GmkVersion::V810] {
            let mut s = exe_block("rm_exe", 1, body.clone());
            let room = read_resource::<Room>(&mut s, Layout::Executable, version)
                .unwrap()
                .unwrap();
            assert_eq!(room.speed, 60);
            assert_eq!(room.instances.len(), 1);
            assert_eq!(room.instances[0].id, 100005);
            assert!(!room.instances[0].locked);
            let snap = if version == GmkVersion::V800 { 16 } else { 32 };
            assert_eq!((room.snap_x, room.snap_y), (snap, snap));
        }
    }

    #[test]
    fn test_triggers_constants_includes() {
        let triggers = vec![
            None,
            Some(Trigger {
                name: GmString::from("on_low_hp"),
                condition: GmString::from("hp < 10"),
                check_moment: 1,
                constant_name: GmString::from("ev_low_hp"),
            }),
        ];
        let constants = vec![Constant {
            name: GmString::from("MAX_HP"),
            value: GmString::from("100"),
        }];
        let includes = vec![
            IncludeFile {
                file_name: GmString::from("data.ini"),
                stored_in_project: true,
                data: Some(b"[a]\nb=1\n".to_vec()),
                export_flags: 2,
                overwrite: true,
                ..Default::default()
            },
            IncludeFile {
                file_name: GmString::from("missing.dll"),
                stored_in_project: false,
                ..Default::default()
            },
        ];
        let mut s = GmkStream::new();
        write_triggers(&triggers, &mut s).unwrap();
        write_constants(&constants, &mut s);
        write_includes(&includes, &mut s).unwrap();
        s.set_position(0).unwrap();
        assert_eq!(read_triggers(&mut s).unwrap(), triggers);
        assert_eq!(read_constants(&mut s).unwrap(), constants);
        let back = read_includes(&mut s, Layout::Archive).unwrap();
        assert_eq!(back[0].data, includes[0].data);
        assert_eq!(back[0].export_flags, 2);
        assert_eq!(back[1].data, None);
        assert_eq!(s.remaining(), 0);
    }

    #[test]
    fn test_game_info_round_trip() {
        let info = GameInfo {
            caption: GmString::from("Help"),
            width: 320,
            ..Default::default()
        };
        let mut s = GmkStream::new();
        write_game_info(&info, &mut s).unwrap();
        s.set_position(0).unwrap();
        let mut back = read_game_info(&mut s, Layout::Archive).unwrap();
        back.last_changed = 0;
        assert_eq!(back, info);
    }
}
