//! Decompiles the project embedded in a compiled 8.0/8.1 game executable.
//!
//! Compiled games carry no resource tree, no timestamps and no editor-only fields. The tree
//! is rebuilt from the decoded resources and the missing fields keep their template values.
pub mod cipher;
pub mod icon;
pub mod locator;

use crate::gmk::Layout;
use crate::gmk::archive::read_dwords;
use crate::gmk::project::{GmString, ProjectModel};
use crate::gmk::resources::*;
use crate::gmk::settings::read_exe_settings;
use crate::gmk::stream::GmkStream;
use crate::gmk::tree::{ResourceTreeNode, insert_leaf, rebuild_room_folder};
use crate::types::{GmkVersion, LoadConfig};
use anyhow::Result;
use cipher::{decrypt_game_data, decrypt_xor_stream};
use icon::{IconSource, default_source, icon_file};
use locator::locate;

/// Dwords of extension function metadata the project format has no room for.
const EXTENSION_FUNCTION_SKIP: usize = 3 + 17 + 1;

/// Keeps each extension package's name and steps over everything else.
fn read_extensions(stream: &mut GmkStream) -> Result<Vec<GmString>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()?;
    let mut names = Vec::new();
    for _ in 0..count {
        stream.skip_fields(1)?;
        names.push(stream.read_string()?);
        stream.skip_blob()?;
        let files = stream.read_u32()?;
        for _ in 0..files {
            stream.skip_fields(1)?;
            stream.skip_blob()?;
            stream.skip_fields(1)?;
            stream.skip_blob()?;
            stream.skip_blob()?;
            let functions = stream.read_u32()?;
            for _ in 0..functions {
                stream.skip_fields(1)?;
                stream.skip_blob()?;
                stream.skip_blob()?;
                stream.skip_fields(EXTENSION_FUNCTION_SKIP)?;
            }
            let constants = stream.read_u32()?;
            for _ in 0..constants {
                stream.skip_fields(1)?;
                stream.skip_blob()?;
                stream.skip_blob()?;
            }
        }
        // encrypted resource archive
        stream.skip_blob()?;
    }
    Ok(names)
}

/// Reads a collection and files a leaf for every present item under its kind's folder.
fn read_into_tree<T: Resource>(
    stream: &mut GmkStream,
    version: GmkVersion,
    tree: &mut [ResourceTreeNode],
) -> Result<Vec<Option<T>>> {
    read_collection(stream, Layout::Executable, version, |index, item: &T| {
        insert_leaf(tree, T::KIND, index, item.name())
    })
}

fn skip_library_code(stream: &mut GmkStream) -> Result<()> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()?;
    for _ in 0..count {
        stream.skip_blob()?;
    }
    Ok(())
}

/// Decodes a game executable image using the icon source chosen by `config`.
pub fn read_exe(
    image: Vec<u8>,
    config: &LoadConfig,
    progress: &mut dyn FnMut(&str),
) -> Result<ProjectModel> {
    let icons = default_source(config.extract_icon);
    decode(image, config.exe_version, icons.as_ref(), progress)
}

/// Decodes a game executable image.
///
/// `version` forces one check; `None` tries 8.0 first and then 8.1.
pub fn decode(
    image: Vec<u8>,
    version: Option<GmkVersion>,
    icons: &dyn IconSource,
    progress: &mut dyn FnMut(&str),
) -> Result<ProjectModel> {
    progress("Locating game data");
    let icon = match icons.icon_image(&image) {
        Ok(icon) => icon,
        Err(e) => {
            log::warn!("Failed to read game icon: {}", e);
            None
        }
    };
    let mut stream = GmkStream::from_vec(image);
    let location = locate(&mut stream, version)?;
    let version = location.version;
    let s = &mut stream;

    match version {
        GmkVersion::V800 => s.skip_fields(2)?,
        GmkVersion::V810 => {
            progress("Decrypting executable");
            decrypt_xor_stream(s)?;
            s.skip_fields(3)?;
        }
    }

    let mut project = ProjectModel::default_template(version);
    progress("Reading settings");
    project.settings = read_exe_settings(s, version)?;
    if let Some(image) = icon {
        project.settings.icon = icon_file(&image);
    }

    progress("Reading d3d wrapper");
    s.skip_blob()?;
    s.skip_blob()?;

    progress("Decrypting game data");
    decrypt_game_data(s)?;
    let garbage = s.read_u32()? as usize;
    // garbage table plus the pro flag
    s.skip_fields(garbage.saturating_add(1))?;
    project.game_id = s.read_u32()?;
    for dword in project.guid.iter_mut() {
        *dword = s.read_u32()?;
    }
    log::debug!("game id {}", project.game_id);

    progress("Reading extensions");
    project.packages = read_extensions(s)?;
    progress("Reading triggers");
    project.triggers = read_triggers(s)?;
    progress("Reading constants");
    project.constants = read_constants(s)?;

    let tree = &mut project.tree;
    progress("Reading sounds");
    project.sounds = read_into_tree(s, version, tree)?;
    progress("Reading sprites");
    project.sprites = read_into_tree(s, version, tree)?;
    progress("Reading backgrounds");
    project.backgrounds = read_into_tree(s, version, tree)?;
    progress("Reading paths");
    project.paths = read_into_tree(s, version, tree)?;
    progress("Reading scripts");
    project.scripts = read_into_tree(s, version, tree)?;
    progress("Reading fonts");
    project.fonts = read_into_tree(s, version, tree)?;
    progress("Reading time lines");
    project.timelines = read_into_tree(s, version, tree)?;
    progress("Reading objects");
    project.objects = read_into_tree(s, version, tree)?;
    progress("Reading rooms");
    project.rooms = read_into_tree(s, version, tree)?;
    project.last_instance_id = s.read_u32()?;
    project.last_tile_id = s.read_u32()?;

    progress("Reading include files");
    project.includes = read_includes(s, Layout::Executable)?;
    progress("Reading game information");
    project.game_info = read_game_info(s, Layout::Executable)?;
    progress("Reading library initialization code");
    skip_library_code(s)?;
    progress("Reading room order");
    project.room_order = read_dwords(s)?;
    rebuild_room_folder(&mut project.tree, &project.rooms, &project.room_order)?;
    Ok(project)
}
