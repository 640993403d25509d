//! Native project archive (`.gmk` / `.gm81`) decoder and encoder.
use crate::gmk::Layout;
use crate::gmk::project::{GmString, ProjectModel};
use crate::gmk::resources::*;
use crate::gmk::settings::{read_archive_settings, write_archive_settings};
use crate::gmk::stream::GmkStream;
use crate::gmk::tree::{ROOT_COUNT, read_tree, write_tree};
use crate::types::{GMK_MAGIC, GmkError, GmkVersion};
use anyhow::Result;

const PACKAGES_MARKER: u32 = 700;
const LIBRARY_CODE_MARKER: u32 = 500;
const ROOM_ORDER_MARKER: u32 = 700;

/// Returns true when `data` starts with the archive magic.
pub fn is_archive(data: &[u8]) -> bool {
    data.get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        == Some(GMK_MAGIC)
}

fn read_strings(stream: &mut GmkStream) -> Result<Vec<GmString>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        items.push(stream.read_string()?);
    }
    Ok(items)
}

fn write_strings(marker: u32, items: &[GmString], stream: &mut GmkStream) {
    stream.write_u32(marker);
    stream.write_u32(items.len() as u32);
    for item in items {
        stream.write_string(item);
    }
}

/// Reads a `[marker][count][dwords…]` list.
pub(crate) fn read_dwords(stream: &mut GmkStream) -> Result<Vec<u32>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut items = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        items.push(stream.read_u32()?);
    }
    Ok(items)
}

fn ignore<T>(_index: u32, _item: &T) -> Result<()> {
    Ok(())
}

/// Decodes a whole archive.
///
/// `progress` receives the name of every section before it is read.
pub fn read_archive(data: Vec<u8>, progress: &mut dyn FnMut(&str)) -> Result<ProjectModel> {
    let mut stream = GmkStream::from_vec(data);
    if stream.read_u32()? != GMK_MAGIC {
        return Err(GmkError::FormatNotRecognized.into());
    }
    let version = GmkVersion::from_raw(stream.read_u32()?)?;
    log::info!("Archive version {}", version);
    let mut project = ProjectModel::default_template(version);
    project.game_id = stream.read_u32()?;
    for dword in project.guid.iter_mut() {
        *dword = stream.read_u32()?;
    }
    let layout = Layout::Archive;
    let s = &mut stream;

    progress("Reading settings");
    project.settings = read_archive_settings(s, version)?;
    progress("Reading triggers");
    project.triggers = read_triggers(s)?;
    project.triggers_changed = s.read_timestamp()?;
    progress("Reading constants");
    project.constants = read_constants(s)?;
    project.constants_changed = s.read_timestamp()?;
    progress("Reading sounds");
    project.sounds = read_collection(s, layout, version, ignore)?;
    progress("Reading sprites");
    project.sprites = read_collection(s, layout, version, ignore)?;
    progress("Reading backgrounds");
    project.backgrounds = read_collection(s, layout, version, ignore)?;
    progress("Reading paths");
    project.paths = read_collection(s, layout, version, ignore)?;
    progress("Reading scripts");
    project.scripts = read_collection(s, layout, version, ignore)?;
    progress("Reading fonts");
    project.fonts = read_collection(s, layout, version, ignore)?;
    progress("Reading time lines");
    project.timelines = read_collection(s, layout, version, ignore)?;
    progress("Reading objects");
    project.objects = read_collection(s, layout, version, ignore)?;
    progress("Reading rooms");
    project.rooms = read_collection(s, layout, version, ignore)?;
    project.last_instance_id = s.read_u32()?;
    project.last_tile_id = s.read_u32()?;
    progress("Reading include files");
    project.includes = read_includes(s, layout)?;
    progress("Reading packages");
    project.packages = read_strings(s)?;
    progress("Reading game information");
    project.game_info = read_game_info(s, layout)?;
    project.library_creation_code = read_strings(s)?;
    project.room_order = read_dwords(s)?;
    progress("Reading resource tree");
    project.tree = read_tree(s, ROOT_COUNT)?;
    if stream.remaining() > 0 {
        log::debug!("{} trailing bytes after resource tree", stream.remaining());
    }
    Ok(project)
}

/// Encodes `project` as an archive of `version`, in memory.
///
/// Timestamps are regenerated and every marker is written as the fixed literal for its
/// section, so the output is semantically but not byte-for-byte equal to any input.
pub fn write_archive(
    project: &ProjectModel,
    version: GmkVersion,
    progress: &mut dyn FnMut(&str),
) -> Result<Vec<u8>> {
    let mut stream = GmkStream::new();
    let s = &mut stream;
    s.write_u32(GMK_MAGIC);
    s.write_u32(version.raw());
    s.write_u32(project.game_id);
    for dword in project.guid {
        s.write_u32(dword);
    }

    progress("Writing settings");
    write_archive_settings(&project.settings, s, version)?;
    progress("Writing triggers");
    write_triggers(&project.triggers, s)?;
    s.write_timestamp();
    progress("Writing constants");
    write_constants(&project.constants, s);
    s.write_timestamp();
    progress("Writing sounds");
    write_collection(&project.sounds, s, version)?;
    progress("Writing sprites");
    write_collection(&project.sprites, s, version)?;
    progress("Writing backgrounds");
    write_collection(&project.backgrounds, s, version)?;
    progress("Writing paths");
    write_collection(&project.paths, s, version)?;
    progress("Writing scripts");
    write_collection(&project.scripts, s, version)?;
    progress("Writing fonts");
    write_collection(&project.fonts, s, version)?;
    progress("Writing time lines");
    write_collection(&project.timelines, s, version)?;
    progress("Writing objects");
    write_collection(&project.objects, s, version)?;
    progress("Writing rooms");
    write_collection(&project.rooms, s, version)?;
    s.write_u32(project.last_instance_id);
    s.write_u32(project.last_tile_id);
    progress("Writing include files");
    write_includes(&project.includes, s)?;
    progress("Writing packages");
    write_strings(PACKAGES_MARKER, &project.packages, s);
    progress("Writing game information");
    write_game_info(&project.game_info, s)?;
    write_strings(LIBRARY_CODE_MARKER, &project.library_creation_code, s);
    s.write_u32(ROOM_ORDER_MARKER);
    s.write_u32(project.room_order.len() as u32);
    for &room in &project.room_order {
        s.write_u32(room);
    }
    progress("Writing resource tree");
    write_tree(&project.tree, s);
    Ok(stream.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmk::project::*;
    use crate::gmk::tree::{GROUP_SCRIPTS, ResourceTreeNode};

    fn quiet() -> impl FnMut(&str) {
        |_| {}
    }

    fn clear_timestamps(project: &mut ProjectModel) {
        project.settings.last_changed = 0;
        project.settings.last_settings_changed = 0;
        project.triggers_changed = 0;
        project.constants_changed = 0;
        project.game_info.last_changed = 0;
        for include in &mut project.includes {
            include.last_changed = 0;
        }
        macro_rules! clear {
            ($($field:ident),*) => {
                $(for item in project.$field.iter_mut().flatten() {
                    item.last_changed = 0;
                })*
            };
        }
        clear!(sounds, sprites, backgrounds, paths, scripts, fonts, timelines, objects, rooms);
    }

    fn sample(version: GmkVersion) -> ProjectModel {
        let mut project = ProjectModel::default_template(version);
        project.constants.push(Constant {
            name: GmString::from("LIVES"),
            value: GmString::from("3"),
        });
        project.triggers.push(None);
        project.scripts = vec![
            Some(Script {
                name: GmString::from("scr_init"),
                code: GmString::from("global.score = 0;"),
                ..Default::default()
            }),
            None,
        ];
        project.sounds.push(Some(Sound {
            name: GmString::from("snd_jump"),
            file_type: GmString::from(".wav"),
            data: Some(vec![1, 2, 3]),
            volume: 1.0,
            ..Default::default()
        }));
        let mut obj = Object {
            name: GmString::from("obj_player"),
            sprite_index: 0,
            ..Default::default()
        };
        obj.events[0].push(ObjectEvent {
            kind: 0,
            actions: vec![Action {
                library_id: 1,
                action_id: 603,
                kind: 7,
                exec_type: 2,
                arguments_used: 1,
                applies_to: -1,
                ..Default::default()
            }],
        });
        project.objects.push(Some(obj));
        project.rooms.push(Some(Room {
            name: GmString::from("rm_start"),
            ..Default::default()
        }));
        project.room_order = vec![0];
        project.packages.push(GmString::from("Windows Dialogs"));
        project.library_creation_code.push(GmString::from("lib_init();"));
        project.tree[4]
            .children
            .push(ResourceTreeNode::leaf(GROUP_SCRIPTS, 0, "scr_init"));
        project
    }

    #[test]
    fn test_round_trip() {
        for version in [GmkVersion::V800, GmkVersion::V810] {
            let project = sample(version);
            let data = write_archive(&project, version, &mut quiet()).unwrap();
            assert!(is_archive(&data));
            let mut back = read_archive(data, &mut quiet()).unwrap();
            let mut expected = project.clone();
            clear_timestamps(&mut back);
            clear_timestamps(&mut expected);
            assert_eq!(back, expected);
        }
    }

    #[test]
    fn test_progress_stages() {
        let project = sample(GmkVersion::V810);
        let mut stages = Vec::new();
        let data = write_archive(&project, GmkVersion::V810, &mut |s: &str| {
            stages.push(s.to_string())
        })
        .unwrap();
        assert_eq!(stages.first().map(String::as_str), Some("Writing settings"));
        assert_eq!(stages.last().map(String::as_str), Some("Writing resource tree"));
        stages.clear();
        read_archive(data, &mut |s: &str| stages.push(s.to_string())).unwrap();
        assert!(stages.iter().any(|s| s == "Reading rooms"));
    }

    #[test]
    fn test_null_slot_survives() {
        let project = sample(GmkVersion::V800);
        let data = write_archive(&project, GmkVersion::V800, &mut quiet()).unwrap();
        let back = read_archive(data, &mut quiet()).unwrap();
        assert!(back.scripts[0].is_some());
        assert!(back.scripts[1].is_none());
        assert_eq!(back.triggers, vec![None]);
    }

    #[test]
    fn test_rejects_bad_header() {
        let err = read_archive(vec![0; 16], &mut quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GmkError>(),
            Some(GmkError::FormatNotRecognized)
        ));

        let mut s = GmkStream::new();
        s.write_u32(GMK_MAGIC);
        s.write_u32(700);
        let err = read_archive(s.into_inner(), &mut quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GmkError>(),
            Some(GmkError::UnsupportedVersion(700))
        ));
    }

    #[test]
    fn test_truncated_archive() {
        let project = sample(GmkVersion::V810);
        let mut data = write_archive(&project, GmkVersion::V810, &mut quiet()).unwrap();
        data.truncate(data.len() - 10);
        let err = read_archive(data, &mut quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GmkError>(),
            Some(GmkError::StreamTruncated { .. })
        ));
    }

    #[test]
    fn test_version_conversion() {
        let project = sample(GmkVersion::V810);
        let data = write_archive(&project, GmkVersion::V800, &mut quiet()).unwrap();
        let back = read_archive(data, &mut quiet()).unwrap();
        assert_eq!(back.version, GmkVersion::V800);
        assert_eq!(back.game_id, project.game_id);
        assert_eq!(back.guid, project.guid);
    }
}
