//! Load and save sequencing shared by the command line and library users.
use crate::gmk::archive::{is_archive, read_archive, write_archive};
use crate::gmk::exe::read_exe;
use crate::gmk::project::ProjectModel;
use crate::types::{GmkError, GmkVersion, LoadConfig, SaveConfig};
use crate::utils::files::{read_file, write_file_atomic};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Receives a short stage name before every major step.
pub type Progress<'a> = &'a mut dyn FnMut(&str);

/// `<input>.gmk` for 8.0 and `<input>.gm81` for 8.1.
pub fn default_output_path(input: &Path, version: GmkVersion) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(version.extension());
    PathBuf::from(name)
}

/// Decodes `data` as an archive when it starts with the archive magic, otherwise as a game
/// executable.
pub fn load_project(data: Vec<u8>, config: &LoadConfig, progress: Progress) -> Result<ProjectModel> {
    if is_archive(&data) {
        log::info!("Loading project archive");
        read_archive(data, progress)
    } else {
        log::info!("Loading game executable");
        read_exe(data, config, progress)
    }
}

pub fn load_file(path: &Path, config: &LoadConfig, progress: Progress) -> Result<ProjectModel> {
    progress("Opening file");
    let data = read_file(path).map_err(GmkError::Io)?;
    log::debug!("{}: {} bytes", path.display(), data.len());
    load_project(data, config, progress)
}

/// Encodes the whole archive in memory first, so a failure never touches `path`.
pub fn save_file(
    project: &ProjectModel,
    path: &Path,
    config: &SaveConfig,
    progress: Progress,
) -> Result<()> {
    let data = write_archive(project, config.version, progress)?;
    progress("Saving file");
    write_file_atomic(path, &data).map_err(GmkError::Io)?;
    log::info!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Loads `input` and saves it as an archive. Returns the path written.
///
/// The output version defaults to the version of the input, and the output path to
/// [`default_output_path`].
pub fn convert(
    input: &Path,
    output: Option<&Path>,
    load: &LoadConfig,
    version: Option<GmkVersion>,
    progress: Progress,
) -> Result<PathBuf> {
    let project = load_file(input, load, progress)?;
    let save = SaveConfig {
        version: version.unwrap_or(project.version),
    };
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, save.version));
    save_file(&project, &output, &save, progress)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmk::project::{GmString, Script};
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gmk_tool_driver_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn sample() -> ProjectModel {
        let mut project = ProjectModel::default_template(GmkVersion::V800);
        project.scripts.push(Some(Script {
            name: GmString::from("scr_main"),
            code: GmString::from("exit;"),
            ..Default::default()
        }));
        project
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("dir/game.exe"), GmkVersion::V800),
            PathBuf::from("dir/game.exe.gmk")
        );
        assert_eq!(
            default_output_path(Path::new("game"), GmkVersion::V810),
            PathBuf::from("game.gm81")
        );
    }

    #[test]
    fn test_convert_archive_keeps_version() {
        let input = scratch("in.gmk");
        let data = write_archive(&sample(), GmkVersion::V800, &mut |_| {}).unwrap();
        fs::write(&input, data).unwrap();

        let mut stages = Vec::new();
        let output = convert(
            &input,
            None,
            &LoadConfig::default(),
            None,
            &mut |s: &str| stages.push(s.to_string()),
        )
        .unwrap();
        assert_eq!(output, default_output_path(&input, GmkVersion::V800));
        assert_eq!(stages.first().map(String::as_str), Some("Opening file"));
        assert_eq!(stages.last().map(String::as_str), Some("Saving file"));

        let back = load_file(&output, &LoadConfig::default(), &mut |_| {}).unwrap();
        assert_eq!(back.version, GmkVersion::V800);
        assert_eq!(back.scripts[0].as_ref().unwrap().code, GmString::from("exit;"));
        fs::remove_file(&input).unwrap();
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn test_convert_to_other_version() {
        let input = scratch("up.gmk");
        let output = scratch("up_out.gm81");
        let data = write_archive(&sample(), GmkVersion::V800, &mut |_| {}).unwrap();
        fs::write(&input, data).unwrap();
        convert(
            &input,
            Some(&output),
            &LoadConfig::default(),
            Some(GmkVersion::V810),
            &mut |_| {},
        )
        .unwrap();
        let back = load_file(&output, &LoadConfig::default(), &mut |_| {}).unwrap();
        assert_eq!(back.version, GmkVersion::V810);
        fs::remove_file(&input).unwrap();
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn test_failed_load_writes_nothing() {
        let input = scratch("garbage.exe");
        let output = scratch("garbage_out.gmk");
        fs::write(&input, vec![0x4Du8; 1024]).unwrap();
        let config = LoadConfig {
            exe_version: None,
            extract_icon: false,
        };
        let err = convert(&input, Some(&output), &config, None, &mut |_| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GmkError>(),
            Some(GmkError::FormatNotRecognized)
        ));
        assert!(!output.exists());
        fs::remove_file(&input).unwrap();
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let err = load_file(&scratch("does_not_exist.exe"), &LoadConfig::default(), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<GmkError>(), Some(GmkError::Io(_))));
    }
}
