use std::fs;
use std::io;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub fn read_file<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    if f.as_ref() == Path::new("-") {
        io::stdin().read_to_end(&mut content)?;
    } else {
        content = fs::read(f)?;
    }
    Ok(content)
}

pub fn make_sure_dir_exists<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<()> {
    let path = f.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Writes `data` to a sibling temporary file and renames it over `f`.
///
/// The destination is either left untouched or fully replaced.
pub fn write_file_atomic<F: AsRef<Path> + ?Sized>(f: &F, data: &[u8]) -> io::Result<()> {
    let path = f.as_ref();
    make_sure_dir_exists(path)?;
    let temp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gmk_tool_files_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_atomic_write_replaces() {
        let path = scratch("replace.gmk");
        fs::write(&path, b"old contents").unwrap();
        write_file_atomic(&path, b"new").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"new");
        assert!(!temp_path(&path).exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let path = scratch("nested").join("deeper").join("out.gm81");
        write_file_atomic(&path, b"data").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"data");
        fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = scratch("is_a_dir");
        fs::create_dir_all(&dir).unwrap();
        // renaming a file over a non-empty directory fails
        fs::write(dir.join("keep"), b"x").unwrap();
        assert!(write_file_atomic(&dir, b"data").is_err());
        assert!(!temp_path(&dir).exists());
        assert!(dir.join("keep").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
