use std::path::{Path, PathBuf};

pub const MKLITTLEFS_PACKAGE: &str = "tool-mklittlefs";
pub const ESPTOOL_PACKAGE: &str = "tool-esptoolpy";

/// PlatformIO's package store: `$PLATFORMIO_CORE_DIR/packages`, else
/// `~/.platformio/packages`.
pub fn platformio_packages_dir() -> Option<PathBuf> {
    if let Some(core) = non_empty_env("PLATFORMIO_CORE_DIR") {
        return Some(PathBuf::from(core).join("packages"));
    }
    non_empty_env("HOME")
        .or_else(|| non_empty_env("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".platformio").join("packages"))
}

pub fn mklittlefs_file_name() -> String {
    format!("mklittlefs{}", std::env::consts::EXE_SUFFIX)
}

/// Explicit path, then the PlatformIO package, then `PATH`. Falls back to the
/// package location so a missing tool is reported where it was expected.
pub fn locate_mklittlefs(explicit: Option<&Path>, packages: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let file_name = mklittlefs_file_name();
    let packaged = packages.map(|p| p.join(MKLITTLEFS_PACKAGE).join(&file_name));
    if let Some(path) = packaged.as_ref().filter(|p| p.is_file()) {
        return path.clone();
    }
    if let Ok(path) = which::which(&file_name) {
        debug!("mklittlefs found on PATH: {}", path.display());
        return path;
    }
    packaged.unwrap_or_else(|| PathBuf::from(file_name))
}

/// `esptool.py` is a script, so there is no `PATH` lookup.
pub fn locate_esptool(explicit: Option<&Path>, packages: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    packages
        .map(|p| p.join(ESPTOOL_PACKAGE).join("esptool.py"))
        .unwrap_or_else(|| PathBuf::from("esptool.py"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/opt/tools/mklittlefs");
        assert_eq!(
            locate_mklittlefs(Some(explicit), Some(Path::new("/pkgs"))),
            explicit
        );
        assert_eq!(
            locate_esptool(Some(Path::new("/opt/esptool.py")), None),
            Path::new("/opt/esptool.py")
        );
    }

    #[test]
    fn packaged_tool_is_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(MKLITTLEFS_PACKAGE);
        std::fs::create_dir_all(&dir).unwrap();
        let tool = dir.join(mklittlefs_file_name());
        std::fs::write(&tool, b"").unwrap();

        assert_eq!(locate_mklittlefs(None, Some(temp.path())), tool);
    }

    #[test]
    fn esptool_comes_from_package_dir() {
        assert_eq!(
            locate_esptool(None, Some(Path::new("/pkgs"))),
            Path::new("/pkgs/tool-esptoolpy/esptool.py")
        );
    }
}
