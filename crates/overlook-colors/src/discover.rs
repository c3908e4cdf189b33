//! Locating the game install, client jar and mods folder from a save directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const CLIMB_LIMIT: usize = 5;
const LAUNCHER_MARKERS: [&str; 3] = ["Fabulously", "Fabric", "Forge"];

fn default_minecraft_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("APPDATA").map(|a| PathBuf::from(a).join(".minecraft"))
    } else if cfg!(target_os = "macos") {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/minecraft"))
    } else {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".minecraft"))
    }
}

/// First directory containing `versions/`, climbing from `start` up to 5 levels,
/// else the platform default install if it has one.
pub fn find_minecraft_dir(start: &Path) -> Option<PathBuf> {
    let mut cur = start.to_path_buf();
    for _ in 0..CLIMB_LIMIT {
        if cur.join("versions").is_dir() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => break,
        }
    }
    default_minecraft_dir().filter(|d| d.join("versions").is_dir())
}

/// `versions/<name>/<name>.jar` if it exists.
fn version_jar(versions: &Path, name: &str) -> Option<PathBuf> {
    let jar = versions.join(name).join(format!("{}.jar", name));
    jar.is_file().then_some(jar)
}

fn version_dirs(versions: &Path) -> Vec<(String, SystemTime)> {
    let Ok(entries) = fs::read_dir(versions) else {
        return Vec::new();
    };
    let mut dirs: Vec<(String, SystemTime)> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            if name.starts_with('.') {
                return None;
            }
            let mtime = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((name, mtime))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

/// First `major.minor[.patch]` run of digits in `s`.
pub fn version_number(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits = |mut i: usize| {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        (i > start).then_some(i)
    };
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() && (i == 0 || !bytes[i - 1].is_ascii_digit()) {
            if let Some(major_end) = digits(i) {
                if bytes.get(major_end) == Some(&b'.') {
                    if let Some(minor_end) = digits(major_end + 1) {
                        let mut end = minor_end;
                        if bytes.get(end) == Some(&b'.') {
                            if let Some(patch_end) = digits(end + 1) {
                                end = patch_end;
                            }
                        }
                        return Some(&s[i..end]);
                    }
                }
            }
        }
        i += 1;
    }
    None
}

/// Client jar for the save at `save_dir`.
///
/// Order: explicit path, the version the save lives under, a version whose
/// name carries the save path's version number, a modded launcher profile,
/// then the most recently modified version.
pub fn find_game_archive(save_dir: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.is_file() {
            return Some(p.to_path_buf());
        }
        log::warn!("configured game archive {} does not exist", p.display());
    }
    let mc = find_minecraft_dir(save_dir)?;
    let versions = mc.join("versions");

    let parent_name = save_dir
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    if let Some(name) = parent_name.filter(|n| *n != "saves") {
        if let Some(jar) = version_jar(&versions, name) {
            log::info!("game archive matches save version: {}", jar.display());
            return Some(jar);
        }
    }

    let dirs = version_dirs(&versions);
    let save_str = save_dir.to_string_lossy();
    if let Some(ver) = version_number(&save_str) {
        for (name, _) in &dirs {
            if name.contains(ver) {
                if let Some(jar) = version_jar(&versions, name) {
                    log::info!("game archive matches version {}: {}", ver, jar.display());
                    return Some(jar);
                }
            }
        }
    }

    for (name, _) in &dirs {
        if LAUNCHER_MARKERS.iter().any(|m| name.contains(m)) {
            if let Some(jar) = version_jar(&versions, name) {
                return Some(jar);
            }
        }
    }

    let mut newest = dirs;
    newest.sort_by(|a, b| b.1.cmp(&a.1));
    newest
        .iter()
        .find_map(|(name, _)| version_jar(&versions, name))
}

/// Mods folder for an install at `mc_dir`.
///
/// Order: explicit path, `<mc>/mods`, `<mc>/versions/*/mods`, then `mods`
/// next to the save's `saves` directory.
pub fn find_mods_dir(
    mc_dir: Option<&Path>,
    save_dir: Option<&Path>,
    explicit: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.is_dir() {
            return Some(p.to_path_buf());
        }
        log::warn!("configured mods folder {} does not exist", p.display());
    }
    if let Some(mc) = mc_dir {
        let main = mc.join("mods");
        if main.is_dir() {
            return Some(main);
        }
        let versions = mc.join("versions");
        for (name, _) in version_dirs(&versions) {
            let mods = versions.join(name).join("mods");
            if mods.is_dir() {
                return Some(mods);
            }
        }
    }
    let beside_saves = save_dir
        .and_then(|s| s.parent())
        .and_then(|saves| saves.parent())
        .map(|root| root.join("mods"));
    beside_saves.filter(|m| m.is_dir())
}

/// All `*.jar` files in `dir`, sorted by name.
pub fn list_archives(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut jars: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "jar"))
        .collect();
    jars.sort();
    jars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"jar").unwrap();
    }

    #[test]
    fn version_numbers() {
        assert_eq!(version_number("saves/1.21.1-NeoForge/x"), Some("1.21.1"));
        assert_eq!(version_number("a/1.20/b"), Some("1.20"));
        assert_eq!(version_number("world 7"), None);
    }

    #[test]
    fn jar_from_version_scoped_save() {
        let root = tempfile::tempdir().unwrap();
        let mc = root.path().join(".minecraft");
        touch(&mc.join("versions/Pack One/Pack One.jar"));
        touch(&mc.join("versions/1.20.1/1.20.1.jar"));
        let save = mc.join("versions/Pack One/World");
        fs::create_dir_all(&save).unwrap();
        assert_eq!(
            find_game_archive(&save, None),
            Some(mc.join("versions/Pack One/Pack One.jar"))
        );
    }

    #[test]
    fn jar_by_version_number() {
        let root = tempfile::tempdir().unwrap();
        let mc = root.path().join("mc");
        touch(&mc.join("versions/1.20.1/1.20.1.jar"));
        touch(&mc.join("versions/1.21/1.21.jar"));
        let save = mc.join("saves/world-1.21");
        fs::create_dir_all(&save).unwrap();
        assert_eq!(
            find_game_archive(&save, None),
            Some(mc.join("versions/1.21/1.21.jar"))
        );
    }

    #[test]
    fn explicit_archive_wins() {
        let root = tempfile::tempdir().unwrap();
        let jar = root.path().join("client.jar");
        touch(&jar);
        assert_eq!(
            find_game_archive(root.path(), Some(&jar)),
            Some(jar.clone())
        );
    }

    #[test]
    fn mods_dir_order() {
        let root = tempfile::tempdir().unwrap();
        let mc = root.path().join("mc");
        fs::create_dir_all(mc.join("versions/pack/mods")).unwrap();
        assert_eq!(
            find_mods_dir(Some(&mc), None, None),
            Some(mc.join("versions/pack/mods"))
        );
        fs::create_dir_all(mc.join("mods")).unwrap();
        assert_eq!(find_mods_dir(Some(&mc), None, None), Some(mc.join("mods")));

        let save = root.path().join("inst/saves/w");
        fs::create_dir_all(&save).unwrap();
        fs::create_dir_all(root.path().join("inst/mods")).unwrap();
        assert_eq!(
            find_mods_dir(None, Some(&save), None),
            Some(root.path().join("inst/mods"))
        );
    }

    #[test]
    fn archives_are_sorted_jars() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("b.jar"));
        touch(&root.path().join("a.jar"));
        touch(&root.path().join("readme.txt"));
        let jars = list_archives(root.path());
        assert_eq!(jars, vec![root.path().join("a.jar"), root.path().join("b.jar")]);
    }
}
