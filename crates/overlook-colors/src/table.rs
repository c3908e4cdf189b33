use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;

use crate::ColorMap;
use crate::color::Rgba;
use crate::palette::{BUILTIN, SPECIAL_IDS, builtin};

/// Block id to colour mapping. Read-only once handed to a resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTable {
    entries: HashMap<String, Rgba>,
}

impl ColorTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(k, c)| (k.to_string(), *c))
                .collect(),
        }
    }

    pub fn from_map(map: ColorMap) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<Rgba> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, color: Rgba) {
        self.entries.insert(id.into(), color);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgba)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// Combine `self` (the built-in table) with extracted colours.
    ///
    /// Existing entries win. When the extracted set holds at least twice as
    /// many ids as `self`, it replaces the table outright and only the
    /// sentinel ids are carried over.
    pub fn merged_with(&self, extracted: ColorMap) -> ColorTable {
        if extracted.len() >= self.len() * 2 {
            log::info!(
                "extracted {} colours against {} built-in, using extracted table",
                extracted.len(),
                self.len()
            );
            let mut table = ColorTable::from_map(extracted);
            for id in SPECIAL_IDS {
                if let Some(c) = self.get(id).or_else(|| builtin(id)) {
                    table.entries.entry(id.to_string()).or_insert(c);
                }
            }
            return table;
        }
        let mut table = self.clone();
        for (id, c) in extracted {
            table.entries.entry(id).or_insert(c);
        }
        table
    }

    /// Sorted id to hex string map.
    pub fn to_hex_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, c)| (k.clone(), c.to_hex()))
            .collect()
    }

    /// Write `block_colors_<unix-seconds>.json` into `dir`.
    pub fn write_snapshot(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("block_colors_{}.json", secs));
        let json = serde_json::to_string_pretty(&self.to_hex_map())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(n: usize) -> ColorMap {
        (0..n)
            .map(|i| (format!("block_{i}"), Rgba::rgb(i as u8, 0, 0)))
            .collect()
    }

    #[test]
    fn builtin_entries_are_not_overridden() {
        let base = ColorTable::builtin();
        let mut ext = extracted(3);
        ext.insert("stone".into(), Rgba::rgb(1, 2, 3));
        let merged = base.merged_with(ext);
        assert_eq!(merged.get("stone"), Some(Rgba::rgb(127, 127, 127)));
        assert_eq!(merged.get("block_2"), Some(Rgba::rgb(2, 0, 0)));
        assert_eq!(merged.len(), base.len() + 3);
    }

    #[test]
    fn large_extraction_replaces_table_but_keeps_sentinels() {
        let base = ColorTable::builtin();
        let mut ext = extracted(base.len() * 3);
        ext.insert("stone".into(), Rgba::rgb(1, 2, 3));
        let merged = base.merged_with(ext);
        assert_eq!(merged.get("stone"), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(merged.get("dirt"), None);
        assert_eq!(merged.get("air"), Some(Rgba::CLEAR));
        assert_eq!(merged.get("none"), Some(Rgba::MISSING));
    }

    #[test]
    fn exactly_double_replaces_table() {
        let base = ColorTable::builtin();
        let merged = base.merged_with(extracted(base.len() * 2));
        assert_eq!(merged.get("dirt"), None);
        assert_eq!(merged.get("air"), Some(Rgba::CLEAR));
        assert_eq!(merged.get("none"), Some(Rgba::MISSING));
    }

    #[test]
    fn just_under_double_merges() {
        let base = ColorTable::builtin();
        let merged = base.merged_with(extracted(base.len() * 2 - 1));
        assert_eq!(merged.get("dirt"), Some(Rgba::rgb(139, 111, 63)));
    }

    #[test]
    fn snapshot_is_sorted_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = ColorTable::builtin().write_snapshot(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("block_colors_") && name.ends_with(".json"));
        let parsed: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["stone"], "#7f7f7f");
        assert_eq!(parsed["air"], "#ffffff00");
    }
}
