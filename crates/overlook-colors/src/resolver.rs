use std::sync::RwLock;

use hashbrown::HashMap;
use overlook_blocks::{BlockId, normalize};

use crate::color::{Rgba, fnv1a64, splitmix64};
use crate::palette::SPECIAL_IDS;
use crate::table::ColorTable;

/// Owns a colour table and memoizes lookups against it.
///
/// Rebuilding colours means constructing a new resolver; the memo never
/// outlives its table.
#[derive(Debug)]
pub struct ColorResolver {
    table: ColorTable,
    // Longest first, then lexicographic.
    substrings: Vec<String>,
    memo: RwLock<HashMap<String, Rgba>>,
}

impl Default for ColorResolver {
    fn default() -> Self {
        Self::new(ColorTable::builtin())
    }
}

impl ColorResolver {
    pub fn new(table: ColorTable) -> Self {
        let mut substrings: Vec<String> = table
            .iter()
            .map(|(k, _)| k)
            .filter(|k| !k.is_empty() && !SPECIAL_IDS.contains(k))
            .map(str::to_string)
            .collect();
        substrings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            table,
            substrings,
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &ColorTable {
        &self.table
    }

    pub fn resolve_block(&self, id: &BlockId) -> Rgba {
        self.resolve(id.as_str())
    }

    /// Colour for any id. Never fails: unknown ids get a stable synthesized colour.
    pub fn resolve(&self, id: &str) -> Rgba {
        if let Some(c) = self.memo.read().unwrap().get(id) {
            return *c;
        }
        let c = self.lookup(id);
        self.memo.write().unwrap().insert(id.to_string(), c);
        c
    }

    fn lookup(&self, raw: &str) -> Rgba {
        let key = normalize(raw);
        if key.is_empty() {
            return Rgba::MISSING;
        }
        if let Some(c) = self.table.get(key) {
            return c;
        }
        if let Some(k) = self.substrings.iter().find(|k| key.contains(k.as_str())) {
            if let Some(c) = self.table.get(k) {
                return c;
            }
        }
        synthesize(key)
    }

    pub fn memo_len(&self) -> usize {
        self.memo.read().unwrap().len()
    }
}

/// Deterministic colour for an id with no table entry; every channel in 55..=254.
pub fn synthesize(id: &str) -> Rgba {
    let h = splitmix64(fnv1a64(id.as_bytes()));
    let channel = |shift: u32| 55 + ((h >> shift) & 0xff) as u8 % 200;
    Rgba::rgb(channel(0), channel(8), channel(16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_after_namespace_strip() {
        let r = ColorResolver::default();
        assert_eq!(r.resolve("minecraft:stone"), Rgba::rgb(127, 127, 127));
        assert_eq!(r.resolve("stone"), Rgba::rgb(127, 127, 127));
        assert_eq!(r.resolve("air"), Rgba::CLEAR);
        assert_eq!(r.resolve("none"), Rgba::MISSING);
    }

    #[test]
    fn empty_id_is_magenta() {
        let r = ColorResolver::default();
        assert_eq!(r.resolve(""), Rgba::MISSING);
        assert_eq!(r.resolve("minecraft:"), Rgba::MISSING);
    }

    #[test]
    fn longest_substring_wins() {
        let r = ColorResolver::default();
        // contains both "grass" and "tall_grass"
        assert_eq!(r.resolve("tall_grass_top"), Rgba::rgb(67, 170, 55));
        // "dark_oak_log" beats "oak_log"
        assert_eq!(r.resolve("stripped_dark_oak_log"), Rgba::rgb(76, 51, 25));
    }

    #[test]
    fn sentinels_never_match_by_substring() {
        let r = ColorResolver::default();
        let c = r.resolve("chair");
        assert_ne!(c, Rgba::CLEAR);
        assert_eq!(c.alpha(), 255);
    }

    #[test]
    fn unknown_ids_are_stable() {
        let r = ColorResolver::default();
        let a = r.resolve("create:cogwheel");
        assert_eq!(a, synthesize("create:cogwheel"));
        assert_eq!(a, ColorResolver::default().resolve("create:cogwheel"));
        assert_eq!(a.alpha(), 255);
        assert!(a.0[..3].iter().all(|&v| v >= 55));
    }

    #[test]
    fn lookups_are_memoized() {
        let r = ColorResolver::default();
        r.resolve("stone");
        r.resolve("stone");
        r.resolve("mystery");
        assert_eq!(r.memo_len(), 2);
    }
}
