//! Built-in block colours.

use crate::color::Rgba;

/// Ids that keep their built-in colour even when extracted colours replace the table.
pub const SPECIAL_IDS: [&str; 4] = ["air", "cave_air", "void_air", "none"];

pub const BUILTIN: &[(&str, Rgba)] = &[
    // stone
    ("stone", Rgba::rgb(127, 127, 127)),
    ("cobblestone", Rgba::rgb(110, 110, 110)),
    ("granite", Rgba::rgb(154, 123, 100)),
    ("diorite", Rgba::rgb(207, 207, 207)),
    ("andesite", Rgba::rgb(138, 138, 138)),
    // ores
    ("coal_ore", Rgba::rgb(46, 46, 46)),
    ("iron_ore", Rgba::rgb(197, 145, 106)),
    ("gold_ore", Rgba::rgb(252, 222, 112)),
    ("diamond_ore", Rgba::rgb(93, 236, 245)),
    ("emerald_ore", Rgba::rgb(23, 221, 98)),
    ("lapis_ore", Rgba::rgb(22, 64, 201)),
    ("redstone_ore", Rgba::rgb(255, 0, 0)),
    // soil and grass
    ("dirt", Rgba::rgb(139, 111, 63)),
    ("grass_block", Rgba::rgb(67, 170, 55)),
    ("grass", Rgba::rgb(67, 170, 55)),
    ("tall_grass", Rgba::rgb(67, 170, 55)),
    ("fern", Rgba::rgb(79, 166, 37)),
    ("large_fern", Rgba::rgb(79, 166, 37)),
    ("podzol", Rgba::rgb(106, 67, 27)),
    ("mycelium", Rgba::rgb(126, 108, 140)),
    ("short_grass", Rgba::rgb(67, 170, 55)),
    ("seagrass", Rgba::rgb(67, 170, 55)),
    ("sea_pickle", Rgba::rgb(89, 176, 65)),
    ("lily_pad", Rgba::rgb(32, 178, 32)),
    ("vine", Rgba::rgb(67, 170, 55)),
    ("moss_block", Rgba::rgb(89, 176, 65)),
    ("moss_carpet", Rgba::rgb(89, 176, 65)),
    ("azalea", Rgba::rgb(79, 166, 37)),
    ("flowering_azalea", Rgba::rgb(79, 166, 37)),
    ("spore_blossom", Rgba::rgb(102, 187, 105)),
    // sand and gravel
    ("sand", Rgba::rgb(219, 207, 142)),
    ("red_sand", Rgba::rgb(189, 106, 55)),
    ("gravel", Rgba::rgb(150, 141, 125)),
    // logs
    ("oak_log", Rgba::rgb(188, 152, 98)),
    ("spruce_log", Rgba::rgb(109, 84, 59)),
    ("birch_log", Rgba::rgb(215, 203, 143)),
    ("jungle_log", Rgba::rgb(151, 114, 80)),
    ("acacia_log", Rgba::rgb(169, 88, 33)),
    ("dark_oak_log", Rgba::rgb(76, 51, 25)),
    // leaves
    ("oak_leaves", Rgba::rgb(55, 154, 55)),
    ("spruce_leaves", Rgba::rgb(42, 141, 42)),
    ("birch_leaves", Rgba::rgb(64, 167, 55)),
    ("jungle_leaves", Rgba::rgb(55, 154, 55)),
    ("acacia_leaves", Rgba::rgb(64, 167, 55)),
    ("dark_oak_leaves", Rgba::rgb(45, 135, 45)),
    // fluids
    ("water", Rgba::rgb(60, 68, 170)),
    ("lava", Rgba::rgb(234, 92, 15)),
    // ice and snow
    ("ice", Rgba::rgb(160, 233, 255)),
    ("snow", Rgba::rgb(255, 255, 255)),
    ("snow_block", Rgba::rgb(243, 244, 251)),
    // plants
    ("dandelion", Rgba::rgb(255, 236, 79)),
    ("poppy", Rgba::rgb(237, 48, 44)),
    // misc
    ("bedrock", Rgba::rgb(10, 10, 10)),
    ("obsidian", Rgba::rgb(21, 18, 30)),
    ("netherrack", Rgba::rgb(114, 58, 57)),
    ("soul_sand", Rgba::rgb(85, 67, 54)),
    ("glowstone", Rgba::rgb(254, 217, 63)),
    ("end_stone", Rgba::rgb(219, 222, 158)),
    // sentinels
    ("air", Rgba::CLEAR),
    ("cave_air", Rgba::CLEAR),
    ("void_air", Rgba::CLEAR),
    ("none", Rgba::MISSING),
];

/// Biome-tinted blocks whose textures are grey; forced after extraction.
pub const VEGETATION: &[(&str, Rgba)] = &[
    ("grass_block", Rgba::rgb(67, 170, 55)),
    ("grass", Rgba::rgb(67, 170, 55)),
    ("tall_grass", Rgba::rgb(67, 170, 55)),
    ("short_grass", Rgba::rgb(67, 170, 55)),
    ("fern", Rgba::rgb(79, 166, 37)),
    ("large_fern", Rgba::rgb(79, 166, 37)),
    ("oak_leaves", Rgba::rgb(55, 154, 55)),
    ("spruce_leaves", Rgba::rgb(42, 141, 42)),
    ("birch_leaves", Rgba::rgb(64, 167, 55)),
    ("jungle_leaves", Rgba::rgb(55, 154, 55)),
    ("acacia_leaves", Rgba::rgb(64, 167, 55)),
    ("dark_oak_leaves", Rgba::rgb(45, 135, 45)),
    ("seagrass", Rgba::rgb(67, 170, 55)),
    ("sea_pickle", Rgba::rgb(89, 176, 65)),
    ("lily_pad", Rgba::rgb(32, 178, 32)),
    ("vine", Rgba::rgb(67, 170, 55)),
    ("moss_block", Rgba::rgb(89, 176, 65)),
    ("moss_carpet", Rgba::rgb(89, 176, 65)),
    ("azalea", Rgba::rgb(79, 166, 37)),
    ("flowering_azalea", Rgba::rgb(79, 166, 37)),
    ("spore_blossom", Rgba::rgb(102, 187, 105)),
];

pub fn builtin(id: &str) -> Option<Rgba> {
    BUILTIN.iter().find(|(k, _)| *k == id).map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_present() {
        assert_eq!(builtin("air"), Some(Rgba::CLEAR));
        assert_eq!(builtin("none"), Some(Rgba::MISSING));
        for id in SPECIAL_IDS {
            assert!(builtin(id).is_some());
        }
    }

    #[test]
    fn builtin_ids_are_unique() {
        let mut ids: Vec<&str> = BUILTIN.iter().map(|(k, _)| *k).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
