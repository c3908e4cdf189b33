use overlook_blocks::{BlockGrid, BlockId, CHUNK_WIDTH, normalize};
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "(minecraft:|mod:)?[a-z_]{0,16}(\\[[a-z=,]{0,10}\\])?") {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(once), once);
        prop_assert!(!once.contains('['));
    }

    #[test]
    fn default_namespace_is_transparent(name in "[a-z_]{1,16}") {
        let qualified = format!("minecraft:{name}");
        prop_assert_eq!(BlockId::new(&qualified), BlockId::new(&name));
        let id = BlockId::new(&name);
        prop_assert_eq!(id.namespace(), None);
    }

    #[test]
    fn paste_only_touches_its_square(cx in 0usize..3, cz in 0usize..3) {
        let mut grid = BlockGrid::for_region(3);
        let square = vec![BlockId::new("stone"); CHUNK_WIDTH * CHUNK_WIDTH];
        grid.paste_square(cx * CHUNK_WIDTH, cz * CHUNK_WIDTH, CHUNK_WIDTH, &square);
        for z in 0..grid.height() {
            for x in 0..grid.width() {
                let inside = x / CHUNK_WIDTH == cx && z / CHUNK_WIDTH == cz;
                prop_assert_eq!(grid.get(x, z).unwrap().is_none(), !inside);
            }
        }
    }
}
