use overlook_blocks::{BlockGrid, BlockId};
use overlook_io::{load_grid, read_grid, save_grid, write_grid};
use proptest::prelude::*;

fn id() -> impl Strategy<Value = BlockId> {
    prop_oneof![
        Just(BlockId::air()),
        Just(BlockId::none()),
        "[a-z_]{1,12}".prop_map(|s| BlockId::new(&s)),
        "[a-z]{1,6}:[a-z_ \"\\\\é]{1,10}".prop_map(|s| BlockId::new(&s)),
    ]
}

fn grid() -> impl Strategy<Value = BlockGrid> {
    (1usize..12, 1usize..12).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop::collection::vec(id(), w), h)
            .prop_map(|rows| BlockGrid::from_rows(rows).unwrap())
    })
}

proptest! {
    #[test]
    fn text_round_trip_keeps_every_cell(g in grid()) {
        let mut buf = Vec::new();
        write_grid(&g, &mut buf).unwrap();
        let back = read_grid(buf.as_slice()).unwrap();
        prop_assert_eq!(back.width(), g.width());
        prop_assert_eq!(back.height(), g.height());
        prop_assert_eq!(back, g);
    }
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.json");
    let mut g = BlockGrid::for_region(1);
    g.set(3, 4, BlockId::new("minecraft:grass_block"));
    save_grid(&g, &path).unwrap();
    let back = load_grid(&path).unwrap();
    assert_eq!(back.get(3, 4).map(BlockId::as_str), Some("grass_block"));
    assert_eq!(back, g);
}
