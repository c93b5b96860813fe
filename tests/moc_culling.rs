//! MOC culling against a planar sky.

mod common;

use std::time::Duration;

use common::{PlanarSky, init_tracing};
use glam::DVec2;
use skylayer::config::CullConfig;
use skylayer::moc::healpix;
use skylayer::moc::{Budget, CollectProgress, MocGroup};

#[test]
fn base_cell_under_the_view_is_the_only_tile() {
    init_tracing();
    for center in [
        DVec2::new(0.0, 0.0),
        DVec2::new(45.0, 60.0),
        DVec2::new(200.0, -40.0),
        DVec2::new(300.0, 10.0),
    ] {
        let npix = healpix::ang2pix(0, center);
        let mut group = MocGroup::from_nuniqs([healpix::nuniq(0, npix)], CullConfig::default());
        let view = PlanarSky::new(center, 0.02, 3);
        let tiles = group.collect_all(&view);
        assert_eq!(tiles.len(), 1, "view at {center}");
        assert_eq!((tiles[0].order, tiles[0].npix), (0, npix));
        assert_eq!(tiles[0].corners.len(), 4);
    }
}

#[test]
fn resumed_collection_only_grows_and_converges() {
    init_tracing();
    let here = DVec2::new(120.0, 25.0);
    let view = PlanarSky::new(here, 0.02, 3);
    let order = 8;
    let base = healpix::ang2pix(order, here) & !255;
    let cells: Vec<(u8, u64)> = (0..256).map(|i| (order, base + i)).collect();
    let config = CullConfig {
        max_depth: 1,
        ..Default::default()
    };

    let mut whole = MocGroup::from_cells(cells.clone(), config.clone());
    let expected = whole.collect_all(&view).to_vec();
    assert!(!expected.is_empty());

    let mut stepped = MocGroup::from_cells(cells, config);
    let mut previous = Vec::new();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let progress = stepped.collect(&view, Budget::Cells(25));
        let tiles = stepped.tiles().to_vec();
        assert!(tiles.len() >= previous.len());
        assert_eq!(&tiles[..previous.len()], previous.as_slice());
        previous = tiles;
        if let CollectProgress::Done { .. } = progress {
            break;
        }
        assert!(rounds < 1000, "collection never finished");
    }
    assert!(rounds > 1);
    assert_eq!(previous, expected);
}

#[test]
fn zero_time_budget_still_makes_progress() {
    init_tracing();
    let here = DVec2::new(120.0, 25.0);
    let view = PlanarSky::new(here, 0.02, 3);
    let order = 7;
    let base = healpix::ang2pix(order, here) & !63;
    let mut group = MocGroup::from_cells((0..64).map(|i| (order, base + i)), CullConfig::default());
    let mut rounds = 0;
    while let CollectProgress::Partial { .. } = group.collect(&view, Budget::Time(Duration::ZERO)) {
        rounds += 1;
        assert!(rounds < 1000, "collection never finished");
    }
    assert!(group.is_done());
}
