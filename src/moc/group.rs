//! Time-boxed visibility culling over a multi-order coverage map.
//!
//! A [`MocGroup`] holds the cells of one MOC bucketed by order. For a given
//! view it decides which tiles to draw: cells up to the display order are
//! drawn as themselves, finer cells are represented by their ancestor at the
//! display order (a parent tile). The walk can stop after a time budget and
//! pick up from its cursor on the next call.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use glam::DVec2;

use super::healpix::{self, MAX_ORDER};
use super::view::SkyView;
use crate::config::CullConfig;
use crate::errors::MocError;
use crate::log::{debug, trace, warn};
use crate::types::Pt;

/// Cells visited between clock checks
const CLOCK_STRIDE: usize = 32;

/// One tile chosen by the culler
#[derive(Clone, Debug, PartialEq)]
pub struct MocTile {
    pub order: u8,
    pub npix: u64,
    /// World corners, N W S E
    pub corners: Vec<Pt>,
    /// Stands in for finer cells below it
    pub is_parent_tile: bool,
}

impl MocTile {
    fn new(order: u8, npix: u64, is_parent_tile: bool) -> Self {
        MocTile {
            order,
            npix,
            corners: healpix::corners(order, npix)
                .into_iter()
                .map(|c| Pt::world(c.x, c.y))
                .collect(),
            is_parent_tile,
        }
    }

    pub fn nuniq(&self) -> u64 {
        healpix::nuniq(self.order, self.npix)
    }
}

/// How long one [`MocGroup::collect`] call may run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    Time(Duration),
    /// Visit at most this many cells
    Cells(usize),
    Unlimited,
}

/// Where the walk stopped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectCursor {
    pub next_order_to_collect: u8,
    pub index: usize,
}

/// Result of one [`MocGroup::collect`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectProgress {
    /// The budget ran out; call again to continue.
    Partial { tiles: usize, cursor: CollectCursor },
    Done { tiles: usize },
}

/// What a view looked like when the per-view state was built
#[derive(Clone, Debug, PartialEq)]
struct ViewKey {
    projection: u64,
    zoom: i64,
    width: u32,
    height: u32,
    hips_order: u8,
    center: Option<(i64, i64)>,
}

impl ViewKey {
    fn of(view: &dyn SkyView) -> Self {
        let dims = view.view_dims();
        ViewKey {
            projection: view.projection_identity(),
            zoom: (view.zoom_factor() * 100_000.0).round() as i64,
            width: dims.width,
            height: dims.height,
            hips_order: view.hips_order(),
            center: view
                .screen_to_world(dims.center())
                .map(|w| ((w.x * 1e6).round() as i64, (w.y * 1e6).round() as i64)),
        }
    }
}

/// A MOC bucketed by order, with per-view culling state.
#[derive(Clone, Debug)]
pub struct MocGroup {
    levels: BTreeMap<u8, Vec<u64>>,
    min_order: u8,
    max_order: u8,
    config: CullConfig,

    view_key: Option<ViewKey>,
    display_order: u8,
    visible_map: BTreeMap<u8, BTreeSet<u64>>,
    candidates: BTreeMap<u8, Vec<u64>>,
    inc: BTreeMap<u8, BTreeSet<u64>>,
    not_inc: BTreeMap<u8, BTreeSet<u64>>,
    emitted_parents: BTreeSet<u64>,
    cursor: CollectCursor,
    done: bool,
    tiles: Vec<MocTile>,
}

impl MocGroup {
    /// Group from NUNIQ values. Invalid values are dropped.
    pub fn from_nuniqs(values: impl IntoIterator<Item = u64>, config: CullConfig) -> Self {
        let cells = values.into_iter().filter_map(|v| match healpix::decode_nuniq(v) {
            Ok(cell) => Some(cell),
            Err(_err) => {
                warn!(value = v, %_err, "dropping MOC cell");
                None
            }
        });
        Self::build(cells, config)
    }

    /// Group from (order, npix) pairs. Out-of-range cells are dropped.
    pub fn from_cells(cells: impl IntoIterator<Item = (u8, u64)>, config: CullConfig) -> Self {
        let cells = cells.into_iter().filter(|&(order, npix)| match healpix::validate(order, npix) {
            Ok(()) => true,
            Err(_err) => {
                warn!(order, npix, %_err, "dropping MOC cell");
                false
            }
        });
        Self::build(cells, config)
    }

    /// Strict variant of [`MocGroup::from_nuniqs`].
    pub fn try_from_nuniqs(values: &[u64], config: CullConfig) -> Result<Self, MocError> {
        let cells = values
            .iter()
            .map(|v| healpix::decode_nuniq(*v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::build(cells.into_iter(), config))
    }

    fn build(cells: impl Iterator<Item = (u8, u64)>, config: CullConfig) -> Self {
        let mut levels: BTreeMap<u8, BTreeSet<u64>> = BTreeMap::new();
        for (order, npix) in cells {
            levels.entry(order).or_default().insert(npix);
        }
        let min_order = levels.keys().next().copied().unwrap_or(0);
        let max_order = levels.keys().next_back().copied().unwrap_or(0);
        MocGroup {
            levels: levels
                .into_iter()
                .map(|(order, set)| (order, set.into_iter().collect()))
                .collect(),
            min_order,
            max_order,
            config,
            view_key: None,
            display_order: 0,
            visible_map: BTreeMap::new(),
            candidates: BTreeMap::new(),
            inc: BTreeMap::new(),
            not_inc: BTreeMap::new(),
            emitted_parents: BTreeSet::new(),
            cursor: CollectCursor::default(),
            done: false,
            tiles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn min_order(&self) -> u8 {
        self.min_order
    }

    pub fn max_order(&self) -> u8 {
        self.max_order
    }

    /// Deepest order drawn as-is for the current view
    pub fn display_order(&self) -> u8 {
        self.display_order
    }

    /// Cells of one order
    pub fn cells(&self, order: u8) -> &[u64] {
        self.levels.get(&order).map_or(&[], Vec::as_slice)
    }

    /// Tiles collected so far for the current view
    pub fn tiles(&self) -> &[MocTile] {
        &self.tiles
    }

    /// Resumption point, when a walk is in progress
    pub fn cursor(&self) -> Option<CollectCursor> {
        (!self.done && self.view_key.is_some()).then_some(self.cursor)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Orders with a visible-cell map for the current view
    pub fn mapped_orders(&self) -> Vec<u8> {
        self.visible_map.keys().copied().collect()
    }

    /// Continue collecting visible tiles for `view`. A different view
    /// restarts the walk.
    pub fn collect(&mut self, view: &dyn SkyView, budget: Budget) -> CollectProgress {
        let key = ViewKey::of(view);
        if self.view_key.as_ref() != Some(&key) {
            self.prepare(view, key);
        }
        if self.done {
            return CollectProgress::Done { tiles: self.tiles.len() };
        }

        let start = Instant::now();
        let mut visited = 0usize;
        let orders: Vec<u8> = self
            .candidates
            .keys()
            .copied()
            .filter(|o| *o >= self.cursor.next_order_to_collect)
            .collect();
        for order in orders {
            if order != self.cursor.next_order_to_collect {
                self.cursor = CollectCursor {
                    next_order_to_collect: order,
                    index: 0,
                };
            }
            let len = self.candidates.get(&order).map_or(0, Vec::len);
            while self.cursor.index < len {
                if over_budget(budget, visited, start) {
                    trace!(
                        order,
                        index = self.cursor.index,
                        tiles = self.tiles.len(),
                        "cull budget spent, pausing"
                    );
                    return CollectProgress::Partial {
                        tiles: self.tiles.len(),
                        cursor: self.cursor,
                    };
                }
                let npix = self.candidates.get(&order).map_or(0, |c| c[self.cursor.index]);
                self.visit(view, order, npix);
                self.cursor.index += 1;
                visited += 1;
            }
        }
        self.done = true;
        debug!(
            tiles = self.tiles.len(),
            display_order = self.display_order,
            "MOC cull finished"
        );
        CollectProgress::Done { tiles: self.tiles.len() }
    }

    /// Run the walk to completion and return every tile.
    pub fn collect_all(&mut self, view: &dyn SkyView) -> &[MocTile] {
        self.collect(view, Budget::Unlimited);
        &self.tiles
    }

    // ==================== Per-view state ====================

    fn prepare(&mut self, view: &dyn SkyView, key: ViewKey) {
        self.display_order = self
            .min_order
            .max(view.hips_order())
            .saturating_add(self.config.max_depth)
            .min(MAX_ORDER);
        self.visible_map = self.build_visible_map(view);
        self.candidates = self.first_pass_filter();
        self.inc.clear();
        self.not_inc.clear();
        self.emitted_parents.clear();
        self.tiles.clear();
        self.done = false;
        self.cursor = CollectCursor {
            next_order_to_collect: self.candidates.keys().next().copied().unwrap_or(0),
            index: 0,
        };
        self.view_key = Some(key);
        debug!(
            display_order = self.display_order,
            mapped = ?self.mapped_orders(),
            candidates = self.candidates.values().map(Vec::len).sum::<usize>(),
            "MOC view prepared"
        );
    }

    fn build_visible_map(&self, view: &dyn SkyView) -> BTreeMap<u8, BTreeSet<u64>> {
        let mut map = BTreeMap::new();
        if view.fov_deg() > self.config.max_fov_deg {
            return map;
        }
        let limit = self.config.visible_cell_limit;
        for order in 1..=self.display_order {
            match view.visible_cells(order, limit) {
                Some(cells) if cells.len() <= limit => {
                    map.insert(order, cells.into_iter().collect());
                }
                _ => break,
            }
        }
        map
    }

    /// Drop cells that cannot be visible according to the sparsest map.
    fn first_pass_filter(&self) -> BTreeMap<u8, Vec<u64>> {
        let reference = self
            .visible_map
            .iter()
            .min_by_key(|(order, cells)| (cells.len(), **order))
            .map(|(order, cells)| (*order, cells));
        let Some((ref_order, ref_cells)) = reference else {
            return self.levels.clone();
        };
        self.levels
            .iter()
            .map(|(&order, cells)| {
                let kept: Vec<u64> = if order >= ref_order {
                    cells
                        .iter()
                        .copied()
                        .filter(|npix| ref_cells.contains(&healpix::ancestor(order, *npix, ref_order)))
                        .collect()
                } else {
                    let covering: BTreeSet<u64> = ref_cells
                        .iter()
                        .map(|c| healpix::ancestor(ref_order, *c, order))
                        .collect();
                    cells.iter().copied().filter(|npix| covering.contains(npix)).collect()
                };
                (order, kept)
            })
            .filter(|(_, kept)| !kept.is_empty())
            .collect()
    }

    // ==================== Walk ====================

    fn visit(&mut self, view: &dyn SkyView, order: u8, npix: u64) {
        if order <= self.display_order {
            if self.is_visible(view, order, npix) {
                self.tiles.push(MocTile::new(order, npix, false));
            }
            return;
        }
        let parent = healpix::ancestor(order, npix, self.display_order);
        if self.emitted_parents.contains(&parent) {
            return;
        }
        if self.is_visible(view, self.display_order, parent) {
            self.emitted_parents.insert(parent);
            self.tiles.push(MocTile::new(self.display_order, parent, true));
        }
    }

    fn is_visible(&mut self, view: &dyn SkyView, order: u8, npix: u64) -> bool {
        if order == 0 {
            return self.memoized(order, npix, || order_zero_visible(view, npix));
        }
        if let Some(cells) = self.visible_map.get(&order) {
            return cells.contains(&npix);
        }
        // below the mapped orders: the ancestor must be visible first
        if let Some((&mapped, cells)) = self.visible_map.range(..order).next_back() {
            if !cells.contains(&healpix::ancestor(order, npix, mapped)) {
                return false;
            }
        }
        self.memoized(order, npix, || tile_on_display(view, order, npix))
    }

    fn memoized(&mut self, order: u8, npix: u64, test: impl FnOnce() -> bool) -> bool {
        if self.inc.get(&order).is_some_and(|s| s.contains(&npix)) {
            return true;
        }
        if self.not_inc.get(&order).is_some_and(|s| s.contains(&npix)) {
            return false;
        }
        let visible = test();
        let memo = if visible { &mut self.inc } else { &mut self.not_inc };
        memo.entry(order).or_default().insert(npix);
        visible
    }
}

fn over_budget(budget: Budget, visited: usize, start: Instant) -> bool {
    match budget {
        Budget::Unlimited => false,
        Budget::Cells(max) => visited >= max,
        Budget::Time(limit) => visited % CLOCK_STRIDE == 0 && visited > 0 && start.elapsed() >= limit,
    }
}

/// Any corner on screen, or the view itself inside the tile.
fn tile_on_display(view: &dyn SkyView, order: u8, npix: u64) -> bool {
    healpix::corners(order, npix)
        .into_iter()
        .any(|c| view.world_on_display(c))
        || view
            .view_probes()
            .into_iter()
            .any(|p| healpix::ang2pix(order, p) == npix)
}

/// Base cells are larger than most views, so also probe the view center
/// and corners.
fn order_zero_visible(view: &dyn SkyView, npix: u64) -> bool {
    tile_on_display(view, 0, npix) || {
        let center: DVec2 = healpix::center(0, npix);
        view.world_on_display(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::LinearConverter;
    use crate::types::Dims;

    fn view(center: DVec2, deg_per_px: f64) -> LinearConverter {
        LinearConverter::centered_on(Dims::new(256, 256), Dims::new(8192, 8192), center, deg_per_px)
    }

    fn config() -> CullConfig {
        CullConfig {
            max_depth: 2,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_cells_are_dropped() {
        let group = MocGroup::from_nuniqs([1, 4, 16, u64::MAX], config());
        assert_eq!(group.cell_count(), 2);
        assert_eq!((group.min_order(), group.max_order()), (0, 1));
        assert!(MocGroup::try_from_nuniqs(&[4, 2], config()).is_err());
    }

    #[test]
    fn strict_build_keeps_every_cell() {
        let group = MocGroup::try_from_nuniqs(&[4, 16, 17], config()).expect("valid nuniqs");
        assert_eq!(group.cell_count(), 3);
        assert_eq!((group.min_order(), group.max_order()), (0, 1));
    }

    #[test]
    fn single_base_cell_is_one_tile() {
        let center = healpix::center(0, 4);
        let mut group = MocGroup::from_cells([(0, 4)], config());
        let tiles = group.collect_all(&view(center, 0.01));
        assert_eq!(tiles.len(), 1);
        assert_eq!((tiles[0].order, tiles[0].npix, tiles[0].is_parent_tile), (0, 4, false));
    }

    #[test]
    fn cells_elsewhere_are_culled() {
        let here = DVec2::new(30.0, 10.0);
        let there = DVec2::new(200.0, -40.0);
        let cells = [
            (5, healpix::ang2pix(5, here)),
            (5, healpix::ang2pix(5, there)),
        ];
        let mut group = MocGroup::from_cells(cells, config());
        let tiles = group.collect_all(&view(here, 0.005));
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].npix, healpix::ang2pix(5, here));
    }

    #[test]
    fn fine_cells_collapse_into_parent_tiles() {
        let here = DVec2::new(30.0, 10.0);
        let v = view(here, 0.05);
        let mut group = MocGroup::from_cells([], config());
        let display = group
            .min_order
            .max(v.hips_order())
            .saturating_add(2);
        let fine = display + 3;
        let base = healpix::ang2pix(fine, here);
        group = MocGroup::from_cells((0..16).map(|i| (fine, (base & !15) + i)), config());
        let tiles = group.collect_all(&v).to_vec();
        assert_eq!(group.display_order(), fine.max(v.hips_order()) + 2);
        // every fine cell is drawn as itself once the display order reaches it
        assert!(tiles.iter().all(|t| !t.is_parent_tile));

        let coarse = CullConfig {
            max_depth: 0,
            ..Default::default()
        };
        let mut group = MocGroup::from_cells([(1, 0)].into_iter().chain((0..16).map(|i| (fine, (base & !15) + i))), coarse);
        let tiles = group.collect_all(&v).to_vec();
        let parents: Vec<_> = tiles.iter().filter(|t| t.is_parent_tile).collect();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].order, group.display_order());
        assert_eq!(parents[0].npix, healpix::ancestor(fine, base, group.display_order()));
    }

    #[test]
    fn resumed_walk_converges() {
        let here = DVec2::new(30.0, 10.0);
        let v = view(here, 0.02);
        let order = 9;
        let base = healpix::ang2pix(order, here);
        let cells: Vec<(u8, u64)> = (0..64).map(|i| (order, (base & !63) + i)).collect();

        let mut whole = MocGroup::from_cells(cells.clone(), config());
        let all = whole.collect_all(&v).to_vec();

        let mut stepped = MocGroup::from_cells(cells, config());
        let first = stepped.collect(&v, Budget::Cells(10));
        let CollectProgress::Partial { cursor, .. } = first else {
            panic!("expected a partial walk, got {first:?}");
        };
        assert_eq!(cursor.index, 10);
        let partial = stepped.tiles().to_vec();
        let second = stepped.collect(&v, Budget::Cells(10));
        assert!(stepped.tiles().len() >= partial.len());
        assert_eq!(&stepped.tiles()[..partial.len()], partial.as_slice());
        assert!(matches!(second, CollectProgress::Partial { .. }));
        while let CollectProgress::Partial { .. } = stepped.collect(&v, Budget::Cells(10)) {}
        assert_eq!(stepped.tiles(), all.as_slice());
        assert!(stepped.cursor().is_none());
    }

    #[test]
    fn view_change_restarts() {
        let here = DVec2::new(30.0, 10.0);
        let mut group = MocGroup::from_cells([(3, healpix::ang2pix(3, here))], config());
        assert_eq!(group.collect_all(&view(here, 0.01)).len(), 1);
        assert_eq!(group.collect_all(&view(DVec2::new(210.0, -50.0), 0.01)).len(), 0);
    }
}
