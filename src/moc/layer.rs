//! The MOC draw layer.
//!
//! A MOC layer keeps one [`MocGroup`] template in its custom state. Each
//! plot gets its own [`MocPlotUpdate`], which the host polls until it yields
//! the action carrying that plot's tiles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::group::{Budget, CollectProgress, MocGroup, MocTile};
use super::view::SkyView;
use crate::config::CullConfig;
use crate::draw::def::DrawingDef;
use crate::draw::object::{DrawList, DrawObject, MocTileData, draw_list};
use crate::layer::action::{self, Action, ActionType, Payload};
use crate::layer::factory::{DrawDataUpdate, LayerFactory, Update};
use crate::layer::DrawLayer;
use crate::log::{debug, trace};
use crate::types::PlotId;

/// Raised when a plot's tiles are ready
pub const TILES_COLLECTED: ActionType = ActionType::new("MocLayer.tilesCollected");

/// Layer colors, handed out in turn
pub const COLORS: [&str; 8] = ["green", "cyan", "magenta", "orange", "lime", "red", "blue", "yellow"];

/// Source cells for a new MOC layer, carried in the CREATE payload
#[derive(Clone, Debug, Default)]
pub struct MocSource {
    pub nuniqs: Vec<u64>,
    pub title: Option<String>,
}

/// Custom state of a MOC layer
#[derive(Debug)]
pub struct MocLayerState {
    pub group: MocGroup,
}

#[derive(Debug, Default)]
pub struct MocLayerFactory {
    config: CullConfig,
    next_color: AtomicUsize,
}

impl MocLayerFactory {
    pub const TYPE_ID: &'static str = "HiPSMOC";

    pub fn new(config: CullConfig) -> Self {
        MocLayerFactory {
            config,
            next_color: AtomicUsize::new(0),
        }
    }

    /// Actions after which every attached plot needs a fresh update
    pub fn needs_update(action: &Action) -> bool {
        [action::ANY_REPLOT, action::MODIFY_CUSTOM_FIELD, action::CHANGE_DRAWING_DEF].contains(&action.kind)
    }

    fn take_color(&self) -> &'static str {
        COLORS[self.next_color.fetch_add(1, Ordering::Relaxed) % COLORS.len()]
    }
}

impl LayerFactory for MocLayerFactory {
    fn type_id(&self) -> &str {
        Self::TYPE_ID
    }

    fn create(&self, payload: &Payload) -> Option<DrawLayer> {
        let id = payload.draw_layer_id.clone()?;
        let source = payload.changes_as::<MocSource>().cloned().unwrap_or_default();
        let group = MocGroup::from_nuniqs(source.nuniqs, self.config.clone());
        let def = match &payload.drawing_def {
            Some(def) => Arc::clone(def),
            None => Arc::new(DrawingDef::new(self.take_color())),
        };
        let title = match source.title {
            Some(title) => format!("MOC - {title}"),
            None => id.clone(),
        };
        debug!(id = %id, cells = group.cell_count(), "MOC layer created");
        let mut layer = DrawLayer::new(id, Self::TYPE_ID)
            .with_title(title)
            .with_action_types([TILES_COLLECTED])
            .with_highlight()
            .with_per_plot_data()
            .with_destroy_when_all_detached()
            .with_custom(Arc::new(MocLayerState { group }));
        layer.drawing_def = def;
        Some(layer)
    }

    fn get_draw_data(&self, layer: &DrawLayer, plot_id: Option<&str>, action: &Action) -> DrawDataUpdate {
        if action.kind != TILES_COLLECTED {
            return DrawDataUpdate::default();
        }
        let Some(payload) = action.payload.as_ref() else {
            return DrawDataUpdate::default();
        };
        // every MOC layer declares this action; only the named one takes the tiles
        if payload.draw_layer_id.as_deref() != Some(layer.id.as_str()) || payload.plot_id.as_deref() != plot_id {
            return DrawDataUpdate::default();
        }
        match payload.changes_as::<DrawList>() {
            Some(data) => DrawDataUpdate {
                data: Update::Set(Arc::clone(data)),
                ..Default::default()
            },
            None => DrawDataUpdate::default(),
        }
    }

    fn on_detach(&self, _layer: &DrawLayer, _plot_ids: &[String]) {
        debug!(id = %_layer.id, ?_plot_ids, "MOC layer detached, updates for these plots should stop");
    }
}

// ============================================================================
// Per-plot update
// ============================================================================

/// What one [`MocPlotUpdate::step`] did
#[derive(Debug)]
pub enum MocStep {
    /// Still culling or building draw objects
    Working { tiles: usize, objects: usize },
    /// All draw objects are ready; dispatch the action.
    Finished(Action),
    Aborted,
}

/// Drives the culler and builds draw objects for one (layer, plot) pair.
#[derive(Debug)]
pub struct MocPlotUpdate {
    layer_id: String,
    plot_id: PlotId,
    group: MocGroup,
    budget: Budget,
    max_chunk: usize,
    objects: Vec<DrawObject>,
    aborted: bool,
}

impl MocPlotUpdate {
    /// Update for `plot_id`, or `None` when the layer is not a MOC layer.
    pub fn new(layer: &DrawLayer, plot_id: impl Into<PlotId>, config: &CullConfig) -> Option<Self> {
        let state = layer.custom_as::<MocLayerState>()?;
        Some(MocPlotUpdate {
            layer_id: layer.id.clone(),
            plot_id: plot_id.into(),
            group: state.group.clone(),
            budget: Budget::Time(config.time_budget()),
            max_chunk: config.max_chunk.max(1),
            objects: Vec::new(),
            aborted: false,
        })
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn plot_id(&self) -> &str {
        &self.plot_id
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Do one budgeted slice of work.
    pub fn step(&mut self, view: &dyn SkyView) -> MocStep {
        if self.aborted {
            return MocStep::Aborted;
        }
        if let CollectProgress::Partial { tiles, .. } = self.group.collect(view, self.budget) {
            return MocStep::Working { tiles, objects: 0 };
        }
        let tiles = self.group.tiles();
        let start = self.objects.len();
        let end = (start + self.max_chunk).min(tiles.len());
        self.objects.extend(tiles[start..end].iter().map(tile_object));
        trace!(plot_id = %self.plot_id, from = start, to = end, "MOC tiles converted");
        if end < tiles.len() {
            return MocStep::Working {
                tiles: tiles.len(),
                objects: end,
            };
        }
        let data = draw_list(std::mem::take(&mut self.objects));
        debug!(layer = %self.layer_id, plot_id = %self.plot_id, tiles = data.len(), "MOC update finished");
        MocStep::Finished(tiles_collected(&self.layer_id, &self.plot_id, data))
    }

    /// Step until finished or aborted.
    pub fn run(&mut self, view: &dyn SkyView) -> Option<Action> {
        loop {
            match self.step(view) {
                MocStep::Working { .. } => continue,
                MocStep::Finished(action) => return Some(action),
                MocStep::Aborted => return None,
            }
        }
    }
}

fn tile_object(tile: &MocTile) -> DrawObject {
    DrawObject::new(MocTileData {
        order: tile.order,
        npix: tile.npix,
        corners: tile.corners.clone(),
        is_parent_tile: tile.is_parent_tile,
    })
}

/// Action storing `data` as the tiles of `plot_id`
pub fn tiles_collected(layer_id: &str, plot_id: &str, data: DrawList) -> Action {
    Action::new(
        TILES_COLLECTED,
        Payload {
            draw_layer_id: Some(layer_id.to_string()),
            plot_id: Some(plot_id.to_string()),
            changes: Some(Arc::new(data)),
            ..Default::default()
        },
    )
}

/// CREATE action for a MOC layer
pub fn create_moc_layer(id: &str, source: MocSource) -> Action {
    Action::new(
        action::CREATE,
        Payload {
            draw_layer_id: Some(id.to_string()),
            draw_layer_type_id: Some(MocLayerFactory::TYPE_ID.to_string()),
            changes: Some(Arc::new(source)),
            ..Default::default()
        },
    )
}
