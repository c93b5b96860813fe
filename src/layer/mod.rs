//! Draw layers and the engine that routes actions to them.
//!
//! A [`DrawLayer`] is an immutable value. Every change goes through
//! [`LayerEngine::reduce`], which returns the same `Arc` when nothing
//! changed so callers can skip work with a pointer comparison.

pub mod action;
pub mod bucket;
pub mod factory;
pub mod reducer;

use std::fmt;
use std::sync::Arc;

pub use action::{Action, ActionType, AnyValue, Payload};
pub use bucket::{ALL_PLOTS, PlotBucket};
pub use factory::{DrawDataUpdate, LayerFactory, LayerFactoryRegistry, ObjectLayerChange, ObjectLayerFactory, Update};
pub use reducer::{DrawLayerRoot, LayerEngine};

use crate::draw::def::DrawingDef;
use crate::draw::object::DrawList;
use crate::render::drawer::Selection;
use crate::types::PlotId;

/// One named collection of draw objects and where it is shown
#[derive(Clone)]
pub struct DrawLayer {
    pub id: String,
    pub type_id: String,
    /// Layers sharing a group id are addressed together
    pub group_id: String,
    pub title: String,
    pub plot_ids: Vec<PlotId>,
    /// Always a subset of `plot_ids`
    pub visible_plot_ids: Vec<PlotId>,
    /// Extra actions this layer reacts to
    pub action_types: Vec<ActionType>,
    pub can_highlight: bool,
    pub can_select: bool,
    pub has_per_plot_data: bool,
    pub destroy_when_all_detached: bool,
    pub drawing_def: Arc<DrawingDef>,
    pub data: PlotBucket<DrawList>,
    pub highlight: PlotBucket<DrawList>,
    pub selected: PlotBucket<Selection>,
    /// Factory-owned state
    pub custom: Option<AnyValue>,
}

impl fmt::Debug for DrawLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawLayer")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("group_id", &self.group_id)
            .field("plot_ids", &self.plot_ids)
            .field("visible_plot_ids", &self.visible_plot_ids)
            .field("action_types", &self.action_types)
            .field("has_per_plot_data", &self.has_per_plot_data)
            .finish_non_exhaustive()
    }
}

impl DrawLayer {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        let id = id.into();
        DrawLayer {
            group_id: id.clone(),
            title: id.clone(),
            id,
            type_id: type_id.into(),
            plot_ids: Vec::new(),
            visible_plot_ids: Vec::new(),
            action_types: Vec::new(),
            can_highlight: false,
            can_select: false,
            has_per_plot_data: false,
            destroy_when_all_detached: false,
            drawing_def: Arc::new(DrawingDef::default()),
            data: PlotBucket::Empty,
            highlight: PlotBucket::Empty,
            selected: PlotBucket::Empty,
            custom: None,
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_drawing_def(mut self, def: DrawingDef) -> Self {
        self.drawing_def = Arc::new(def);
        self
    }

    pub fn with_action_types(mut self, action_types: impl IntoIterator<Item = ActionType>) -> Self {
        self.action_types = action_types.into_iter().collect();
        self
    }

    pub fn with_highlight(mut self) -> Self {
        self.can_highlight = true;
        self
    }

    pub fn with_select(mut self) -> Self {
        self.can_select = true;
        self
    }

    pub fn with_per_plot_data(mut self) -> Self {
        self.has_per_plot_data = true;
        self
    }

    pub fn with_destroy_when_all_detached(mut self) -> Self {
        self.destroy_when_all_detached = true;
        self
    }

    pub fn with_data(mut self, data: DrawList) -> Self {
        self.data = PlotBucket::All(data);
        self
    }

    pub fn with_custom(mut self, custom: AnyValue) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Id, type id or group id equals `key`.
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.type_id == key || self.group_id == key
    }

    pub fn is_attached(&self, plot_id: &str) -> bool {
        self.plot_ids.iter().any(|p| p == plot_id)
    }

    pub fn is_visible(&self, plot_id: &str) -> bool {
        self.visible_plot_ids.iter().any(|p| p == plot_id)
    }

    pub fn data_for(&self, plot_id: &str) -> Option<&DrawList> {
        self.data.get(plot_id)
    }

    pub fn highlight_for(&self, plot_id: &str) -> Option<&DrawList> {
        self.highlight.get(plot_id)
    }

    pub fn selected_for(&self, plot_id: &str) -> Option<&Selection> {
        self.selected.get(plot_id)
    }

    /// Downcast the factory-owned state.
    pub fn custom_as<T: std::any::Any + Send + Sync>(&self) -> Option<&T> {
        self.custom.as_ref()?.downcast_ref::<T>()
    }
}
