//! Layer types plug into the engine through [`LayerFactory`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::DrawLayer;
use super::action::{Action, MODIFY_CUSTOM_FIELD, Payload};
use crate::draw::object::DrawList;
use crate::render::drawer::Selection;

/// A new value for one draw-data bucket
#[derive(Clone, Debug, Default)]
pub enum Update<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Update<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Update::Keep)
    }
}

/// What a factory wants stored for one plot (or for all plots)
#[derive(Clone, Debug, Default)]
pub struct DrawDataUpdate {
    pub data: Update<DrawList>,
    pub highlight: Update<DrawList>,
    pub selected: Update<Selection>,
}

impl DrawDataUpdate {
    pub fn data(data: DrawList) -> Self {
        DrawDataUpdate {
            data: Update::Set(data),
            ..Default::default()
        }
    }
}

/// A layer type: how it is created and how it reacts to actions.
///
/// The engine looks factories up by type id; everything except
/// [`LayerFactory::type_id`] and [`LayerFactory::create`] has a default
/// that changes nothing.
pub trait LayerFactory: fmt::Debug + Send + Sync {
    fn type_id(&self) -> &str;

    /// Build a fresh layer for a CREATE action.
    fn create(&self, payload: &Payload) -> Option<DrawLayer>;

    /// Layer-level changes for an action routed to this layer. `None`
    /// keeps the layer as it is.
    fn layer_changes(&self, _layer: &DrawLayer, _action: &Action) -> Option<DrawLayer> {
        None
    }

    /// New draw data. Called once per visible plot for per-plot layers and
    /// once with `None` otherwise.
    fn get_draw_data(&self, _layer: &DrawLayer, _plot_id: Option<&str>, _action: &Action) -> DrawDataUpdate {
        DrawDataUpdate::default()
    }

    /// The layer is leaving `plot_ids`.
    fn on_detach(&self, _layer: &DrawLayer, _plot_ids: &[String]) {}
}

/// Factories by type id
#[derive(Clone, Debug, Default)]
pub struct LayerFactoryRegistry {
    factories: BTreeMap<String, Arc<dyn LayerFactory>>,
}

impl LayerFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in [`ObjectLayerFactory`]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ObjectLayerFactory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn LayerFactory>) {
        self.factories.insert(factory.type_id().to_string(), factory);
    }

    pub fn get(&self, type_id: &str) -> Option<&Arc<dyn LayerFactory>> {
        self.factories.get(type_id)
    }
}

// ============================================================================
// Object layer
// ============================================================================

/// Value carried by MODIFY_CUSTOM_FIELD for an object layer
#[derive(Clone, Debug)]
pub enum ObjectLayerChange {
    Data(DrawList),
    Highlight(Option<DrawList>),
    Selected(Option<Selection>),
}

/// A layer holding a static list of draw objects shared by every plot.
#[derive(Debug)]
pub struct ObjectLayerFactory;

impl ObjectLayerFactory {
    pub const TYPE_ID: &'static str = "ObjectLayer";
}

impl LayerFactory for ObjectLayerFactory {
    fn type_id(&self) -> &str {
        Self::TYPE_ID
    }

    fn create(&self, payload: &Payload) -> Option<DrawLayer> {
        let id = payload.draw_layer_id.clone()?;
        let mut layer = DrawLayer::new(id, Self::TYPE_ID).with_highlight().with_select();
        if let Some(def) = &payload.drawing_def {
            layer.drawing_def = Arc::clone(def);
        }
        if let Some(data) = payload.changes_as::<DrawList>() {
            layer = layer.with_data(Arc::clone(data));
        }
        Some(layer)
    }

    fn get_draw_data(&self, _layer: &DrawLayer, _plot_id: Option<&str>, action: &Action) -> DrawDataUpdate {
        if action.kind != MODIFY_CUSTOM_FIELD {
            return DrawDataUpdate::default();
        }
        let Some(change) = action.payload.as_ref().and_then(|p| p.changes_as::<ObjectLayerChange>()) else {
            return DrawDataUpdate::default();
        };
        let set_or_clear = |v: &Option<DrawList>| match v {
            Some(list) => Update::Set(Arc::clone(list)),
            None => Update::Clear,
        };
        match change {
            ObjectLayerChange::Data(data) => DrawDataUpdate::data(Arc::clone(data)),
            ObjectLayerChange::Highlight(h) => DrawDataUpdate {
                highlight: set_or_clear(h),
                ..Default::default()
            },
            ObjectLayerChange::Selected(s) => DrawDataUpdate {
                selected: match s {
                    Some(s) => Update::Set(s.clone()),
                    None => Update::Clear,
                },
                ..Default::default()
            },
        }
    }
}
