//! Actions routed to draw layers.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::DrawLayer;
use crate::draw::def::DrawingDef;
use crate::types::PlotId;

/// Action type name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionType(pub Cow<'static, str>);

impl ActionType {
    pub const fn new(name: &'static str) -> Self {
        ActionType(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        ActionType(Cow::Owned(name))
    }
}

pub const CREATE: ActionType = ActionType::new("DrawLayer.create");
pub const DESTROY: ActionType = ActionType::new("DrawLayer.destroy");
pub const ATTACH: ActionType = ActionType::new("DrawLayer.attachToPlot");
pub const DETACH: ActionType = ActionType::new("DrawLayer.detachFromPlot");
pub const PRE_ATTACH: ActionType = ActionType::new("DrawLayer.preAttachToPlot");
pub const CHANGE_VISIBILITY: ActionType = ActionType::new("DrawLayer.changeVisibility");
pub const CHANGE_DRAWING_DEF: ActionType = ActionType::new("DrawLayer.changeDrawingDef");
pub const MODIFY_CUSTOM_FIELD: ActionType = ActionType::new("DrawLayer.modifyCustomField");
pub const FORCE_DRAW_LAYER_UPDATE: ActionType = ActionType::new("DrawLayer.forceUpdate");
pub const ANY_REPLOT: ActionType = ActionType::new("Plot.anyReplot");
pub const DELETE_PLOT_VIEW: ActionType = ActionType::new("Plot.deletePlotView");

/// Actions every root accepts before any layer adds its own
pub fn builtin_actions() -> Vec<ActionType> {
    vec![
        CREATE,
        DESTROY,
        ATTACH,
        DETACH,
        PRE_ATTACH,
        CHANGE_VISIBILITY,
        CHANGE_DRAWING_DEF,
        MODIFY_CUSTOM_FIELD,
        FORCE_DRAW_LAYER_UPDATE,
        ANY_REPLOT,
        DELETE_PLOT_VIEW,
    ]
}

/// Opaque value carried by custom actions
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Action arguments. Which fields matter depends on the action type.
#[derive(Clone, Default)]
pub struct Payload {
    /// Target layer: matched against the layer id, type id or group id
    pub draw_layer_id: Option<String>,
    pub draw_layer_type_id: Option<String>,
    pub plot_id: Option<PlotId>,
    pub plot_ids: Vec<PlotId>,
    pub visible: Option<bool>,
    pub drawing_def: Option<Arc<DrawingDef>>,
    /// The layer being created
    pub layer: Option<Arc<DrawLayer>>,
    /// Custom field changes or a factory-specific value
    pub changes: Option<AnyValue>,
    pub destroy_when_all_detached: bool,
}

impl Payload {
    /// Every plot id named by the payload, `plot_id` first.
    pub fn all_plot_ids(&self) -> Vec<PlotId> {
        let mut ids: Vec<PlotId> = self.plot_id.iter().cloned().collect();
        for id in &self.plot_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Downcast the `changes` value.
    pub fn changes_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.changes.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("draw_layer_id", &self.draw_layer_id)
            .field("draw_layer_type_id", &self.draw_layer_type_id)
            .field("plot_id", &self.plot_id)
            .field("plot_ids", &self.plot_ids)
            .field("visible", &self.visible)
            .field("layer", &self.layer.as_ref().map(|l| &l.id))
            .field("changes", &self.changes.is_some())
            .field("destroy_when_all_detached", &self.destroy_when_all_detached)
            .finish()
    }
}

/// A state change request for the layer engine
#[derive(Clone, Debug)]
pub struct Action {
    pub kind: ActionType,
    pub payload: Option<Payload>,
}

impl Action {
    pub fn new(kind: ActionType, payload: Payload) -> Self {
        Action {
            kind,
            payload: Some(payload),
        }
    }

    fn for_layer(id: &str) -> Payload {
        Payload {
            draw_layer_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn create(layer: DrawLayer) -> Self {
        Action::new(
            CREATE,
            Payload {
                draw_layer_id: Some(layer.id.clone()),
                layer: Some(Arc::new(layer)),
                ..Default::default()
            },
        )
    }

    pub fn destroy(id: &str) -> Self {
        Action::new(DESTROY, Action::for_layer(id))
    }

    /// Attach and make visible on the given plots.
    pub fn attach(id: &str, plot_ids: &[&str]) -> Self {
        Action::new(
            ATTACH,
            Payload {
                plot_ids: plot_ids.iter().map(|p| p.to_string()).collect(),
                visible: Some(true),
                ..Action::for_layer(id)
            },
        )
    }

    pub fn detach(id: &str, plot_ids: &[&str]) -> Self {
        Action::new(
            DETACH,
            Payload {
                plot_ids: plot_ids.iter().map(|p| p.to_string()).collect(),
                ..Action::for_layer(id)
            },
        )
    }

    pub fn change_visibility(id: &str, plot_ids: &[&str], visible: bool) -> Self {
        Action::new(
            CHANGE_VISIBILITY,
            Payload {
                plot_ids: plot_ids.iter().map(|p| p.to_string()).collect(),
                visible: Some(visible),
                ..Action::for_layer(id)
            },
        )
    }

    pub fn change_drawing_def(id: &str, def: DrawingDef) -> Self {
        Action::new(
            CHANGE_DRAWING_DEF,
            Payload {
                drawing_def: Some(Arc::new(def)),
                ..Action::for_layer(id)
            },
        )
    }

    pub fn modify_custom_field(id: &str, changes: AnyValue) -> Self {
        Action::new(
            MODIFY_CUSTOM_FIELD,
            Payload {
                changes: Some(changes),
                ..Action::for_layer(id)
            },
        )
    }

    pub fn force_update(id: &str) -> Self {
        Action::new(FORCE_DRAW_LAYER_UPDATE, Action::for_layer(id))
    }

    /// A plot was redrawn; every layer gets a chance to recompute.
    pub fn any_replot(plot_ids: &[&str]) -> Self {
        Action::new(
            ANY_REPLOT,
            Payload {
                plot_ids: plot_ids.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    pub fn delete_plot_view(plot_id: &str) -> Self {
        Action::new(
            DELETE_PLOT_VIEW,
            Payload {
                plot_id: Some(plot_id.to_string()),
                ..Default::default()
            },
        )
    }

    /// Ask for a layer type on plots before any layer of that type exists.
    pub fn pre_attach(type_id: &str, plot_ids: &[&str]) -> Self {
        Action::new(
            PRE_ATTACH,
            Payload {
                draw_layer_type_id: Some(type_id.to_string()),
                plot_ids: plot_ids.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    pub fn with_destroy_when_all_detached(mut self) -> Self {
        if let Some(payload) = self.payload.as_mut() {
            payload.destroy_when_all_detached = true;
        }
        self
    }

    /// Target layer id, if any
    pub fn layer_id(&self) -> Option<&str> {
        self.payload.as_ref()?.draw_layer_id.as_deref()
    }
}
