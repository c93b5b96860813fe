//! The layer state machine.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::DrawLayer;
use super::action::{self, Action, ActionType, Payload};
use super::bucket::PlotBucket;
use super::factory::{LayerFactory, LayerFactoryRegistry, Update};
use crate::draw::object::DrawList;
use crate::log::{debug, warn};
use crate::render::drawer::Selection;
use crate::types::PlotId;

/// Every layer plus the actions they accept
#[derive(Clone, Debug)]
pub struct DrawLayerRoot {
    pub allowed_actions: BTreeSet<ActionType>,
    pub layers: Vec<Arc<DrawLayer>>,
    /// Plots waiting for a layer type to be created, by type id
    pub pre_attached: BTreeMap<String, Vec<PlotId>>,
}

impl Default for DrawLayerRoot {
    fn default() -> Self {
        DrawLayerRoot {
            allowed_actions: action::builtin_actions().into_iter().collect(),
            layers: Vec::new(),
            pre_attached: BTreeMap::new(),
        }
    }
}

impl DrawLayerRoot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn layer(&self, id: &str) -> Option<&Arc<DrawLayer>> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layers whose id, type id or group id equals `key`
    pub fn matching<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Arc<DrawLayer>> + 'a {
        self.layers.iter().filter(move |l| l.matches(key))
    }

    /// Layers attached to `plot_id`
    pub fn attached_to<'a>(&'a self, plot_id: &'a str) -> impl Iterator<Item = &'a Arc<DrawLayer>> + 'a {
        self.layers.iter().filter(move |l| l.is_attached(plot_id))
    }
}

/// Applies actions to a [`DrawLayerRoot`].
#[derive(Clone, Debug)]
pub struct LayerEngine {
    factories: Arc<LayerFactoryRegistry>,
}

impl LayerEngine {
    pub fn new(factories: Arc<LayerFactoryRegistry>) -> Self {
        LayerEngine { factories }
    }

    pub fn factories(&self) -> &LayerFactoryRegistry {
        &self.factories
    }

    fn factory_for(&self, layer: &DrawLayer) -> Option<&dyn LayerFactory> {
        self.factories.get(&layer.type_id).map(|f| f.as_ref())
    }

    /// Apply `action`. Returns `root` itself when nothing changed.
    pub fn reduce(&self, root: &Arc<DrawLayerRoot>, action: &Action) -> Arc<DrawLayerRoot> {
        let Some(payload) = action.payload.as_ref() else {
            return Arc::clone(root);
        };
        if !root.allowed_actions.contains(&action.kind) {
            return Arc::clone(root);
        }
        debug!(kind = %action.kind, layer = ?payload.draw_layer_id, "reducing layer action");

        let kind = &action.kind;
        if *kind == action::CREATE {
            self.create(root, payload)
        } else if *kind == action::DESTROY {
            destroy(root, payload)
        } else if *kind == action::PRE_ATTACH {
            pre_attach(root, payload)
        } else if *kind == action::DETACH {
            self.detach(root, action, payload)
        } else if *kind == action::DELETE_PLOT_VIEW {
            self.delete_plot_view(root, payload)
        } else if *kind == action::ANY_REPLOT {
            self.update_layers(root, action, |_| true)
        } else if [
            action::ATTACH,
            action::CHANGE_VISIBILITY,
            action::CHANGE_DRAWING_DEF,
            action::MODIFY_CUSTOM_FIELD,
            action::FORCE_DRAW_LAYER_UPDATE,
        ]
        .contains(kind)
        {
            let Some(key) = payload.draw_layer_id.as_deref() else {
                return Arc::clone(root);
            };
            self.update_layers(root, action, |l| l.matches(key))
        } else {
            self.update_layers(root, action, |l| l.action_types.contains(kind))
        }
    }

    // ==================== Root-level actions ====================

    fn create(&self, root: &Arc<DrawLayerRoot>, payload: &Payload) -> Arc<DrawLayerRoot> {
        let layer = match (&payload.layer, &payload.draw_layer_type_id) {
            (Some(layer), _) => Some(DrawLayer::clone(layer)),
            (None, Some(type_id)) => self.factories.get(type_id).and_then(|f| f.create(payload)),
            (None, None) => None,
        };
        let Some(layer) = layer else {
            warn!(payload = ?payload, "CREATE without a layer or a known type id ignored");
            return Arc::clone(root);
        };
        if root.layer(&layer.id).is_some() {
            warn!(id = %layer.id, "layer already exists, CREATE ignored");
            return Arc::clone(root);
        }
        debug!(id = %layer.id, type_id = %layer.type_id, "layer created");

        let mut next = DrawLayerRoot::clone(root);
        next.allowed_actions.extend(layer.action_types.iter().cloned());
        let mut layer = Arc::new(layer);
        if let Some(plots) = root.pre_attached.get(&layer.type_id).filter(|p| !p.is_empty()) {
            let ids: Vec<&str> = plots.iter().map(String::as_str).collect();
            layer = self.reduce_layer(&layer, &Action::attach(&layer.id, &ids));
        }
        next.layers.push(layer);
        Arc::new(next)
    }

    fn detach(&self, root: &Arc<DrawLayerRoot>, action: &Action, payload: &Payload) -> Arc<DrawLayerRoot> {
        let Some(key) = payload.draw_layer_id.as_deref() else {
            return Arc::clone(root);
        };
        let updated = self.update_layers(root, action, |l| l.matches(key));
        if Arc::ptr_eq(&updated, root) {
            return updated;
        }
        let mut next = DrawLayerRoot::clone(&updated);
        let before = next.layers.len();
        next.layers.retain(|l| {
            let destroy = (payload.destroy_when_all_detached || l.destroy_when_all_detached)
                && l.matches(key)
                && l.plot_ids.is_empty();
            if destroy {
                debug!(id = %l.id, "layer detached from every plot, destroying");
            }
            !destroy
        });
        if next.layers.len() == before {
            updated
        } else {
            Arc::new(next)
        }
    }

    fn delete_plot_view(&self, root: &Arc<DrawLayerRoot>, payload: &Payload) -> Arc<DrawLayerRoot> {
        let Some(plot_id) = payload.plot_id.as_deref() else {
            return Arc::clone(root);
        };
        let mut changed = false;
        let layers = root
            .layers
            .iter()
            .map(|layer| {
                if !layer.is_attached(plot_id) {
                    return Arc::clone(layer);
                }
                changed = true;
                self.reduce_layer(layer, &Action::detach(&layer.id, &[plot_id]))
            })
            .collect();
        let mut pre_attached = root.pre_attached.clone();
        for plots in pre_attached.values_mut() {
            if plots.iter().any(|p| p == plot_id) {
                plots.retain(|p| p != plot_id);
                changed = true;
            }
        }
        if !changed {
            return Arc::clone(root);
        }
        Arc::new(DrawLayerRoot {
            allowed_actions: root.allowed_actions.clone(),
            layers,
            pre_attached,
        })
    }

    /// Route `action` to every layer accepted by `pick`.
    fn update_layers(
        &self,
        root: &Arc<DrawLayerRoot>,
        action: &Action,
        pick: impl Fn(&DrawLayer) -> bool,
    ) -> Arc<DrawLayerRoot> {
        let mut changed = false;
        let layers: Vec<Arc<DrawLayer>> = root
            .layers
            .iter()
            .map(|layer| {
                if !pick(layer) {
                    return Arc::clone(layer);
                }
                let next = self.reduce_layer(layer, action);
                changed |= !Arc::ptr_eq(&next, layer);
                next
            })
            .collect();
        if !changed {
            return Arc::clone(root);
        }
        Arc::new(DrawLayerRoot {
            allowed_actions: root.allowed_actions.clone(),
            layers,
            pre_attached: root.pre_attached.clone(),
        })
    }

    // ==================== Layer-level reducer ====================

    /// Apply `action` to one layer. Returns `layer` itself when nothing
    /// changed.
    pub fn reduce_layer(&self, layer: &Arc<DrawLayer>, action: &Action) -> Arc<DrawLayer> {
        let Some(payload) = action.payload.as_ref() else {
            return Arc::clone(layer);
        };
        let factory = self.factory_for(layer);
        let mut next: Cow<'_, DrawLayer> = Cow::Borrowed(layer.as_ref());
        let kind = &action.kind;

        if *kind == action::ATTACH {
            let visible = payload.visible.unwrap_or(true);
            for plot_id in payload.all_plot_ids() {
                if !next.is_attached(&plot_id) {
                    next.to_mut().plot_ids.push(plot_id.clone());
                }
                if visible && !next.is_visible(&plot_id) {
                    next.to_mut().visible_plot_ids.push(plot_id);
                }
            }
        } else if *kind == action::DETACH {
            let leaving: Vec<PlotId> = payload
                .all_plot_ids()
                .into_iter()
                .filter(|p| next.is_attached(p))
                .collect();
            if !leaving.is_empty() {
                if let Some(factory) = factory {
                    factory.on_detach(&next, &leaving);
                }
                let l = next.to_mut();
                l.plot_ids.retain(|p| !leaving.contains(p));
                l.visible_plot_ids.retain(|p| !leaving.contains(p));
                l.data = l.data.retain_plots(&l.plot_ids);
                l.highlight = l.highlight.retain_plots(&l.plot_ids);
            }
        } else if *kind == action::CHANGE_VISIBILITY {
            let visible = payload.visible.unwrap_or(true);
            for plot_id in payload.all_plot_ids() {
                if !next.is_attached(&plot_id) || next.is_visible(&plot_id) == visible {
                    continue;
                }
                let l = next.to_mut();
                if visible {
                    l.visible_plot_ids.push(plot_id);
                } else {
                    l.visible_plot_ids.retain(|p| *p != plot_id);
                }
            }
        } else if *kind == action::CHANGE_DRAWING_DEF {
            if let Some(def) = &payload.drawing_def {
                if !Arc::ptr_eq(def, &next.drawing_def) {
                    next.to_mut().drawing_def = Arc::clone(def);
                }
            }
        }

        if let Some(factory) = factory {
            if let Some(changed) = factory.layer_changes(&next, action) {
                next = Cow::Owned(changed);
            }
            let plots: Vec<Option<PlotId>> = if next.has_per_plot_data {
                next.visible_plot_ids.iter().cloned().map(Some).collect()
            } else {
                vec![None]
            };
            for plot_id in plots {
                let update = factory.get_draw_data(&next, plot_id.as_deref(), action);
                let plot_id = plot_id.as_deref();
                if let Some(data) = apply_list(&next.data, plot_id, update.data) {
                    next.to_mut().data = data;
                }
                if let Some(highlight) = apply_list(&next.highlight, plot_id, update.highlight) {
                    next.to_mut().highlight = highlight;
                }
                if let Some(selected) = apply_selection(&next.selected, plot_id, update.selected) {
                    next.to_mut().selected = selected;
                }
            }
        }

        match next {
            Cow::Borrowed(_) => Arc::clone(layer),
            Cow::Owned(l) => Arc::new(l),
        }
    }
}

fn destroy(root: &Arc<DrawLayerRoot>, payload: &Payload) -> Arc<DrawLayerRoot> {
    let Some(id) = payload.draw_layer_id.as_deref() else {
        return Arc::clone(root);
    };
    if root.layer(id).is_none() {
        return Arc::clone(root);
    }
    debug!(id, "layer destroyed");
    let mut next = DrawLayerRoot::clone(root);
    next.layers.retain(|l| l.id != id);
    Arc::new(next)
}

fn pre_attach(root: &Arc<DrawLayerRoot>, payload: &Payload) -> Arc<DrawLayerRoot> {
    let Some(type_id) = payload.draw_layer_type_id.as_deref() else {
        return Arc::clone(root);
    };
    let current = root.pre_attached.get(type_id).cloned().unwrap_or_default();
    let mut merged = current.clone();
    for plot_id in payload.all_plot_ids() {
        if !merged.contains(&plot_id) {
            merged.push(plot_id);
        }
    }
    if merged.len() == current.len() {
        return Arc::clone(root);
    }
    let mut next = DrawLayerRoot::clone(root);
    next.pre_attached.insert(type_id.to_string(), merged);
    Arc::new(next)
}

/// New bucket when `update` changes the list by reference.
fn apply_list(
    bucket: &PlotBucket<DrawList>,
    plot_id: Option<&str>,
    update: Update<DrawList>,
) -> Option<PlotBucket<DrawList>> {
    let current = match plot_id {
        Some(id) => bucket.get(id),
        None => match bucket {
            PlotBucket::All(v) => Some(v),
            _ => None,
        },
    };
    match update {
        Update::Keep => None,
        Update::Set(list) if current.is_some_and(|c| Arc::ptr_eq(c, &list)) => None,
        Update::Set(list) => Some(bucket.with(plot_id, Some(list))),
        Update::Clear if current.is_none() => None,
        Update::Clear => Some(bucket.with(plot_id, None)),
    }
}

fn apply_selection(
    bucket: &PlotBucket<Selection>,
    plot_id: Option<&str>,
    update: Update<Selection>,
) -> Option<PlotBucket<Selection>> {
    let current = match plot_id {
        Some(id) => bucket.get(id),
        None => match bucket {
            PlotBucket::All(v) => Some(v),
            _ => None,
        },
    };
    match update {
        Update::Keep => None,
        Update::Set(sel) if current.is_some_and(|c| c.same(&sel)) => None,
        Update::Set(sel) => Some(bucket.with(plot_id, Some(sel))),
        Update::Clear if current.is_none() => None,
        Update::Clear => Some(bucket.with(plot_id, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::def::DrawingDef;
    use crate::draw::object::{DrawObject, draw_list};
    use crate::layer::factory::{ObjectLayerChange, ObjectLayerFactory};
    use crate::types::Pt;

    fn engine() -> LayerEngine {
        LayerEngine::new(Arc::new(LayerFactoryRegistry::with_builtins()))
    }

    fn with_layer(engine: &LayerEngine) -> Arc<DrawLayerRoot> {
        let root = DrawLayerRoot::new();
        engine.reduce(&root, &Action::create(DrawLayer::new("cat", ObjectLayerFactory::TYPE_ID)))
    }

    // ==================== Root tests ====================

    #[test]
    fn unknown_action_returns_same_root() {
        let engine = engine();
        let root = with_layer(&engine);
        let action = Action::new(ActionType::from("Nobody.listens".to_string()), Payload::default());
        assert!(Arc::ptr_eq(&engine.reduce(&root, &action), &root));
        let no_payload = Action {
            kind: action::ATTACH,
            payload: None,
        };
        assert!(Arc::ptr_eq(&engine.reduce(&root, &no_payload), &root));
    }

    #[test]
    fn create_extends_allowed_actions() {
        let engine = engine();
        let custom = ActionType::from("Catalog.rowsChanged".to_string());
        let layer = DrawLayer::new("cat", "Plain").with_action_types([custom.clone()]);
        let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(layer));
        assert!(root.allowed_actions.contains(&custom));
        assert!(root.allowed_actions.contains(&action::ATTACH));
        // duplicate id is ignored
        let again = engine.reduce(&root, &Action::create(DrawLayer::new("cat", "Plain")));
        assert!(Arc::ptr_eq(&again, &root));
    }

    #[test]
    fn create_by_type_uses_factory() {
        let engine = engine();
        let action = Action::new(
            action::CREATE,
            Payload {
                draw_layer_id: Some("objs".into()),
                draw_layer_type_id: Some(ObjectLayerFactory::TYPE_ID.into()),
                ..Default::default()
            },
        );
        let root = engine.reduce(&DrawLayerRoot::new(), &action);
        let layer = root.layer("objs").expect("layer");
        assert!(layer.can_select);
    }

    #[test]
    fn pre_attached_plots_join_on_create() {
        let engine = engine();
        let root = engine.reduce(
            &DrawLayerRoot::new(),
            &Action::pre_attach(ObjectLayerFactory::TYPE_ID, &["p1", "p2"]),
        );
        let again = engine.reduce(&root, &Action::pre_attach(ObjectLayerFactory::TYPE_ID, &["p1"]));
        assert!(Arc::ptr_eq(&again, &root));
        let root = engine.reduce(&root, &Action::create(DrawLayer::new("cat", ObjectLayerFactory::TYPE_ID)));
        let layer = root.layer("cat").expect("layer");
        assert_eq!(layer.plot_ids, vec!["p1", "p2"]);
        assert_eq!(layer.visible_plot_ids, vec!["p1", "p2"]);
    }

    #[test]
    fn destroy_removes_layer() {
        let engine = engine();
        let root = with_layer(&engine);
        let root = engine.reduce(&root, &Action::destroy("cat"));
        assert!(root.layers.is_empty());
        assert!(Arc::ptr_eq(&engine.reduce(&root, &Action::destroy("cat")), &root));
    }

    #[test]
    fn detach_all_destroys_when_asked() {
        let engine = engine();
        let root = with_layer(&engine);
        let root = engine.reduce(&root, &Action::attach("cat", &["p1", "p2"]));
        let root = engine.reduce(&root, &Action::detach("cat", &["p1"]).with_destroy_when_all_detached());
        assert_eq!(root.layers.len(), 1);
        let root = engine.reduce(&root, &Action::detach("cat", &["p2"]).with_destroy_when_all_detached());
        assert!(root.layers.is_empty());
    }

    #[test]
    fn delete_plot_view_detaches_everywhere() {
        let engine = engine();
        let root = with_layer(&engine);
        let root = engine.reduce(&root, &Action::create(DrawLayer::new("other", "Plain")));
        let root = engine.reduce(&root, &Action::attach("cat", &["p1", "p2"]));
        let root = engine.reduce(&root, &Action::attach("other", &["p1"]));
        let root = engine.reduce(&root, &Action::delete_plot_view("p1"));
        assert_eq!(root.layer("cat").map(|l| l.plot_ids.clone()), Some(vec!["p2".to_string()]));
        assert!(root.layer("other").is_some_and(|l| l.plot_ids.is_empty()));
    }

    #[test]
    fn group_id_addresses_several_layers() {
        let engine = engine();
        let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(DrawLayer::new("a", "Plain").with_group("g")));
        let root = engine.reduce(&root, &Action::create(DrawLayer::new("b", "Plain").with_group("g")));
        let root = engine.reduce(&root, &Action::attach("g", &["p1"]));
        assert_eq!(root.attached_to("p1").count(), 2);
    }

    // ==================== Layer tests ====================

    #[test]
    fn redundant_visibility_change_keeps_reference() {
        let engine = engine();
        let root = with_layer(&engine);
        let root = engine.reduce(&root, &Action::attach("cat", &["p1"]));
        let same = engine.reduce(&root, &Action::change_visibility("cat", &["p1"], true));
        assert!(Arc::ptr_eq(&same, &root));
        // not attached: nothing to hide or show
        let same = engine.reduce(&root, &Action::change_visibility("cat", &["p9"], true));
        assert!(Arc::ptr_eq(&same, &root));
        let hidden = engine.reduce(&root, &Action::change_visibility("cat", &["p1"], false));
        assert!(hidden.layer("cat").is_some_and(|l| l.visible_plot_ids.is_empty()));
    }

    #[test]
    fn attach_hidden_keeps_plot_invisible() {
        let engine = engine();
        let root = with_layer(&engine);
        let mut action = Action::attach("cat", &["p1"]);
        if let Some(p) = action.payload.as_mut() {
            p.visible = Some(false);
        }
        let root = engine.reduce(&root, &action);
        let layer = root.layer("cat").expect("layer");
        assert!(layer.is_attached("p1"));
        assert!(!layer.is_visible("p1"));
    }

    #[test]
    fn drawing_def_is_replaced() {
        let engine = engine();
        let root = with_layer(&engine);
        let root = engine.reduce(&root, &Action::change_drawing_def("cat", DrawingDef::new("red")));
        let layer = root.layer("cat").expect("layer");
        assert_eq!(layer.drawing_def.color, crate::types::Color::named("red"));
    }

    #[test]
    fn object_layer_data_replaced_by_custom_field() {
        let engine = engine();
        let root = with_layer(&engine);
        let data = draw_list(vec![DrawObject::point(Pt::image(1.0, 2.0))]);
        let change: action::AnyValue = Arc::new(ObjectLayerChange::Data(data.clone()));
        let root = engine.reduce(&root, &Action::modify_custom_field("cat", change.clone()));
        let layer = root.layer("cat").expect("layer");
        assert!(layer.data_for("any-plot").is_some_and(|d| Arc::ptr_eq(d, &data)));
        // the same list again changes nothing
        let again = engine.reduce(&root, &Action::modify_custom_field("cat", change));
        assert!(Arc::ptr_eq(&again, &root));
    }

    #[test]
    fn detach_prunes_per_plot_data() {
        let engine = engine();
        let data = draw_list(vec![DrawObject::point(Pt::image(1.0, 2.0))]);
        let mut layer = DrawLayer::new("cat", "Plain").with_per_plot_data();
        layer.data = PlotBucket::Empty
            .with(Some("p1"), Some(data.clone()))
            .with(Some("p2"), Some(data));
        let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(layer));
        let root = engine.reduce(&root, &Action::attach("cat", &["p1", "p2"]));
        let root = engine.reduce(&root, &Action::detach("cat", &["p1"]));
        let layer = root.layer("cat").expect("layer");
        assert_eq!(layer.data.plot_ids(), vec!["p2"]);
    }
}
