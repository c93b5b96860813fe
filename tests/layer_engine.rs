//! Layer state machine driven end to end.

mod common;

use std::sync::Arc;

use common::{Lcg, image_plot, init_tracing};
use skylayer::draw::DrawOpRegistry;
use skylayer::draw::object::{DrawObject, draw_list};
use skylayer::layer::action::{self, ActionType};
use skylayer::layer::{Action, DrawLayer, DrawLayerRoot, LayerEngine, LayerFactoryRegistry, ObjectLayerFactory, Payload};
use skylayer::render::{DrawerStack, RenderOutcome};
use skylayer::surface::CommandBuffer;
use skylayer::types::Pt;

fn engine() -> LayerEngine {
    LayerEngine::new(Arc::new(LayerFactoryRegistry::with_builtins()))
}

fn object_layer(id: &str) -> Action {
    let data = draw_list(vec![
        DrawObject::point(Pt::image(10.0, 10.0)),
        DrawObject::point(Pt::image(20.0, 30.0)),
    ]);
    Action::new(
        action::CREATE,
        Payload {
            draw_layer_id: Some(id.to_string()),
            draw_layer_type_id: Some(ObjectLayerFactory::TYPE_ID.to_string()),
            changes: Some(Arc::new(data)),
            ..Default::default()
        },
    )
}

#[test]
fn unknown_action_leaves_root_untouched() {
    init_tracing();
    let engine = engine();
    let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(DrawLayer::new("a", "Plain")));
    let root = engine.reduce(&root, &Action::attach("a", &["p1"]));
    let unknown = Action::new(
        ActionType::from("Elsewhere.somethingHappened".to_string()),
        Payload {
            draw_layer_id: Some("a".into()),
            ..Default::default()
        },
    );
    assert!(Arc::ptr_eq(&root, &engine.reduce(&root, &unknown)));
}

#[test]
fn visible_plots_stay_within_attached_plots() {
    init_tracing();
    let engine = engine();
    let plots = ["p1", "p2", "p3", "p4"];
    let layers = ["a", "b"];
    let mut root = DrawLayerRoot::new();
    for id in layers {
        root = engine.reduce(&root, &Action::create(DrawLayer::new(id, "Plain").with_group("g")));
    }

    let mut rng = Lcg::new(0x5eed);
    for _ in 0..600 {
        let layer = if rng.next_below(4) == 0 { "g" } else { layers[rng.next_below(2)] };
        let picked: Vec<&str> = plots.iter().copied().filter(|_| rng.next_below(2) == 0).collect();
        let action = match rng.next_below(6) {
            0 => Action::attach(layer, &picked),
            1 => Action::detach(layer, &picked),
            2 => Action::change_visibility(layer, &picked, true),
            3 => Action::change_visibility(layer, &picked, false),
            4 => Action::delete_plot_view(plots[rng.next_below(plots.len())]),
            _ => Action::any_replot(&picked),
        };
        root = engine.reduce(&root, &action);

        for l in &root.layers {
            for visible in &l.visible_plot_ids {
                assert!(l.plot_ids.contains(visible), "{} visible on unattached {visible}", l.id);
            }
            let mut ids = l.plot_ids.clone();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), l.plot_ids.len(), "duplicate plot ids on {}", l.id);
        }
    }
    assert_eq!(root.layers.len(), 2);
}

#[test]
fn object_layer_renders_where_visible() {
    init_tracing();
    let engine = engine();
    let root = engine.reduce(&DrawLayerRoot::new(), &object_layer("objects"));
    let root = engine.reduce(&root, &Action::attach("objects", &["p1", "p2"]));
    let root = engine.reduce(&root, &Action::change_visibility("objects", &["p2"], false));

    let mut stack = DrawerStack::new(
        Arc::new(DrawOpRegistry::with_builtins()),
        Box::new(|plot: &skylayer::PlotView| CommandBuffer::new(plot.cc.view_dims())),
    );
    let views = [image_plot("p1", 100), image_plot("p2", 100)];
    let outcomes = stack.sync(&root, &views);
    assert_eq!(outcomes, vec![("objects".to_string(), "p1".to_string(), RenderOutcome::Drawn)]);
    assert!(!stack.drawer("objects", "p1").expect("drawer").primary().is_blank());
    assert!(stack.drawer("objects", "p2").is_none());

    // nothing changed, nothing redrawn
    let again = stack.sync(&root, &views);
    assert_eq!(again[0].2, RenderOutcome::Skipped);

    let root = engine.reduce(&root, &Action::destroy("objects"));
    assert!(stack.sync(&root, &views).is_empty());
    assert!(stack.is_empty());
}
