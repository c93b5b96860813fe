//! One drawer per (layer, plot), kept in step with the layer state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::drawer::{Drawer, RenderOutcome};
use super::schedule::{StepOutcome, TaskRegistry};
use crate::config::RendererConfig;
use crate::convert::PlotView;
use crate::draw::ops::DrawOpRegistry;
use crate::layer::DrawLayerRoot;
use crate::log::debug;
use crate::surface::RenderSurface;
use crate::types::PlotId;

type DrawerKey = (String, PlotId);

/// Makes the primary surface for a new drawer
pub type SurfaceMaker<S> = Box<dyn Fn(&PlotView) -> S + Send + Sync>;

pub struct DrawerStack<S: RenderSurface> {
    registry: Arc<DrawOpRegistry>,
    config: RendererConfig,
    tasks: Option<Arc<dyn TaskRegistry>>,
    make_surface: SurfaceMaker<S>,
    drawers: BTreeMap<DrawerKey, Drawer<S>>,
}

impl<S: RenderSurface> fmt::Debug for DrawerStack<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawerStack")
            .field("drawers", &self.drawers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S: RenderSurface> DrawerStack<S> {
    pub fn new(registry: Arc<DrawOpRegistry>, make_surface: SurfaceMaker<S>) -> Self {
        DrawerStack {
            registry,
            config: RendererConfig::default(),
            tasks: None,
            make_surface,
            drawers: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tasks(mut self, tasks: Arc<dyn TaskRegistry>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn drawer(&self, layer_id: &str, plot_id: &str) -> Option<&Drawer<S>> {
        self.drawers.get(&(layer_id.to_string(), plot_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.drawers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawers.is_empty()
    }

    /// Feed every visible (layer, plot) pair its current data. Drawers for
    /// pairs that are no longer visible are cleared and dropped.
    pub fn sync(&mut self, root: &DrawLayerRoot, plots: &[PlotView]) -> Vec<(String, PlotId, RenderOutcome)> {
        let mut seen: BTreeSet<DrawerKey> = BTreeSet::new();
        let mut outcomes = Vec::new();
        for layer in &root.layers {
            for plot in plots.iter().filter(|p| layer.is_visible(&p.plot_id)) {
                let key = (layer.id.clone(), plot.plot_id.clone());
                let drawer = self.drawers.entry(key.clone()).or_insert_with(|| {
                    debug!(layer = %layer.id, plot_id = %plot.plot_id, "new drawer");
                    let mut drawer = Drawer::new(plot.plot_id.clone(), (self.make_surface)(plot), Arc::clone(&self.registry))
                        .with_name(format!("{}-{}", layer.id, plot.plot_id))
                        .with_config(self.config.clone());
                    if let Some(tasks) = &self.tasks {
                        drawer = drawer.with_tasks(Arc::clone(tasks));
                    }
                    drawer
                });
                let outcome = drawer.set_data(
                    layer.data_for(&plot.plot_id).cloned(),
                    layer.selected_for(&plot.plot_id).cloned(),
                    Arc::clone(&plot.cc),
                    Arc::clone(&layer.drawing_def),
                    false,
                );
                drawer.set_highlight(layer.highlight_for(&plot.plot_id).cloned());
                outcomes.push((key.0.clone(), key.1.clone(), outcome));
                seen.insert(key);
            }
        }
        self.drawers.retain(|key, drawer| {
            let keep = seen.contains(key);
            if !keep {
                debug!(layer = %key.0, plot_id = %key.1, "dropping drawer");
                drawer.clear();
            }
            keep
        });
        outcomes
    }

    /// Advance every chunked render by one step. Returns how many are
    /// still pending.
    pub fn step_all(&mut self) -> usize {
        let mut pending = 0;
        for drawer in self.drawers.values_mut() {
            let Some(ticket) = drawer.pending() else {
                continue;
            };
            if let StepOutcome::Pending { .. } = drawer.step(ticket) {
                pending += 1;
            }
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{CoordConverter, LinearConverter};
    use crate::draw::object::{DrawObject, draw_list};
    use crate::layer::{Action, DrawLayer, LayerEngine, LayerFactoryRegistry};
    use crate::surface::CommandBuffer;
    use crate::types::{Dims, Pt};

    fn stack() -> DrawerStack<CommandBuffer> {
        DrawerStack::new(
            Arc::new(DrawOpRegistry::with_builtins()),
            Box::new(|plot: &PlotView| CommandBuffer::new(plot.cc.view_dims())),
        )
    }

    fn plot(id: &str) -> PlotView {
        let cc: Arc<dyn CoordConverter> = Arc::new(LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100)));
        PlotView::new(id, cc)
    }

    #[test]
    fn drawers_follow_visibility() {
        let engine = LayerEngine::new(Arc::new(LayerFactoryRegistry::new()));
        let data = draw_list(vec![DrawObject::point(Pt::image(5.0, 5.0))]);
        let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(DrawLayer::new("cat", "Plain").with_data(data)));
        let root = engine.reduce(&root, &Action::attach("cat", &["p1", "p2"]));
        let plots = [plot("p1"), plot("p2")];

        let mut stack = stack();
        let outcomes = stack.sync(&root, &plots);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, _, o)| *o == RenderOutcome::Drawn));
        assert!(stack.drawer("cat", "p1").is_some_and(|d| !d.primary().is_blank()));

        // nothing changed: both drawers skip
        let outcomes = stack.sync(&root, &plots);
        assert!(outcomes.iter().all(|(_, _, o)| *o == RenderOutcome::Skipped));

        let root = engine.reduce(&root, &Action::change_visibility("cat", &["p2"], false));
        stack.sync(&root, &plots);
        assert_eq!(stack.len(), 1);
        assert!(stack.drawer("cat", "p2").is_none());
    }

    #[test]
    fn step_all_drives_chunked_renders() {
        let engine = LayerEngine::new(Arc::new(LayerFactoryRegistry::new()));
        let data = draw_list(
            (0..900)
                .map(|i| DrawObject::point(Pt::image((i % 90) as f64 + 1.0, (i / 90) as f64 + 1.0)))
                .collect(),
        );
        let root = engine.reduce(&DrawLayerRoot::new(), &Action::create(DrawLayer::new("cat", "Plain").with_data(data)));
        let root = engine.reduce(&root, &Action::attach("cat", &["p1"]));
        let mut stack = stack().with_config(RendererConfig {
            point_chunk_size: 400,
            ..Default::default()
        });
        stack.sync(&root, &[plot("p1")]);
        assert_eq!(stack.step_all(), 1);
        assert_eq!(stack.step_all(), 1);
        assert_eq!(stack.step_all(), 0);
        assert!(stack.drawer("cat", "p1").is_some_and(|d| d.pending().is_none()));
    }
}
