//! The per-(layer, plot) drawer.
//!
//! A [`Drawer`] owns three surfaces: the primary one for the layer's data,
//! one for the selected objects and one for highlights. [`Drawer::set_data`]
//! decides whether anything needs redrawing, then draws small lists at once
//! and large lists in chunks through an offscreen buffer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::DVec2;

use super::schedule::{RenderTicket, StepOutcome, TaskRegistry};
use crate::config::RendererConfig;
use crate::convert::CoordConverter;
use crate::draw::def::{DrawParams, DrawingDef};
use crate::draw::object::{DrawKind, DrawList, DrawObject};
use crate::draw::ops::{DrawContext, DrawOpRegistry, OpEnv};
use crate::log::{debug, trace};
use crate::surface::{RenderSurface, Surface};
use crate::types::{Dims, PlotId, Pt};

/// Decimation keeps everything when fewer points than this are on screen.
const DECIMATE_KEEP_ALL: usize = 200;

// ============================================================================
// Selection
// ============================================================================

/// Which objects of the primary list are selected
#[derive(Clone)]
pub enum Selection {
    Indexes(Arc<Vec<usize>>),
    Predicate(Arc<dyn Fn(usize, &DrawObject) -> bool + Send + Sync>),
}

impl Selection {
    pub fn indexes(indexes: Vec<usize>) -> Self {
        Selection::Indexes(Arc::new(indexes))
    }

    pub fn predicate(f: impl Fn(usize, &DrawObject) -> bool + Send + Sync + 'static) -> Self {
        Selection::Predicate(Arc::new(f))
    }

    /// Same selection by reference
    pub fn same(&self, other: &Selection) -> bool {
        match (self, other) {
            (Selection::Indexes(a), Selection::Indexes(b)) => Arc::ptr_eq(a, b),
            (Selection::Predicate(a), Selection::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Selected objects, in list order for predicates and index order otherwise.
    pub fn select<'a>(&self, objects: &'a [DrawObject]) -> Vec<&'a DrawObject> {
        match self {
            Selection::Indexes(idx) => idx.iter().filter_map(|i| objects.get(*i)).collect(),
            Selection::Predicate(f) => objects
                .iter()
                .enumerate()
                .filter(|(i, obj)| f(*i, *obj))
                .map(|(_, obj)| obj)
                .collect(),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Indexes(idx) => f.debug_tuple("Indexes").field(idx).finish(),
            Selection::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

fn same_list(a: &Option<DrawList>, b: &Option<DrawList>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn same_selection(a: &Option<Selection>, b: &Option<Selection>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}

// ============================================================================
// View signature
// ============================================================================

/// Everything about a view that forces a redraw when it changes
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSignature {
    def: usize,
    projection: u64,
    view: Dims,
    data: Dims,
    /// Zoom factor rounded to 5 decimals
    zoom: i64,
    /// Screen position of the image origin, rounded
    scroll: Option<(i64, i64)>,
    /// World position of image pixel (1, 1)
    test_point: String,
}

impl ViewSignature {
    pub fn new(def: &Arc<DrawingDef>, cc: &dyn CoordConverter) -> Self {
        ViewSignature {
            def: Arc::as_ptr(def) as usize,
            projection: cc.projection_identity(),
            view: cc.view_dims(),
            data: cc.data_dims(),
            zoom: (cc.zoom_factor() * 100_000.0).round() as i64,
            scroll: cc
                .image_to_screen(DVec2::ZERO)
                .map(|s| (s.x.round() as i64, s.y.round() as i64)),
            test_point: cc
                .image_to_world(DVec2::ONE)
                .map(|w| Pt::world(w.x, w.y).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn same_zoom(&self, other: &ViewSignature) -> bool {
        self.zoom == other.zoom
    }
}

// ============================================================================
// Drawer
// ============================================================================

/// What [`Drawer::set_data`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Nothing changed
    Skipped,
    /// No data: the surfaces were cleared
    Cleared,
    /// The primary surface was redrawn synchronously
    Drawn,
    /// Only the selection surface was redrawn
    SelectionUpdated,
    /// A chunked render was started; poll it with [`Drawer::step`]
    Scheduled(RenderTicket),
}

struct RenderJob<S> {
    ticket: RenderTicket,
    objects: DrawList,
    cursor: usize,
    chunk_size: usize,
    buffer: S,
    cc: Arc<dyn CoordConverter>,
    def: Arc<DrawingDef>,
}

/// Renders one layer onto one plot
pub struct Drawer<S: RenderSurface> {
    name: String,
    plot_id: PlotId,
    config: RendererConfig,
    registry: Arc<DrawOpRegistry>,
    tasks: Option<Arc<dyn TaskRegistry>>,
    primary: S,
    selection_surface: S,
    highlight_surface: S,
    data: Option<DrawList>,
    highlight: Option<DrawList>,
    selection: Option<Selection>,
    def: Arc<DrawingDef>,
    cc: Option<Arc<dyn CoordConverter>>,
    signature: Option<ViewSignature>,
    job: Option<RenderJob<S>>,
    generation: u64,
    task_id: Option<String>,
}

impl<S: RenderSurface> fmt::Debug for Drawer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawer")
            .field("name", &self.name)
            .field("plot_id", &self.plot_id)
            .field("objects", &self.data.as_ref().map_or(0, |d| d.len()))
            .field("generation", &self.generation)
            .field("drawing", &self.job.is_some())
            .finish()
    }
}

impl<S: RenderSurface> Drawer<S> {
    /// Drawer for `plot_id` drawing onto `primary`. The selection and
    /// highlight surfaces are made from it.
    pub fn new(plot_id: impl Into<PlotId>, primary: S, registry: Arc<DrawOpRegistry>) -> Self {
        let plot_id = plot_id.into();
        Drawer {
            name: plot_id.clone(),
            selection_surface: primary.offscreen(),
            highlight_surface: primary.offscreen(),
            primary,
            plot_id,
            config: RendererConfig::default(),
            registry,
            tasks: None,
            data: None,
            highlight: None,
            selection: None,
            def: Arc::new(DrawingDef::default()),
            cc: None,
            signature: None,
            job: None,
            generation: 0,
            task_id: None,
        }
    }

    /// Name used to build task ids
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tasks(mut self, tasks: Arc<dyn TaskRegistry>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn plot_id(&self) -> &str {
        &self.plot_id
    }

    pub fn primary(&self) -> &S {
        &self.primary
    }

    pub fn selection_surface(&self) -> &S {
        &self.selection_surface
    }

    pub fn highlight_surface(&self) -> &S {
        &self.highlight_surface
    }

    /// Ticket of the chunked render in flight, if any
    pub fn pending(&self) -> Option<RenderTicket> {
        self.job.as_ref().map(|job| job.ticket)
    }

    /// Update the data and view. Redraws only what changed.
    pub fn set_data(
        &mut self,
        data: Option<DrawList>,
        selection: Option<Selection>,
        cc: Arc<dyn CoordConverter>,
        def: Arc<DrawingDef>,
        force: bool,
    ) -> RenderOutcome {
        let signature = ViewSignature::new(&def, cc.as_ref());
        let view_changed = self.signature.as_ref() != Some(&signature);
        let data_changed = !same_list(&self.data, &data);
        let selection_changed = !same_selection(&self.selection, &selection);

        if !force && !view_changed && !data_changed && !selection_changed {
            trace!(plot_id = %self.plot_id, "drawer skipped, nothing changed");
            return RenderOutcome::Skipped;
        }

        let zoom_changed = self
            .signature
            .as_ref()
            .is_some_and(|old| !old.same_zoom(&signature));
        if zoom_changed {
            debug!(plot_id = %self.plot_id, "zoom changed, clearing all surfaces");
            self.cancel();
            self.primary.clear();
            self.selection_surface.clear();
            self.highlight_surface.clear();
        }

        self.signature = Some(signature);
        self.data = data;
        self.selection = selection;
        self.def = def;
        self.cc = Some(cc);

        if view_changed || force {
            self.redraw_highlight();
        }
        self.redraw_selection();
        if data_changed || view_changed || force {
            self.redraw_primary()
        } else {
            RenderOutcome::SelectionUpdated
        }
    }

    /// Replace the highlight list and redraw its surface.
    pub fn set_highlight(&mut self, highlight: Option<DrawList>) {
        if same_list(&self.highlight, &highlight) {
            return;
        }
        self.highlight = highlight;
        self.redraw_highlight();
    }

    /// Cancel any render in flight and blank every surface.
    pub fn clear(&mut self) {
        self.cancel();
        self.primary.clear();
        self.selection_surface.clear();
        self.highlight_surface.clear();
    }

    /// Draw the next chunk of the render named by `ticket`.
    pub fn step(&mut self, ticket: RenderTicket) -> StepOutcome {
        let Some(job) = self.job.as_mut() else {
            return StepOutcome::Stale;
        };
        if job.ticket != ticket {
            debug!(plot_id = %self.plot_id, ?ticket, "stale render ticket ignored");
            return StepOutcome::Stale;
        }
        let env = OpEnv::new(&self.registry, job.cc.as_ref(), &job.def);
        let (chunk, next) = collect_chunk(&job.objects, job.cursor, job.chunk_size, env.cc);
        draw_chunk(&mut job.buffer, &chunk, env);
        trace!(plot_id = %self.plot_id, from = job.cursor, to = next, "drew chunk");
        job.cursor = next;
        if job.cursor < job.objects.len() {
            return StepOutcome::Pending {
                cursor: job.cursor,
                total: job.objects.len(),
            };
        }
        if let Some(job) = self.job.take() {
            self.primary.copy_from(&job.buffer);
        }
        self.remove_task();
        debug!(plot_id = %self.plot_id, "chunked render finished");
        StepOutcome::Done
    }

    /// Poll the render in flight until it finishes.
    pub fn finish(&mut self) -> StepOutcome {
        let Some(ticket) = self.pending() else {
            return StepOutcome::Stale;
        };
        loop {
            match self.step(ticket) {
                StepOutcome::Pending { .. } => continue,
                done => return done,
            }
        }
    }

    // ==================== Internals ====================

    fn cancel(&mut self) {
        if let Some(_job) = self.job.take() {
            debug!(plot_id = %self.plot_id, ticket = ?_job.ticket, "chunked render cancelled");
        }
        self.remove_task();
    }

    fn add_task(&mut self) {
        let task_id = format!("{}-{}", self.name, self.generation);
        if let Some(tasks) = &self.tasks {
            tasks.add_task_count(&self.plot_id, &task_id);
        }
        self.task_id = Some(task_id);
    }

    fn remove_task(&mut self) {
        if let Some(task_id) = self.task_id.take() {
            if let Some(tasks) = &self.tasks {
                tasks.remove_task_count(&self.plot_id, &task_id);
            }
        }
    }

    fn redraw_primary(&mut self) -> RenderOutcome {
        self.cancel();
        let inputs = self.cc.clone().zip(self.data.clone());
        let Some((cc, data)) = inputs.filter(|(_, data)| !data.is_empty()) else {
            self.primary.clear();
            self.highlight_surface.clear();
            return RenderOutcome::Cleared;
        };
        let objects = self.prepare(data, cc.as_ref());

        if objects.len() <= self.config.sync_threshold {
            debug!(plot_id = %self.plot_id, count = objects.len(), "drawing synchronously");
            self.primary.clear();
            let env = OpEnv::new(&self.registry, cc.as_ref(), &self.def);
            let (chunk, _) = collect_chunk(&objects, 0, usize::MAX, env.cc);
            draw_chunk(&mut self.primary, &chunk, env);
            return RenderOutcome::Drawn;
        }

        self.generation += 1;
        let ticket = RenderTicket {
            generation: self.generation,
        };
        let chunk_size = if objects.iter().all(DrawObject::is_point) {
            self.config.point_chunk_size
        } else {
            self.config.object_chunk_size
        };
        if objects.len() > self.config.progress_threshold {
            self.add_task();
        }
        debug!(
            plot_id = %self.plot_id,
            count = objects.len(),
            chunk_size,
            ?ticket,
            "starting chunked render"
        );
        self.job = Some(RenderJob {
            ticket,
            objects,
            cursor: 0,
            chunk_size: chunk_size.max(1),
            buffer: self.primary.offscreen(),
            cc,
            def: Arc::clone(&self.def),
        });
        RenderOutcome::Scheduled(ticket)
    }

    fn redraw_selection(&mut self) {
        self.selection_surface.clear();
        let (Some(cc), Some(data), Some(selection)) = (&self.cc, &self.data, &self.selection) else {
            return;
        };
        let env = OpEnv::new(&self.registry, cc.as_ref(), &self.def);
        for obj in selection.select(data) {
            let selected = obj.clone().with_color(self.def.selected_color.clone());
            let mut ctx = DrawContext {
                env,
                surface: &mut self.selection_surface,
                only_add_to_path: false,
            };
            self.registry.draw(&selected, &mut ctx);
        }
    }

    fn redraw_highlight(&mut self) {
        self.highlight_surface.clear();
        let (Some(cc), Some(highlight)) = (&self.cc, &self.highlight) else {
            return;
        };
        let env = OpEnv::new(&self.registry, cc.as_ref(), &self.def);
        for obj in highlight.iter() {
            let lit = self
                .registry
                .make_highlight(obj, &env)
                .unwrap_or_else(|| obj.clone().with_color(self.def.highlight_color.clone()));
            let mut ctx = DrawContext {
                env,
                surface: &mut self.highlight_surface,
                only_add_to_path: false,
            };
            self.registry.draw(&lit, &mut ctx);
        }
    }

    /// Decimated copy of dense point data, or the list itself.
    fn prepare(&self, data: DrawList, cc: &dyn CoordConverter) -> DrawList {
        if !self.config.decimate || data.len() <= self.config.decimate_min_objects {
            return data;
        }
        let decimated = decimate(&data, &self.registry, &self.def, cc, self.config.decimate_fuzz);
        debug!(
            plot_id = %self.plot_id,
            before = data.len(),
            after = decimated.len(),
            "decimated draw list"
        );
        Arc::new(decimated)
    }
}

// ============================================================================
// Chunk drawing
// ============================================================================

/// Points off the viewport are not worth a draw call.
fn should_draw(obj: &DrawObject, cc: &dyn CoordConverter) -> bool {
    match &obj.kind {
        DrawKind::Point(p) => cc.point_on_display(&p.pt),
        _ => true,
    }
}

/// Up to `max` drawable objects starting at `start`, and the next cursor.
fn collect_chunk<'a>(
    objects: &'a [DrawObject],
    start: usize,
    max: usize,
    cc: &dyn CoordConverter,
) -> (Vec<&'a DrawObject>, usize) {
    let mut chunk = Vec::new();
    let mut cursor = start;
    while cursor < objects.len() && chunk.len() < max {
        let obj = &objects[cursor];
        cursor += 1;
        if should_draw(obj, cc) {
            chunk.push(obj);
        }
    }
    (chunk, cursor)
}

/// True when every object can join one path with one color and width.
fn can_share_path(chunk: &[&DrawObject], env: &OpEnv<'_>) -> bool {
    let Some(first) = chunk.first() else {
        return false;
    };
    let color = first.color.as_ref().unwrap_or(&env.def.color);
    let width = first.line_width.unwrap_or(env.def.line_width);
    chunk.iter().all(|obj| {
        obj.color.as_ref().unwrap_or(&env.def.color) == color
            && obj.line_width.unwrap_or(env.def.line_width) == width
            && env.registry.use_path_optimization(obj, env.def)
    })
}

fn draw_chunk(surface: &mut dyn Surface, chunk: &[&DrawObject], env: OpEnv<'_>) {
    let Some(first) = chunk.first() else {
        return;
    };
    let shared = can_share_path(chunk, &env);
    if shared {
        let params = DrawParams::resolve(env.def, first);
        surface.begin_path(&params.color, params.line_width);
    }
    for obj in chunk {
        let mut ctx = DrawContext {
            env,
            surface: &mut *surface,
            only_add_to_path: shared,
        };
        env.registry.draw(obj, &mut ctx);
    }
    if shared {
        surface.stroke();
    }
}

// ============================================================================
// Decimation
// ============================================================================

/// Snap up to the next multiple of `fuzz`, staying inside `max`.
fn snap(v: f64, fuzz: u32, max: u32) -> i64 {
    let v = v.trunc() as i64;
    let fuzz = i64::from(fuzz.max(1));
    let rem = v.rem_euclid(fuzz);
    let snapped = if rem == 0 { v } else { v + (fuzz - rem) };
    if snapped == i64::from(max) { snapped - 1 } else { snapped }
}

/// One object per `fuzz`-pixel grid cell. When only a few objects are on
/// screen they are all kept.
fn decimate(
    data: &[DrawObject],
    registry: &DrawOpRegistry,
    def: &DrawingDef,
    cc: &dyn CoordConverter,
    fuzz: u32,
) -> Vec<DrawObject> {
    let env = OpEnv::new(registry, cc, def);
    let Dims { width, height } = cc.view_dims();
    let mut grid: BTreeMap<(i64, i64), &DrawObject> = BTreeMap::new();
    let mut first_on_screen = Vec::new();
    let mut on_screen = 0usize;
    for obj in data {
        let Some(s) = registry
            .center_pt(obj, &env)
            .and_then(|center| cc.to_screen(&center))
        else {
            continue;
        };
        let cell = (snap(s.x, fuzz, width), snap(s.y, fuzz, height));
        if cell.0 < 0 || cell.1 < 0 || cell.0 >= i64::from(width) || cell.1 >= i64::from(height) {
            continue;
        }
        grid.entry(cell).or_insert(obj);
        if on_screen < DECIMATE_KEEP_ALL {
            first_on_screen.push(obj);
        }
        on_screen += 1;
    }
    let kept: Vec<&DrawObject> = if on_screen < DECIMATE_KEEP_ALL {
        first_on_screen
    } else {
        grid.into_values().collect()
    };
    kept.into_iter().cloned().collect()
}
