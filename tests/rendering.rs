//! Region output and the chunked render path.

mod common;

use std::sync::Arc;

use common::init_tracing;
use glam::DVec2;
use skylayer::config::RendererConfig;
use skylayer::convert::{CoordConverter, LinearConverter};
use skylayer::draw::object::{Distance, DrawList, DrawObject, draw_list};
use skylayer::draw::{DrawOpRegistry, DrawingDef, OpEnv};
use skylayer::render::{Drawer, RenderOutcome};
use skylayer::surface::CommandBuffer;
use skylayer::types::{Dims, Pt};

fn image_cc() -> LinearConverter {
    LinearConverter::new(Dims::new(400, 400), Dims::new(400, 400))
}

fn regions(objects: &[DrawObject], cc: &dyn CoordConverter) -> String {
    let registry = DrawOpRegistry::with_builtins();
    let def = DrawingDef::default();
    let env = OpEnv::new(&registry, cc, &def);
    registry.to_regions(objects, &env).join("\n")
}

#[test]
fn region_lines_match_ds9_syntax() {
    init_tracing();
    let image = [DrawObject::circle(Pt::image(120.0, 45.0), Distance::image(10.0)).with_color("red")];
    insta::assert_snapshot!(regions(&image, &image_cc()), @"image;circle 120 45 10 # color=red");

    let sky = LinearConverter::centered_on(Dims::new(400, 400), Dims::new(400, 400), DVec2::new(10.3, 20.3), 0.001);
    let world = [
        DrawObject::polygon(vec![Pt::world(10.1, 20.2), Pt::world(10.3, 20.4), Pt::world(10.5, 20.2)]),
        DrawObject::polygon(vec![Pt::world(10.1, 20.2), Pt::world(10.3, 20.4), Pt::world(10.5, 20.2)])
            .with_color("red")
            .with_line_width(3.0),
    ];
    insta::assert_snapshot!(regions(&world, &sky), @r"
    J2000;polygon 10.1 20.2 10.3 20.4 10.5 20.2
    J2000;polygon 10.1 20.2 10.3 20.4 10.5 20.2 # color=red width=3
    ");
}

fn scattered_points(n: usize) -> DrawList {
    draw_list(
        (0..n)
            .map(|i| DrawObject::point(Pt::image((i * 7 % 380) as f64 + 10.0, (i * 13 % 380) as f64 + 10.0)))
            .collect(),
    )
}

fn geometry(buffer: &CommandBuffer) -> Vec<String> {
    let mut out: Vec<String> = buffer
        .commands()
        .iter()
        .filter(|c| !c.is_framing())
        .map(|c| format!("{c:?}"))
        .collect();
    out.sort();
    out
}

fn drawer(config: RendererConfig) -> Drawer<CommandBuffer> {
    Drawer::new(
        "p1",
        CommandBuffer::new(Dims::new(400, 400)),
        Arc::new(DrawOpRegistry::with_builtins()),
    )
    .with_config(config)
}

#[test]
fn chunked_render_draws_what_a_sync_render_draws() {
    init_tracing();
    let cc: Arc<dyn CoordConverter> = Arc::new(image_cc());
    let def = Arc::new(DrawingDef::default());
    let data = scattered_points(600);

    let mut sync = drawer(RendererConfig {
        sync_threshold: 1000,
        ..Default::default()
    });
    let outcome = sync.set_data(Some(data.clone()), None, cc.clone(), def.clone(), false);
    assert_eq!(outcome, RenderOutcome::Drawn);

    let mut chunked = drawer(RendererConfig {
        point_chunk_size: 400,
        ..Default::default()
    });
    let outcome = chunked.set_data(Some(data), None, cc, def, false);
    assert!(matches!(outcome, RenderOutcome::Scheduled(_)), "got {outcome:?}");
    chunked.finish();

    assert_eq!(geometry(sync.primary()), geometry(chunked.primary()));
    assert!(!geometry(sync.primary()).is_empty());
}
