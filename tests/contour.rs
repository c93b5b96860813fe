//! Footprint tracing from pixel spans to draw objects.

mod common;

use common::init_tracing;
use glam::DVec2;
use skylayer::contour::{ConnectedObj, ImageLineFootprint, PixelBox, Span};
use skylayer::convert::LinearConverter;
use skylayer::draw::object::DrawKind;
use skylayer::draw::{DrawOpRegistry, DrawingDef, OpEnv};
use skylayer::types::Dims;

/// Pixels enclosed by a lattice ring, boundary included (Pick's theorem).
fn enclosed_pixels(ring: &[DVec2]) -> f64 {
    let n = ring.len();
    let (mut twice_area, mut boundary) = (0.0, 0.0);
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        twice_area += a.perp_dot(b);
        let d = (b - a).abs();
        boundary += gcd(d.x as u64, d.y as u64) as f64;
    }
    twice_area.abs() / 2.0 + boundary / 2.0 + 1.0
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[test]
fn filled_block_has_four_corners_and_twelve_pixels() {
    init_tracing();
    let spans = (0..=2).map(|y| Span::new(y, 0, 3)).collect();
    let bbox = PixelBox::new(0, 0, 3, 2).expect("bbox");
    let obj = ConnectedObj::new(bbox, spans, Vec::new(), "block").expect("footprint");
    let outline = obj.outline();
    assert_eq!(outline.polygons.len(), 1);
    let ring = &outline.polygons[0];
    assert_eq!(ring.len(), 4);
    assert!((enclosed_pixels(ring) - 12.0).abs() <= 1.0);
}

#[test]
fn ring_with_hole_traces_its_outside() {
    init_tracing();
    // 5x5 square with a 3x3 hole
    let mut spans = vec![Span::new(0, 0, 4), Span::new(4, 0, 4)];
    for y in 1..=3 {
        spans.push(Span::new(y, 0, 0));
        spans.push(Span::new(y, 4, 4));
    }
    let bbox = PixelBox::new(0, 0, 4, 4).expect("bbox");
    let obj = ConnectedObj::new(bbox, spans, Vec::new(), "frame").expect("footprint");
    assert_eq!(obj.segments().zeros.iter().flatten().count(), 3);
    let ring = &obj.outline().polygons[0];
    assert_eq!(ring.len(), 4);
    assert_eq!(enclosed_pixels(ring), 25.0);
}

#[test]
fn footprint_document_round_trips_to_regions() {
    init_tracing();
    let json = r#"{
        "feet": {
            "f1": {"corners": [[2, 2], [5, 2], [5, 4], [2, 4]],
                   "spans": [[2, 2, 5], [3, 2, 5], [4, 2, 5]],
                   "peaks": [[3.0, 3.0]]}
        }
    }"#;
    let fp = ImageLineFootprint::from_json_str(json).expect("document");
    let obj = fp.to_draw_object();
    assert!(matches!(obj.kind, DrawKind::ImageLine(_)));

    let registry = DrawOpRegistry::with_builtins();
    let cc = LinearConverter::new(Dims::new(20, 20), Dims::new(20, 20));
    let def = DrawingDef::default();
    let env = OpEnv::new(&registry, &cc, &def);
    insta::assert_snapshot!(registry.to_region(&obj, &env).join("\n"), @r"
    image;polygon 2 2 5 2 5 4 2 4
    image;point 3 3 # point=x
    ");
}
