//! Batches of pixel-span footprints turned into draw objects.
//!
//! Input mirrors the footprint documents image servers emit: a pixel
//! convention plus a map of footprint id to bounding corners, covered spans
//! `[y, x1, x2]` and optional peaks `[x, y]`.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::Deserialize;

use super::connected::{ConnectedObj, PixelBox, Segment, Span};
use crate::draw::object::{Distance, DrawObject, ImageLineData};
use crate::errors::ContourError;
use crate::log::{debug, warn};
use crate::types::Pt;

/// Pixel convention of incoming footprint coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelSys {
    /// Already image coordinates
    #[default]
    #[serde(alias = "imagept")]
    Image,
    /// Zero-based pixel centers
    #[serde(alias = "zero", alias = "zerobased")]
    ZeroBased,
    /// One-based FITS pixel centers
    #[serde(alias = "FITS")]
    Fits,
}

impl PixelSys {
    fn offset(self) -> f64 {
        match self {
            PixelSys::Image => 0.0,
            PixelSys::ZeroBased => 0.5,
            PixelSys::Fits => -0.5,
        }
    }
}

/// One footprint as delivered
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FootData {
    pub corners: Vec<(i64, i64)>,
    pub spans: Vec<(i64, i64, i64)>,
    #[serde(default)]
    pub peaks: Vec<(f64, f64)>,
}

impl FootData {
    fn into_connected(self, id: &str) -> Result<ConnectedObj, ContourError> {
        let bbox = PixelBox::from_corners(&self.corners)?;
        let spans = self.spans.into_iter().map(|(y, x1, x2)| Span::new(y, x1, x2)).collect();
        let peaks = self.peaks.into_iter().map(|(x, y)| DVec2::new(x, y)).collect();
        ConnectedObj::new(bbox, spans, peaks, id)
    }
}

/// A footprint document
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FootprintSet {
    #[serde(default, alias = "pixelSys")]
    pub pixelsys: PixelSys,
    pub feet: BTreeMap<String, FootData>,
}

/// Every footprint of a batch, split into row-connected pieces.
#[derive(Clone, Debug, Default)]
pub struct ImageLineFootprint {
    pixel_sys: PixelSys,
    total_feet: usize,
    objects: Vec<ConnectedObj>,
}

impl ImageLineFootprint {
    /// Build from footprints keyed by id. Footprints that fail validation
    /// are dropped with a warning.
    pub fn from_feet(pixel_sys: PixelSys, feet: impl IntoIterator<Item = (String, FootData)>) -> Self {
        let mut total_feet = 0;
        let mut objects = Vec::new();
        for (id, foot) in feet {
            total_feet += 1;
            match foot.into_connected(&id) {
                Ok(obj) => objects.extend(obj.split_on_empty_line()),
                Err(_error) => {
                    warn!(id = %id, %_error, "dropping footprint");
                }
            }
        }
        debug!(total_feet, pieces = objects.len(), "image-line footprints built");
        ImageLineFootprint {
            pixel_sys,
            total_feet,
            objects,
        }
    }

    pub fn from_set(set: FootprintSet) -> Self {
        Self::from_feet(set.pixelsys, set.feet)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<FootprintSet>(json).map(Self::from_set)
    }

    pub fn pixel_sys(&self) -> PixelSys {
        self.pixel_sys
    }

    /// Footprints in the input, before splitting
    pub fn total_feet(&self) -> usize {
        self.total_feet
    }

    pub fn objects(&self) -> &[ConnectedObj] {
        &self.objects
    }

    fn image_pt(&self, v: DVec2) -> Pt {
        let off = self.pixel_sys.offset();
        Pt::image(v.x + off, v.y + off)
    }

    /// One draw object holding every traced ring and peak.
    pub fn to_draw_object(&self) -> DrawObject {
        let polygons = self
            .objects
            .iter()
            .flat_map(|obj| obj.outline().polygons.iter())
            .map(|ring| ring.iter().map(|&v| self.image_pt(v)).collect())
            .collect();
        let peaks = self
            .objects
            .iter()
            .flat_map(|obj| obj.peaks().iter())
            .map(|&v| self.image_pt(v))
            .collect();
        DrawObject::new(ImageLineData { polygons, peaks })
    }

    /// One polygon per traced ring, tagged with its footprint id.
    pub fn polygon_objects(&self) -> Vec<DrawObject> {
        self.objects
            .iter()
            .flat_map(|obj| {
                obj.outline().polygons.iter().map(move |ring| {
                    DrawObject::polygon(ring.iter().map(|&v| self.image_pt(v)).collect()).with_id(obj.id())
                })
            })
            .collect()
    }

    /// A point per peak, tagged with its footprint id.
    pub fn peak_objects(&self) -> Vec<DrawObject> {
        self.objects
            .iter()
            .flat_map(|obj| {
                obj.peaks()
                    .iter()
                    .map(move |&v| DrawObject::point(self.image_pt(v)).with_id(obj.id()))
            })
            .collect()
    }

    /// Rectangles covering each covered span, or each enclosed hole when
    /// `covered` is false. Edges sit half a pixel outside the span.
    pub fn rect_objects(&self, covered: bool) -> Vec<DrawObject> {
        let mut rects = Vec::new();
        for obj in &self.objects {
            let segments = obj.segments();
            let rows = if covered { &segments.ones } else { &segments.zeros };
            let y1 = obj.bbox().y1;
            for (i, row) in rows.iter().enumerate() {
                let y = (y1 + i as i64) as f64;
                rects.extend(row.iter().map(|seg| self.rect(seg, y).with_id(obj.id())));
            }
        }
        rects
    }

    fn rect(&self, seg: &Segment, y: f64) -> DrawObject {
        let center = self.image_pt(DVec2::new((seg.x0 + seg.x1) as f64 / 2.0, y));
        let width = (seg.x1 - seg.x0 + 1) as f64;
        DrawObject::rectangle(center, Distance::image(width), Distance::image(1.0), 0.0)
    }

    /// Footprint whose box holds the image point, nearest box center first.
    pub fn find(&self, image: DVec2) -> Option<&ConnectedObj> {
        let local = image - DVec2::splat(self.pixel_sys.offset());
        self.objects
            .iter()
            .filter(|obj| obj.bbox().contains(local))
            .min_by(|a, b| {
                let da = a.bbox().center().distance_squared(local);
                let db = b.bbox().center().distance_squared(local);
                da.total_cmp(&db)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::object::{DrawKind, ShapeKind};

    const DOC: &str = r#"{
        "pixelsys": "zero-based",
        "feet": {
            "a": {"corners": [[0, 0], [3, 0], [3, 2], [0, 2]],
                  "spans": [[0, 0, 3], [1, 0, 3], [2, 0, 3]],
                  "peaks": [[1.0, 1.0]]},
            "b": {"corners": [[10, 0], [12, 0], [12, 4], [10, 4]],
                  "spans": [[0, 10, 12], [4, 10, 12]]},
            "bad": {"corners": [[0, 0], [1, 1]], "spans": [[5, 0, 1]]}
        }
    }"#;

    #[test]
    fn document_builds_split_pieces() {
        let fp = ImageLineFootprint::from_json_str(DOC).expect("valid json");
        assert_eq!(fp.pixel_sys(), PixelSys::ZeroBased);
        assert_eq!(fp.total_feet(), 3);
        // "a" stays whole, "b" splits at its empty rows, "bad" is dropped
        assert_eq!(fp.objects().len(), 3);
        assert_eq!(fp.polygon_objects().len(), 3);
        assert_eq!(fp.peak_objects().len(), 1);
    }

    #[test]
    fn draw_object_shifts_by_pixel_convention() {
        let fp = ImageLineFootprint::from_json_str(DOC).expect("valid json");
        let obj = fp.to_draw_object();
        let DrawKind::ImageLine(data) = &obj.kind else {
            panic!("expected image-line data");
        };
        assert_eq!(data.polygons.len(), 3);
        assert_eq!(data.polygons[0][0], Pt::image(0.5, 0.5));
        assert_eq!(data.peaks, vec![Pt::image(1.5, 1.5)]);
    }

    #[test]
    fn rects_reach_half_a_pixel_past_spans() {
        let feet = [(
            "a".to_string(),
            FootData {
                corners: vec![(0, 0), (2, 2)],
                spans: vec![(0, 0, 2), (1, 0, 0), (1, 2, 2), (2, 0, 2)],
                peaks: Vec::new(),
            },
        )];
        let fp = ImageLineFootprint::from_feet(PixelSys::Image, feet);
        assert_eq!(fp.rect_objects(true).len(), 4);
        let holes = fp.rect_objects(false);
        assert_eq!(holes.len(), 1);
        let DrawKind::Shape(shape) = &holes[0].kind else {
            panic!("expected a shape");
        };
        match &shape.shape {
            ShapeKind::Rectangle { center, width, .. } => {
                assert_eq!(*center, Pt::image(1.0, 1.0));
                assert_eq!(*width, Distance::image(1.0));
            }
            other => panic!("expected a rectangle, got {other:?}"),
        }
    }

    #[test]
    fn find_prefers_nearest_box() {
        let fp = ImageLineFootprint::from_json_str(DOC).expect("valid json");
        assert_eq!(fp.find(DVec2::new(1.5, 1.5)).map(ConnectedObj::id), Some("a"));
        assert!(fp.find(DVec2::new(50.0, 50.0)).is_none());
    }
}
