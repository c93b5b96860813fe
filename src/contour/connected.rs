//! One footprint's pixel coverage and the outline traced from it.
//!
//! Rows run bottom-up: `y1` is the lowest row of the bounding box and
//! "north" is `+y`.

use std::sync::OnceLock;

use glam::DVec2;

use crate::errors::ContourError;
use crate::log::trace;

/// A covered run of pixels `x1..=x2` on row `y`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub y: i64,
    pub x1: i64,
    pub x2: i64,
}

impl Span {
    pub const fn new(y: i64, x1: i64, x2: i64) -> Self {
        Span { y, x1, x2 }
    }
}

/// Inclusive pixel bounding box
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl PixelBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Result<Self, ContourError> {
        if x1 > x2 || y1 > y2 {
            return Err(ContourError::InvertedBBox { x1, y1, x2, y2 });
        }
        Ok(PixelBox { x1, y1, x2, y2 })
    }

    /// Box spanned by the min and max of a corner list.
    pub fn from_corners(corners: &[(i64, i64)]) -> Result<Self, ContourError> {
        let Some(&(x0, y0)) = corners.first() else {
            return Err(ContourError::EmptyFootprint);
        };
        let (mut x1, mut y1, mut x2, mut y2) = (x0, y0, x0, y0);
        for &(x, y) in corners {
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x);
            y2 = y2.max(y);
        }
        Ok(PixelBox { x1, y1, x2, y2 })
    }

    fn covering(spans: &[Span]) -> Option<Self> {
        let first = spans.first()?;
        let mut b = PixelBox {
            x1: first.x1,
            y1: first.y,
            x2: first.x2,
            y2: first.y,
        };
        for s in spans {
            b.x1 = b.x1.min(s.x1);
            b.x2 = b.x2.max(s.x2);
            b.y1 = b.y1.min(s.y);
            b.y2 = b.y2.max(s.y);
        }
        Some(b)
    }

    pub fn width(&self) -> usize {
        (self.x2 - self.x1 + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.y2 - self.y1 + 1) as usize
    }

    pub fn contains(&self, pt: DVec2) -> bool {
        pt.x >= self.x1 as f64 && pt.x <= self.x2 as f64 && pt.y >= self.y1 as f64 && pt.y <= self.y2 as f64
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new((self.x1 + self.x2) as f64 / 2.0, (self.y1 + self.y2) as f64 / 2.0)
    }

    fn holds(&self, span: &Span) -> bool {
        span.x1 <= span.x2 && span.y >= self.y1 && span.y <= self.y2 && span.x1 >= self.x1 && span.x2 <= self.x2
    }
}

/// An inclusive run `x0..=x1` within one row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub x0: i64,
    pub x1: i64,
}

impl Segment {
    /// -1 when wholly left of `other`, 1 when wholly right, 0 when they overlap.
    fn rel_position(&self, other: &Segment) -> i8 {
        if self.x1 < other.x0 {
            -1
        } else if self.x0 > other.x1 {
            1
        } else {
            0
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Gap {
    seg: Segment,
    open: bool,
}

/// Covered and hole segments, one list per row starting at `y1`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segments {
    pub ones: Vec<Vec<Segment>>,
    pub zeros: Vec<Vec<Segment>>,
}

/// Traced outline in image pixel coordinates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outline {
    /// One closed ring per 8-connected region
    pub polygons: Vec<Vec<DVec2>>,
}

/// One footprint: a bounding box, its covered spans and its peaks.
#[derive(Clone, Debug)]
pub struct ConnectedObj {
    id: String,
    bbox: PixelBox,
    spans: Vec<Span>,
    peaks: Vec<DVec2>,
    segments: OnceLock<Segments>,
    outline: OnceLock<Outline>,
}

impl ConnectedObj {
    /// Build from a bounding box and spans. Every span must lie in the box.
    pub fn new(
        bbox: PixelBox,
        mut spans: Vec<Span>,
        peaks: Vec<DVec2>,
        id: impl Into<String>,
    ) -> Result<Self, ContourError> {
        if spans.is_empty() {
            return Err(ContourError::EmptyFootprint);
        }
        if let Some(bad) = spans.iter().find(|s| !bbox.holds(s)) {
            return Err(ContourError::SpanOutsideBBox {
                y: bad.y,
                x1: bad.x1,
                x2: bad.x2,
            });
        }
        spans.sort_unstable();
        Ok(ConnectedObj {
            id: id.into(),
            bbox,
            spans,
            peaks,
            segments: OnceLock::new(),
            outline: OnceLock::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bbox(&self) -> PixelBox {
        self.bbox
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn peaks(&self) -> &[DVec2] {
        &self.peaks
    }

    /// Number of covered pixels
    pub fn covered_pixels(&self) -> usize {
        self.segments()
            .ones
            .iter()
            .flatten()
            .map(|s| (s.x1 - s.x0 + 1) as usize)
            .sum()
    }

    /// Covered runs and enclosed holes per row, computed once.
    pub fn segments(&self) -> &Segments {
        self.segments.get_or_init(|| {
            let ones = self.one_segments();
            let zeros = enclosed_gaps(&ones);
            Segments { ones, zeros }
        })
    }

    /// Traced polygons, computed once.
    pub fn outline(&self) -> &Outline {
        self.outline.get_or_init(|| self.trace())
    }

    /// Split at rows with no coverage into row-connected pieces. The piece
    /// holding the topmost rows comes first.
    pub fn split_on_empty_line(self) -> Vec<ConnectedObj> {
        let ones = &self.segments().ones;
        let PixelBox { y1, y2, .. } = self.bbox;
        let mut cuts = Vec::new();
        let mut first_y = y1;
        for y in (y1 + 1)..y2 {
            if ones[(y - y1) as usize].is_empty() {
                if y > first_y {
                    cuts.push((first_y, y - 1));
                }
                first_y = y + 1;
            }
        }
        if cuts.is_empty() {
            return vec![self];
        }

        let ConnectedObj {
            id, mut spans, mut peaks, ..
        } = self;
        let mut pieces = Vec::new();
        for (from, to) in cuts {
            let (inside, rest): (Vec<Span>, Vec<Span>) = spans.into_iter().partition(|s| s.y >= from && s.y <= to);
            spans = rest;
            let (peaks_in, peaks_rest): (Vec<DVec2>, Vec<DVec2>) =
                peaks.into_iter().partition(|p| p.y >= from as f64 && p.y <= to as f64);
            peaks = peaks_rest;
            if let Some(piece) = piece_of(inside, peaks_in, &id) {
                pieces.push(piece);
            }
        }
        if let Some(rest) = piece_of(spans, peaks, &id) {
            pieces.insert(0, rest);
        }
        trace!(id = %id, pieces = pieces.len(), "footprint split on empty rows");
        pieces
    }

    /// Rows of covered segments, merged and sorted.
    fn one_segments(&self) -> Vec<Vec<Segment>> {
        let PixelBox { y1, .. } = self.bbox;
        let mut rows: Vec<Vec<Segment>> = vec![Vec::new(); self.bbox.height()];
        for span in &self.spans {
            let row = &mut rows[(span.y - y1) as usize];
            match row.last_mut() {
                // spans are sorted, so a touching run can only follow the last one
                Some(last) if span.x1 <= last.x1 + 1 => last.x1 = last.x1.max(span.x2),
                _ => row.push(Segment {
                    x0: span.x1,
                    x1: span.x2,
                }),
            }
        }
        rows
    }

    /// Binary mask of covered pixels and enclosed holes, row 0 at `y1`.
    fn mask(&self) -> Vec<Vec<bool>> {
        let Segments { ones, zeros } = self.segments();
        let x1 = self.bbox.x1;
        let mut m = vec![vec![false; self.bbox.width()]; self.bbox.height()];
        for (row, segs) in m.iter_mut().zip(ones.iter().zip(zeros)) {
            for seg in segs.0.iter().chain(segs.1) {
                for x in seg.x0..=seg.x1 {
                    row[(x - x1) as usize] = true;
                }
            }
        }
        m
    }

    fn trace(&self) -> Outline {
        let mask = self.mask();
        let labels = label_regions(&mask);
        let (ox, oy) = (self.bbox.x1, self.bbox.y1);
        let polygons = labels
            .starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let ring = trace_region(&labels, i as u32 + 1, start);
                let ring = simplify(ring);
                pad_ring(ring)
                    .into_iter()
                    .map(|(x, y)| DVec2::new((x + ox) as f64, (y + oy) as f64))
                    .collect()
            })
            .collect();
        Outline { polygons }
    }
}

fn piece_of(spans: Vec<Span>, peaks: Vec<DVec2>, id: &str) -> Option<ConnectedObj> {
    let bbox = PixelBox::covering(&spans)?;
    ConnectedObj::new(bbox, spans, peaks, id).ok()
}

/// Gaps between covered runs that are enclosed by coverage on every side.
///
/// Gaps touching the left or right edge start out open, as do inner gaps on
/// the first and last rows. A gap next to an empty row, or overlapping an
/// open gap on a neighbouring row, becomes open too. Two sweeps (top-down,
/// then bottom-up) settle the flags; whatever stays closed is a hole.
fn enclosed_gaps(ones: &[Vec<Segment>]) -> Vec<Vec<Segment>> {
    let rows = ones.len();
    let (lo, hi) = bounds(ones);
    let mut gaps: Vec<Vec<Gap>> = ones
        .iter()
        .enumerate()
        .map(|(i, segs)| {
            let (Some(first), Some(last)) = (segs.first(), segs.last()) else {
                return Vec::new();
            };
            let edge_row = i == 0 || i + 1 == rows;
            let mut row = Vec::new();
            if lo < first.x0 {
                row.push(Gap {
                    seg: Segment { x0: lo, x1: first.x0 - 1 },
                    open: true,
                });
            }
            for pair in segs.windows(2) {
                if pair[0].x1 < pair[1].x0 - 1 {
                    row.push(Gap {
                        seg: Segment {
                            x0: pair[0].x1 + 1,
                            x1: pair[1].x0 - 1,
                        },
                        open: edge_row,
                    });
                }
            }
            if hi > last.x1 {
                row.push(Gap {
                    seg: Segment { x0: last.x1 + 1, x1: hi },
                    open: true,
                });
            }
            row
        })
        .collect();

    for i in (0..rows).chain((0..rows).rev()) {
        settle_row(ones, &mut gaps, i);
    }

    gaps.into_iter()
        .map(|row| row.into_iter().filter(|g| !g.open).map(|g| g.seg).collect())
        .collect()
}

fn bounds(ones: &[Vec<Segment>]) -> (i64, i64) {
    let lo = ones.iter().filter_map(|r| r.first()).map(|s| s.x0).min().unwrap_or(0);
    let hi = ones.iter().filter_map(|r| r.last()).map(|s| s.x1).max().unwrap_or(0);
    (lo, hi)
}

fn settle_row(ones: &[Vec<Segment>], gaps: &mut [Vec<Gap>], i: usize) {
    for n in 0..gaps[i].len() {
        if gaps[i][n].open {
            continue;
        }
        let seg = gaps[i][n].seg;
        let open = (i > 0 && leaks_into(ones, gaps, seg, i - 1))
            || (i + 1 < ones.len() && leaks_into(ones, gaps, seg, i + 1));
        gaps[i][n].open = open;
    }
}

fn leaks_into(ones: &[Vec<Segment>], gaps: &[Vec<Gap>], seg: Segment, row: usize) -> bool {
    if ones[row].is_empty() {
        return true;
    }
    for other in gaps[row].iter().filter(|g| g.open) {
        match seg.rel_position(&other.seg) {
            -1 => break,
            0 => return true,
            _ => {}
        }
    }
    false
}

// ============================================================================
// Boundary tracing
// ============================================================================

/// Step for each direction: E, NE, N, NW, W, SW, S, SE
const STEP: [(i64, i64); 8] = [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];

/// Directions to try, in order, after arriving from each direction
const NEXT: [&[usize]; 8] = [
    &[3, 4, 5, 6, 7, 0],
    &[3, 4, 5, 6, 7, 0, 1],
    &[5, 6, 7, 0, 1, 2],
    &[5, 6, 7, 0, 1, 2, 3],
    &[7, 0, 1, 2, 3, 4],
    &[7, 0, 1, 2, 3, 4, 5],
    &[1, 2, 3, 4, 5, 6],
    &[1, 2, 3, 4, 5, 6, 7],
];

const WEST: usize = 4;

struct Labels {
    width: i64,
    height: i64,
    cells: Vec<u32>,
    /// First cell of each region in row-major order
    starts: Vec<(i64, i64)>,
}

impl Labels {
    fn get(&self, x: i64, y: i64) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[(y * self.width + x) as usize])
    }
}

/// Label 8-connected regions of the mask, numbering them from 1.
fn label_regions(mask: &[Vec<bool>]) -> Labels {
    let height = mask.len() as i64;
    let width = mask.first().map_or(0, Vec::len) as i64;
    let mut labels = Labels {
        width,
        height,
        cells: vec![0; (width * height) as usize],
        starts: Vec::new(),
    };
    let mut stack = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if !mask[y as usize][x as usize] || labels.cells[idx] != 0 {
                continue;
            }
            labels.starts.push((x, y));
            let label = labels.starts.len() as u32;
            labels.cells[idx] = label;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in STEP {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if labels.get(nx, ny) == Some(0) && mask[ny as usize][nx as usize] {
                        labels.cells[(ny * width + nx) as usize] = label;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    labels
}

/// Walk the boundary of region `label` counterclockwise from its first cell.
fn trace_region(labels: &Labels, label: u32, start: (i64, i64)) -> Vec<(i64, i64)> {
    let cap = labels.cells.iter().filter(|&&l| l == label).count() * 4 + 8;
    let mut ring = vec![start];
    let mut current = start;
    let mut from = WEST;
    while ring.len() < cap {
        let mut found = None;
        for &dir in NEXT[from] {
            let next = (current.0 + STEP[dir].0, current.1 + STEP[dir].1);
            match labels.get(next.0, next.1) {
                None => continue,
                Some(_) if next == start => break,
                Some(l) if l == label => {
                    found = Some((next, dir));
                    break;
                }
                Some(_) => {}
            }
        }
        let Some((next, dir)) = found else {
            break;
        };
        current = next;
        from = (dir + 4) % 8;
        ring.push(current);
    }
    ring
}

/// Drop vertices lying strictly between their neighbours on a straight line.
fn simplify(mut ring: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    let n = ring.len();
    if n < 3 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let (px, py) = ring[(i + n - 1) % n];
            let (cx, cy) = ring[i];
            let (nx, ny) = ring[(i + 1) % n];
            let (ax, ay) = (px - cx, py - cy);
            let (bx, by) = (nx - cx, ny - cy);
            let straight = ax * by - ay * bx == 0 && ax * bx + ay * by < 0;
            !straight
        })
        .map(|i| ring[i])
        .collect()
}

/// Rings always carry at least three vertices.
fn pad_ring(mut ring: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    if let Some(&first) = ring.first() {
        while ring.len() < 3 {
            ring.push(first);
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(spans: &[(i64, i64, i64)]) -> ConnectedObj {
        let spans: Vec<Span> = spans.iter().map(|&(y, x1, x2)| Span::new(y, x1, x2)).collect();
        let bbox = PixelBox::covering(&spans).expect("spans");
        ConnectedObj::new(bbox, spans, Vec::new(), "fp").expect("valid footprint")
    }

    fn shoelace(ring: &[DVec2]) -> f64 {
        let n = ring.len();
        (0..n)
            .map(|i| ring[i].perp_dot(ring[(i + 1) % n]))
            .sum::<f64>()
            / 2.0
    }

    #[test]
    fn block_traces_to_four_corners() {
        let o = obj(&[(0, 0, 3), (1, 0, 3), (2, 0, 3)]);
        let polys = &o.outline().polygons;
        assert_eq!(polys.len(), 1);
        let ring = &polys[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], DVec2::new(0.0, 0.0));
        // counterclockwise through pixel centers: 3 x 2 units
        assert_eq!(shoelace(ring), 6.0);
        assert_eq!(o.covered_pixels(), 12);
    }

    #[test]
    fn bad_input_is_rejected() {
        let bbox = PixelBox::new(0, 0, 3, 3).expect("bbox");
        assert_eq!(
            ConnectedObj::new(bbox, Vec::new(), Vec::new(), "a").err(),
            Some(ContourError::EmptyFootprint)
        );
        assert_eq!(
            ConnectedObj::new(bbox, vec![Span::new(1, 2, 5)], Vec::new(), "a").err(),
            Some(ContourError::SpanOutsideBBox { y: 1, x1: 2, x2: 5 })
        );
        assert!(matches!(PixelBox::new(3, 0, 1, 2), Err(ContourError::InvertedBBox { .. })));
    }

    #[test]
    fn enclosed_hole_is_kept() {
        // ring of coverage around (1, 1)
        let o = obj(&[(0, 0, 2), (1, 0, 0), (1, 2, 2), (2, 0, 2)]);
        assert_eq!(o.segments().zeros[1], vec![Segment { x0: 1, x1: 1 }]);
        assert!(o.segments().zeros[0].is_empty());
    }

    #[test]
    fn notch_open_to_the_edge_is_not_a_hole() {
        // a U shape: the gap in row 1 continues into the open top row
        let o = obj(&[(0, 0, 2), (1, 0, 0), (1, 2, 2), (2, 0, 0), (2, 2, 2)]);
        assert!(o.segments().zeros.iter().all(Vec::is_empty));
    }

    #[test]
    fn single_pixel_is_padded() {
        let o = obj(&[(5, 7, 7)]);
        let ring = &o.outline().polygons[0];
        assert_eq!(ring.len(), 3);
        assert!(ring.iter().all(|p| *p == DVec2::new(7.0, 5.0)));
    }

    #[test]
    fn disjoint_regions_give_separate_rings() {
        let o = obj(&[(0, 0, 1), (0, 4, 5), (1, 0, 1), (1, 4, 5)]);
        assert_eq!(o.outline().polygons.len(), 2);
    }

    #[test]
    fn split_moves_spans_and_peaks() {
        let spans = vec![Span::new(0, 0, 2), Span::new(1, 0, 2), Span::new(3, 1, 1), Span::new(4, 0, 3)];
        let bbox = PixelBox::from_corners(&[(0, 0), (3, 0), (3, 4), (0, 4)]).expect("bbox");
        let peaks = vec![DVec2::new(1.0, 0.0), DVec2::new(2.0, 4.0)];
        let pieces = ConnectedObj::new(bbox, spans, peaks, "fp")
            .expect("valid")
            .split_on_empty_line();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].bbox(), PixelBox::new(0, 3, 3, 4).expect("bbox"));
        assert_eq!(pieces[0].peaks(), &[DVec2::new(2.0, 4.0)]);
        assert_eq!(pieces[1].bbox(), PixelBox::new(0, 0, 2, 1).expect("bbox"));
        assert_eq!(pieces[1].peaks(), &[DVec2::new(1.0, 0.0)]);
        assert!(pieces.iter().all(|p| p.id() == "fp"));
    }
}
