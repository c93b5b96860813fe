//! Screen-space translation and rotation of anchor points.
//!
//! Points are moved on screen and converted back into their own coordinate
//! space, so a world-anchored object stays world-anchored.

use glam::DVec2;

use super::object::{DrawObject, Geometry};
use crate::convert::CoordConverter;
use crate::types::{CoordSys, Pt};

fn remap(
    obj: &DrawObject,
    cc: &dyn CoordConverter,
    mut f: impl FnMut(DVec2) -> DVec2,
) -> Option<DrawObject> {
    let mut out = obj.clone();
    let mut failed = false;
    out.kind.map_points(&mut |p| {
        let moved = cc
            .to_screen(&p)
            .map(&mut f)
            .and_then(|s| cc.convert(&Pt::screen(s.x, s.y), p.sys));
        match moved {
            Some(m) => m,
            None => {
                failed = true;
                p
            }
        }
    });
    (!failed).then_some(out)
}

/// Copy shifted by a screen offset; `None` if any point fails to convert.
pub fn translated(obj: &DrawObject, cc: &dyn CoordConverter, offset: DVec2) -> Option<DrawObject> {
    remap(obj, cc, |s| s + offset)
}

/// Copy rotated by `angle` radians about `center`.
pub fn rotated(obj: &DrawObject, cc: &dyn CoordConverter, angle: f64, center: &Pt) -> Option<DrawObject> {
    let c = cc.to_screen(center)?;
    let rot = DVec2::from_angle(angle);
    remap(obj, cc, |s| c + rot.rotate(s - c))
}

/// Screen position of every anchor, or `None` if any fails.
pub fn screen_points(pts: &[Pt], cc: &dyn CoordConverter) -> Option<Vec<DVec2>> {
    pts.iter().map(|p| cc.to_screen(p)).collect()
}

/// Mean screen position of the points, expressed in the first point's space.
pub fn centroid(pts: &[Pt], cc: &dyn CoordConverter) -> Option<Pt> {
    let first = pts.first()?;
    let screen = screen_points(pts, cc)?;
    let mid = screen.iter().copied().sum::<DVec2>() / screen.len() as f64;
    cc.convert(&Pt::screen(mid.x, mid.y), first.sys)
}

/// True when every point shares one coordinate space.
pub fn same_space(pts: &[Pt]) -> Option<CoordSys> {
    let first = pts.first()?.sys;
    pts.iter().all(|p| p.sys == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::LinearConverter;
    use crate::types::Dims;

    #[test]
    fn translate_keeps_space() {
        let cc = LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100));
        let obj = DrawObject::line(Pt::image(10.0, 10.0), Pt::image(20.0, 10.0));
        let moved = translated(&obj, &cc, DVec2::new(5.0, 5.0)).unwrap();
        // screen y grows downward, image y upward
        assert_eq!(moved.points(), vec![Pt::image(15.0, 5.0), Pt::image(25.0, 5.0)]);
    }

    #[test]
    fn rotate_quarter_turn() {
        let cc = LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100));
        let obj = DrawObject::point(Pt::screen(20.0, 10.0));
        let out = rotated(&obj, &cc, std::f64::consts::FRAC_PI_2, &Pt::screen(10.0, 10.0)).unwrap();
        let p = out.points()[0];
        assert!((p.x - 10.0).abs() < 1e-9 && (p.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn failed_conversion_gives_none() {
        let cc = LinearConverter::new(Dims::new(100, 100), Dims::new(100, 100));
        let obj = DrawObject::point(Pt::world(1.0, 1.0));
        assert!(translated(&obj, &cc, DVec2::ONE).is_none());
    }

    #[test]
    fn mixed_spaces() {
        assert_eq!(same_space(&[Pt::image(0.0, 0.0), Pt::image(1.0, 1.0)]), Some(CoordSys::Image));
        assert_eq!(same_space(&[Pt::image(0.0, 0.0), Pt::world(1.0, 1.0)]), None);
        assert_eq!(same_space(&[]), None);
    }
}
