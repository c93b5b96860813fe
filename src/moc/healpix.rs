//! Nested HEALPix indexing.
//!
//! Only what the culler needs: NUNIQ packing, ancestors, pixel lookup for a
//! sky position and the four corners of a cell. Positions are (lon, lat) in
//! degrees.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;

use crate::errors::MocError;

/// Deepest order a 64-bit NUNIQ can hold
pub const MAX_ORDER: u8 = 29;

const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

pub fn nside(order: u8) -> u64 {
    1u64 << order
}

/// Number of cells at `order`
pub fn npix_count(order: u8) -> u64 {
    12u64 << (2 * u32::from(order))
}

/// Pack an (order, npix) pair.
pub fn nuniq(order: u8, npix: u64) -> u64 {
    (4u64 << (2 * u32::from(order))) + npix
}

/// Unpack a NUNIQ value into (order, npix).
pub fn decode_nuniq(value: u64) -> Result<(u8, u64), MocError> {
    if value < 4 {
        return Err(MocError::InvalidNuniq { value });
    }
    // the order is the position of the leading bit pair above the base 4
    let order = (63 - value.leading_zeros()) / 2 - 1;
    if order > u32::from(MAX_ORDER) {
        return Err(MocError::OrderOutOfRange {
            order: order as u8,
            max: MAX_ORDER,
        });
    }
    let order = order as u8;
    let npix = value - (4u64 << (2 * u32::from(order)));
    if npix >= npix_count(order) {
        return Err(MocError::PixelOutOfRange { order, npix });
    }
    Ok((order, npix))
}

/// Check an (order, npix) pair.
pub fn validate(order: u8, npix: u64) -> Result<(), MocError> {
    if order > MAX_ORDER {
        return Err(MocError::OrderOutOfRange { order, max: MAX_ORDER });
    }
    if npix >= npix_count(order) {
        return Err(MocError::PixelOutOfRange { order, npix });
    }
    Ok(())
}

/// The cell at `to_order` containing `npix`. `to_order` must not exceed `order`.
pub fn ancestor(order: u8, npix: u64, to_order: u8) -> u64 {
    npix >> (2 * u32::from(order.saturating_sub(to_order)))
}

// ============================================================================
// Bit interleaving
// ============================================================================

fn spread_bits(v: u64) -> u64 {
    let mut v = v & 0xffff_ffff;
    v = (v | (v << 16)) & 0x0000_ffff_0000_ffff;
    v = (v | (v << 8)) & 0x00ff_00ff_00ff_00ff;
    v = (v | (v << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    (v | (v << 1)) & 0x5555_5555_5555_5555
}

fn compress_bits(v: u64) -> u64 {
    let mut v = v & 0x5555_5555_5555_5555;
    v = (v | (v >> 1)) & 0x3333_3333_3333_3333;
    v = (v | (v >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    v = (v | (v >> 4)) & 0x00ff_00ff_00ff_00ff;
    v = (v | (v >> 8)) & 0x0000_ffff_0000_ffff;
    (v | (v >> 16)) & 0x0000_0000_ffff_ffff
}

fn xyf2nest(order: u8, ix: u64, iy: u64, face: u64) -> u64 {
    (face << (2 * u32::from(order))) + spread_bits(ix) + (spread_bits(iy) << 1)
}

fn nest2xyf(order: u8, npix: u64) -> (u64, u64, usize) {
    let face = npix >> (2 * u32::from(order));
    let local = npix & ((1u64 << (2 * u32::from(order))) - 1);
    (compress_bits(local), compress_bits(local >> 1), face as usize)
}

// ============================================================================
// Positions
// ============================================================================

/// Cell containing a (lon, lat) position.
pub fn ang2pix(order: u8, lonlat: DVec2) -> u64 {
    let ns = nside(order) as i64;
    let z = lonlat.y.clamp(-90.0, 90.0).to_radians().sin();
    let za = z.abs();
    let tt = (lonlat.x.to_radians() / FRAC_PI_2).rem_euclid(4.0);

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * (z * 0.75);
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp >> order;
        let ifm = jm >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        (face, jm & (ns - 1), ns - (jp & (ns - 1)) - 1)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z >= 0.0 {
            (ntt, ns - jm - 1, ns - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };
    xyf2nest(order, ix as u64, iy as u64, face as u64)
}

/// Position of a fractional (x, y) on a base face, both in [0, 1].
fn xyf2loc(x: f64, y: f64, face: usize) -> DVec2 {
    let jr = JRLL[face] as f64 - x - y;
    let (nr, z) = if jr < 1.0 {
        (jr, 1.0 - jr * jr / 3.0)
    } else if jr > 3.0 {
        let nr = 4.0 - jr;
        (nr, nr * nr / 3.0 - 1.0)
    } else {
        (1.0, (2.0 - jr) * 2.0 / 3.0)
    };
    let mut tmp = JPLL[face] as f64 * nr + x - y;
    if tmp < 0.0 {
        tmp += 8.0;
    }
    if tmp >= 8.0 {
        tmp -= 8.0;
    }
    let phi = if nr < 1e-15 { 0.0 } else { 0.5 * FRAC_PI_2 * tmp / nr };
    DVec2::new(phi.to_degrees().rem_euclid(360.0), z.clamp(-1.0, 1.0).asin().to_degrees())
}

/// Corners of a cell in N, W, S, E order.
pub fn corners(order: u8, npix: u64) -> [DVec2; 4] {
    let (ix, iy, face) = nest2xyf(order, npix);
    let ns = nside(order) as f64;
    let xc = (ix as f64 + 0.5) / ns;
    let yc = (iy as f64 + 0.5) / ns;
    let dc = 0.5 / ns;
    [
        xyf2loc(xc + dc, yc + dc, face),
        xyf2loc(xc - dc, yc + dc, face),
        xyf2loc(xc - dc, yc - dc, face),
        xyf2loc(xc + dc, yc - dc, face),
    ]
}

/// Center of a cell.
pub fn center(order: u8, npix: u64) -> DVec2 {
    let (ix, iy, face) = nest2xyf(order, npix);
    let ns = nside(order) as f64;
    xyf2loc((ix as f64 + 0.5) / ns, (iy as f64 + 0.5) / ns, face)
}

/// Approximate cell width in degrees.
pub fn cell_size_deg(order: u8) -> f64 {
    (4.0 * PI / npix_count(order) as f64).sqrt().to_degrees()
}

/// HiPS order whose 512-pixel tiles best match `deg_per_pixel`.
pub fn hips_order_for(deg_per_pixel: f64) -> u8 {
    if !(deg_per_pixel.is_finite() && deg_per_pixel > 0.0) {
        return 0;
    }
    let order = (cell_size_deg(0) / (512.0 * deg_per_pixel)).log2().round();
    order.clamp(0.0, f64::from(MAX_ORDER - 9)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nuniq_round_trips_edges() {
        assert_eq!(nuniq(0, 0), 4);
        assert_eq!(decode_nuniq(4).unwrap(), (0, 0));
        assert_eq!(decode_nuniq(15).unwrap(), (0, 11));
        assert_eq!(decode_nuniq(16).unwrap(), (1, 0));
        assert_eq!(decode_nuniq(nuniq(29, 12)).unwrap(), (29, 12));
    }

    #[test]
    fn bad_nuniq_is_rejected() {
        assert!(matches!(decode_nuniq(3), Err(MocError::InvalidNuniq { value: 3 })));
        assert!(matches!(decode_nuniq(u64::MAX), Err(MocError::OrderOutOfRange { .. })));
        assert!(validate(1, 48).is_err());
        assert!(validate(1, 47).is_ok());
    }

    #[test]
    fn ancestor_drops_two_bits_per_order() {
        assert_eq!(ancestor(3, 0b10_11_01, 1), 0b10);
        assert_eq!(ancestor(2, 7, 2), 7);
    }

    #[test]
    fn bit_interleave_inverts() {
        for v in [0u64, 1, 5, 0xabcd, 0xffff_ffff] {
            assert_eq!(compress_bits(spread_bits(v)), v);
        }
    }

    #[test]
    fn base_pixel_lookup() {
        // north polar cap, equatorial belt, south polar cap
        assert_eq!(ang2pix(0, DVec2::new(45.0, 60.0)), 0);
        assert_eq!(ang2pix(0, DVec2::new(0.0, 0.0)), 4);
        assert_eq!(ang2pix(0, DVec2::new(45.0, -60.0)), 8);
    }

    #[test]
    fn center_maps_back_to_cell() {
        for order in [0u8, 1, 3, 6] {
            for npix in [0, npix_count(order) / 3, npix_count(order) - 1] {
                assert_eq!(ang2pix(order, center(order, npix)), npix, "order {order} npix {npix}");
            }
        }
    }

    #[test]
    fn base_cell_zero_corners() {
        let c = corners(0, 0);
        // north corner is the pole
        assert!((c[0].y - 90.0).abs() < 1e-9);
        // south corner sits on the equator at lon 45
        assert!(c[2].y.abs() < 1e-9);
        assert!((c[2].x - 45.0).abs() < 1e-9);
    }

    #[test]
    fn hips_order_grows_with_resolution() {
        assert!(hips_order_for(0.001) > hips_order_for(0.1));
        assert_eq!(hips_order_for(f64::NAN), 0);
    }
}
