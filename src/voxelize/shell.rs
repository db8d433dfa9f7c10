//! Shell membership tests for disks, rings, balls and spherical shells.
//!
//! All comparisons use squared distances. A thickness at least as large as
//! the radius selects the filled variant; otherwise only the band between
//! `radius - thickness` and `radius` is kept.

/// Whether the squared distance `d2` lies in the band of a shape with the
/// given radius and thickness
#[inline]
pub fn within_band(d2: f64, radius: f64, thickness: u32) -> bool {
    let thickness = f64::from(thickness);
    let r2 = radius * radius;
    if thickness >= radius {
        return d2 <= r2;
    }
    let inner = radius - thickness;
    d2 >= inner * inner && d2 <= r2
}

/// Flat-plane offset `(dx, dz)` on a disk or ring
#[inline]
pub fn on_disk_shell(dx: i32, dz: i32, radius: f64, thickness: u32) -> bool {
    let (dx, dz) = (i64::from(dx), i64::from(dz));
    within_band((dx * dx + dz * dz) as f64, radius, thickness)
}

/// Offset `(dx, dy, dz)` on a ball or spherical shell
#[inline]
pub fn on_sphere_shell(dx: i32, dy: i32, dz: i32, radius: f64, thickness: u32) -> bool {
    let (dx, dy, dz) = (i64::from(dx), i64::from(dy), i64::from(dz));
    within_band((dx * dx + dy * dy + dz * dz) as f64, radius, thickness)
}
