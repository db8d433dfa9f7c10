//! Shape definitions: circles, spheres and line segments.
//!
//! A [`Shape`] is immutable once built. Its sample count is computed during
//! construction with a counting scan; the voxels themselves are built on the
//! first render and cached, so a shape rejected by the budget never holds
//! them.

pub mod color;

pub use color::Rgb;

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::math::lattice::{cell_center, floor_to_lattice};
use crate::math::rotation::Tilt;
use crate::render::sink::{Sample, SampleSink};
use crate::voxelize::{
    build_circle, build_sphere, count_circle, count_sphere, line_length, rasterize_line, VoxelSet,
};

/// Largest accepted diameter. Bounds the scan before the budget is checked.
pub const MAX_DIAMETER: f64 = 256.0;

/// Largest accepted absolute coordinate. Keeps every voxel inside the lattice key range.
pub const MAX_COORDINATE: f64 = 1_000_000.0;

/// Largest accepted absolute rotation (degrees)
pub const MAX_ROTATION: f64 = 90.0;

/// Sample size used when the host does not configure one
pub const DEFAULT_SAMPLE_SIZE: f32 = 1.5;

/// Shape variant tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Circle,
    Sphere,
    Line,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Circle, ShapeKind::Sphere, ShapeKind::Line];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Line => "line",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ring or disk, authored in the X-Z plane then tilted
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: DVec3,
    pub diameter: f64,
    pub thickness: u32,
    /// Tilt about the local X axis (degrees)
    pub rot_x: f64,
    /// Spin about the Z axis, applied after `rot_x` (degrees)
    pub rot_z: f64,
}

impl Circle {
    /// One-block-thick flat circle
    pub fn new(center: DVec3, diameter: f64) -> Self {
        Self { center, diameter, thickness: 1, rot_x: 0.0, rot_z: 0.0 }
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_rotation(mut self, rot_x: f64, rot_z: f64) -> Self {
        self.rot_x = rot_x;
        self.rot_z = rot_z;
        self
    }
}

/// Ball or spherical shell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: DVec3,
    pub diameter: f64,
    pub thickness: u32,
}

impl Sphere {
    /// One-block-thick hollow sphere
    pub fn new(center: DVec3, diameter: f64) -> Self {
        Self { center, diameter, thickness: 1 }
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness;
        self
    }
}

/// Segment between two points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub start: DVec3,
    pub end: DVec3,
}

impl Line {
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self { start, end }
    }
}

/// Geometry of a shape, tagged by kind
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    Circle(Circle),
    Sphere(Sphere),
    Line(Line),
}

impl From<Circle> for Geometry {
    fn from(c: Circle) -> Self {
        Geometry::Circle(c)
    }
}

impl From<Sphere> for Geometry {
    fn from(s: Sphere) -> Self {
        Geometry::Sphere(s)
    }
}

impl From<Line> for Geometry {
    fn from(l: Line) -> Self {
        Geometry::Line(l)
    }
}

fn check_point(p: DVec3) -> Result<()> {
    for c in p.to_array() {
        if !c.is_finite() || c.abs() > MAX_COORDINATE {
            return Err(Error::CoordinateOutOfRange(c));
        }
    }
    Ok(())
}

fn check_diameter(diameter: f64) -> Result<()> {
    if diameter.is_finite() && diameter > 0.0 && diameter <= MAX_DIAMETER {
        Ok(())
    } else {
        Err(Error::InvalidDiameter(diameter))
    }
}

fn check_thickness(thickness: u32) -> Result<()> {
    if thickness >= 1 {
        Ok(())
    } else {
        Err(Error::InvalidThickness(i64::from(thickness)))
    }
}

fn check_rotation(axis: char, degrees: f64) -> Result<()> {
    if (-MAX_ROTATION..=MAX_ROTATION).contains(&degrees) {
        Ok(())
    } else {
        Err(Error::RotationOutOfRange { axis, degrees })
    }
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Circle(_) => ShapeKind::Circle,
            Geometry::Sphere(_) => ShapeKind::Sphere,
            Geometry::Line(_) => ShapeKind::Line,
        }
    }

    /// Reject parameters that cannot be voxelized
    pub fn validate(&self) -> Result<()> {
        match self {
            Geometry::Circle(c) => {
                check_point(c.center)?;
                check_diameter(c.diameter)?;
                check_thickness(c.thickness)?;
                check_rotation('X', c.rot_x)?;
                check_rotation('Z', c.rot_z)
            }
            Geometry::Sphere(s) => {
                check_point(s.center)?;
                check_diameter(s.diameter)?;
                check_thickness(s.thickness)
            }
            Geometry::Line(l) => {
                check_point(l.start)?;
                check_point(l.end)
            }
        }
    }

    /// Samples the voxelized geometry emits, without building it
    fn count(&self) -> u64 {
        match self {
            Geometry::Circle(c) => {
                let tilt = Tilt::from_degrees(c.rot_x, c.rot_z);
                count_circle(c.diameter, c.thickness, &tilt)
            }
            Geometry::Sphere(s) => count_sphere(s.diameter, s.thickness),
            Geometry::Line(l) => line_length(floor_to_lattice(l.start), floor_to_lattice(l.end)),
        }
    }

    fn voxelize(&self) -> VoxelSet {
        match self {
            Geometry::Circle(c) => {
                let tilt = Tilt::from_degrees(c.rot_x, c.rot_z);
                build_circle(c.center, c.diameter, c.thickness, &tilt)
            }
            Geometry::Sphere(s) => build_sphere(s.center, s.diameter, s.thickness),
            Geometry::Line(l) => VoxelSet::from_path(rasterize_line(
                floor_to_lattice(l.start),
                floor_to_lattice(l.end),
            )),
        }
    }
}

/// A validated, voxelized shape anchored in a world
#[derive(Clone, Debug)]
pub struct Shape {
    world: String,
    color: Rgb,
    geometry: Geometry,
    samples: u64,
    voxels: Arc<OnceLock<VoxelSet>>,
}

impl Shape {
    /// Validate and count samples. Voxels are built on first use.
    pub fn new(world: impl Into<String>, color: Rgb, geometry: impl Into<Geometry>) -> Result<Self> {
        let geometry = geometry.into();
        geometry.validate()?;
        let samples = geometry.count();
        Ok(Self {
            world: world.into(),
            color,
            geometry,
            samples,
            voxels: Arc::new(OnceLock::new()),
        })
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Voxels of this shape, built and cached on the first call
    pub fn voxels(&self) -> &VoxelSet {
        self.voxels.get_or_init(|| {
            let set = self.geometry.voxelize();
            debug_assert_eq!(set.sample_count(), self.samples);
            set
        })
    }

    /// Whether the voxels have been built yet
    pub fn is_voxelized(&self) -> bool {
        self.voxels.get().is_some()
    }

    /// Samples this shape emits per render, which is also its budget cost
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Emit one sample per voxel. Stops at the first sink failure.
    pub fn render(&self, sink: &dyn SampleSink, size: f32) -> Result<u64> {
        let mut emitted = 0;
        for voxel in self.voxels().iter() {
            sink.spawn_sample(&Sample {
                world: &self.world,
                position: cell_center(voxel),
                color: self.color,
                size,
            })?;
            emitted += 1;
        }
        Ok(emitted)
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.world == other.world && self.color == other.color && self.geometry == other.geometry
    }
}
