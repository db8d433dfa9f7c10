//! On-disk schema for one owner's shapes.
//!
//! ```json
//! {
//!   "circles": { "<name>": { "world", "x", "y", "z", "diameter", "thickness", "color", "rotX", "rotZ" } },
//!   "spheres": { "<name>": { "world", "x", "y", "z", "diameter", "thickness", "color" } },
//!   "lines":   { "<name>": { "world", "start": { "x", "y", "z" }, "end": { .. }, "color" } }
//! }
//! ```
//!
//! `color` is a packed `0xRRGGBB` integer. Missing sections mean no shapes of
//! that kind.
//!
//! Records are decoded one at a time. A record that does not fit its schema
//! is kept as raw JSON in [`UnreadableRecords`] and written back unchanged, so
//! one damaged entry never costs the rest of the file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::shape::{Circle, Geometry, Line, Rgb, Shape, ShapeKind, Sphere};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircleRecord {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diameter: f64,
    pub thickness: i64,
    pub color: u32,
    #[serde(rename = "rotX", default)]
    pub rot_x: f64,
    #[serde(rename = "rotZ", default)]
    pub rot_z: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereRecord {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diameter: f64,
    pub thickness: i64,
    pub color: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<DVec3> for PointRecord {
    fn from(p: DVec3) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

impl From<PointRecord> for DVec3 {
    fn from(p: PointRecord) -> Self {
        DVec3::new(p.x, p.y, p.z)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub world: String,
    pub start: PointRecord,
    pub end: PointRecord,
    pub color: u32,
}

/// Persisted form of a single shape
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeRecord {
    Circle(CircleRecord),
    Sphere(SphereRecord),
    Line(LineRecord),
}

fn thickness_from_record(thickness: i64) -> Result<u32> {
    u32::try_from(thickness)
        .ok()
        .filter(|&t| t >= 1)
        .ok_or(Error::InvalidThickness(thickness))
}

impl ShapeRecord {
    pub fn from_shape(shape: &Shape) -> Self {
        let world = shape.world().to_string();
        let color = shape.color().packed();
        match *shape.geometry() {
            Geometry::Circle(c) => ShapeRecord::Circle(CircleRecord {
                world,
                x: c.center.x,
                y: c.center.y,
                z: c.center.z,
                diameter: c.diameter,
                thickness: i64::from(c.thickness),
                color,
                rot_x: c.rot_x,
                rot_z: c.rot_z,
            }),
            Geometry::Sphere(s) => ShapeRecord::Sphere(SphereRecord {
                world,
                x: s.center.x,
                y: s.center.y,
                z: s.center.z,
                diameter: s.diameter,
                thickness: i64::from(s.thickness),
                color,
            }),
            Geometry::Line(l) => ShapeRecord::Line(LineRecord {
                world,
                start: l.start.into(),
                end: l.end.into(),
                color,
            }),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeRecord::Circle(_) => ShapeKind::Circle,
            ShapeRecord::Sphere(_) => ShapeKind::Sphere,
            ShapeRecord::Line(_) => ShapeKind::Line,
        }
    }

    pub fn world(&self) -> &str {
        match self {
            ShapeRecord::Circle(r) => &r.world,
            ShapeRecord::Sphere(r) => &r.world,
            ShapeRecord::Line(r) => &r.world,
        }
    }

    /// Rebuild the live shape, validating every field
    pub fn to_shape(&self) -> Result<Shape> {
        match self {
            ShapeRecord::Circle(r) => {
                let circle = Circle::new(DVec3::new(r.x, r.y, r.z), r.diameter)
                    .with_thickness(thickness_from_record(r.thickness)?)
                    .with_rotation(r.rot_x, r.rot_z);
                Shape::new(r.world.clone(), Rgb::from_packed(r.color)?, circle)
            }
            ShapeRecord::Sphere(r) => {
                let sphere = Sphere::new(DVec3::new(r.x, r.y, r.z), r.diameter)
                    .with_thickness(thickness_from_record(r.thickness)?);
                Shape::new(r.world.clone(), Rgb::from_packed(r.color)?, sphere)
            }
            ShapeRecord::Line(r) => {
                let line = Line::new(r.start.into(), r.end.into());
                Shape::new(r.world.clone(), Rgb::from_packed(r.color)?, line)
            }
        }
    }
}

/// Raw JSON of records that could not be decoded, keyed like the document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnreadableRecords {
    pub circles: BTreeMap<String, Value>,
    pub spheres: BTreeMap<String, Value>,
    pub lines: BTreeMap<String, Value>,
}

impl UnreadableRecords {
    fn section(&self, kind: ShapeKind) -> &BTreeMap<String, Value> {
        match kind {
            ShapeKind::Circle => &self.circles,
            ShapeKind::Sphere => &self.spheres,
            ShapeKind::Line => &self.lines,
        }
    }

    fn section_mut(&mut self, kind: ShapeKind) -> &mut BTreeMap<String, Value> {
        match kind {
            ShapeKind::Circle => &mut self.circles,
            ShapeKind::Sphere => &mut self.spheres,
            ShapeKind::Line => &mut self.lines,
        }
    }

    pub fn len(&self) -> usize {
        self.circles.len() + self.spheres.len() + self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything stored for one owner
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument", into = "RawDocument")]
pub struct OwnerDocument {
    pub circles: BTreeMap<String, CircleRecord>,
    pub spheres: BTreeMap<String, SphereRecord>,
    pub lines: BTreeMap<String, LineRecord>,
    /// Kept verbatim; never instantiated
    pub unreadable: UnreadableRecords,
}

/// File layout with every record still undecoded
#[derive(Default, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    circles: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    spheres: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    lines: BTreeMap<String, Value>,
}

fn decode_section<R: serde::de::DeserializeOwned>(
    kind: ShapeKind,
    raw: BTreeMap<String, Value>,
    unreadable: &mut BTreeMap<String, Value>,
) -> BTreeMap<String, R> {
    let mut records = BTreeMap::new();
    for (name, value) in raw {
        match R::deserialize(&value) {
            Ok(record) => {
                records.insert(name, record);
            }
            Err(e) => {
                log::warn!("Keeping unreadable {kind} '{name}' as stored: {e}");
                unreadable.insert(name, value);
            }
        }
    }
    records
}

fn encode_section<R: Serialize>(
    kind: ShapeKind,
    records: BTreeMap<String, R>,
    unreadable: BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut raw = BTreeMap::new();
    for (name, record) in records {
        match serde_json::to_value(&record) {
            Ok(value) => {
                raw.insert(name, value);
            }
            Err(e) => log::error!("Cannot encode {kind} '{name}': {e}"),
        }
    }
    for (name, value) in unreadable {
        raw.entry(name).or_insert(value);
    }
    raw
}

impl From<RawDocument> for OwnerDocument {
    fn from(raw: RawDocument) -> Self {
        let mut unreadable = UnreadableRecords::default();
        let circles = decode_section(ShapeKind::Circle, raw.circles, &mut unreadable.circles);
        let spheres = decode_section(ShapeKind::Sphere, raw.spheres, &mut unreadable.spheres);
        let lines = decode_section(ShapeKind::Line, raw.lines, &mut unreadable.lines);
        Self { circles, spheres, lines, unreadable }
    }
}

impl From<OwnerDocument> for RawDocument {
    fn from(doc: OwnerDocument) -> Self {
        let unreadable = doc.unreadable;
        Self {
            circles: encode_section(ShapeKind::Circle, doc.circles, unreadable.circles),
            spheres: encode_section(ShapeKind::Sphere, doc.spheres, unreadable.spheres),
            lines: encode_section(ShapeKind::Line, doc.lines, unreadable.lines),
        }
    }
}

impl OwnerDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any record of the same kind and name
    pub fn insert(&mut self, name: impl Into<String>, record: ShapeRecord) {
        let name = name.into();
        self.unreadable.section_mut(record.kind()).remove(&name);
        match record {
            ShapeRecord::Circle(r) => {
                self.circles.insert(name, r);
            }
            ShapeRecord::Sphere(r) => {
                self.spheres.insert(name, r);
            }
            ShapeRecord::Line(r) => {
                self.lines.insert(name, r);
            }
        }
    }

    /// Remove a record, readable or not. Returns true if one was present.
    pub fn remove(&mut self, kind: ShapeKind, name: &str) -> bool {
        let raw = self.unreadable.section_mut(kind).remove(name).is_some();
        let typed = match kind {
            ShapeKind::Circle => self.circles.remove(name).is_some(),
            ShapeKind::Sphere => self.spheres.remove(name).is_some(),
            ShapeKind::Line => self.lines.remove(name).is_some(),
        };
        raw || typed
    }

    /// Remove every record of one kind
    pub fn clear_kind(&mut self, kind: ShapeKind) {
        self.unreadable.section_mut(kind).clear();
        match kind {
            ShapeKind::Circle => self.circles.clear(),
            ShapeKind::Sphere => self.spheres.clear(),
            ShapeKind::Line => self.lines.clear(),
        }
    }

    /// Whether any record of `kind` is held
    pub fn has_kind(&self, kind: ShapeKind) -> bool {
        let typed = match kind {
            ShapeKind::Circle => !self.circles.is_empty(),
            ShapeKind::Sphere => !self.spheres.is_empty(),
            ShapeKind::Line => !self.lines.is_empty(),
        };
        typed || !self.unreadable.section(kind).is_empty()
    }

    pub fn len(&self) -> usize {
        self.circles.len() + self.spheres.len() + self.lines.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten the decoded records into `(name, record)` pairs, circles first.
    /// Unreadable records are returned separately.
    pub fn into_records(self) -> (Vec<(String, ShapeRecord)>, UnreadableRecords) {
        let circles = self.circles.into_iter().map(|(n, r)| (n, ShapeRecord::Circle(r)));
        let spheres = self.spheres.into_iter().map(|(n, r)| (n, ShapeRecord::Sphere(r)));
        let lines = self.lines.into_iter().map(|(n, r)| (n, ShapeRecord::Line(r)));
        (circles.chain(spheres).chain(lines).collect(), self.unreadable)
    }

    /// Copy every record of `other` whose kind and name has no counterpart here
    pub fn merge_missing(&mut self, other: &OwnerDocument) {
        for (name, r) in &other.circles {
            if !self.contains(ShapeKind::Circle, name) {
                self.circles.insert(name.clone(), r.clone());
            }
        }
        for (name, r) in &other.spheres {
            if !self.contains(ShapeKind::Sphere, name) {
                self.spheres.insert(name.clone(), r.clone());
            }
        }
        for (name, r) in &other.lines {
            if !self.contains(ShapeKind::Line, name) {
                self.lines.insert(name.clone(), r.clone());
            }
        }
        for kind in ShapeKind::ALL {
            for (name, value) in other.unreadable.section(kind) {
                if !self.contains(kind, name) {
                    self.unreadable.section_mut(kind).insert(name.clone(), value.clone());
                }
            }
        }
    }

    fn contains(&self, kind: ShapeKind, name: &str) -> bool {
        let typed = match kind {
            ShapeKind::Circle => self.circles.contains_key(name),
            ShapeKind::Sphere => self.spheres.contains_key(name),
            ShapeKind::Line => self.lines.contains_key(name),
        };
        typed || self.unreadable.section(kind).contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_hand_written_file() {
        let json = r#"{
            "circles": {
                "ring": { "world": "world", "x": 0.5, "y": 64.0, "z": -3.0,
                          "diameter": 10.0, "thickness": 1, "color": 65280,
                          "rotX": 45.0, "rotZ": 0.0 }
            },
            "lines": {
                "beam": { "world": "world_nether",
                          "start": { "x": 0.0, "y": 0.0, "z": 0.0 },
                          "end": { "x": 3.0, "y": 4.0, "z": 0.0 },
                          "color": 16711680 }
            }
        }"#;
        let doc: OwnerDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.len(), 2);
        assert!(doc.spheres.is_empty());

        let ring = ShapeRecord::Circle(doc.circles["ring"].clone()).to_shape().unwrap();
        assert_eq!(ring.color(), Rgb::LIME);
        match ring.geometry() {
            Geometry::Circle(c) => assert_eq!(c.rot_x, 45.0),
            other => panic!("unexpected geometry {other:?}"),
        }

        let beam = ShapeRecord::Line(doc.lines["beam"].clone()).to_shape().unwrap();
        assert_eq!(beam.world(), "world_nether");
        assert_eq!(beam.sample_count(), 5);
    }

    #[test]
    fn test_empty_sections_not_written() {
        let mut doc = OwnerDocument::new();
        let sphere = Shape::new("world", Rgb::BLUE, Sphere::new(DVec3::ZERO, 4.0)).unwrap();
        doc.insert("ball", ShapeRecord::from_shape(&sphere));

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"spheres\""));
        assert!(!json.contains("\"circles\""));
        assert!(!json.contains("\"lines\""));
    }

    #[test]
    fn test_record_preserves_shape() {
        let circle = Circle::new(DVec3::new(1.25, 70.0, -8.5), 12.0)
            .with_thickness(3)
            .with_rotation(-30.0, 15.0);
        let shape = Shape::new("world", Rgb::TEAL, circle).unwrap();
        let rebuilt = ShapeRecord::from_shape(&shape).to_shape().unwrap();
        assert_eq!(rebuilt, shape);
        assert_eq!(rebuilt.sample_count(), shape.sample_count());
    }

    #[test]
    fn test_invalid_record_rejected() {
        let record = ShapeRecord::Sphere(SphereRecord {
            world: "world".into(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            diameter: 4.0,
            thickness: -2,
            color: 0,
        });
        assert!(matches!(record.to_shape(), Err(Error::InvalidThickness(-2))));
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let a = Shape::new("world", Rgb::RED, Line::new(DVec3::ZERO, DVec3::X)).unwrap();
        let b = Shape::new("old", Rgb::BLUE, Line::new(DVec3::ZERO, DVec3::Y)).unwrap();

        let mut live = OwnerDocument::new();
        live.insert("l1", ShapeRecord::from_shape(&a));
        let mut dormant = OwnerDocument::new();
        dormant.insert("l1", ShapeRecord::from_shape(&b));
        dormant.insert("l2", ShapeRecord::from_shape(&b));

        live.merge_missing(&dormant);
        assert_eq!(live.lines.len(), 2);
        assert_eq!(live.lines["l1"].world, "world");
        assert_eq!(live.lines["l2"].world, "old");
    }

    #[test]
    fn test_damaged_record_kept_verbatim() {
        let json = r#"{
            "lines": {
                "good": { "world": "world",
                          "start": { "x": 0.0, "y": 0.0, "z": 0.0 },
                          "end": { "x": 2.0, "y": 0.0, "z": 0.0 },
                          "color": 255 },
                "bad": { "world": "world",
                         "start": { "x": 0.0, "y": 0.0, "z": 0.0 },
                         "end": { "x": 1.0, "y": 0.0, "z": 0.0 } }
            },
            "spheres": {
                "odd": { "world": "world", "x": "ten", "y": 0.0, "z": 0.0,
                         "diameter": 4.0, "thickness": 1, "color": 0 }
            }
        }"#;
        let doc: OwnerDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.lines.len(), 1);
        assert!(doc.lines.contains_key("good"));
        assert!(doc.unreadable.lines.contains_key("bad"));
        assert!(doc.spheres.is_empty());
        assert!(doc.unreadable.spheres.contains_key("odd"));
        assert_eq!(doc.len(), 3);

        // Written back unchanged next to the decoded record
        let written: Value = serde_json::to_value(&doc).unwrap();
        let original: Value = serde_json::from_str(json).unwrap();
        assert_eq!(written["lines"]["bad"], original["lines"]["bad"]);
        assert_eq!(written["spheres"]["odd"], original["spheres"]["odd"]);
        assert_eq!(written["lines"]["good"]["color"], 255);
    }

    #[test]
    fn test_insert_replaces_unreadable_record() {
        let doc_json = r#"{ "lines": { "beam": { "world": 7 } } }"#;
        let mut doc: OwnerDocument = serde_json::from_str(doc_json).unwrap();
        assert!(doc.has_kind(ShapeKind::Line));

        let line = Shape::new("world", Rgb::RED, Line::new(DVec3::ZERO, DVec3::X)).unwrap();
        doc.insert("beam", ShapeRecord::from_shape(&line));
        assert!(doc.unreadable.is_empty());
        assert_eq!(doc.len(), 1);

        assert!(doc.remove(ShapeKind::Line, "beam"));
        assert!(!doc.has_kind(ShapeKind::Line));
    }
}
