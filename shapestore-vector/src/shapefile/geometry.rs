/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 05/10/2026
Last Modified: 16/10/2026
License: MIT
*/
use shapestore_common::algorithms::is_clockwise_order;
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::{Bounded, BoundingBox, Point2D};
use std::fmt;
use std::str::FromStr;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
}

impl ShapeType {
    /// Maps an on-disk shape code to a ShapeType. Unknown codes are an
    /// `UnsupportedGeometryType` error; Z/M codes are recognized here and
    /// rejected by the codec.
    pub fn from_int(value: i32) -> Result<ShapeType> {
        let st = match value {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            _ => {
                return Err(ShapeError::UnsupportedGeometryType(format!(
                    "unrecognized shape type code {}",
                    value
                )))
            }
        };
        Ok(st)
    }

    pub fn to_int(&self) -> i32 {
        *self as u16 as i32
    }

    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            ShapeType::Null => ShapeType::Null,
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeType::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeType::MultiPoint
            }
        }
    }

    pub fn dimension(&self) -> ShapeTypeDimension {
        match self {
            ShapeType::Null
            | ShapeType::MultiPoint
            | ShapeType::Point
            | ShapeType::Polygon
            | ShapeType::PolyLine => ShapeTypeDimension::XY,
            ShapeType::MultiPointM
            | ShapeType::PointM
            | ShapeType::PolygonM
            | ShapeType::PolyLineM => ShapeTypeDimension::Measure,
            ShapeType::MultiPointZ
            | ShapeType::PointZ
            | ShapeType::PolygonZ
            | ShapeType::PolyLineZ => ShapeTypeDimension::Z,
        }
    }

    /// Returns an error for the measured and 3-D variants.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.dimension() != ShapeTypeDimension::XY {
            return Err(ShapeError::UnsupportedGeometryType(format!(
                "{} shapes are not supported",
                self
            )));
        }
        Ok(())
    }
}

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShapeTypeDimension {
    XY,
    Measure,
    Z,
}

impl Default for ShapeType {
    fn default() -> ShapeType {
        ShapeType::Null
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let printable = match *self {
            ShapeType::Null => "Null",
            ShapeType::Point => "Point",
            ShapeType::PolyLine => "PolyLine",
            ShapeType::Polygon => "Polygon",
            ShapeType::MultiPoint => "MultiPoint",
            ShapeType::PointZ => "PointZ",
            ShapeType::PolyLineZ => "PolyLineZ",
            ShapeType::PolygonZ => "PolygonZ",
            ShapeType::MultiPointZ => "MultiPointZ",
            ShapeType::PointM => "PointM",
            ShapeType::PolyLineM => "PolyLineM",
            ShapeType::PolygonM => "PolygonM",
            ShapeType::MultiPointM => "MultiPointM",
        };
        write!(f, "{}", printable)
    }
}

impl FromStr for ShapeType {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<ShapeType> {
        match s.trim().to_lowercase().as_str() {
            "point" => Ok(ShapeType::Point),
            "polyline" | "line" => Ok(ShapeType::PolyLine),
            "polygon" => Ok(ShapeType::Polygon),
            "multipoint" => Ok(ShapeType::MultiPoint),
            other => Err(ShapeError::UnsupportedGeometryType(format!(
                "'{}' is not a supported shape type",
                other
            ))),
        }
    }
}

/// The vertices and part-start indices of a PolyLine or Polygon record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPartShape {
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
}

pub type PolyLineShape = MultiPartShape;
pub type PolygonShape = MultiPartShape;

/// One ring of a polygon. Clockwise rings are exterior.
#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub points: Vec<Point2D>,
    pub is_exterior: bool,
}

/// An exterior ring and the holes that follow it in part order.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonGroup {
    pub exterior: Vec<Point2D>,
    pub holes: Vec<Vec<Point2D>>,
}

impl MultiPartShape {
    pub fn new() -> MultiPartShape {
        MultiPartShape::default()
    }

    /// Builds a shape with one part per slice.
    pub fn from_parts(parts: &[Vec<Point2D>]) -> MultiPartShape {
        let mut shape = MultiPartShape::new();
        for part in parts {
            shape.add_part(part);
        }
        shape
    }

    /// Adds a part of Point2Ds to the shape.
    pub fn add_part(&mut self, points: &[Point2D]) {
        self.parts.push(self.points.len() as i32);
        self.points.extend_from_slice(points);
    }

    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// The vertices of part `index`; the last part runs to the final vertex.
    pub fn part(&self, index: usize) -> &[Point2D] {
        let start = self.parts[index] as usize;
        let end = if index + 1 < self.parts.len() {
            self.parts[index + 1] as usize
        } else {
            self.points.len()
        };
        &self.points[start..end]
    }

    pub fn iter_parts(&self) -> impl Iterator<Item = &[Point2D]> + '_ {
        (0..self.parts.len()).map(move |i| self.part(i))
    }

    /// Checks that part starts are non-decreasing and lie within the vertex
    /// list.
    pub fn validate(&self) -> Result<()> {
        let n = self.points.len() as i32;
        let mut prev = 0i32;
        for (i, &start) in self.parts.iter().enumerate() {
            if start < 0 || start > n {
                return Err(ShapeError::ShapeFileCorrupt(format!(
                    "part {} starts at vertex {} but the shape has {} vertices",
                    i, start, n
                )));
            }
            if start < prev {
                return Err(ShapeError::ShapeFileCorrupt(format!(
                    "part {} starts at vertex {}, before the previous part ({})",
                    i, start, prev
                )));
            }
            prev = start;
        }
        if self.parts.is_empty() && n > 0 {
            return Err(ShapeError::ShapeFileCorrupt(
                "shape has vertices but no parts".to_string(),
            ));
        }
        Ok(())
    }

    /// Each part, classified by winding.
    pub fn rings(&self) -> Vec<Ring> {
        self.iter_parts()
            .map(|p| Ring {
                points: p.to_vec(),
                is_exterior: is_clockwise_order(p),
            })
            .collect()
    }

    /// Groups the rings into polygons. Every exterior ring starts a new
    /// polygon and the interior rings after it become its holes. A leading
    /// interior ring with no exterior before it is promoted to an exterior.
    pub fn polygons(&self) -> Vec<PolygonGroup> {
        let mut groups: Vec<PolygonGroup> = vec![];
        for ring in self.rings() {
            if ring.is_exterior || groups.is_empty() {
                groups.push(PolygonGroup {
                    exterior: ring.points,
                    holes: vec![],
                });
            } else if let Some(last) = groups.last_mut() {
                last.holes.push(ring.points);
            }
        }
        groups
    }
}

/// A decoded Shapefile record.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeRecord {
    Null,
    Point(Point2D),
    MultiPoint(Vec<Point2D>),
    PolyLine(PolyLineShape),
    Polygon(PolygonShape),
}

impl Default for ShapeRecord {
    fn default() -> ShapeRecord {
        ShapeRecord::Null
    }
}

impl ShapeRecord {
    pub fn point(x: f64, y: f64) -> ShapeRecord {
        ShapeRecord::Point(Point2D::new(x, y))
    }

    pub fn polyline(parts: &[Vec<Point2D>]) -> ShapeRecord {
        ShapeRecord::PolyLine(MultiPartShape::from_parts(parts))
    }

    pub fn polygon(rings: &[Vec<Point2D>]) -> ShapeRecord {
        ShapeRecord::Polygon(MultiPartShape::from_parts(rings))
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeRecord::Null => ShapeType::Null,
            ShapeRecord::Point(_) => ShapeType::Point,
            ShapeRecord::MultiPoint(_) => ShapeType::MultiPoint,
            ShapeRecord::PolyLine(_) => ShapeType::PolyLine,
            ShapeRecord::Polygon(_) => ShapeType::Polygon,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ShapeRecord::Null)
    }

    /// All vertices in storage order.
    pub fn vertices(&self) -> &[Point2D] {
        match self {
            ShapeRecord::Null => &[],
            ShapeRecord::Point(p) => std::slice::from_ref(p),
            ShapeRecord::MultiPoint(points) => points,
            ShapeRecord::PolyLine(shape) | ShapeRecord::Polygon(shape) => &shape.points,
        }
    }

    pub fn num_points(&self) -> usize {
        self.vertices().len()
    }

    pub fn num_parts(&self) -> usize {
        match self {
            ShapeRecord::PolyLine(shape) | ShapeRecord::Polygon(shape) => shape.num_parts(),
            _ => 0,
        }
    }
}

impl Bounded for ShapeRecord {
    /// The tight box around the record's vertices; empty for Null.
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices())
    }
}

impl fmt::Display for ShapeRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShapeRecord::Null => write!(f, "Null"),
            ShapeRecord::Point(p) => write!(f, "Point {}", p),
            _ => write!(
                f,
                "{} ({} parts, {} points, extent {})",
                self.shape_type(),
                self.num_parts(),
                self.num_points(),
                self.bounding_box()
            ),
        }
    }
}
