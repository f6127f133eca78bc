/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 05/10/2026
Last Modified: 17/10/2026
License: MIT
*/

pub mod shapefile;

// exports identifiers from private sub-modules in the current module namespace
pub use crate::shapefile::attributes::{DbaseField, DbaseFile, DbaseHeader, FieldData, FieldType};
pub use crate::shapefile::feature::{Feature, RowState};
pub use crate::shapefile::geometry::*;
pub use crate::shapefile::header::ShapefileHeader;
pub use crate::shapefile::index::{IndexSlot, ShapeFileIndex};
pub use crate::shapefile::locale::TextEncoding;
pub use crate::shapefile::provider::ShapeFileProvider;
pub use crate::shapefile::reader::{FeatureFilter, ShapeFileDataReader};
