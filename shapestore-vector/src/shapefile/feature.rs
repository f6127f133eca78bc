/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 08/10/2026
Last Modified: 15/10/2026
License: MIT
*/
use super::attributes::FieldData;
use super::geometry::ShapeRecord;
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::{Bounded, BoundingBox};
use std::fmt;

/// Where a feature stands relative to the file it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowState {
    /// Not yet attached to any provider.
    Detached,
    /// Created by a provider but not yet inserted.
    Added,
    Unchanged,
    Modified,
}

/// A geometry plus its attribute row.
#[derive(Clone, Debug)]
pub struct Feature {
    oid: Option<u32>,
    geometry: ShapeRecord,
    attributes: Vec<FieldData>,
    state: RowState,
    geometry_changed: bool,
    attributes_changed: bool,
}

impl Feature {
    pub fn new(geometry: ShapeRecord, attributes: Vec<FieldData>) -> Feature {
        Feature {
            oid: None,
            geometry,
            attributes,
            state: RowState::Detached,
            geometry_changed: false,
            attributes_changed: false,
        }
    }

    pub(crate) fn added(num_fields: usize) -> Feature {
        Feature {
            attributes: vec![FieldData::Null; num_fields],
            state: RowState::Added,
            ..Feature::new(ShapeRecord::Null, vec![])
        }
    }

    pub(crate) fn from_store(oid: u32, geometry: ShapeRecord, attributes: Vec<FieldData>) -> Feature {
        Feature {
            oid: Some(oid),
            state: RowState::Unchanged,
            ..Feature::new(geometry, attributes)
        }
    }

    /// The feature id, once the feature has been stored.
    pub fn oid(&self) -> Option<u32> {
        self.oid
    }

    pub fn geometry(&self) -> &ShapeRecord {
        &self.geometry
    }

    pub fn attributes(&self) -> &[FieldData] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> Option<&FieldData> {
        self.attributes.get(index)
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn geometry_changed(&self) -> bool {
        self.geometry_changed
    }

    pub fn attributes_changed(&self) -> bool {
        self.attributes_changed
    }

    pub fn set_geometry(&mut self, geometry: ShapeRecord) {
        self.geometry = geometry;
        self.geometry_changed = true;
        self.touch();
    }

    pub fn set_attribute(&mut self, index: usize, value: FieldData) -> Result<()> {
        match self.attributes.get_mut(index) {
            Some(slot) => *slot = value,
            None => {
                return Err(ShapeError::InvalidOperation(format!(
                    "attribute index {} is out of range ({} fields)",
                    index,
                    self.attributes.len()
                )))
            }
        }
        self.attributes_changed = true;
        self.touch();
        Ok(())
    }

    pub fn set_attributes(&mut self, values: Vec<FieldData>) {
        self.attributes = values;
        self.attributes_changed = true;
        self.touch();
    }

    /// Clears the change flags after the feature has been written.
    pub fn accept_changes(&mut self) {
        self.state = RowState::Unchanged;
        self.geometry_changed = false;
        self.attributes_changed = false;
    }

    pub(crate) fn mark_inserted(&mut self, oid: u32) {
        self.oid = Some(oid);
        self.accept_changes();
    }

    fn touch(&mut self) {
        if self.state == RowState::Unchanged {
            self.state = RowState::Modified;
        }
    }
}

impl Bounded for Feature {
    fn bounding_box(&self) -> BoundingBox {
        self.geometry.bounding_box()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.oid {
            Some(oid) => write!(f, "FID {}: {}", oid, self.geometry)?,
            None => write!(f, "FID -: {}", self.geometry)?,
        }
        for value in &self.attributes {
            write!(f, ", {}", value)?;
        }
        Ok(())
    }
}
