/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 10/10/2026
Last Modified: 16/10/2026
License: MIT
*/
use super::attributes::{DbaseFile, FieldData};
use super::codec::read_record;
use super::feature::Feature;
use super::geometry::ShapeType;
use super::index::IndexSlot;
use shapestore_common::error::Result;
use shapestore_common::structures::{Bounded, BoundingBox};
use std::fs::File;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::vec;
use tracing::warn;

/// A row predicate applied after the box test.
pub type FeatureFilter = Arc<dyn Fn(&Feature) -> bool + Send + Sync>;

/// Holds a provider's single reader slot; releases it when dropped.
pub(crate) struct ReaderGuard(Arc<AtomicBool>);

impl ReaderGuard {
    /// Claims the slot, or returns `None` if another reader holds it.
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Option<ReaderGuard> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReaderGuard(Arc::clone(flag)))
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A forward-only cursor over the features matching an intersection query.
///
/// Candidates come from the spatial index (or every slot when the provider
/// is not indexed). Each candidate is decoded and kept when its geometry's
/// bounding box overlaps the query box and the optional filter accepts it.
/// A record that fails to decode ends the iteration with that error unless
/// the provider tolerates corrupt records, in which case it is skipped.
///
/// The reader owns its own file handles. While it is alive the provider
/// refuses to open a second reader or to mutate the files.
pub struct ShapeFileDataReader {
    shp: File,
    dbf: Option<DbaseFile>,
    shape_type: ShapeType,
    num_fields: usize,
    candidates: vec::IntoIter<(u32, IndexSlot)>,
    query: BoundingBox,
    filter: Option<FeatureFilter>,
    tolerate_corrupt_records: bool,
    finished: bool,
    _guard: ReaderGuard,
}

impl ShapeFileDataReader {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        shp: File,
        dbf: Option<DbaseFile>,
        shape_type: ShapeType,
        candidates: Vec<(u32, IndexSlot)>,
        query: BoundingBox,
        filter: Option<FeatureFilter>,
        tolerate_corrupt_records: bool,
        guard: ReaderGuard,
    ) -> ShapeFileDataReader {
        let num_fields = dbf.as_ref().map(|d| d.fields().len()).unwrap_or(0);
        ShapeFileDataReader {
            shp,
            dbf,
            shape_type,
            num_fields,
            candidates: candidates.into_iter(),
            query,
            filter,
            tolerate_corrupt_records,
            finished: false,
            _guard: guard,
        }
    }

    /// The number of candidates not yet examined.
    pub fn remaining_candidates(&self) -> usize {
        self.candidates.len()
    }

    fn read_candidate(&mut self, oid: u32, slot: IndexSlot) -> Result<Option<Feature>> {
        let geometry = read_record(&mut self.shp, oid, slot, self.shape_type)?;
        if geometry.is_null() || !geometry.bounding_box().overlaps(self.query) {
            return Ok(None);
        }
        let attributes = match &self.dbf {
            Some(dbf) if oid < dbf.num_records() => dbf.read_row(oid)?,
            _ => vec![FieldData::Null; self.num_fields],
        };
        let feature = Feature::from_store(oid, geometry, attributes);
        if let Some(filter) = &self.filter {
            if !filter(&feature) {
                return Ok(None);
            }
        }
        Ok(Some(feature))
    }
}

impl Iterator for ShapeFileDataReader {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Result<Feature>> {
        if self.finished {
            return None;
        }
        while let Some((oid, slot)) = self.candidates.next() {
            match self.read_candidate(oid, slot) {
                Ok(Some(feature)) => return Some(Ok(feature)),
                Ok(None) => {}
                Err(e) if self.tolerate_corrupt_records => {
                    warn!("Skipping feature {}: {}", oid, e);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        self.finished = true;
        None
    }
}

impl FusedIterator for ShapeFileDataReader {}
