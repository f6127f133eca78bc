/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 09/10/2026
Last Modified: 17/10/2026
License: MIT

Notes: The provider keeps the .shp, .shx and .dbf files and the in-memory
spatial index in step on every insert, update and delete. There is no
multi-file transaction: a failure part way through a mutation can leave the
files disagreeing with one another.
*/
use super::attributes::{DbaseField, DbaseFile, FieldData};
use super::codec::{encode, null_content, read_record, write_record};
use super::feature::{Feature, RowState};
use super::geometry::{ShapeRecord, ShapeType};
use super::header::ShapefileHeader;
use super::index::ShapeFileIndex;
use super::locale::{cpg_name, parse_cpg, resolve_encoding};
use super::reader::{FeatureFilter, ReaderGuard, ShapeFileDataReader};
use super::{cpg_path, dbf_path, prj_path, shx_path, sidx_path, RECORD_HEADER_LENGTH_IN_WORDS};
use shapestore_common::configs::Configs;
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::{Bounded, BoundingBox, DynamicRTree};
use shapestore_common::utils::get_formatted_elapsed_time;
use std::fs;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

struct OpenState {
    shp: File,
    /// Only held when the files were opened for writing.
    shx: Option<File>,
    dbf: Option<DbaseFile>,
    header: ShapefileHeader,
    /// The envelope of the stored features. Kept apart from the header,
    /// whose all-zero envelope cannot tell a feature at the origin from
    /// an empty file.
    extent: BoundingBox,
    index: ShapeFileIndex,
    tree: Option<DynamicRTree>,
    tree_dirty: bool,
    /// Set once anything has been written to the .shp file.
    modified: bool,
    writable: bool,
    projection: Option<String>,
}

impl OpenState {
    /// Rewrites the .shp header and, when present, the .shx header.
    fn sync_headers(&mut self) -> Result<()> {
        self.header.file_length = self.index.total_length_in_words();
        self.header.set_bounding_box(self.extent);
        self.modified = true;
        self.header.write(&mut self.shp)?;
        if let Some(shx) = self.shx.as_mut() {
            self.index.write_header(shx, &self.header)?;
        }
        Ok(())
    }

    fn read_geometry(&self, oid: u32) -> Result<ShapeRecord> {
        let slot = self.index.slot_for(oid)?;
        let mut shp = &self.shp;
        read_record(&mut shp, oid, slot, self.header.shape_type)
    }

    fn read_attributes(&self, oid: u32) -> Result<Vec<FieldData>> {
        match &self.dbf {
            Some(dbf) if oid < dbf.num_records() => dbf.read_row(oid),
            Some(dbf) => Ok(vec![FieldData::Null; dbf.fields().len()]),
            None => Ok(vec![]),
        }
    }

    /// Writes `values` to row `oid`, padding the table with null rows
    /// if it is shorter than the record index.
    fn store_attributes(&mut self, oid: u32, values: &[FieldData]) -> Result<()> {
        match self.dbf.as_mut() {
            Some(dbf) => {
                while dbf.num_records() < oid {
                    dbf.append_row(&[])?;
                }
                if dbf.num_records() == oid {
                    dbf.append_row(values)?;
                } else {
                    dbf.write_row(oid, values)?;
                }
                Ok(())
            }
            None if values.is_empty() => Ok(()),
            None => Err(ShapeError::InvalidOperation(
                "the Shapefile has no attribute table".to_string(),
            )),
        }
    }

    fn validate_attributes(&self, values: &[FieldData]) -> Result<()> {
        match &self.dbf {
            Some(dbf) => dbf.encode_row(values).map(|_| ()),
            None if values.is_empty() => Ok(()),
            None => Err(ShapeError::InvalidOperation(
                "the Shapefile has no attribute table".to_string(),
            )),
        }
    }

    fn mark_tree(&mut self, remove: Option<BoundingBox>, insert: Option<BoundingBox>, oid: u32) {
        if let Some(tree) = self.tree.as_mut() {
            if let Some(bbox) = remove {
                if !tree.remove(bbox, oid) {
                    debug!("Feature {} was not in the spatial index", oid);
                }
            }
            if let Some(bbox) = insert {
                tree.insert(bbox, oid);
            }
            self.tree_dirty = true;
        }
    }
}

/// Reads, queries and edits an ESRI Shapefile.
///
/// A provider starts closed. `open` reads the header and the record index,
/// opens the attribute table and loads (or builds) the spatial index.
/// Queries and mutations require the provider to be open, and mutations
/// require it to have been opened exclusively.
///
/// Intersection queries test bounding boxes only; a feature is returned when
/// its box overlaps the query box, not when its exact shape does.
///
/// Example:
///
/// ```no_run
/// use shapestore_common::configs::Configs;
/// use shapestore_vector::ShapeFileProvider;
/// use shapestore_common::structures::BoundingBox;
///
/// # fn main() -> shapestore_common::Result<()> {
/// let mut provider = ShapeFileProvider::new("lakes.shp", Configs::default())?;
/// provider.open(false)?;
/// for feature in provider.execute_intersection_query(&BoundingBox::new(0.0, 10.0, 0.0, 10.0))? {
///     println!("{}", feature?);
/// }
/// provider.close()?;
/// # Ok(())
/// # }
/// ```
pub struct ShapeFileProvider {
    path: PathBuf,
    configs: Configs,
    state: Option<OpenState>,
    filter: Option<FeatureFilter>,
    reader_active: Arc<AtomicBool>,
}

impl ShapeFileProvider {
    /// Creates a closed provider for the Shapefile at `path`.
    pub fn new<P: AsRef<Path>>(path: P, configs: Configs) -> Result<ShapeFileProvider> {
        configs.validate()?;
        Ok(ShapeFileProvider {
            path: path.as_ref().with_extension("shp"),
            configs,
            state: None,
            filter: None,
            reader_active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Writes an empty Shapefile (.shp, .shx, .dbf and .cpg) and returns a
    /// closed provider for it. Any existing files of the same name are
    /// replaced.
    pub fn create<P: AsRef<Path>>(
        path: P,
        shape_type: ShapeType,
        fields: Vec<DbaseField>,
        configs: Configs,
    ) -> Result<ShapeFileProvider> {
        configs.validate()?;
        shape_type.ensure_supported()?;
        if shape_type == ShapeType::Null {
            return Err(ShapeError::UnsupportedGeometryType(
                "cannot create a Shapefile of Null shapes".to_string(),
            ));
        }
        let path = path.as_ref().with_extension("shp");
        let header = ShapefileHeader::new(shape_type);

        let mut shp = File::create(&path)?;
        header.write(&mut shp)?;
        let mut shx = File::create(shx_path(&path))?;
        ShapeFileIndex::new().save(&mut shx, &header)?;
        DbaseFile::create(dbf_path(&path), fields, configs.default_code_page)?;
        fs::write(cpg_path(&path), cpg_name(configs.default_code_page))?;
        let sidx = sidx_path(&path);
        if sidx.exists() {
            fs::remove_file(sidx)?;
        }

        info!("Created {} Shapefile {}", shape_type, path.display());
        ShapeFileProvider::new(path, configs)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Opens the files. `exclusive` opens them for writing; otherwise every
    /// mutation is refused. Opening an open provider does nothing.
    pub fn open(&mut self, exclusive: bool) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let start = Instant::now();
        if !self.path.is_file() {
            return Err(ShapeError::ShapeFileIsInvalid(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        let mut shp = OpenOptions::new()
            .read(true)
            .write(exclusive)
            .open(&self.path)?;
        let header = ShapefileHeader::read(&mut shp)?;
        header.shape_type.ensure_supported()?;

        let (index, shx) = self.open_record_index(&mut shp, &header, exclusive)?;
        let projection = self.read_projection()?;
        let dbf = self.open_attributes(exclusive)?;
        if let Some(dbf) = &dbf {
            if dbf.num_records() as usize != index.len() {
                warn!(
                    "{} has {} attribute rows for {} records",
                    self.path.display(),
                    dbf.num_records(),
                    index.len()
                );
            }
        }

        let extent = header.bounding_box();
        let mut state = OpenState {
            shp,
            shx,
            dbf,
            header,
            extent,
            index,
            tree: None,
            tree_dirty: false,
            modified: false,
            writable: exclusive,
            projection,
        };
        if self.configs.enable_spatial_index {
            let (tree, dirty) = self.load_or_build_tree(&state)?;
            state.tree = Some(tree);
            state.tree_dirty = dirty;
        }
        if state.extent.is_empty() && !state.index.is_empty() {
            // a zero envelope may hide features at the origin
            state.extent = match &state.tree {
                Some(tree) => tree.bounding_box(),
                None => union_of(&live_boxes(&state, &self.configs)?),
            };
        }

        info!(
            "Opened {} ({} features, {}) in {}",
            self.path.display(),
            state.index.len(),
            if exclusive { "read-write" } else { "read-only" },
            get_formatted_elapsed_time(start)
        );
        self.state = Some(state);
        Ok(())
    }

    /// Flushes pending index state and releases the files. Closing a closed
    /// provider does nothing.
    pub fn close(&mut self) -> Result<()> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => return Ok(()),
        };
        if state.writable {
            // an untouched .shp keeps its timestamp so the saved .sidx stays current
            if state.modified {
                state.sync_headers()?;
                state.shp.flush()?;
            }
            if let Some(dbf) = state.dbf.as_mut() {
                dbf.flush_header()?;
            }
            if (state.tree_dirty || state.modified) && self.configs.use_spatial_index_file {
                if let Some(tree) = &state.tree {
                    self.save_tree(tree)?;
                }
            }
        }
        info!("Closed {}", self.path.display());
        Ok(())
    }

    fn open_record_index(
        &self,
        shp: &mut File,
        header: &ShapefileHeader,
        writable: bool,
    ) -> Result<(ShapeFileIndex, Option<File>)> {
        let path = shx_path(&self.path);
        if path.is_file() {
            let mut shx = OpenOptions::new().read(true).write(writable).open(&path)?;
            match ShapeFileIndex::load(&mut shx) {
                Ok(index) => return Ok((index, if writable { Some(shx) } else { None })),
                Err(ShapeError::ObsoleteIndexFileFormat(msg)) => {
                    warn!("Rebuilding {}: {}", path.display(), msg)
                }
                Err(e) => return Err(e),
            }
        } else {
            warn!("{} is missing; rebuilding it from the records", path.display());
        }

        let index = ShapeFileIndex::rebuild_from_shp(shp)?;
        if !writable {
            return Ok((index, None));
        }
        let mut shx = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        index.save(&mut shx, header)?;
        Ok((index, Some(shx)))
    }

    fn read_projection(&self) -> Result<Option<String>> {
        let path = prj_path(&self.path);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let wkt = String::from_utf8(bytes).map_err(|_| {
            ShapeError::ShapeFileIsInvalid(format!("{} is not valid text", path.display()))
        })?;
        Ok(Some(wkt.trim().to_string()))
    }

    fn open_attributes(&self, writable: bool) -> Result<Option<DbaseFile>> {
        let path = dbf_path(&self.path);
        if !path.is_file() {
            debug!("{} has no attribute table", self.path.display());
            return Ok(None);
        }
        let default_code_page = self.configs.default_code_page;
        let cpg = cpg_path(&self.path);
        let encoding = if cpg.is_file() {
            let contents = fs::read_to_string(&cpg)?;
            match parse_cpg(&contents) {
                Some(cp) => Some(resolve_encoding(Some(cp), 0, default_code_page)),
                None => {
                    warn!("Ignoring unrecognized code page '{}' in {}", contents.trim(), cpg.display());
                    None
                }
            }
        } else {
            None
        };
        Ok(Some(DbaseFile::open(path, writable, encoding, default_code_page)?))
    }

    /// Returns the tree and whether it needs saving.
    fn load_or_build_tree(&self, state: &OpenState) -> Result<(DynamicRTree, bool)> {
        if self.configs.use_spatial_index_file {
            match self.load_tree(state) {
                Ok(Some(tree)) => return Ok((tree, false)),
                Ok(None) => {}
                Err(e) if e.is_recoverable_index_error() => {
                    warn!("Discarding spatial index for {}: {}", self.path.display(), e)
                }
                Err(e) => return Err(e),
            }
        }
        let tree = build_tree(state, &self.configs)?;
        Ok((tree, state.writable && self.configs.use_spatial_index_file))
    }

    fn load_tree(&self, state: &OpenState) -> Result<Option<DynamicRTree>> {
        let path = sidx_path(&self.path);
        if !path.is_file() {
            return Ok(None);
        }
        if is_older(&path, &self.path) {
            warn!("{} is older than its Shapefile; rebuilding", path.display());
            return Ok(None);
        }
        let tree = DynamicRTree::load(BufReader::new(File::open(&path)?))?;
        if tree.min_entries() != self.configs.min_node_entries
            || tree.max_entries() != self.configs.max_node_entries
        {
            warn!(
                "{} was built with {}..{} entries per node, not {}..{}; rebuilding",
                path.display(),
                tree.min_entries(),
                tree.max_entries(),
                self.configs.min_node_entries,
                self.configs.max_node_entries
            );
            return Ok(None);
        }
        let num_slots = state.index.len();
        if let Some(entry) = tree.search(tree.bounding_box()).find(|e| e.id as usize >= num_slots) {
            return Err(ShapeError::IndexCorrupt(format!(
                "entry for feature {} but the file holds {} records",
                entry.id, num_slots
            )));
        }
        debug!("Loaded spatial index {} ({} entries)", path.display(), tree.len());
        Ok(Some(tree))
    }

    fn save_tree(&self, tree: &DynamicRTree) -> Result<()> {
        let path = sidx_path(&self.path);
        let mut writer = BufWriter::new(File::create(&path)?);
        tree.save(&mut writer)?;
        writer.flush()?;
        debug!("Saved spatial index {} ({} entries)", path.display(), tree.len());
        Ok(())
    }

    fn state(&self) -> Result<&OpenState> {
        self.state
            .as_ref()
            .ok_or(ShapeError::InvalidOperationInClosedState)
    }

    fn writable_state(&mut self) -> Result<&mut OpenState> {
        let reader_active = self.reader_active.load(Ordering::Acquire);
        let state = self
            .state
            .as_mut()
            .ok_or(ShapeError::InvalidOperationInClosedState)?;
        if reader_active {
            return Err(ShapeError::ConcurrentReaderActive);
        }
        if !state.writable {
            return Err(ShapeError::InvalidOperation(
                "the Shapefile was opened in read-only mode".to_string(),
            ));
        }
        Ok(state)
    }

    pub fn shape_type(&self) -> Result<ShapeType> {
        Ok(self.state()?.header.shape_type)
    }

    pub fn header(&self) -> Result<&ShapefileHeader> {
        Ok(&self.state()?.header)
    }

    pub fn fields(&self) -> Result<&[DbaseField]> {
        Ok(match &self.state()?.dbf {
            Some(dbf) => dbf.fields(),
            None => &[],
        })
    }

    /// The .prj well-known text, if the Shapefile has one.
    pub fn projection(&self) -> Result<Option<&str>> {
        Ok(self.state()?.projection.as_deref())
    }

    /// The extent of the indexed features, or the file envelope when the
    /// provider keeps no spatial index. The file envelope only grows on
    /// insert and update; `rebuild_spatial_index` tightens it.
    pub fn get_extents(&self) -> Result<BoundingBox> {
        let state = self.state()?;
        Ok(match &state.tree {
            Some(tree) => tree.bounding_box(),
            None => state.extent,
        })
    }

    /// The number of record slots, deleted records included.
    pub fn get_feature_count(&self) -> Result<u32> {
        Ok(self.state()?.index.len() as u32)
    }

    /// The geometry of `oid`; `ShapeRecord::Null` once deleted.
    pub fn get_geometry(&self, oid: u32) -> Result<ShapeRecord> {
        self.state()?.read_geometry(oid)
    }

    pub fn get_feature(&self, oid: u32) -> Result<Feature> {
        let state = self.state()?;
        let geometry = state.read_geometry(oid)?;
        let attributes = state.read_attributes(oid)?;
        Ok(Feature::from_store(oid, geometry, attributes))
    }

    /// A blank feature with one null value per attribute field, ready to
    /// be filled in and inserted.
    pub fn new_feature(&self) -> Result<Feature> {
        Ok(Feature::added(self.fields()?.len()))
    }

    /// The ids of features whose bounding boxes overlap `bbox`, in
    /// ascending order.
    pub fn get_object_ids_in_view(&self, bbox: BoundingBox) -> Result<Vec<u32>> {
        let state = self.state()?;
        let mut ids: Vec<u32> = match &state.tree {
            Some(tree) => tree.search(bbox).map(|e| e.id).collect(),
            None => {
                let mut ids = vec![];
                for (oid, _) in state.index.iter() {
                    let geometry = state.read_geometry(oid)?;
                    if !geometry.is_null() && geometry.bounding_box().overlaps(bbox) {
                        ids.push(oid);
                    }
                }
                ids
            }
        };
        ids.sort_unstable();
        Ok(ids)
    }

    /// Installs a predicate that readers apply to every candidate.
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&Feature) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Opens a reader over the features whose bounding boxes overlap the
    /// bounding box of `geometry`. Only one reader may be alive at a time.
    pub fn execute_intersection_query<G: Bounded + ?Sized>(
        &self,
        geometry: &G,
    ) -> Result<ShapeFileDataReader> {
        let state = self.state()?;
        let guard =
            ReaderGuard::acquire(&self.reader_active).ok_or(ShapeError::ConcurrentReaderActive)?;
        let query = geometry.bounding_box();

        let candidates = match &state.tree {
            Some(tree) => {
                let mut ids: Vec<u32> = tree.search(query).map(|e| e.id).collect();
                ids.sort_unstable();
                let mut candidates = Vec::with_capacity(ids.len());
                for oid in ids {
                    candidates.push((oid, state.index.slot_for(oid)?));
                }
                candidates
            }
            None => state.index.iter().collect(),
        };

        let shp = File::open(&self.path)?;
        let dbf = match &state.dbf {
            Some(dbf) => Some(DbaseFile::open(
                dbf_path(&self.path),
                false,
                Some(dbf.encoding()),
                self.configs.default_code_page,
            )?),
            None => None,
        };
        debug!("Intersection query {} has {} candidates", query, candidates.len());
        Ok(ShapeFileDataReader::new(
            shp,
            dbf,
            state.header.shape_type,
            candidates,
            query,
            self.filter.clone(),
            self.configs.tolerate_corrupt_records,
            guard,
        ))
    }

    /// Appends a feature and returns its new id.
    pub fn insert(&mut self, feature: &mut Feature) -> Result<u32> {
        let state = self.writable_state()?;
        if feature.geometry().is_null() {
            return Err(ShapeError::InvalidOperation(
                "cannot insert a feature with a Null geometry".to_string(),
            ));
        }
        if let Some(oid) = feature.oid() {
            return Err(ShapeError::InvalidOperation(format!(
                "feature {} is already stored",
                oid
            )));
        }
        let content = encode(feature.geometry(), state.header.shape_type)?;
        state.validate_attributes(feature.attributes())?;

        let oid = state.index.allocate_next_id();
        let offset = state.index.total_length_in_words();
        let length = (content.len() / 2) as i32;
        write_record(&mut state.shp, offset, oid, &content)?;
        state.index.record_slot(oid, offset, length)?;
        if let Some(shx) = state.shx.as_mut() {
            state.index.write_slot(shx, oid)?;
        }
        state.store_attributes(oid, feature.attributes())?;

        let bbox = feature.geometry().bounding_box();
        state.extent.expand_to(bbox);
        state.sync_headers()?;
        state.mark_tree(None, Some(bbox), oid);

        debug!("Inserted feature {} at word {} ({} words)", oid, offset, length);
        feature.mark_inserted(oid);
        Ok(oid)
    }

    pub fn insert_many(&mut self, features: &mut [Feature]) -> Result<Vec<u32>> {
        let mut ids = Vec::with_capacity(features.len());
        for feature in features.iter_mut() {
            ids.push(self.insert(feature)?);
        }
        info!("Inserted {} features into {}", ids.len(), self.path.display());
        Ok(ids)
    }

    /// Writes back a modified feature. Features that are not `Modified`
    /// are left alone.
    ///
    /// A new geometry of the same encoded length overwrites the old record.
    /// Otherwise it is appended at the end of the .shp file, the feature's
    /// slot is pointed at it, and the old record becomes a Null record of
    /// the old length. The feature keeps its id either way.
    pub fn update(&mut self, feature: &mut Feature) -> Result<()> {
        let state = self.writable_state()?;
        if feature.state() != RowState::Modified {
            return Ok(());
        }
        let oid = feature.oid().ok_or_else(|| {
            ShapeError::InvalidOperation("cannot update a feature that was never stored".to_string())
        })?;
        let slot = state.index.slot_for(oid)?;

        if feature.geometry_changed() {
            if feature.geometry().is_null() {
                return Err(ShapeError::InvalidOperation(
                    "cannot update to a Null geometry; delete the feature instead".to_string(),
                ));
            }
            let content = encode(feature.geometry(), state.header.shape_type)?;
            if feature.attributes_changed() {
                state.validate_attributes(feature.attributes())?;
            }
            let old = state.read_geometry(oid)?;
            let length = (content.len() / 2) as i32;
            if length == slot.length {
                write_record(&mut state.shp, slot.offset, oid, &content)?;
            } else {
                let offset = state.index.total_length_in_words();
                write_record(&mut state.shp, offset, oid, &content)?;
                state.index.record_slot(oid, offset, length)?;
                if let Some(shx) = state.shx.as_mut() {
                    state.index.write_slot(shx, oid)?;
                }
                let dead = vec![0u8; slot.length as usize * 2];
                write_record(&mut state.shp, slot.offset, oid, &dead)?;
                debug!(
                    "Relocated feature {} from word {} to word {}",
                    oid, slot.offset, offset
                );
            }
            let bbox = feature.geometry().bounding_box();
            state.extent.expand_to(bbox);
            state.sync_headers()?;
            let old_bbox = if old.is_null() { None } else { Some(old.bounding_box()) };
            state.mark_tree(old_bbox, Some(bbox), oid);
        }
        if feature.attributes_changed() {
            state.store_attributes(oid, feature.attributes())?;
        }
        debug!("Updated feature {}", oid);
        feature.accept_changes();
        Ok(())
    }

    /// Deletes a stored feature.
    pub fn delete(&mut self, feature: &Feature) -> Result<()> {
        let oid = feature.oid().ok_or_else(|| {
            ShapeError::InvalidOperation("cannot delete a feature that was never stored".to_string())
        })?;
        self.delete_by_id(oid)
    }

    /// Replaces the geometry of `oid` with a Null record in place. The slot
    /// keeps its length, the id is not reused and the attribute row is
    /// kept.
    pub fn delete_by_id(&mut self, oid: u32) -> Result<()> {
        let state = self.writable_state()?;
        let slot = state.index.slot_for(oid)?;
        let old = state.read_geometry(oid)?;
        if old.is_null() {
            return Ok(());
        }
        let tag_offset = (slot.offset + RECORD_HEADER_LENGTH_IN_WORDS) as u64 * 2;
        state.shp.seek(SeekFrom::Start(tag_offset))?;
        state.shp.write_all(&null_content())?;
        state.modified = true;
        state.mark_tree(Some(old.bounding_box()), None, oid);
        debug!("Deleted feature {}", oid);
        Ok(())
    }

    /// Discards the spatial index and rebuilds it from the records, saving
    /// it when the provider is writable. The file envelope is recomputed
    /// from the live features, dropping space left by deleted ones, and
    /// written to the headers when the provider is writable.
    pub fn rebuild_spatial_index(&mut self) -> Result<()> {
        if !self.configs.enable_spatial_index {
            return Err(ShapeError::InvalidOperation(
                "spatial indexing is disabled".to_string(),
            ));
        }
        if self.reader_active.load(Ordering::Acquire) {
            return Err(ShapeError::ConcurrentReaderActive);
        }
        let start = Instant::now();
        let state = self
            .state
            .as_mut()
            .ok_or(ShapeError::InvalidOperationInClosedState)?;
        let tree = build_tree(state, &self.configs)?;
        let writable = state.writable;
        let num_entries = tree.len();
        state.extent = tree.bounding_box();
        state.tree = Some(tree);
        state.tree_dirty = false;
        if writable {
            state.sync_headers()?;
            state.shp.flush()?;
        }
        if writable && self.configs.use_spatial_index_file {
            if let Some(tree) = self.state.as_ref().and_then(|s| s.tree.as_ref()) {
                self.save_tree(tree)?;
            }
        }
        info!(
            "Rebuilt spatial index for {} ({} entries) in {}",
            self.path.display(),
            num_entries,
            get_formatted_elapsed_time(start)
        );
        Ok(())
    }
}

impl Drop for ShapeFileProvider {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing {}: {}", self.path.display(), e);
        }
    }
}

/// Builds a tree from a scan of every record slot.
fn build_tree(state: &OpenState, configs: &Configs) -> Result<DynamicRTree> {
    let entries = live_boxes(state, configs)?;
    DynamicRTree::bulk_build(configs.min_node_entries, configs.max_node_entries, entries)
}

/// The box and id of every non-null record.
fn live_boxes(state: &OpenState, configs: &Configs) -> Result<Vec<(BoundingBox, u32)>> {
    let mut entries = Vec::with_capacity(state.index.len());
    for (oid, _) in state.index.iter() {
        match state.read_geometry(oid) {
            Ok(geometry) if geometry.is_null() => {}
            Ok(geometry) => entries.push((geometry.bounding_box(), oid)),
            Err(e) if configs.tolerate_corrupt_records => {
                warn!("Skipping unreadable feature {}: {}", oid, e)
            }
            Err(e) => return Err(e),
        }
    }
    Ok(entries)
}

fn union_of(entries: &[(BoundingBox, u32)]) -> BoundingBox {
    entries
        .iter()
        .fold(BoundingBox::empty(), |acc, (bbox, _)| acc.union(*bbox))
}

fn is_older(path: &Path, than: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(path), modified(than)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::{is_older, ShapeFileProvider};
    use crate::shapefile::attributes::{DbaseField, FieldData, FieldType};
    use crate::shapefile::feature::{Feature, RowState};
    use crate::shapefile::geometry::{ShapeRecord, ShapeType};
    use crate::shapefile::header::ShapefileHeader;
    use crate::shapefile::{shx_path, sidx_path};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use shapestore_common::configs::Configs;
    use shapestore_common::error::ShapeError;
    use shapestore_common::structures::{BoundingBox, Point2D};
    use std::collections::HashSet;
    use std::fs::File;
    use std::path::Path;

    fn square(x: f64, y: f64, size: f64) -> ShapeRecord {
        ShapeRecord::polygon(&[vec![
            Point2D::new(x, y),
            Point2D::new(x, y + size),
            Point2D::new(x + size, y + size),
            Point2D::new(x + size, y),
            Point2D::new(x, y),
        ]])
    }

    fn fields() -> Vec<DbaseField> {
        vec![
            DbaseField::character("NAME", 16),
            DbaseField::numeric("VALUE", 8, 0),
        ]
    }

    fn create(path: &Path, shape_type: ShapeType) -> ShapeFileProvider {
        let mut provider =
            ShapeFileProvider::create(path, shape_type, fields(), Configs::default()).unwrap();
        provider.open(true).unwrap();
        provider
    }

    fn feature(geometry: ShapeRecord, name: &str, value: i32) -> Feature {
        Feature::new(
            geometry,
            vec![FieldData::Text(name.to_string()), FieldData::Int(value)],
        )
    }

    #[test]
    fn test_square_polygon_query() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = create(&dir.path().join("squares.shp"), ShapeType::Polygon);
        let mut f = feature(
            ShapeRecord::polygon(&[vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(10.0, 0.0),
                Point2D::new(10.0, 10.0),
                Point2D::new(0.0, 10.0),
                Point2D::new(0.0, 0.0),
            ]]),
            "square",
            1,
        );
        let oid = provider.insert(&mut f).unwrap();
        assert_eq!(oid, 0);
        assert_eq!(f.state(), RowState::Unchanged);
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(0.0, 10.0, 0.0, 10.0)
        );

        let hits: Vec<Feature> = provider
            .execute_intersection_query(&BoundingBox::new(5.0, 15.0, 5.0, 15.0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].oid(), Some(0));
        assert_eq!(hits[0].geometry(), f.geometry());
        assert_eq!(hits[0].attribute(0), Some(&FieldData::Text("square".to_string())));

        let misses = provider
            .execute_intersection_query(&BoundingBox::new(20.0, 30.0, 20.0, 30.0))
            .unwrap()
            .count();
        assert_eq!(misses, 0);
    }

    #[test]
    fn test_many_random_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.shp");
        let mut provider = create(&path, ShapeType::Point);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut features: Vec<Feature> = (0..1000)
            .map(|i| {
                let x = rng.gen_range(0.0..1000.0);
                let y = rng.gen_range(0.0..1000.0);
                feature(ShapeRecord::point(x, y), "pt", i)
            })
            .collect();
        let ids = provider.insert_many(&mut features).unwrap();
        assert_eq!(ids.len(), 1000);
        assert_eq!(provider.get_feature_count().unwrap(), 1000);

        let extent = provider.get_extents().unwrap();
        let found: HashSet<u32> = provider
            .execute_intersection_query(&extent)
            .unwrap()
            .map(|f| f.unwrap().oid().unwrap())
            .collect();
        assert_eq!(found.len(), 1000);

        // the .shp length matches the header after a reopen
        provider.close().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 100 + 1000 * 28);
        let shx = std::fs::read(shx_path(&path)).unwrap();
        assert_eq!(shx.len(), 100 + 1000 * 8);
        assert!(sidx_path(&path).is_file());

        provider.open(false).unwrap();
        assert_eq!(provider.get_feature_count().unwrap(), 1000);
        assert_eq!(provider.get_extents().unwrap(), extent);
        let view = provider
            .get_object_ids_in_view(BoundingBox::new(0.0, 500.0, 0.0, 500.0))
            .unwrap();
        let expected: Vec<u32> = features
            .iter()
            .filter(|f| match f.geometry() {
                ShapeRecord::Point(p) => p.x <= 500.0 && p.y <= 500.0,
                _ => false,
            })
            .map(|f| f.oid().unwrap())
            .collect();
        assert_eq!(view, expected);
    }

    #[test]
    fn test_delete_keeps_slot_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = create(&dir.path().join("del.shp"), ShapeType::Polygon);
        let mut keep = feature(square(100.0, 100.0, 5.0), "keep", 1);
        let mut gone = feature(square(0.0, 0.0, 5.0), "gone", 2);
        provider.insert(&mut keep).unwrap();
        let oid = provider.insert(&mut gone).unwrap();

        provider.delete(&gone).unwrap();
        assert_eq!(provider.get_geometry(oid).unwrap(), ShapeRecord::Null);
        assert!(provider
            .get_object_ids_in_view(BoundingBox::new(0.0, 5.0, 0.0, 5.0))
            .unwrap()
            .is_empty());
        assert_eq!(provider.get_feature_count().unwrap(), 2);
        let stored = provider.get_feature(oid).unwrap();
        assert_eq!(stored.attribute(0), Some(&FieldData::Text("gone".to_string())));
        // deleting twice is harmless
        provider.delete_by_id(oid).unwrap();

        // the deleted record is skipped by readers
        let all: Vec<u32> = provider
            .execute_intersection_query(&BoundingBox::new(-1e9, 1e9, -1e9, 1e9))
            .unwrap()
            .map(|f| f.unwrap().oid().unwrap())
            .collect();
        assert_eq!(all, vec![0]);
    }

    #[test]
    fn test_update_in_place_and_relocated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upd.shp");
        let mut provider = create(&path, ShapeType::Polygon);
        let mut a = feature(square(0.0, 0.0, 1.0), "a", 1);
        let mut b = feature(square(10.0, 10.0, 1.0), "b", 2);
        provider.insert(&mut a).unwrap();
        provider.insert(&mut b).unwrap();

        // unchanged features are not written
        provider.update(&mut a).unwrap();

        // same vertex count: rewritten in place
        a.set_geometry(square(50.0, 50.0, 2.0));
        provider.update(&mut a).unwrap();
        assert_eq!(provider.get_geometry(0).unwrap(), square(50.0, 50.0, 2.0));
        assert_eq!(
            provider.get_object_ids_in_view(BoundingBox::new(50.0, 51.0, 50.0, 51.0)).unwrap(),
            vec![0]
        );
        assert!(provider
            .get_object_ids_in_view(BoundingBox::new(0.0, 0.5, 0.0, 0.5))
            .unwrap()
            .is_empty());

        // a longer geometry moves to the end of the file and keeps its id
        let triangle_fan = ShapeRecord::polygon(&[vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 4.0),
            Point2D::new(2.0, 6.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(2.0, -2.0),
            Point2D::new(0.0, 0.0),
        ]]);
        b.set_geometry(triangle_fan.clone());
        b.set_attribute(1, FieldData::Int(20)).unwrap();
        provider.update(&mut b).unwrap();
        assert_eq!(b.oid(), Some(1));
        assert_eq!(provider.get_feature_count().unwrap(), 2);
        let stored = provider.get_feature(1).unwrap();
        assert_eq!(stored.geometry(), &triangle_fan);
        assert_eq!(stored.attribute(1), Some(&FieldData::Int(20)));
        assert_eq!(
            provider.get_object_ids_in_view(BoundingBox::new(1.0, 3.0, 5.0, 5.5)).unwrap(),
            vec![1]
        );
        provider.close().unwrap();

        // a rebuilt .shx follows the relocated record
        std::fs::remove_file(shx_path(&path)).unwrap();
        provider.open(true).unwrap();
        assert_eq!(provider.get_geometry(1).unwrap(), triangle_fan);
        assert_eq!(provider.get_geometry(0).unwrap(), square(50.0, 50.0, 2.0));
    }

    #[test]
    fn test_insert_rejects_bad_features() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = create(&dir.path().join("bad.shp"), ShapeType::Point);
        let mut null = feature(ShapeRecord::Null, "n", 0);
        assert!(matches!(
            provider.insert(&mut null),
            Err(ShapeError::InvalidOperation(_))
        ));
        let mut wrong = feature(square(0.0, 0.0, 1.0), "w", 0);
        assert!(matches!(
            provider.insert(&mut wrong),
            Err(ShapeError::UnsupportedGeometryType(_))
        ));
        let mut too_wide = feature(ShapeRecord::point(0.0, 0.0), "x", 123456789);
        assert!(matches!(
            provider.insert(&mut too_wide),
            Err(ShapeError::InvalidOperation(_))
        ));
        // nothing was written for the rejected features
        assert_eq!(provider.get_feature_count().unwrap(), 0);

        let mut blank = provider.new_feature().unwrap();
        assert_eq!(blank.state(), RowState::Added);
        blank.set_geometry(ShapeRecord::point(1.0, 1.0));
        assert_eq!(provider.insert(&mut blank).unwrap(), 0);
        assert!(provider.insert(&mut blank).is_err());
        assert_eq!(
            provider.get_feature(0).unwrap().attributes(),
            &[FieldData::Null, FieldData::Null]
        );
    }

    #[test]
    fn test_closed_and_read_only_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.shp");
        let mut provider = create(&path, ShapeType::Point);
        provider.insert(&mut feature(ShapeRecord::point(1.0, 2.0), "p", 1)).unwrap();
        provider.close().unwrap();
        provider.close().unwrap();

        assert!(matches!(
            provider.get_feature_count(),
            Err(ShapeError::InvalidOperationInClosedState)
        ));
        assert!(matches!(
            provider.insert(&mut feature(ShapeRecord::point(0.0, 0.0), "q", 2)),
            Err(ShapeError::InvalidOperationInClosedState)
        ));

        provider.open(false).unwrap();
        provider.open(false).unwrap();
        assert_eq!(provider.get_feature_count().unwrap(), 1);
        assert!(matches!(
            provider.insert(&mut feature(ShapeRecord::point(0.0, 0.0), "q", 2)),
            Err(ShapeError::InvalidOperation(_))
        ));
        assert!(matches!(
            provider.delete_by_id(0),
            Err(ShapeError::InvalidOperation(_))
        ));

        let missing = ShapeFileProvider::new(dir.path().join("nope.shp"), Configs::default());
        assert!(matches!(
            missing.unwrap().open(false),
            Err(ShapeError::ShapeFileIsInvalid(_))
        ));
    }

    #[test]
    fn test_single_active_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = create(&dir.path().join("readers.shp"), ShapeType::Point);
        provider.insert(&mut feature(ShapeRecord::point(1.0, 1.0), "a", 1)).unwrap();
        let everything = BoundingBox::new(-10.0, 10.0, -10.0, 10.0);

        let reader = provider.execute_intersection_query(&everything).unwrap();
        assert!(matches!(
            provider.execute_intersection_query(&everything),
            Err(ShapeError::ConcurrentReaderActive)
        ));
        drop(reader);
        assert_eq!(provider.execute_intersection_query(&everything).unwrap().count(), 1);
    }

    #[test]
    fn test_mutation_blocked_while_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("busy.shp");
        let mut provider = create(&path, ShapeType::Point);
        provider.insert(&mut feature(ShapeRecord::point(1.0, 1.0), "a", 1)).unwrap();
        provider.close().unwrap();
        provider.open(true).unwrap();
        let flag = provider.reader_active.clone();
        let reader = provider
            .execute_intersection_query(&BoundingBox::new(0.0, 2.0, 0.0, 2.0))
            .unwrap();
        assert!(flag.load(std::sync::atomic::Ordering::Acquire));
        // the reader owns its handles, so it survives past the borrow
        let rows: Vec<_> = reader.collect();
        assert_eq!(rows.len(), 1);
        assert!(!flag.load(std::sync::atomic::Ordering::Acquire));

        let _held = super::ReaderGuard::acquire(&flag).unwrap();
        assert!(matches!(
            provider.insert(&mut feature(ShapeRecord::point(0.0, 0.0), "b", 2)),
            Err(ShapeError::ConcurrentReaderActive)
        ));
    }

    #[test]
    fn test_filter_excludes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = create(&dir.path().join("filter.shp"), ShapeType::Point);
        for i in 0..10 {
            provider
                .insert(&mut feature(ShapeRecord::point(i as f64, 0.0), "p", i))
                .unwrap();
        }
        provider.set_filter(|f| matches!(f.attribute(1), Some(FieldData::Int(v)) if v % 2 == 0));
        let everything = BoundingBox::new(-1.0, 100.0, -1.0, 1.0);
        let evens: Vec<u32> = provider
            .execute_intersection_query(&everything)
            .unwrap()
            .map(|f| f.unwrap().oid().unwrap())
            .collect();
        assert_eq!(evens, vec![0, 2, 4, 6, 8]);
        provider.clear_filter();
        assert_eq!(provider.execute_intersection_query(&everything).unwrap().count(), 10);
    }

    #[test]
    fn test_side_car_index_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heal.shp");
        let mut provider = create(&path, ShapeType::Point);
        for i in 0..50 {
            provider
                .insert(&mut feature(ShapeRecord::point(i as f64, i as f64), "p", i))
                .unwrap();
        }
        provider.close().unwrap();

        // a .sidx from some other format version is discarded and rebuilt
        let sidx = sidx_path(&path);
        let mut bytes = std::fs::read(&sidx).unwrap();
        bytes[4] = 99;
        std::fs::write(&sidx, &bytes).unwrap();
        provider.open(false).unwrap();
        assert_eq!(
            provider
                .get_object_ids_in_view(BoundingBox::new(9.5, 10.5, 9.5, 10.5))
                .unwrap(),
            vec![10]
        );
        provider.close().unwrap();

        // an obsolete .shx is rebuilt from the record headers
        let shx = shx_path(&path);
        let mut bytes = std::fs::read(&shx).unwrap();
        bytes.truncate(bytes.len() - 4);
        std::fs::write(&shx, &bytes).unwrap();
        provider.open(true).unwrap();
        assert_eq!(provider.get_feature_count().unwrap(), 50);
        provider.rebuild_spatial_index().unwrap();
        assert_eq!(
            provider.get_geometry(49).unwrap(),
            ShapeRecord::point(49.0, 49.0)
        );
        provider.close().unwrap();
        assert_eq!(std::fs::read(&shx).unwrap().len(), 100 + 50 * 8);
    }

    #[test]
    fn test_without_spatial_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.shp");
        let configs = Configs {
            enable_spatial_index: false,
            ..Configs::default()
        };
        let mut provider =
            ShapeFileProvider::create(&path, ShapeType::MultiPoint, fields(), configs).unwrap();
        provider.open(true).unwrap();
        let mut f = feature(
            ShapeRecord::MultiPoint(vec![Point2D::new(1.0, 1.0), Point2D::new(3.0, 4.0)]),
            "mp",
            7,
        );
        provider.insert(&mut f).unwrap();
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(1.0, 3.0, 1.0, 4.0)
        );
        assert_eq!(
            provider
                .get_object_ids_in_view(BoundingBox::new(2.0, 2.5, 2.0, 2.5))
                .unwrap(),
            vec![0]
        );
        assert!(matches!(
            provider.rebuild_spatial_index(),
            Err(ShapeError::InvalidOperation(_))
        ));
        provider.close().unwrap();
        assert!(!sidx_path(&path).exists());
    }

    #[test]
    fn test_code_page_side_car() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.shp");
        let configs = Configs {
            default_code_page: 1252,
            ..Configs::default()
        };
        let mut provider = ShapeFileProvider::create(
            &path,
            ShapeType::Point,
            vec![DbaseField::new("NAME", FieldType::Character, 10, 0)],
            configs,
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(path.with_extension("cpg")).unwrap(),
            "1252"
        );
        provider.open(true).unwrap();
        let mut f = Feature::new(
            ShapeRecord::point(0.0, 0.0),
            vec![FieldData::Text("Mont\u{e9}al".to_string())],
        );
        provider.insert(&mut f).unwrap();
        provider.close().unwrap();

        // the .cpg wins over the default code page
        let mut provider = ShapeFileProvider::new(&path, Configs::default()).unwrap();
        provider.open(false).unwrap();
        assert_eq!(
            provider.get_feature(0).unwrap().attribute(0),
            Some(&FieldData::Text("Mont\u{e9}al".to_string()))
        );
    }

    fn stored_envelope(path: &Path) -> (f64, f64, f64, f64) {
        let header = ShapefileHeader::read(&mut File::open(path).unwrap()).unwrap();
        (header.x_min, header.y_min, header.x_max, header.y_max)
    }

    #[test]
    fn test_feature_at_origin_keeps_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin.shp");
        let configs = Configs {
            enable_spatial_index: false,
            ..Configs::default()
        };
        let mut provider =
            ShapeFileProvider::create(&path, ShapeType::Point, fields(), configs.clone()).unwrap();
        provider.open(true).unwrap();
        provider
            .insert(&mut feature(ShapeRecord::point(0.0, 0.0), "origin", 1))
            .unwrap();
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0)
        );
        provider
            .insert(&mut feature(ShapeRecord::point(5.0, 5.0), "far", 2))
            .unwrap();
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(0.0, 5.0, 0.0, 5.0)
        );
        provider.close().unwrap();
        assert_eq!(stored_envelope(&path), (0.0, 0.0, 5.0, 5.0));

        // a file holding only the origin point stores a zero envelope
        let lone = dir.path().join("lone.shp");
        let mut provider =
            ShapeFileProvider::create(&lone, ShapeType::Point, fields(), configs.clone()).unwrap();
        provider.open(true).unwrap();
        provider
            .insert(&mut feature(ShapeRecord::point(0.0, 0.0), "origin", 1))
            .unwrap();
        provider.close().unwrap();
        assert_eq!(stored_envelope(&lone), (0.0, 0.0, 0.0, 0.0));

        provider.open(true).unwrap();
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0)
        );
        provider
            .insert(&mut feature(ShapeRecord::point(-2.0, 3.0), "west", 2))
            .unwrap();
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(-2.0, 0.0, 0.0, 3.0)
        );
        provider.close().unwrap();
        assert_eq!(stored_envelope(&lone), (-2.0, 0.0, 0.0, 3.0));
    }

    #[test]
    fn test_untouched_session_keeps_spatial_index_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.shp");
        let mut provider = create(&path, ShapeType::Point);
        provider
            .insert(&mut feature(ShapeRecord::point(1.0, 2.0), "p", 1))
            .unwrap();
        provider.close().unwrap();
        let sidx = sidx_path(&path);
        assert!(!is_older(&sidx, &path));

        let modified = |p: &Path| std::fs::metadata(p).unwrap().modified().unwrap();
        let shp_before = modified(&path);
        let sidx_before = modified(&sidx);
        provider.open(true).unwrap();
        assert_eq!(provider.get_feature_count().unwrap(), 1);
        provider.close().unwrap();
        assert_eq!(modified(&path), shp_before);
        assert_eq!(modified(&sidx), sidx_before);
        assert!(!is_older(&sidx, &path));

        // an edit rewrites the .shp and saves the index after it
        provider.open(true).unwrap();
        provider.delete_by_id(0).unwrap();
        provider.close().unwrap();
        assert!(!is_older(&sidx, &path));
    }

    #[test]
    fn test_rebuild_tightens_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrink.shp");
        let mut provider = create(&path, ShapeType::Polygon);
        provider
            .insert(&mut feature(square(0.0, 0.0, 5.0), "near", 1))
            .unwrap();
        let far = provider
            .insert(&mut feature(square(100.0, 100.0, 5.0), "far", 2))
            .unwrap();
        provider.delete_by_id(far).unwrap();
        assert_eq!(
            provider.header().unwrap().bounding_box(),
            BoundingBox::new(0.0, 105.0, 0.0, 105.0)
        );

        provider.rebuild_spatial_index().unwrap();
        assert_eq!(
            provider.header().unwrap().bounding_box(),
            BoundingBox::new(0.0, 5.0, 0.0, 5.0)
        );
        assert_eq!(
            provider.get_extents().unwrap(),
            BoundingBox::new(0.0, 5.0, 0.0, 5.0)
        );
        provider.close().unwrap();
        assert_eq!(stored_envelope(&path), (0.0, 0.0, 5.0, 5.0));
        let shx = ShapefileHeader::read(&mut File::open(shx_path(&path)).unwrap()).unwrap();
        assert_eq!((shx.x_max, shx.y_max), (5.0, 5.0));
    }

    #[test]
    fn test_node_size_change_rebuilds_spatial_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanout.shp");
        let mut provider = create(&path, ShapeType::Point);
        for i in 0..40 {
            provider
                .insert(&mut feature(ShapeRecord::point(i as f64, 0.0), "p", i))
                .unwrap();
        }
        provider.close().unwrap();

        let configs = Configs {
            min_node_entries: 3,
            max_node_entries: 8,
            ..Configs::default()
        };
        let mut provider = ShapeFileProvider::new(&path, configs.clone()).unwrap();
        provider.open(true).unwrap();
        let tree = provider.state.as_ref().unwrap().tree.as_ref().unwrap();
        assert_eq!((tree.min_entries(), tree.max_entries()), (3, 8));
        assert_eq!(tree.len(), 40);
        provider.close().unwrap();

        let mut provider = ShapeFileProvider::new(&path, configs).unwrap();
        provider.open(false).unwrap();
        let tree = provider.state.as_ref().unwrap().tree.as_ref().unwrap();
        assert_eq!((tree.min_entries(), tree.max_entries()), (3, 8));
    }
}
