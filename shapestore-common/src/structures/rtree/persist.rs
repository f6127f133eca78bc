/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 06/10/2026
Last Modified: 15/10/2026
License: MIT

Notes: The on-disk layout of the spatial index side-car (.sidx). All values
are little-endian.

    magic        4 bytes   b"SRTX"
    version      u32
    min_entries  u16
    max_entries  u16
    entry_count  u64
    root node    (recursive)

A node is a tag byte (0 = leaf, 1 = internal), its box as four f64 values
(min_x, min_y, max_x, max_y), a u16 child count and then either the child
nodes or, for a leaf, (box, u32 id) pairs.
*/
use super::{DynamicRTree, Node, NodeKind, RTreeEntry};
use crate::error::{Result, ShapeError};
use crate::structures::BoundingBox;
use crate::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;

pub const INDEX_FORMAT_VERSION: u32 = 1;

const INDEX_MAGIC: &[u8; 4] = b"SRTX";
const LEAF_TAG: u8 = 0;
const INTERNAL_TAG: u8 = 1;
const MAX_DEPTH: usize = 64;

impl DynamicRTree {
    /// Serializes the tree. The caller owns buffering and flushing.
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        let mut bow = ByteOrderWriter::new(writer, Endianness::LittleEndian);
        bow.write_bytes(INDEX_MAGIC)?;
        bow.write_u32(INDEX_FORMAT_VERSION)?;
        bow.write_u16(self.min_entries as u16)?;
        bow.write_u16(self.max_entries as u16)?;
        bow.write_u64(self.len as u64)?;
        self.write_node(&mut bow, self.root)
    }

    fn write_node<W: Write>(&self, bow: &mut ByteOrderWriter<W>, node: usize) -> Result<()> {
        let n = &self.nodes[node];
        match &n.kind {
            NodeKind::Leaf(entries) => {
                bow.write_u8(LEAF_TAG)?;
                write_bbox(bow, n.bbox)?;
                bow.write_u16(entries.len() as u16)?;
                for e in entries {
                    write_bbox(bow, e.bbox)?;
                    bow.write_u32(e.id)?;
                }
            }
            NodeKind::Internal(children) => {
                bow.write_u8(INTERNAL_TAG)?;
                write_bbox(bow, n.bbox)?;
                bow.write_u16(children.len() as u16)?;
                for &c in children {
                    self.write_node(bow, c)?;
                }
            }
        }
        Ok(())
    }

    /// Reads a tree written by `save`.
    ///
    /// A foreign magic number or version yields `ObsoleteIndexFileFormat`;
    /// any structural defect, including a premature end of stream, yields
    /// `IndexCorrupt`. Either way the caller should rebuild the index.
    pub fn load<R: Read + Seek>(reader: R) -> Result<DynamicRTree> {
        let mut bor = ByteOrderReader::new(reader, Endianness::LittleEndian)?;
        if bor.len() < 8 {
            return Err(ShapeError::ObsoleteIndexFileFormat(
                "spatial index file is too short to hold a header".to_string(),
            ));
        }
        let magic = bor.read_bytes(4)?;
        if magic.as_slice() != INDEX_MAGIC {
            return Err(ShapeError::ObsoleteIndexFileFormat(
                "unrecognized spatial index magic number".to_string(),
            ));
        }
        let version = bor.read_u32()?;
        if version != INDEX_FORMAT_VERSION {
            return Err(ShapeError::ObsoleteIndexFileFormat(format!(
                "spatial index version {} (expected {})",
                version, INDEX_FORMAT_VERSION
            )));
        }
        read_body(&mut bor).map_err(|e| match e {
            ShapeError::TruncatedData(msg) => {
                ShapeError::IndexCorrupt(format!("unexpected end of spatial index ({})", msg))
            }
            other => other,
        })
    }

    fn read_node<R: Read + Seek>(&mut self, bor: &mut ByteOrderReader<R>, depth: usize) -> Result<usize> {
        if depth > MAX_DEPTH {
            return Err(ShapeError::IndexCorrupt(
                "spatial index nesting is too deep".to_string(),
            ));
        }
        let tag = bor.read_u8()?;
        let bbox = read_bbox(bor)?;
        let count = bor.read_u16()? as usize;
        let kind = match tag {
            LEAF_TAG => {
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let bbox = read_bbox(bor)?;
                    let id = bor.read_u32()?;
                    entries.push(RTreeEntry { bbox, id });
                }
                NodeKind::Leaf(entries)
            }
            INTERNAL_TAG => {
                let mut children = Vec::with_capacity(count);
                for _ in 0..count {
                    children.push(self.read_node(bor, depth + 1)?);
                }
                NodeKind::Internal(children)
            }
            t => {
                return Err(ShapeError::IndexCorrupt(format!(
                    "unknown spatial index node tag {}",
                    t
                )))
            }
        };
        Ok(self.alloc(Node { bbox, kind }))
    }
}

fn read_body<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> Result<DynamicRTree> {
    let min_entries = bor.read_u16()? as usize;
    let max_entries = bor.read_u16()? as usize;
    let entry_count = bor.read_u64()? as usize;
    let mut tree = DynamicRTree::new(min_entries, max_entries).map_err(|e| {
        ShapeError::IndexCorrupt(format!("invalid spatial index fan-out: {}", e))
    })?;

    // the placeholder root leaf from `new` is discarded
    tree.nodes.clear();
    let root = tree.read_node(bor, 0)?;
    tree.root = root;
    tree.len = entry_count;
    if bor.remaining() > 0 {
        return Err(ShapeError::IndexCorrupt(format!(
            "{} unexpected trailing bytes in spatial index",
            bor.remaining()
        )));
    }
    tree.check_integrity()?;
    Ok(tree)
}

fn write_bbox<W: Write>(bow: &mut ByteOrderWriter<W>, bbox: BoundingBox) -> Result<()> {
    bow.write_f64(bbox.min_x)?;
    bow.write_f64(bbox.min_y)?;
    bow.write_f64(bbox.max_x)?;
    bow.write_f64(bbox.max_y)
}

fn read_bbox<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> Result<BoundingBox> {
    Ok(BoundingBox {
        min_x: bor.read_f64()?,
        min_y: bor.read_f64()?,
        max_x: bor.read_f64()?,
        max_y: bor.read_f64()?,
    })
}

#[cfg(test)]
mod test {
    use crate::error::ShapeError;
    use crate::structures::{BoundingBox, DynamicRTree};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    fn sample_tree() -> DynamicRTree {
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut tree = DynamicRTree::new(2, 8).unwrap();
        for i in 0..200u32 {
            let x = rng.gen_range(-180.0..180.0);
            let y = rng.gen_range(-90.0..90.0);
            tree.insert(BoundingBox::new(x, x + 1.0, y, y + 1.0), i);
        }
        tree
    }

    fn ids(tree: &DynamicRTree, query: BoundingBox) -> Vec<u32> {
        let mut v: Vec<u32> = tree.search(query).map(|e| e.id).collect();
        v.sort();
        v
    }

    #[test]
    fn test_save_and_load() {
        let tree = sample_tree();
        let mut buf = vec![];
        tree.save(&mut buf).unwrap();
        assert_eq!(&buf[0..4], b"SRTX");

        let loaded = DynamicRTree::load(Cursor::new(buf)).unwrap();
        assert_eq!(loaded.len(), 200);
        assert_eq!(loaded.height(), tree.height());
        assert_eq!(loaded.min_entries(), 2);
        assert_eq!(loaded.max_entries(), 8);
        let query = BoundingBox::new(-50.0, 50.0, -20.0, 20.0);
        assert_eq!(ids(&loaded, query), ids(&tree, query));
    }

    #[test]
    fn test_loaded_tree_remains_mutable() {
        let mut buf = vec![];
        sample_tree().save(&mut buf).unwrap();
        let mut loaded = DynamicRTree::load(Cursor::new(buf)).unwrap();
        loaded.insert(BoundingBox::new(500.0, 501.0, 500.0, 501.0), 999);
        assert_eq!(ids(&loaded, BoundingBox::new(499.0, 502.0, 499.0, 502.0)), vec![999]);
        loaded.check_integrity().unwrap();
    }

    #[test]
    fn test_wrong_version_is_obsolete() {
        let mut buf = vec![];
        sample_tree().save(&mut buf).unwrap();
        buf[4] = 99;
        match DynamicRTree::load(Cursor::new(buf)) {
            Err(ShapeError::ObsoleteIndexFileFormat(_)) => {}
            other => panic!("expected an obsolete format error, got {:?}", other.err()),
        }

        match DynamicRTree::load(Cursor::new(b"QIX1\x01\x00\x00\x00".to_vec())) {
            Err(ShapeError::ObsoleteIndexFileFormat(_)) => {}
            other => panic!("expected an obsolete format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_truncated_index_is_corrupt() {
        let mut buf = vec![];
        sample_tree().save(&mut buf).unwrap();
        buf.truncate(buf.len() - 10);
        match DynamicRTree::load(Cursor::new(buf)) {
            Err(ShapeError::IndexCorrupt(_)) => {}
            other => panic!("expected a corrupt index error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_wrong_entry_count_is_corrupt() {
        let mut buf = vec![];
        sample_tree().save(&mut buf).unwrap();
        // entry count lives at bytes 12..20
        buf[12] = buf[12].wrapping_add(1);
        let err = DynamicRTree::load(Cursor::new(buf)).err().unwrap();
        assert!(err.is_recoverable_index_error());
        assert!(matches!(err, ShapeError::IndexCorrupt(_)));
    }
}
