// private sub-module defined in other files
mod bounding_box;
mod point2d;
mod rtree;

// exports identifiers from private sub-modules in the current module namespace
pub use self::bounding_box::{Bounded, BoundingBox};
pub use self::point2d::Point2D;
pub use self::rtree::{
    DynamicRTree, RTreeEntry, SearchIter, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES,
    INDEX_FORMAT_VERSION, MAX_NODE_CAPACITY,
};
