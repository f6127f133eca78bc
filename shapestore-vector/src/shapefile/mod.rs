/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 05/10/2026
Last Modified: 17/10/2026
License: MIT

Notes: The logic behind working with the ESRI Shapefile format. A Shapefile
is a family of files sharing a base name: the geometry (.shp), the record
index (.shx), the attribute table (.dbf) and the optional code page (.cpg)
and projection (.prj) side-cars. The spatial index is kept in a .sidx
side-car of our own.
*/

pub mod attributes;
pub mod codec;
pub mod feature;
pub mod geometry;
pub mod header;
pub mod index;
pub mod locale;
pub mod provider;
pub mod reader;

use std::path::{Path, PathBuf};

/// Magic number at offset 0 of .shp and .shx files.
pub const FILE_CODE: i32 = 9994;
pub const SHAPEFILE_VERSION: i32 = 1000;
pub const HEADER_LENGTH_IN_BYTES: usize = 100;
pub const HEADER_LENGTH_IN_WORDS: i32 = 50;
/// Record number plus content length.
pub const RECORD_HEADER_LENGTH_IN_WORDS: i32 = 4;

pub fn shx_path<P: AsRef<Path>>(shp: P) -> PathBuf {
    shp.as_ref().with_extension("shx")
}

pub fn dbf_path<P: AsRef<Path>>(shp: P) -> PathBuf {
    shp.as_ref().with_extension("dbf")
}

pub fn cpg_path<P: AsRef<Path>>(shp: P) -> PathBuf {
    shp.as_ref().with_extension("cpg")
}

pub fn prj_path<P: AsRef<Path>>(shp: P) -> PathBuf {
    shp.as_ref().with_extension("prj")
}

pub fn sidx_path<P: AsRef<Path>>(shp: P) -> PathBuf {
    shp.as_ref().with_extension("sidx")
}

#[cfg(test)]
mod test {
    use super::{dbf_path, sidx_path};
    use std::path::PathBuf;

    #[test]
    fn test_side_car_names() {
        assert_eq!(dbf_path("data/roads.shp"), PathBuf::from("data/roads.dbf"));
        assert_eq!(sidx_path("roads.shp"), PathBuf::from("roads.sidx"));
    }
}
