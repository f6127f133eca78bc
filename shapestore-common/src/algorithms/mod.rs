/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 03/10/2026
Last Modified: 03/10/2026
License: MIT
*/
// private sub-module defined in other files
mod is_clockwise_order;

// exports identifiers from private sub-modules in the current module namespace
pub use self::is_clockwise_order::{is_clockwise_order, signed_ring_area};
