/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 02/10/2026
Last Modified: 17/10/2026
License: MIT
*/

pub mod algorithms;
pub mod configs;
pub mod error;
pub mod structures;
pub mod utils;

pub use crate::error::{Result, ShapeError};
