#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Transit buffers and R-tree spatial indexes for eligibility joins.
//!
//! Buffers are built in Web Mercator, where the radii are meaningful, and
//! handed back in WGS84. The indexes answer the two questions the pipeline
//! asks: which polygon's interior contains this point (site eligibility and
//! reference-layer attribution), and which polygon intersects this geometry
//! (corridor to TIF association). Containment is boundary-exclusive;
//! intersection is not.

pub mod buffer;
pub mod filter;
pub mod index;

pub use buffer::{buffer_multi_line, buffer_point, buffer_transit_feature};
pub use filter::{filter_corridors, filter_municipality};
pub use index::{BufferLayer, PolygonLayer};
