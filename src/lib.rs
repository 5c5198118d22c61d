//! # Tile Conjurer
//!
//! A minimal XYZ tile server that conjures Mapbox Vector Tiles
//! straight out of a PostGIS database.
//!
//! ## How it works
//!
//! Requests of the shape `GET /{z}/{x}/{y}.{format}` are parsed into a
//! tile address, validated against the tile pyramid, and converted
//! into an EPSG:3857 bounding envelope. The envelope is rendered into
//! a single parameterized PostGIS query that clips intersecting
//! features, projects them into tile pixel space, and aggregates them
//! with `ST_AsMVT`, one named layer per configured source. The binary
//! result is streamed back to the client unchanged.
//!
//! ## Known limitations
//!
//! The current focus is rendering from a single PostGIS database; the
//! tile math assumes the web mercator pyramid. Other backends and
//! tiling schemes can be added behind the [`TileSource`] trait if they
//! become relevant.

#![deny(warnings)]

// TODO: remove once async fn in traits become stable
use async_trait::async_trait;

pub mod config;
pub mod error;
pub mod mercator;
pub mod query;
pub mod server;
pub mod service;
pub mod source;
pub mod tile;

pub use error::Error;

/// This is the main trait exported by this crate: anything that can
/// render the Mapbox vector tile for a slippy map tile in XYZ format.
#[async_trait]
pub trait TileSource: Sized {
    async fn render_mvt(&self, zoom: u8, x: i64, y: i64) -> Result<Vec<u8>, Error>;
}
