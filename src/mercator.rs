//! Tile pyramid math in EPSG:3857 spherical mercator.

/// Half-width of the world in EPSG:3857.
pub const EPSG_3857_MAX: f64 = 20037508.3427892;

/// Envelope edges are densified to width / DENSIFY_FACTOR before the
/// bounds polygon gets reprojected into the source SRS, so a large
/// envelope does not degrade into a four-point quadrilateral.
pub const DENSIFY_FACTOR: f64 = 4.0;

/// An axis-aligned bounding box in EPSG:3857.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Envelope {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Maximum segment length for densifying the envelope boundary.
    pub fn segment_size(&self) -> f64 {
        self.width() / DENSIFY_FACTOR
    }
}

/// Computes the EPSG:3857 bounds of an XYZ tile.
///
/// XYZ tile coordinates are in image space, origin top-left, so the
/// vertical axis is inverted relative to the projection's north-up
/// axis. All four edges are computed multiplicatively from the world
/// minimum so adjacent tiles share bit-identical edge coordinates.
pub fn tile_envelope(zoom: u8, x: i64, y: i64) -> Envelope {
    let world_min = -EPSG_3857_MAX;
    let world_size = 2.0 * EPSG_3857_MAX;
    let tile_size = world_size / (1u64 << zoom) as f64;
    Envelope {
        xmin: world_min + tile_size * x as f64,
        xmax: world_min + tile_size * (x + 1) as f64,
        ymin: EPSG_3857_MAX - tile_size * (y + 1) as f64,
        ymax: EPSG_3857_MAX - tile_size * y as f64,
    }
}
