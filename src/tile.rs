//! Slippy map tile addresses in XYZ format.
//!
//! A tile address is parsed from request paths of the shape
//! `/{z}/{x}/{y}.{format}` and validated against the tile pyramid:
//! level `z` has `2^z × 2^z` tiles, numbered from the top-left corner.

/// Zoom levels past this would overflow the pyramid size computation.
pub const MAX_ZOOM: u8 = 30;

/// The two accepted aliases for the Mapbox Vector Tile media type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileFormat {
    Pbf,
    Mvt,
}

impl TileFormat {
    pub fn from_extension(ext: &str) -> Option<TileFormat> {
        match ext {
            "pbf" => Some(TileFormat::Pbf),
            "mvt" => Some(TileFormat::Mvt),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("path does not match /{{z}}/{{x}}/{{y}}.{{format}}")]
    Malformed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported tile format '{0}'")]
    UnsupportedFormat(String),
    #[error("tile {x}/{y} out of range at zoom {zoom}")]
    OutOfRange { zoom: u8, x: i64, y: i64 },
}

/// A request-scoped tile coordinate. Coordinates are kept signed so
/// that negative x/y survive parsing and are rejected by `validate`
/// as out-of-range rather than as a malformed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileAddress {
    pub zoom: u8,
    pub x: i64,
    pub y: i64,
    pub format: String,
}

impl TileAddress {
    /// Parses a `/{z}/{x}/{y}.{format}` request path.
    pub fn parse(path: &str) -> Result<TileAddress, ParseError> {
        let rest = path.strip_prefix('/').ok_or(ParseError::Malformed)?;
        let mut parts = rest.splitn(3, '/');
        let zoom = parts.next().ok_or(ParseError::Malformed)?;
        let x = parts.next().ok_or(ParseError::Malformed)?;
        let last = parts.next().ok_or(ParseError::Malformed)?;
        let (y, format) = last.split_once('.').ok_or(ParseError::Malformed)?;

        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseError::Malformed);
        }

        Ok(TileAddress {
            zoom: parse_unsigned(zoom)?,
            x: parse_signed(x)?,
            y: parse_signed(y)?,
            format: format.to_string(),
        })
    }

    /// Checks the address against the pyramid geometry and the
    /// supported format aliases.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if TileFormat::from_extension(&self.format).is_none() {
            return Err(ValidationError::UnsupportedFormat(self.format.clone()));
        }
        check_bounds(self.zoom, self.x, self.y)
    }
}

/// Pyramid geometry check, shared by path validation and direct
/// renders. Guards the `1 << zoom` pyramid size computation, so it
/// must run before any envelope math.
pub fn check_bounds(zoom: u8, x: i64, y: i64) -> Result<(), ValidationError> {
    if zoom > MAX_ZOOM {
        return Err(ValidationError::OutOfRange { zoom, x, y });
    }
    let size = 1i64 << zoom;
    if x < 0 || y < 0 || x >= size || y >= size {
        return Err(ValidationError::OutOfRange { zoom, x, y });
    }
    Ok(())
}

fn parse_unsigned(s: &str) -> Result<u8, ParseError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::Malformed);
    }
    s.parse().map_err(|_| ParseError::Malformed)
}

fn parse_signed(s: &str) -> Result<i64, ParseError> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::Malformed);
    }
    s.parse().map_err(|_| ParseError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_path() {
        let addr = TileAddress::parse("/1/1/0.pbf").unwrap();
        assert_eq!(
            addr,
            TileAddress {
                zoom: 1,
                x: 1,
                y: 0,
                format: String::from("pbf"),
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        for path in [
            "",
            "/",
            "/1/1/0",
            "/1/1.pbf",
            "/a/b/c.pbf",
            "/1/1/0.",
            "/1/1/0.p8f",
            "1/1/0.pbf",
            "/1.5/1/0.pbf",
            "/-1/0/0.pbf",
        ] {
            assert_eq!(TileAddress::parse(path), Err(ParseError::Malformed), "{}", path);
        }
    }

    #[test]
    fn test_parse_keeps_negative_coordinates() {
        let addr = TileAddress::parse("/1/-1/0.pbf").unwrap();
        assert_eq!(addr.x, -1);
    }

    #[test]
    fn test_validate_accepts_in_range_tiles() {
        let addr = TileAddress::parse("/2/3/3.mvt").unwrap();
        assert_eq!(addr.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let addr = TileAddress {
            zoom: 2,
            x: 4,
            y: 0,
            format: String::from("pbf"),
        };
        assert_eq!(
            addr.validate(),
            Err(ValidationError::OutOfRange { zoom: 2, x: 4, y: 0 })
        );

        let addr = TileAddress::parse("/1/-1/0.pbf").unwrap();
        assert!(matches!(
            addr.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));

        let addr = TileAddress::parse("/1/0/-1.pbf").unwrap();
        assert!(matches!(
            addr.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unsupported_format() {
        let addr = TileAddress {
            zoom: 1,
            x: 0,
            y: 0,
            format: String::from("png"),
        };
        assert_eq!(
            addr.validate(),
            Err(ValidationError::UnsupportedFormat(String::from("png")))
        );
    }

    #[test]
    fn test_validate_bounds_zoom() {
        let addr = TileAddress {
            zoom: 31,
            x: 0,
            y: 0,
            format: String::from("pbf"),
        };
        assert!(matches!(
            addr.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_check_bounds_rejects_shift_overflowing_zooms() {
        // zooms past the cap never reach the pyramid size computation
        for zoom in [31u8, 63, 64, 255] {
            assert!(matches!(
                check_bounds(zoom, 0, 0),
                Err(ValidationError::OutOfRange { .. })
            ));
        }
        assert_eq!(check_bounds(30, 0, 0), Ok(()));
    }
}
