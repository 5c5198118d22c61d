//! Rendering of tile extraction SQL.
//!
//! The envelope's numeric bounds and the pixel affine travel as bind
//! parameters; only startup-validated identifiers (table, columns,
//! layer name) and integer literals (SRID, feature cap) are templated
//! into the query text.

use crate::error::Error;
use crate::mercator::Envelope;
use crate::source::DataSourceDescriptor;

/// Tile pixel-grid resolution, per the MVT convention.
pub const MVT_EXTENT: u32 = 4096;

/// The affine mapping from EPSG:3857 into tile-local pixel space.
///
/// `fy` is negative: the tile pixel grid is in image space with the
/// origin at the top-left, so the vertical axis flips relative to
/// mercator's north-up axis. Losing that sign mirrors every tile
/// vertically without any error being raised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelTransform {
    pub fx: f64,
    pub fy: f64,
    pub xoff: f64,
    pub yoff: f64,
}

impl PixelTransform {
    pub fn from_envelope(env: &Envelope) -> PixelTransform {
        let fx = f64::from(MVT_EXTENT) / env.width();
        let fy = -f64::from(MVT_EXTENT) / env.height();
        PixelTransform {
            fx,
            fy,
            xoff: -env.xmin * fx,
            yoff: -env.ymax * fy,
        }
    }
}

/// A rendered extraction query: SQL text plus its ordered numeric
/// binds. Consumed exactly once; every tile has a distinct envelope so
/// there is nothing to cache.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    binds: [f64; 9],
}

impl RenderedQuery {
    /// Bind values in `$1..=$9` order.
    pub fn binds(&self) -> &[f64; 9] {
        &self.binds
    }
}

/// Renders the extraction query for one envelope across all configured
/// sources. Each source becomes one `ST_AsMVT` arm producing a named
/// layer; arms are joined with UNION ALL and share the same binds.
///
/// Pure construction: never touches the database, and fails only on a
/// malformed descriptor.
pub fn render(env: &Envelope, sources: &[DataSourceDescriptor]) -> Result<RenderedQuery, Error> {
    if sources.is_empty() {
        return Err(Error::Descriptor(String::from("no tile sources configured")));
    }

    let arms: Result<Vec<String>, Error> = sources.iter().map(|s| render_arm(s)).collect();
    let transform = PixelTransform::from_envelope(env);

    Ok(RenderedQuery {
        sql: arms?.join(" UNION ALL "),
        binds: [
            env.xmin,
            env.ymin,
            env.xmax,
            env.ymax,
            env.segment_size(),
            transform.fx,
            transform.fy,
            transform.xoff,
            transform.yoff,
        ],
    })
}

fn render_arm(source: &DataSourceDescriptor) -> Result<String, Error> {
    source.validate()?;

    let geom = quote_ident(&source.geometry_column);
    let table = quote_table(&source.table);
    let props_t = prop_list(&source.properties, "t");
    let props_s = prop_list(&source.properties, "s");
    let props_c = prop_list(&source.properties, "c");

    // bounds materializes the densified envelope in EPSG:3857; subset
    // pulls intersecting rows in the source SRS; clipped cuts them to
    // the envelope; pixels applies the affine into the 4096 grid.
    Ok(format!(
        "(WITH bounds AS (\n\
         \x20   SELECT ST_Segmentize(ST_MakeEnvelope($1, $2, $3, $4, 3857), $5) AS geom\n\
         ),\n\
         subset AS (\n\
         \x20   SELECT {props_t}t.{geom} AS geom\n\
         \x20   FROM {table} t, bounds\n\
         \x20   WHERE ST_Intersects(t.{geom}, ST_Transform(bounds.geom, {srid}))\n\
         \x20   LIMIT {cap}\n\
         ),\n\
         clipped AS (\n\
         \x20   SELECT {props_s}ST_Intersection(ST_Transform(s.geom, 3857), bounds.geom) AS geom\n\
         \x20   FROM subset s, bounds\n\
         ),\n\
         pixels AS (\n\
         \x20   SELECT {props_c}ST_SnapToGrid(ST_Affine(c.geom, $6, 0, 0, $7, $8, $9), 1) AS geom\n\
         \x20   FROM clipped c\n\
         )\n\
         SELECT ST_AsMVT(pixels.*, '{layer}', {extent}, 'geom') FROM pixels)",
        props_t = props_t,
        props_s = props_s,
        props_c = props_c,
        geom = geom,
        table = table,
        srid = source.srid,
        cap = source.max_features,
        layer = source.name,
        extent = MVT_EXTENT,
    ))
}

fn prop_list(properties: &[String], alias: &str) -> String {
    properties
        .iter()
        .map(|p| format!("{}.{}, ", alias, quote_ident(p)))
        .collect()
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident)
}

// Schema-qualified table names quote each part separately.
fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}
