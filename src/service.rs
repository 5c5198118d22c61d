//! Per-request orchestration: path → envelope → query → tile bytes.

use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use sqlx::{PgPool, Row};

use crate::error::Error;
use crate::mercator::{tile_envelope, Envelope};
use crate::query::{self, RenderedQuery};
use crate::source::DataSourceDescriptor;
use crate::tile::{self, TileAddress};
use crate::TileSource;

pub const MVT_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";

/// A successfully rendered tile, ready for the transport to frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTile {
    pub payload: Vec<u8>,
    pub content_type: &'static str,
}

/// The long-lived tile renderer. Holds the connection pool (lazily
/// connecting, one checkout per request) and the source descriptors.
///
/// All request-scoped state lives on the stack of `serve_tile`, so a
/// single instance is shared freely across transport tasks.
#[derive(Debug)]
pub struct TileService {
    pool: PgPool,
    target: String,
    sources: Vec<DataSourceDescriptor>,
}

impl TileService {
    /// Builds the service, rejecting malformed descriptors up front.
    ///
    /// `target` is a password-free description of the database the
    /// pool points at, used in error bodies when it cannot be reached.
    pub fn new(
        pool: PgPool,
        target: String,
        sources: Vec<DataSourceDescriptor>,
    ) -> Result<TileService, Error> {
        if sources.is_empty() {
            return Err(Error::Descriptor(String::from("no tile sources configured")));
        }
        for source in &sources {
            source.validate()?;
        }
        Ok(TileService {
            pool,
            target,
            sources,
        })
    }

    /// Serves one tile request from a raw `/{z}/{x}/{y}.{format}` path.
    pub async fn serve_tile(&self, path: &str) -> Result<RenderedTile, Error> {
        let addr = TileAddress::parse(path).map_err(|e| Error::bad_request(path, e))?;
        addr.validate().map_err(|e| Error::bad_request(path, e))?;

        let env = tile_envelope(addr.zoom, addr.x, addr.y);
        info!(
            "path: {} tile: {}/{}/{} env: {:?}",
            path, addr.zoom, addr.x, addr.y, env
        );

        let payload = self.render_envelope(&env).await?;
        Ok(RenderedTile {
            payload,
            content_type: MVT_CONTENT_TYPE,
        })
    }

    /// Renders and runs the extraction query for one envelope.
    async fn render_envelope(&self, env: &Envelope) -> Result<Vec<u8>, Error> {
        let rendered = query::render(env, &self.sources)?;
        info!("sql: {}", rendered.sql);
        self.execute(&rendered).await
    }

    /// Runs a rendered query, collecting one layer blob per row.
    async fn execute(&self, rendered: &RenderedQuery) -> Result<Vec<u8>, Error> {
        let query = rendered
            .binds()
            .iter()
            .fold(sqlx::query(&rendered.sql), |q, bind| q.bind(*bind));

        let mut layers: Vec<Option<Vec<u8>>> = Vec::new();
        let mut stream = query.fetch(&self.pool);
        while let Some(row) = stream.try_next().await.map_err(|e| self.classify(e))? {
            layers.push(
                row.try_get(0)
                    .map_err(|source| Error::QueryFailed { source })?,
            );
        }

        concat_layers(layers)
    }

    // Connection-level trouble is Unavailable and clears up on a later
    // request; anything the backend said about the query is QueryFailed.
    fn classify(&self, err: sqlx::Error) -> Error {
        match err {
            e @ (sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed) => Error::Unavailable {
                target: self.target.clone(),
                source: e,
            },
            other => Error::QueryFailed { source: other },
        }
    }
}

/// Concatenates per-layer tile blobs into one payload. A NULL layer is
/// an empty tile, not a failure. A cursor with no rows at all is a
/// failure: the ST_AsMVT aggregate emits a row per layer, so a missing
/// row means the query never ran to completion.
fn concat_layers(layers: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, Error> {
    if layers.is_empty() {
        return Err(Error::EmptyCursor);
    }
    let mut payload: Vec<u8> = Vec::new();
    for layer in layers.into_iter().flatten() {
        payload.extend_from_slice(&layer);
    }
    Ok(payload)
}

#[async_trait]
impl TileSource for TileService {
    async fn render_mvt(&self, zoom: u8, x: i64, y: i64) -> Result<Vec<u8>, Error> {
        tile::check_bounds(zoom, x, y)
            .map_err(|e| Error::bad_request(&format!("{}/{}/{}", zoom, x, y), e))?;
        let env = tile_envelope(zoom, x, y);
        self.render_envelope(&env).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_descriptor;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    fn lazy_service() -> TileService {
        let options = PgConnectOptions::new()
            .host("localhost")
            .port(5432)
            .username("docker")
            .database("tiles");
        let pool = PgPoolOptions::new().connect_lazy_with(options);
        TileService::new(
            pool,
            String::from("postgres://docker@localhost:5432/tiles"),
            vec![test_descriptor()],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_bad_configuration() {
        let pool = PgPoolOptions::new().connect_lazy_with(PgConnectOptions::new());

        let err = TileService::new(pool.clone(), String::new(), vec![]).unwrap_err();
        assert!(matches!(err, Error::Descriptor(_)));

        let mut desc = test_descriptor();
        desc.table = String::new();
        let err = TileService::new(pool, String::new(), vec![desc]).unwrap_err();
        assert!(matches!(err, Error::Descriptor(_)));
    }

    #[tokio::test]
    async fn test_serve_tile_rejects_bad_paths_before_touching_the_pool() {
        let service = lazy_service();

        for path in ["/nope", "/1/1/0.png", "/2/4/0.pbf", "/1/-1/0.pbf"] {
            match service.serve_tile(path).await {
                Err(Error::BadRequest { path: p, .. }) => assert_eq!(p, path),
                other => panic!("expected BadRequest for {}, got {:?}", path, other.err()),
            }
        }
    }

    #[tokio::test]
    async fn test_render_mvt_bounds_its_inputs() {
        let service = lazy_service();

        // shift-overflowing zooms and off-pyramid tiles fail cleanly
        // without reaching the envelope math or the pool
        for (zoom, x, y) in [(64u8, 0i64, 0i64), (255, 0, 0), (1, 2, 0), (1, 0, -1)] {
            match service.render_mvt(zoom, x, y).await {
                Err(Error::BadRequest { path, .. }) => {
                    assert_eq!(path, format!("{}/{}/{}", zoom, x, y))
                }
                other => panic!("expected BadRequest, got {:?}", other.err()),
            }
        }
    }

    #[tokio::test]
    async fn test_error_classification() {
        let service = lazy_service();

        let err = service.classify(sqlx::Error::PoolTimedOut);
        match err {
            Error::Unavailable { target, .. } => {
                assert_eq!(target, "postgres://docker@localhost:5432/tiles")
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }

        let err = service.classify(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::QueryFailed { .. }));
    }

    #[test]
    fn test_concat_layers_joins_layer_blobs_in_row_order() {
        let payload =
            concat_layers(vec![Some(vec![1, 2]), Some(vec![3]), Some(vec![])]).unwrap();
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_null_layer_is_an_empty_tile() {
        let payload = concat_layers(vec![None]).unwrap();
        assert!(payload.is_empty());

        let payload = concat_layers(vec![Some(vec![7]), None]).unwrap();
        assert_eq!(payload, vec![7]);
    }

    #[test]
    fn test_rowless_cursor_is_a_failure() {
        assert!(matches!(concat_layers(vec![]), Err(Error::EmptyCursor)));
    }
}
