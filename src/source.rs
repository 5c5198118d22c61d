//! Descriptions of the PostGIS tables tiles are conjured from.

use serde::Deserialize;

use crate::error::Error;

fn default_max_features() -> i64 {
    10_000
}

fn default_srid() -> i32 {
    4326
}

/// A single PostGIS-backed tile source. Each descriptor becomes one
/// named layer in the rendered tile.
///
/// Fixed at startup and shared read-only across requests; validation
/// of the identifiers happens once, in [`DataSourceDescriptor::validate`],
/// so query rendering can treat the descriptor as trusted.
#[derive(Clone, Deserialize, Debug)]
pub struct DataSourceDescriptor {
    /// Layer name emitted into the tile.
    pub name: String,
    /// Table (optionally schema-qualified) holding the features.
    pub table: String,
    pub geometry_column: String,
    /// SRID the table's geometry is stored in.
    #[serde(default = "default_srid")]
    pub srid: i32,
    /// Property columns exposed as feature attributes.
    #[serde(default)]
    pub properties: Vec<String>,
    /// Cardinality cap on features pulled into a single tile.
    #[serde(default = "default_max_features")]
    pub max_features: i64,
}

impl DataSourceDescriptor {
    /// Startup-time sanity check. A descriptor that fails here never
    /// reaches query rendering.
    pub fn validate(&self) -> Result<(), Error> {
        check_ident(&self.name, "layer name")?;
        check_ident(&self.table, "table")?;
        check_ident(&self.geometry_column, "geometry column")?;
        for prop in &self.properties {
            check_ident(prop, "property column")?;
        }
        if self.srid <= 0 {
            return Err(Error::Descriptor(format!(
                "source '{}' has invalid SRID {}",
                self.name, self.srid
            )));
        }
        if self.max_features <= 0 {
            return Err(Error::Descriptor(format!(
                "source '{}' has non-positive feature cap {}",
                self.name, self.max_features
            )));
        }
        Ok(())
    }
}

fn check_ident(ident: &str, what: &str) -> Result<(), Error> {
    if ident.is_empty() {
        return Err(Error::Descriptor(format!("missing {}", what)));
    }
    if ident.contains('"') || ident.contains('\'') || ident.contains('\0') {
        return Err(Error::Descriptor(format!(
            "{} '{}' contains quoting characters",
            what, ident
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_descriptor() -> DataSourceDescriptor {
    DataSourceDescriptor {
        name: String::from("ships"),
        table: String::from("public.ships"),
        geometry_column: String::from("trip"),
        srid: 4326,
        properties: vec![String::from("mmsi")],
        max_features: 10_000,
    }
}
