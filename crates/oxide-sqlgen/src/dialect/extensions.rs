//! Optional vector and geospatial extensions.

use crate::error::{Error, Result};
use crate::fragment::Fragment;

/// Distance metric for vector similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorMetric {
    L2,
    Cosine,
    /// Negative inner product, so smaller is closer like the others.
    InnerProduct,
}

/// Vector similarity operations.
pub trait VectorOps: Send + Sync {
    /// Distance between a vector column and a query vector.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn distance(&self, column: Fragment, query: &[f32], metric: VectorMetric) -> Result<Fragment>;

    /// Casts a bound vector literal to the vector type.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn cast_vector(&self, query: &[f32]) -> Result<Fragment>;
}

/// Geospatial operations on WGS 84 points.
pub trait GeoOps: Send + Sync {
    /// A point from longitude and latitude.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn point(&self, longitude: f64, latitude: f64) -> Result<Fragment>;

    /// Distance in meters.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn distance(&self, a: Fragment, b: Fragment) -> Result<Fragment>;

    /// `column` lies within `meters` of the point.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn within_distance(
        &self,
        column: Fragment,
        longitude: f64,
        latitude: f64,
        meters: f64,
    ) -> Result<Fragment>;

    /// `a` contains `b`.
    ///
    /// # Errors
    ///
    /// Fails when the extension is unavailable.
    fn contains(&self, a: Fragment, b: Fragment) -> Result<Fragment>;
}

/// Text form accepted by pgvector: `[1,2.5,3]`.
#[must_use]
pub fn vector_text(values: &[f32]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(","))
}

/// Stand-in for an extension the dialect or database lacks.
#[derive(Debug, Clone)]
pub struct Unsupported {
    pub dialect: &'static str,
    pub feature: &'static str,
    pub suggestion: &'static str,
}

impl Unsupported {
    /// The error every method of this marker returns.
    #[must_use]
    pub fn error(&self, method: &str) -> Error {
        Error::not_supported(self.dialect, self.feature, method, self.suggestion)
    }
}

impl VectorOps for Unsupported {
    fn distance(&self, _: Fragment, _: &[f32], _: VectorMetric) -> Result<Fragment> {
        Err(self.error("vector.distance"))
    }

    fn cast_vector(&self, _: &[f32]) -> Result<Fragment> {
        Err(self.error("vector.cast_vector"))
    }
}

impl GeoOps for Unsupported {
    fn point(&self, _: f64, _: f64) -> Result<Fragment> {
        Err(self.error("geo.point"))
    }

    fn distance(&self, _: Fragment, _: Fragment) -> Result<Fragment> {
        Err(self.error("geo.distance"))
    }

    fn within_distance(&self, _: Fragment, _: f64, _: f64, _: f64) -> Result<Fragment> {
        Err(self.error("geo.within_distance"))
    }

    fn contains(&self, _: Fragment, _: Fragment) -> Result<Fragment> {
        Err(self.error("geo.contains"))
    }
}

/// pgvector on PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgVector;

impl VectorOps for PgVector {
    fn distance(&self, column: Fragment, query: &[f32], metric: VectorMetric) -> Result<Fragment> {
        let op = match metric {
            VectorMetric::L2 => " <-> ",
            VectorMetric::Cosine => " <=> ",
            VectorMetric::InnerProduct => " <#> ",
        };
        Ok(column.with_raw(op).then(self.cast_vector(query)?).parens())
    }

    fn cast_vector(&self, query: &[f32]) -> Result<Fragment> {
        Ok(Fragment::param(vector_text(query)).with_raw("::vector"))
    }
}

/// PostGIS on PostgreSQL. Distances use the geography type so they come
/// out in meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostGis;

impl GeoOps for PostGis {
    fn point(&self, longitude: f64, latitude: f64) -> Result<Fragment> {
        Ok(Fragment::raw("ST_SetSRID(ST_MakePoint(")
            .with_param(longitude)
            .with_raw(", ")
            .with_param(latitude)
            .with_raw("), 4326)"))
    }

    fn distance(&self, a: Fragment, b: Fragment) -> Result<Fragment> {
        Ok(Fragment::raw("ST_Distance(")
            .then(a)
            .with_raw("::geography, ")
            .then(b)
            .with_raw("::geography)"))
    }

    fn within_distance(
        &self,
        column: Fragment,
        longitude: f64,
        latitude: f64,
        meters: f64,
    ) -> Result<Fragment> {
        Ok(Fragment::raw("ST_DWithin(")
            .then(column)
            .with_raw("::geography, ")
            .then(self.point(longitude, latitude)?)
            .with_raw("::geography, ")
            .with_param(meters)
            .with_raw(")"))
    }

    fn contains(&self, a: Fragment, b: Fragment) -> Result<Fragment> {
        Ok(Fragment::raw("ST_Contains(").then(a).with_raw(", ").then(b).with_raw(")"))
    }
}

/// MySQL spatial functions (8.0+).
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlSpatial;

impl GeoOps for MySqlSpatial {
    fn point(&self, longitude: f64, latitude: f64) -> Result<Fragment> {
        Ok(Fragment::raw("ST_SRID(POINT(")
            .with_param(longitude)
            .with_raw(", ")
            .with_param(latitude)
            .with_raw("), 4326)"))
    }

    fn distance(&self, a: Fragment, b: Fragment) -> Result<Fragment> {
        Ok(Fragment::raw("ST_Distance_Sphere(")
            .then(a)
            .with_raw(", ")
            .then(b)
            .with_raw(")"))
    }

    fn within_distance(
        &self,
        column: Fragment,
        longitude: f64,
        latitude: f64,
        meters: f64,
    ) -> Result<Fragment> {
        Ok(self
            .distance(column, self.point(longitude, latitude)?)?
            .with_raw(" <= ")
            .with_param(meters))
    }

    fn contains(&self, a: Fragment, b: Fragment) -> Result<Fragment> {
        Ok(Fragment::raw("ST_Contains(").then(a).with_raw(", ").then(b).with_raw(")"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::PlaceholderStyle;
    use crate::value::SqlValue;

    #[test]
    fn pgvector_distance() {
        let (sql, params) = PgVector
            .distance(Fragment::raw("\"embedding\""), &[1.0, 2.5], VectorMetric::Cosine)
            .map(|f| f.render(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(sql, r#"("embedding" <=> $1::vector)"#);
        assert_eq!(params, vec![SqlValue::Text("[1,2.5]".into())]);
    }

    #[test]
    fn postgis_within_distance() {
        let sql = PostGis
            .within_distance(Fragment::raw("\"location\""), 13.4, 52.5, 1000.0)
            .map(|f| f.sql(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(
            sql,
            r#"ST_DWithin("location"::geography, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)"#
        );
    }

    #[test]
    fn mysql_distance_sphere() {
        let sql = MySqlSpatial
            .within_distance(Fragment::raw("`location`"), 13.4, 52.5, 1000.0)
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(
            sql,
            "ST_Distance_Sphere(`location`, ST_SRID(POINT(?, ?), 4326)) <= ?"
        );
    }

    #[test]
    fn unsupported_reports_method() {
        let marker = Unsupported {
            dialect: "sqlite",
            feature: "vector search",
            suggestion: "use PostgreSQL with pgvector",
        };
        let err = VectorOps::distance(&marker, Fragment::raw("v"), &[1.0], VectorMetric::L2)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("vector.distance"), "{err}");
        assert!(err.contains("sqlite"), "{err}");
    }
}
