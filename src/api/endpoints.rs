//! Fixed registry of FOIS dashboard endpoints
//!
//! Each endpoint has a resource path, a zone predicate and a destination
//! table. The set is closed: selection by name or 1-based index is
//! validated once at startup.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Row;

/// Supported FOIS endpoints, in canonical processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Pending indents (`pndgindt`)
    PendingIndents,
    /// Placement/release detention (`plctresndttn`)
    PlacementDetention,
    /// Weight, lead, NTKM and freight by origin/destination (`wghtleadntkmfrgt`)
    OriginDestination,
}

/// Row predicate over zone fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneFilter {
    /// `field == zone`
    Field(&'static str),
    /// Any of the fields equals the zone
    AnyOf(&'static [&'static str]),
}

impl ZoneFilter {
    /// Whether a row belongs to `zone`
    ///
    /// The field value must equal `zone` exactly; padded values and rows
    /// missing the field never match.
    pub fn matches(&self, row: &Row, zone: &str) -> bool {
        let field_is = |field: &str| row.get(field).and_then(|v| v.as_str()) == Some(zone);

        match self {
            Self::Field(field) => field_is(field),
            Self::AnyOf(fields) => fields.iter().any(|f| field_is(f)),
        }
    }

    /// Keep only rows for `zone`
    pub fn apply(&self, rows: Vec<Row>, zone: &str) -> Vec<Row> {
        rows.into_iter().filter(|row| self.matches(row, zone)).collect()
    }
}

const OD_ZONE_FIELDS: &[&str] = &["dstnzone", "srczone"];

impl Endpoint {
    /// Get all endpoints in canonical order
    pub fn all() -> Vec<Self> {
        vec![
            Self::PendingIndents,
            Self::PlacementDetention,
            Self::OriginDestination,
        ]
    }

    /// Resource path segment appended to the API base
    pub fn path(&self) -> &'static str {
        match self {
            Self::PendingIndents => "pndgindt",
            Self::PlacementDetention => "plctresndttn",
            Self::OriginDestination => "wghtleadntkmfrgt",
        }
    }

    /// Destination table name
    pub fn table(&self) -> &'static str {
        match self {
            Self::PendingIndents => "fois_indent_data",
            Self::PlacementDetention => "fois_detn_data",
            Self::OriginDestination => "fois_od_data",
        }
    }

    pub fn zone_filter(&self) -> ZoneFilter {
        match self {
            Self::PendingIndents | Self::PlacementDetention => ZoneFilter::Field("zone"),
            Self::OriginDestination => ZoneFilter::AnyOf(OD_ZONE_FIELDS),
        }
    }

    /// 1-based position in the registry
    pub fn index(&self) -> usize {
        match self {
            Self::PendingIndents => 1,
            Self::PlacementDetention => 2,
            Self::OriginDestination => 3,
        }
    }

    /// Create from a path, a table name (with or without `df_`) or a 1-based index
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();

        if let Ok(idx) = key.parse::<usize>() {
            return Self::all().into_iter().find(|e| e.index() == idx);
        }

        let key = key.strip_prefix("df_").unwrap_or(&key);
        Self::all()
            .into_iter()
            .find(|e| e.path() == key || e.table() == key)
    }

    /// Resolve a user selector, failing with a validation error
    pub fn resolve(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            let valid = Self::all()
                .iter()
                .map(|e| format!("{} ({})", e.path(), e.index()))
                .collect::<Vec<_>>()
                .join(", ");
            Error::validation(format!("Unknown endpoint '{}'. Valid: {valid}", s.trim()))
        })
    }

    /// Endpoints selected by an optional selector; `None` means all
    pub fn select(selector: Option<&str>) -> Result<Vec<Self>> {
        match selector {
            Some(s) => Ok(vec![Self::resolve(s)?]),
            None => Ok(Self::all()),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}
