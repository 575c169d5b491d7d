use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use super::not_blank;
use crate::repository::{Entity, FilterValue, Filterable, PgEntity, SqlValue};

/// Kind of service lane a portal leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalType {
    QuickMaintenance,
    SlowMaintenance,
    Repair,
    Police,
}

impl PortalType {
    pub const ALL: [PortalType; 4] = [
        Self::QuickMaintenance,
        Self::SlowMaintenance,
        Self::Repair,
        Self::Police,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickMaintenance => "QUICK_MAINTENANCE",
            Self::SlowMaintenance => "SLOW_MAINTENANCE",
            Self::Repair => "REPAIR",
            Self::Police => "POLICE",
        }
    }
}

impl fmt::Display for PortalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown portal type '{s}'"))
    }
}

/// Entry gate of the yard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: PortalType,
    pub name: String,
}

/// Create/replace body for a portal
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PortalPayload {
    #[serde(rename = "type")]
    pub kind: PortalType,

    #[validate(
        length(min = 1, max = 150, message = "must be between 1 and 150 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
}

impl From<PortalPayload> for Portal {
    fn from(payload: PortalPayload) -> Self {
        Self {
            id: 0,
            kind: payload.kind,
            name: payload.name,
        }
    }
}

impl Filterable for Portal {
    fn column_value(&self, column: &str) -> Option<FilterValue> {
        match column {
            "portal_type" => Some(self.kind.as_str().into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Portal {
    const NAME: &'static str = "Portal";

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

impl<'r> FromRow<'r, PgRow> for Portal {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("portal_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            kind: kind.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "portal_type".to_string(),
                source: e.into(),
            })?,
            name: row.try_get("name")?,
        })
    }
}

impl PgEntity for Portal {
    const TABLE: &'static str = "portals";

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("portal_type", SqlValue::Text(Some(self.kind.as_str().to_string()))),
            ("name", SqlValue::Text(Some(self.name.clone()))),
        ]
    }
}
