use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use super::not_blank;
use crate::repository::{Entity, FilterValue, Filterable, PgEntity, SqlValue, UniqueKey};

/// Access level carried by users and their tokens
///
/// Accepts either the name (`"ADMIN"`) or the numeric code (`3`) on input and
/// always serializes as the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "RoleRepr")]
pub enum Role {
    #[default]
    User,
    Operator,
    Manager,
    Admin,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<RoleRepr> for Role {
    type Error = String;

    fn try_from(repr: RoleRepr) -> Result<Self, Self::Error> {
        match repr {
            RoleRepr::Code(code) => Role::from_code(code),
            RoleRepr::Name(name) => name.parse(),
        }
    }
}

impl Role {
    pub const ALL: [Role; 4] = [Self::User, Self::Operator, Self::Manager, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Operator => "OPERATOR",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Role for a numeric code in `0..=3`
    pub fn from_code(code: u8) -> Result<Self, String> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| format!("role code must be between 0 and 3, got {code}"))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Registered account; the password hash never leaves the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New, not yet stored user
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// Create/replace body for a user; also the registration body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(
        length(min = 1, max = 150, message = "must be between 1 and 150 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,

    #[validate(
        email(message = "must be a valid email address"),
        length(max = 254, message = "must be at most 254 characters")
    )]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "must be between 1 and 128 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: Role,
}

impl Filterable for User {
    fn column_value(&self, column: &str) -> Option<FilterValue> {
        match column {
            "email" => Some(self.email.clone().into()),
            "role" => Some(self.role.as_str().into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("users_email_key", &self.email)]
    }

    fn preserve(mut self, previous: &Self) -> Self {
        self.created_at = previous.created_at;
        self
    }
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "role".to_string(),
                source: e.into(),
            })?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgEntity for User {
    const TABLE: &'static str = "users";
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["created_at"];

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("name", SqlValue::Text(Some(self.name.clone()))),
            ("email", SqlValue::Text(Some(self.email.clone()))),
            ("password_hash", SqlValue::Text(Some(self.password_hash.clone()))),
            ("role", SqlValue::Text(Some(self.role.as_str().to_string()))),
            ("created_at", SqlValue::Timestamp(Some(self.created_at))),
        ]
    }
}
