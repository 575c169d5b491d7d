use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::{Validate, ValidationError};

use super::{invalid, not_blank};
use crate::repository::{Entity, FilterValue, Filterable, PgEntity, SqlValue, UniqueKey};

/// A motorcycle checked into the yard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motorcycle {
    pub id: i64,
    pub license_plate: String,
    pub rfid: String,
    pub problem_description: String,
    pub portal_id: i64,
    pub entry_date: DateTime<Utc>,
    pub availability_forecast: DateTime<Utc>,
    pub brand: Option<String>,
    pub year: Option<i32>,
}

impl Motorcycle {
    /// Days between entry and forecast availability
    pub fn maintenance_days(&self) -> f64 {
        let span = self.availability_forecast - self.entry_date;
        span.num_seconds() as f64 / 86_400.0
    }
}

/// Create/replace body for a motorcycle
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule"))]
pub struct MotorcyclePayload {
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "not_blank")
    )]
    pub license_plate: String,

    #[validate(
        length(min = 1, max = 64, message = "must be between 1 and 64 characters"),
        custom(function = "not_blank")
    )]
    pub rfid: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub problem_description: String,

    #[validate(range(min = 1, message = "must be a positive portal id"))]
    pub portal_id: i64,

    pub entry_date: DateTime<Utc>,

    pub availability_forecast: DateTime<Utc>,

    #[serde(default)]
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub brand: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1900, max = 2100, message = "must be between 1900 and 2100"))]
    pub year: Option<i32>,
}

fn validate_schedule(payload: &MotorcyclePayload) -> Result<(), ValidationError> {
    if payload.entry_date > payload.availability_forecast {
        return Err(invalid(
            "schedule",
            "availabilityForecast must not be earlier than entryDate",
        ));
    }
    Ok(())
}

impl From<MotorcyclePayload> for Motorcycle {
    fn from(payload: MotorcyclePayload) -> Self {
        Self {
            id: 0,
            license_plate: payload.license_plate,
            rfid: payload.rfid,
            problem_description: payload.problem_description,
            portal_id: payload.portal_id,
            entry_date: payload.entry_date,
            availability_forecast: payload.availability_forecast,
            brand: payload.brand.filter(|b| !b.trim().is_empty()),
            year: payload.year,
        }
    }
}

impl Filterable for Motorcycle {
    fn column_value(&self, column: &str) -> Option<FilterValue> {
        match column {
            "license_plate" => Some(self.license_plate.clone().into()),
            "rfid" => Some(self.rfid.clone().into()),
            "portal_id" => Some(self.portal_id.into()),
            "brand" => self.brand.clone().map(FilterValue::from),
            "year" => self.year.map(FilterValue::from),
            _ => None,
        }
    }
}

impl Entity for Motorcycle {
    const NAME: &'static str = "Motorcycle";

    fn id(&self) -> i64 {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("motorcycles_license_plate_key", &self.license_plate),
            UniqueKey::new("motorcycles_rfid_key", &self.rfid),
        ]
    }
}

impl<'r> FromRow<'r, PgRow> for Motorcycle {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            license_plate: row.try_get("license_plate")?,
            rfid: row.try_get("rfid")?,
            problem_description: row.try_get("problem_description")?,
            portal_id: row.try_get("portal_id")?,
            entry_date: row.try_get("entry_date")?,
            availability_forecast: row.try_get("availability_forecast")?,
            brand: row.try_get("brand")?,
            year: row.try_get("year")?,
        })
    }
}

impl PgEntity for Motorcycle {
    const TABLE: &'static str = "motorcycles";

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("license_plate", SqlValue::Text(Some(self.license_plate.clone()))),
            ("rfid", SqlValue::Text(Some(self.rfid.clone()))),
            (
                "problem_description",
                SqlValue::Text(Some(self.problem_description.clone())),
            ),
            ("portal_id", SqlValue::BigInt(Some(self.portal_id))),
            ("entry_date", SqlValue::Timestamp(Some(self.entry_date))),
            (
                "availability_forecast",
                SqlValue::Timestamp(Some(self.availability_forecast)),
            ),
            ("brand", SqlValue::Text(self.brand.clone())),
            ("year", SqlValue::Int(self.year)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload() -> MotorcyclePayload {
        MotorcyclePayload {
            license_plate: "ABC1D23".into(),
            rfid: "RFID-0001".into(),
            problem_description: "Brake pads".into(),
            portal_id: 1,
            entry_date: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            availability_forecast: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            brand: Some("Honda".into()),
            year: Some(2022),
        }
    }

    #[test]
    fn test_valid_payload() {
        assert!(payload().validate().is_ok());
        let bike = Motorcycle::from(payload());
        assert_eq!(bike.id, 0);
        assert!((bike.maintenance_days() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_forecast_before_entry_is_rejected() {
        let mut p = payload();
        p.availability_forecast = p.entry_date - chrono::Duration::days(1);
        let errors = p.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }

    #[test]
    fn test_field_limits() {
        let mut p = payload();
        p.license_plate = "X".repeat(21);
        p.portal_id = 0;
        let errors = p.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("license_plate"));
        assert!(fields.contains_key("portal_id"));
    }

    #[test]
    fn test_blank_plate_is_rejected() {
        let mut p = payload();
        p.license_plate = "   ".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_camel_case_body() {
        let json = serde_json::json!({
            "licensePlate": "XYZ9A87",
            "rfid": "R-2",
            "portalId": 3,
            "entryDate": "2024-03-01T08:00:00Z",
            "availabilityForecast": "2024-03-02T08:00:00Z",
            "year": 2021
        });
        let p: MotorcyclePayload = serde_json::from_value(json).unwrap();
        assert_eq!(p.portal_id, 3);
        assert!(p.brand.is_none());
        assert_eq!(p.problem_description, "");
    }

    #[test]
    fn test_filterable_columns() {
        let bike = Motorcycle::from(payload());
        assert_eq!(bike.column_value("brand"), Some(FilterValue::from("Honda")));
        assert_eq!(bike.column_value("year"), Some(FilterValue::Integer(2022)));
        assert_eq!(bike.column_value("portal_id"), Some(FilterValue::Integer(1)));
        assert_eq!(bike.column_value("unknown"), None);
    }
}
