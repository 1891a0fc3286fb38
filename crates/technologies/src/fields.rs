//! Declarative field tables for reading technologies from JSON.
//!
//! Each variant lists its recognized keys with a setter. One routine walks
//! the input object and dispatches through the table; keys with no entry are
//! logged and skipped.

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    FoodProductionTechnology, ForestProductionTechnology, GenericTechnology, Ghg,
    ProducibleTechnology, Result, TechnologyError,
};

/// Setter for one input key.
pub struct Field<T> {
    pub name: &'static str,
    pub set: fn(&mut T, &Value) -> std::result::Result<(), String>,
}

impl<T> Field<T> {
    pub const fn new(
        name: &'static str,
        set: fn(&mut T, &Value) -> std::result::Result<(), String>,
    ) -> Self {
        Self { name, set }
    }
}

/// Keys every technology carries, consumed before the table walk.
const COMMON_KEYS: &[&str] = &["type", "name", "year"];

/// Apply every key of `object` through `fields`.
pub fn apply_fields<T>(
    target: &mut T,
    object: &Map<String, Value>,
    fields: &[Field<T>],
    technology: &str,
) -> Result<()> {
    for (key, value) in object {
        if COMMON_KEYS.contains(&key.as_str()) {
            continue;
        }
        match fields.iter().find(|field| field.name == key) {
            Some(field) => {
                (field.set)(target, value).map_err(|reason| TechnologyError::InvalidField {
                    technology: technology.to_string(),
                    field: key.clone(),
                    reason,
                })?
            }
            None => warn!(technology, field = %key, "Unrecognized technology field skipped"),
        }
    }
    Ok(())
}

/// Build a technology from its JSON description.
///
/// The `type` key selects the variant; `name` and `year` are required.
pub fn parse_technology(value: &Value) -> Result<Box<dyn ProducibleTechnology>> {
    let object = value.as_object().ok_or(TechnologyError::MissingField("type"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(TechnologyError::MissingField("type"))?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or(TechnologyError::MissingField("name"))?;
    let year = object
        .get("year")
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok())
        .ok_or(TechnologyError::MissingField("year"))?;

    match kind {
        GenericTechnology::XML_NAME => {
            let mut tech = GenericTechnology::new(name, year);
            apply_fields(&mut tech, object, GenericTechnology::FIELDS, name)?;
            Ok(Box::new(tech))
        }
        FoodProductionTechnology::XML_NAME => {
            let mut tech = FoodProductionTechnology::new(name, year, "");
            apply_fields(&mut tech, object, FoodProductionTechnology::FIELDS, name)?;
            require_land_type(tech.food().land_type.as_str())?;
            Ok(Box::new(tech))
        }
        ForestProductionTechnology::XML_NAME => {
            let mut tech = ForestProductionTechnology::new(name, year, "", 0);
            apply_fields(&mut tech, object, ForestProductionTechnology::FIELDS, name)?;
            require_land_type(tech.land_type())?;
            Ok(Box::new(tech))
        }
        other => Err(TechnologyError::UnknownType(other.to_string())),
    }
}

fn require_land_type(land_type: &str) -> Result<()> {
    if land_type.is_empty() {
        return Err(TechnologyError::MissingField("landType"));
    }
    Ok(())
}

pub(crate) fn number(value: &Value) -> std::result::Result<f64, String> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("expected a number, got {value}"))
}

pub(crate) fn integer(value: &Value) -> std::result::Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, got {value}"))
}

pub(crate) fn text(value: &Value) -> std::result::Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("expected a string, got {value}"))
}

pub(crate) fn ghgs(value: &Value) -> std::result::Result<Vec<Ghg>, String> {
    serde_json::from_value(value.clone()).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_forest_technology() {
        let tech = parse_technology(&json!({
            "type": "ForestProductionTechnology",
            "name": "Forest",
            "year": 1975,
            "landType": "Forest",
            "rotationPeriod": 30,
            "calProduction": 100.0,
            "calYield": 2.0,
            "futureProduction": 120.0,
            "ghgs": [{ "name": "CO2", "coefficient": 0.1 }]
        }))
        .unwrap();
        assert_eq!(tech.xml_name(), "ForestProductionTechnology");
        assert_eq!(tech.name(), "Forest");
        assert_eq!(tech.year(), 1975);
        assert_eq!(tech.future_market("Forest").as_deref(), Some("FutureForest"));
        assert_eq!(tech.core().ghgs, vec![Ghg::new("CO2", 0.1)]);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let tech = parse_technology(&json!({
            "type": "GenericTechnology",
            "name": "Mill",
            "year": 1990,
            "capacity": 5.0,
            "color": "green"
        }));
        assert!(tech.is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_technology(&json!({
            "type": "ForestProductionTechnology",
            "name": "Forest",
            "year": 1975,
            "landType": "Forest",
            "calYield": -1.0
        }))
        .unwrap_err();
        assert!(matches!(err, TechnologyError::InvalidField { ref field, .. } if field == "calYield"));

        let err = parse_technology(&json!({ "type": "Steam", "name": "x", "year": 1975 }))
            .unwrap_err();
        assert_eq!(err, TechnologyError::UnknownType("Steam".into()));

        let err = parse_technology(&json!({ "type": "FoodProductionTechnology", "year": 1975 }))
            .unwrap_err();
        assert_eq!(err, TechnologyError::MissingField("name"));
    }

    #[test]
    fn test_land_type_required_for_land_technologies() {
        let err = parse_technology(&json!({
            "type": "FoodProductionTechnology",
            "name": "Corn",
            "year": 1975
        }))
        .unwrap_err();
        assert_eq!(err, TechnologyError::MissingField("landType"));
    }
}
