//! Normalization of persisted catalog records.
//!
//! Stores hand back whatever shape their columns happen to have. Every read
//! goes through [`normalize`] so that type drift (string ids, `"true"`/`1`
//! flags, empty strings standing in for `null`) never reaches the
//! reservation rules. Normalization is total: unreadable values degrade to
//! safe defaults instead of failing.

use crate::types::{CarolId, CatalogItem, RawCatalogItem, Team};
use serde_json::Value;

/// Converts a raw record into its canonical form.
///
/// Idempotent: `normalize(&RawCatalogItem::from(&normalize(x))) == normalize(x)`.
#[must_use]
pub fn normalize(raw: &RawCatalogItem) -> CatalogItem {
    CatalogItem {
        id: normalize_id(&raw.id),
        name: normalize_name(&raw.name),
        selected: normalize_selected(&raw.selected),
        branch: normalize_text(&raw.branch),
        team: normalize_text(&raw.team).and_then(|t| t.parse::<Team>().ok()),
    }
}

/// Normalizes a batch of raw records, preserving order.
#[must_use]
pub fn normalize_all(raws: &[RawCatalogItem]) -> Vec<CatalogItem> {
    raws.iter().map(normalize).collect()
}

#[allow(clippy::cast_possible_truncation)] // integral values only
fn normalize_id(value: &Value) -> CarolId {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.map_or(CarolId::UNASSIGNED, CarolId::new)
}

fn normalize_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn normalize_selected(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Empty or missing text collapses to `None`.
fn normalize_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawCatalogItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_ids_are_parsed() {
        let item = normalize(&raw(json!({"id": "7", "name": "Silent Night"})));
        assert_eq!(item.id, CarolId::new(7));
        assert_eq!(item.name, "Silent Night");
    }

    #[test]
    fn test_unreadable_ids_collapse_to_unassigned() {
        assert_eq!(normalize(&raw(json!({"id": "abc"}))).id, CarolId::UNASSIGNED);
        assert_eq!(normalize(&raw(json!({"id": null}))).id, CarolId::UNASSIGNED);
        assert_eq!(normalize(&raw(json!({}))).id, CarolId::UNASSIGNED);
        assert_eq!(normalize(&raw(json!({"id": 2.5}))).id, CarolId::UNASSIGNED);
        assert_eq!(normalize(&raw(json!({"id": 4.0}))).id, CarolId::new(4));
    }

    #[test]
    fn test_selected_accepts_only_truthy_forms() {
        for truthy in [json!(true), json!("true"), json!(1), json!("1")] {
            assert!(normalize(&raw(json!({"id": 1, "selected": truthy}))).selected);
        }
        for falsy in [
            json!(false),
            json!("false"),
            json!(0),
            json!("0"),
            json!("TRUE"),
            json!(2),
            json!(null),
            json!("yes"),
        ] {
            assert!(!normalize(&raw(json!({"id": 1, "selected": falsy}))).selected);
        }
        assert!(!normalize(&raw(json!({"id": 1}))).selected);
    }

    #[test]
    fn test_empty_branch_and_team_collapse_to_none() {
        let item = normalize(&raw(json!({"id": 1, "branch": "", "team": ""})));
        assert_eq!(item.branch, None);
        assert_eq!(item.team, None);

        let item = normalize(&raw(json!({"id": 1, "branch": null})));
        assert_eq!(item.branch, None);

        let item = normalize(&raw(json!({"id": 1, "branch": "Kelaniya", "team": "Team 2"})));
        assert_eq!(item.branch.as_deref(), Some("Kelaniya"));
        assert_eq!(item.team, Some(Team::Team2));
    }
}
