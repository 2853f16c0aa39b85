use crate::constants::{
    BERLIN_WFS_URL, GEMEINDE_ALIASES, LICENSE_DL_DE_BY, LICENSE_DL_DE_ZERO, UNKNOWN,
};
use crate::types::{Geometry, RiskZone};
use serde_json::{json, Map, Value};

/// Resolves the first usable attribute from an ordered alias list.
///
/// Null and empty-string values fall through to the next alias, matching how
/// the source municipalities leave unused spellings blank.
pub fn resolve_alias<'a>(attributes: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| attributes.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
}

/// Municipality name under any of its known spellings, or the sentinel.
pub fn gemeinde_name(attributes: &Map<String, Value>) -> String {
    match resolve_alias(attributes, GEMEINDE_ALIASES) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Parses a numeric attribute that may use a German decimal comma
/// ("1,2" → 1.2). Plain JSON numbers pass through unchanged.
pub fn parse_german_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Full original attribute set plus fixed source and license tags. This is
/// the record's audit trail and is never dropped.
fn provenance(attributes: &Map<String, Value>, quelle: &str, lizenz: &str) -> Value {
    let mut raw = attributes.clone();
    raw.insert("quelle".to_string(), Value::String(quelle.to_string()));
    raw.insert("lizenz".to_string(), Value::String(lizenz.to_string()));
    Value::Object(raw)
}

/// Normalizes one NRW flood-zone feature into a `geo_hochwasser` row.
///
/// Total over features with geometry: unknown municipality spellings degrade
/// to the sentinel instead of erroring.
pub fn normalize_nrw_flood(
    geometry: Geometry,
    attributes: &Map<String, Value>,
    zone: RiskZone,
    quelle_url: &str,
) -> Value {
    json!({
        "geometry": geometry,
        "risikozone": zone.as_str(),
        "bundesland": "nrw",
        "gemeinde": gemeinde_name(attributes),
        "quelle_url": quelle_url,
        "raw_data": provenance(attributes, "opengeodata_nrw_hwrm", LICENSE_DL_DE_ZERO),
    })
}

/// Normalizes one Berlin WFS feature into a `geo_hochwasser` row.
pub fn normalize_berlin_flood(geometry: Geometry, attributes: &Map<String, Value>) -> Value {
    let quelle_url = attributes
        .get("link")
        .and_then(Value::as_str)
        .unwrap_or(BERLIN_WFS_URL);
    // Berlin ÜSG are HQ100 by definition (§76 WHG)
    json!({
        "geometry": geometry,
        "risikozone": RiskZone::Hq100.as_str(),
        "bundesland": "berlin",
        "gemeinde": "Berlin",
        "quelle_url": quelle_url,
        "raw_data": {
            "sen_id": attributes.get("sen_id").cloned().unwrap_or(Value::Null),
            "uesg": attributes.get("uesg").cloned().unwrap_or(Value::Null),
            "link": attributes.get("link").cloned().unwrap_or(Value::Null),
            "quelle": "gdi_berlin_wfs_ua_uesg",
            "lizenz": LICENSE_DL_DE_ZERO,
        },
    })
}

/// Normalizes one BORIS ground-value feature into a `geo_boris` row.
///
/// Returns `None` when the required BRW value does not parse; the caller
/// counts that record as skipped and moves on.
pub fn normalize_ground_value(
    geometry: Geometry,
    attributes: &Map<String, Value>,
    quelle_url: &str,
) -> Option<Value> {
    let brw_eur = attributes.get("BRW").and_then(parse_german_decimal)?;
    let center = geometry.centroid()?;

    let nuta_code = attributes.get("NUTA").and_then(Value::as_str);
    let entw_code = attributes.get("ENTW").and_then(Value::as_str);
    let gfz = attributes.get("GFZ").and_then(parse_german_decimal);
    let grz = attributes.get("GRZ").and_then(parse_german_decimal);

    Some(json!({
        "gemeinde": gemeinde_name(attributes),
        "bundesland": "nrw",
        "bodenrichtwert_eur": brw_eur,
        "stichtag": attributes.get("STAG").cloned().unwrap_or(Value::Null),
        "richtwertzone": zone_number(attributes),
        "entwicklungszustand": entw_code.map(expand_entwicklungszustand),
        "quelle_url": quelle_url,
        "point": {
            "type": "Point",
            "coordinates": center,
        },
        "raw_data": {
            "nutzungsart_code": nuta_code,
            "nutzungsart": nuta_code.map(expand_nutzungsart),
            "gfz": gfz,
            "grz": grz,
            "ortsteil": attributes.get("ORTST").cloned().unwrap_or(Value::Null),
            "plz": attributes.get("PLZ").cloned().unwrap_or(Value::Null),
            "gemarkung": attributes.get("GEMA").cloned().unwrap_or(Value::Null),
            "gemeindeschluessel": attributes.get("GESL").cloned().unwrap_or(Value::Null),
            "wertermittlungsnummer": attributes.get("WNUM").cloned().unwrap_or(Value::Null),
            "polygon": geometry,
            "quelle": "opengeodata_nrw_brw",
            "lizenz": LICENSE_DL_DE_BY,
        },
    }))
}

/// Zone number as a string; absent or null stays null, and whole numeric
/// zone numbers render without a decimal point.
fn zone_number(attributes: &Map<String, Value>) -> Option<String> {
    match attributes.get("BRWZNR")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?;
            Some(if f.fract() == 0.0 {
                format!("{}", f as i64)
            } else {
                n.to_string()
            })
        }
        other => Some(other.to_string()),
    }
}

/// BORIS Nutzungsart codes; unmapped codes pass through unchanged.
fn expand_nutzungsart(code: &str) -> &str {
    match code {
        "W" => "Wohnbaufläche",
        "WS" => "Kleinsiedlungsgebiet",
        "WR" => "Reines Wohngebiet",
        "WA" => "Allgemeines Wohngebiet",
        "WB" => "Besonderes Wohngebiet",
        "M" => "Gemischte Baufläche",
        "MI" => "Mischgebiet",
        "MK" => "Kerngebiet",
        "MD" => "Dorfgebiet",
        "G" => "Gewerbliche Baufläche",
        "GE" => "Gewerbegebiet",
        "GI" => "Industriegebiet",
        "S" => "Sonderbaufläche",
        "SE" => "Sondergebiet Erholung",
        "SO" => "Sonstiges Sondergebiet",
        "F" => "Fläche der Land-/Forstwirtschaft",
        "LF" => "Land-/Forstwirtschaft",
        "SF" => "Sonstige Fläche",
        "E" => "Sonstige Fläche",
        other => other,
    }
}

/// BORIS Entwicklungszustand codes; unmapped codes pass through unchanged.
fn expand_entwicklungszustand(code: &str) -> &str {
    match code {
        "B" => "Baureifes Land",
        "R" => "Rohbauland",
        "E" => "Erschließungsbeitragsfrei",
        "LF" => "Land-/Forstwirtschaft",
        "SF" => "Sonstige Fläche",
        "ebf" => "Erschließungsbeitragsfrei",
        "ebp" => "Erschließungsbeitragspflichtig",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn polygon() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![[7.0, 51.0], [7.1, 51.0], [7.1, 51.1], [7.0, 51.0]]],
        }
    }

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn alias_resolution_tries_spellings_in_order() {
        let attributes = attrs(json!({"GN": "Wuppertal", "GENA": "Solingen"}));
        assert_eq!(gemeinde_name(&attributes), "Wuppertal");

        let attributes = attrs(json!({"GEMEINDE": null, "GENA": "Solingen"}));
        assert_eq!(gemeinde_name(&attributes), "Solingen");
    }

    #[test]
    fn missing_aliases_and_explicit_sentinel_agree() {
        let explicit = attrs(json!({"gemeinde": "unbekannt"}));
        let absent = attrs(json!({"SHAPE_AREA": 12.5}));
        assert_eq!(gemeinde_name(&explicit), UNKNOWN);
        assert_eq!(gemeinde_name(&absent), UNKNOWN);
    }

    #[test]
    fn german_decimal_parsing() {
        assert_eq!(parse_german_decimal(&json!("1,2")), Some(1.2));
        assert_eq!(parse_german_decimal(&json!("125")), Some(125.0));
        assert_eq!(parse_german_decimal(&json!(540.5)), Some(540.5));
        assert_eq!(parse_german_decimal(&json!("k.A.")), None);
        assert_eq!(parse_german_decimal(&json!(null)), None);
        assert_eq!(parse_german_decimal(&json!("")), None);
    }

    #[test]
    fn flood_row_keeps_full_provenance() {
        let attributes = attrs(json!({"GENA": "Köln", "OBJECTID": 7}));
        let row = normalize_nrw_flood(polygon(), &attributes, RiskZone::HqExtrem, "http://x/y.zip");
        assert_eq!(row["risikozone"], "HQextrem");
        assert_eq!(row["bundesland"], "nrw");
        assert_eq!(row["gemeinde"], "Köln");
        assert_eq!(row["raw_data"]["OBJECTID"], 7);
        assert_eq!(row["raw_data"]["GENA"], "Köln");
        assert_eq!(row["raw_data"]["quelle"], "opengeodata_nrw_hwrm");
        assert_eq!(row["raw_data"]["lizenz"], LICENSE_DL_DE_ZERO);
        assert_eq!(row["geometry"]["type"], "Polygon");
    }

    #[test]
    fn berlin_rows_are_hq100_by_definition() {
        let attributes = attrs(json!({"sen_id": "0101", "link": "https://example.org/0101"}));
        let row = normalize_berlin_flood(polygon(), &attributes);
        assert_eq!(row["risikozone"], "HQ100");
        assert_eq!(row["bundesland"], "berlin");
        assert_eq!(row["gemeinde"], "Berlin");
        assert_eq!(row["quelle_url"], "https://example.org/0101");
        assert_eq!(row["raw_data"]["quelle"], "gdi_berlin_wfs_ua_uesg");
    }

    #[test]
    fn ground_value_row_parses_comma_decimals_and_expands_codes() {
        let attributes = attrs(json!({
            "GENA": "Düsseldorf",
            "BRW": "1250,5",
            "NUTA": "WR",
            "ENTW": "B",
            "GFZ": "1,2",
            "STAG": "2024-01-01",
            "BRWZNR": 1234.0,
        }));
        let row = normalize_ground_value(polygon(), &attributes, "http://x/brw.zip").unwrap();
        assert_eq!(row["bodenrichtwert_eur"], 1250.5);
        assert_eq!(row["richtwertzone"], "1234");
        assert_eq!(row["entwicklungszustand"], "Baureifes Land");
        assert_eq!(row["raw_data"]["nutzungsart"], "Reines Wohngebiet");
        assert_eq!(row["raw_data"]["gfz"], 1.2);
        assert_eq!(row["raw_data"]["polygon"]["type"], "Polygon");
        let lon = row["point"]["coordinates"][0].as_f64().unwrap();
        assert!((7.0..7.1).contains(&lon));
    }

    #[test]
    fn ground_value_row_keeps_absent_zone_number_null() {
        // dBASE leaves empty Character fields as null; they must stay null.
        let attributes = attrs(json!({"GENA": "Köln", "BRW": "540,0", "BRWZNR": null}));
        let row = normalize_ground_value(polygon(), &attributes, "http://x/brw.zip").unwrap();
        assert_eq!(row["richtwertzone"], Value::Null);

        let attributes = attrs(json!({"GENA": "Köln", "BRW": "540,0"}));
        let row = normalize_ground_value(polygon(), &attributes, "http://x/brw.zip").unwrap();
        assert_eq!(row["richtwertzone"], Value::Null);
    }

    #[test]
    fn unparsable_required_value_skips_the_record() {
        let attributes = attrs(json!({"GENA": "Essen", "BRW": "k.A."}));
        assert!(normalize_ground_value(polygon(), &attributes, "http://x").is_none());
    }
}
