//! Conversion of loaded documents into source data.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::{Number, Value};
use url::form_urlencoded;

use crate::error::MapConfError;

const LAT_COLUMNS: &[&str] = &["lat", "latitude", "y"];
const LON_COLUMNS: &[&str] = &["lon", "lng", "long", "longitude", "x"];

/// Query parameter added to refreshed urls to bypass caches.
pub const CACHE_BUSTING_PARAM: &str = "_t";

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| names.contains(&header.trim().to_lowercase().as_str()))
}

fn property_value(value: &str) -> Value {
    let value = value.trim();
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }

    value
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

/// Reads a CSV document with a point per row.
///
/// Latitude and longitude columns are detected by their header (`lat`, `latitude` or `y` and
/// `lon`, `lng`, `long`, `longitude` or `x`). Rows without valid coordinates are skipped. All
/// columns become feature properties; numeric values are stored as numbers.
pub fn csv_points(text: &str) -> Result<FeatureCollection, MapConfError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let (Some(lat), Some(lon)) = (
        find_column(&headers, LAT_COLUMNS),
        find_column(&headers, LON_COLUMNS),
    ) else {
        return Err(MapConfError::Decoding(
            "CSV document has no latitude and longitude columns".into(),
        ));
    };

    let mut features = vec![];
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::debug!("Skipping CSV row {index}: {err}");
                continue;
            }
        };

        let coordinates = (
            record.get(lat).and_then(|v| v.trim().parse::<f64>().ok()),
            record.get(lon).and_then(|v| v.trim().parse::<f64>().ok()),
        );
        let (Some(lat), Some(lon)) = coordinates else {
            log::debug!("Skipping CSV row {index} without coordinates");
            continue;
        };

        let properties: JsonObject = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), property_value(value)))
            .collect();

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::Point(vec![lon, lat]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Returns the url with the cache busting parameter set to the given timestamp.
pub fn cache_busted(url: &str, timestamp_millis: u128) -> String {
    let (url, fragment) = match url.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = url.split_once('?').unwrap_or((url, ""));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key != CACHE_BUSTING_PARAM {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair(CACHE_BUSTING_PARAM, &timestamp_millis.to_string());

    let mut result = format!("{base}?{}", serializer.finish());
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }

    result
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u128 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn points_from_csv() {
        let text = "name,Latitude,Longitude,count\n\
                    Panaji,15.49,73.82,12\n\
                    broken,abc,73.9,1\n\
                    Margao,15.27,73.95,n/a\n";

        let collection = csv_points(text).unwrap();
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        assert_matches!(
            first.geometry.as_ref().map(|g| &g.value),
            Some(geojson::Value::Point(point)) if point == &vec![73.82, 15.49]
        );

        let properties = first.properties.as_ref().unwrap();
        assert_eq!(properties["name"], json!("Panaji"));
        assert_eq!(properties["count"], json!(12));
        assert_eq!(
            collection.features[1].properties.as_ref().unwrap()["count"],
            json!("n/a")
        );
    }

    #[test]
    fn csv_without_coordinates() {
        let result = csv_points("name,value\na,1\n");
        assert_matches!(result, Err(MapConfError::Decoding(_)));
    }

    #[test]
    fn cache_busting() {
        assert_eq!(cache_busted("https://x/radar.png", 5), "https://x/radar.png?_t=5");
        assert_eq!(
            cache_busted("https://x/radar.png?layer=a&_t=1", 7),
            "https://x/radar.png?layer=a&_t=7"
        );
        assert_eq!(cache_busted("data.csv#top", 9), "data.csv?_t=9#top");
    }
}
