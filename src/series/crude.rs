//! Crude wire representation of a series
//!
//! This is the shape a series takes at storage and transport boundaries:
//!
//! ```json
//! { "dataType": "float32", "timeRange": { "start": 0, "end": 10 }, "alignment": 4, "data": "AACAPw==" }
//! ```
//!
//! `data` is accepted as a byte array, a base64 string or `null` (empty), and
//! is always written as base64.

use super::Series;
use crate::error::{Result, TelemError};
use crate::time::TimeRange;
use crate::types::DataType;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudeSeries {
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<u64>,
    #[serde(
        default,
        serialize_with = "serialize_data",
        deserialize_with = "deserialize_data"
    )]
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CrudeData {
    Bytes(Vec<u8>),
    Base64(String),
}

fn serialize_data<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn deserialize_data<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
    match Option::<CrudeData>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(CrudeData::Bytes(bytes)) => Ok(bytes),
        Some(CrudeData::Base64(encoded)) => STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom),
    }
}

impl CrudeSeries {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Series {
    /// Build a series from its wire form
    pub fn from_crude(crude: CrudeSeries) -> Result<Series> {
        if crude.data_type == DataType::Unknown {
            return Err(TelemError::Construction(
                "crude series has unknown data type".to_string(),
            ));
        }
        let mut series = Series::from_bytes(&crude.data, Some(crude.data_type))?;
        if let Some(time_range) = crude.time_range {
            series = series.with_time_range(time_range);
        }
        if let Some(alignment) = crude.alignment {
            series = series.with_alignment(alignment);
        }
        Ok(series)
    }

    /// Wire form of the valid region
    pub fn to_crude(&self) -> CrudeSeries {
        CrudeSeries {
            data_type: self.data_type,
            time_range: self.time_range,
            alignment: Some(self.alignment),
            data: self.to_bytes(),
        }
    }
}

impl TryFrom<CrudeSeries> for Series {
    type Error = TelemError;

    fn try_from(crude: CrudeSeries) -> Result<Series> {
        Series::from_crude(crude)
    }
}

impl From<&Series> for CrudeSeries {
    fn from(series: &Series) -> Self {
        series.to_crude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemValue;

    #[test]
    fn test_deserialize_base64() {
        let json = r#"{"dataType":"float32","alignment":4,"data":"AACAPwAAAEA="}"#;
        let series = Series::from_crude(CrudeSeries::from_json_str(json).unwrap()).unwrap();
        assert_eq!(series.as_slice::<f32>().unwrap(), &[1.0, 2.0]);
        assert_eq!(series.alignment(), 4);
        assert_eq!(series.time_range(), None);
    }

    #[test]
    fn test_deserialize_byte_array_and_null() {
        let crude = CrudeSeries::from_json_str(r#"{"dataType":"uint8","data":[1,2,3]}"#).unwrap();
        assert_eq!(crude.data, vec![1, 2, 3]);
        let crude = CrudeSeries::from_json_str(r#"{"dataType":"uint8","data":null}"#).unwrap();
        assert!(crude.data.is_empty());
        let crude = CrudeSeries::from_json_str(r#"{"dataType":"uint8"}"#).unwrap();
        assert!(crude.data.is_empty());
    }

    #[test]
    fn test_string_series_from_wire() {
        let crude = CrudeSeries {
            data_type: DataType::String,
            time_range: Some(TimeRange::from_nanos(1, 2)),
            alignment: None,
            data: b"a\nb\n".to_vec(),
        };
        let series = Series::try_from(crude).unwrap();
        assert_eq!(series.at(1), Some(TelemValue::String("b".to_string())));
        assert_eq!(series.time_range(), Some(TimeRange::from_nanos(1, 2)));
    }

    #[test]
    fn test_serializes_data_as_base64() {
        let series = Series::from(vec![1.0f32]).with_alignment(2);
        let json = series.to_crude().to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dataType"], "float32");
        assert_eq!(value["alignment"], 2);
        assert_eq!(value["data"], "AACAPw==");
        assert!(value.get("timeRange").is_none());
    }

    #[test]
    fn test_rejects_bad_base64_and_unknown_type() {
        assert!(CrudeSeries::from_json_str(r#"{"dataType":"uint8","data":"!!"}"#).is_err());
        let crude = CrudeSeries {
            data_type: DataType::Unknown,
            time_range: None,
            alignment: None,
            data: vec![],
        };
        assert!(Series::from_crude(crude).is_err());
    }
}
