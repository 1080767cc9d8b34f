//! Server information returned for a GET on the main URL.

use giot_common::LongLat;
use serde::{Deserialize, Serialize};

/// Capabilities and provenance of a GIoT data server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InfoReply {
    /// Name and contact information of the responsible organization.
    pub organization_info: String,
    pub copy_right: String,
    /// Timestamp of the oldest available data.
    pub oldest: String,
    /// Timestamp of the newest available data, blank while recording is ongoing.
    pub newest: String,
    /// Seconds past `newest` that time specifications may reach.
    pub max_forecast: f64,
    /// Corner of the area for which data can be supplied.
    pub south_west: LongLat,
    /// Other corner, with larger longitude and latitude.
    pub north_east: LongLat,
    /// Available data sets (gases, particle sizes, noise level, ...).
    pub datasets: Vec<String>,
    /// The URL to send data requests to.
    #[serde(rename = "DataURL")]
    pub data_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_wire_names() {
        let info = InfoReply {
            organization_info: "Uppsala University".to_string(),
            copy_right: "CC-BY".to_string(),
            oldest: "2016-01-01T00:00:00Z".to_string(),
            newest: String::new(),
            max_forecast: 86400.0,
            south_west: LongLat::new(17.61, 59.85),
            north_east: LongLat::new(17.66, 59.87),
            datasets: vec!["NO2".to_string(), "PM10".to_string()],
            data_url: "http://localhost:8090/data".to_string(),
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["OrganizationInfo"], "Uppsala University");
        assert_eq!(value["CopyRight"], "CC-BY");
        assert_eq!(value["MaxForecast"], 86400.0);
        assert_eq!(value["DataURL"], "http://localhost:8090/data");
        assert_eq!(value["Datasets"][1], "PM10");
    }
}
