use serde::Deserialize;

use crate::error::{LocationIqError, Result};

/// One entry of a `/search.php` response. LocationIQ returns coordinates as
/// decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub importance: Option<f64>,
}

impl Place {
    /// Parsed `(lat, lon)` pair.
    pub fn coordinates(&self) -> Result<(f64, f64)> {
        let lat: f64 = self
            .lat
            .trim()
            .parse()
            .map_err(|_| LocationIqError::Parse(format!("invalid latitude {:?}", self.lat)))?;
        let lon: f64 = self
            .lon
            .trim()
            .parse()
            .map_err(|_| LocationIqError::Parse(format!("invalid longitude {:?}", self.lon)))?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(LocationIqError::Parse(format!(
                "coordinates out of range: {lat}, {lon}"
            )));
        }
        Ok((lat, lon))
    }
}

/// Error body LocationIQ sends alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
