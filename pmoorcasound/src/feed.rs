//! Feed model: a named, geolocated hydrophone node
//!
//! Feeds come from the feed-selection side of the application, usually as
//! camelCase JSON:
//!
//! ```json
//! {
//!   "name": "Orcasound Lab (Haro Strait)",
//!   "nodeName": "rpi_orcasound_lab",
//!   "locationPoint": { "type": "Point", "coordinates": [-123.1735, 48.5583] }
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown by the player when no feed is selected
pub const NO_FEED_LABEL: &str = "Player: no feed selected";

/// A listening node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    /// Display label (e.g., "Orcasound Lab")
    pub name: String,
    /// Identifier used in storage addressing (e.g., "rpi_orcasound_lab")
    pub node_name: String,
    /// Geographic position of the hydrophone
    #[serde(default)]
    pub location_point: LocationPoint,
}

/// GeoJSON-like point, `coordinates` is `[longitude, latitude]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationPoint {
    #[serde(default)]
    pub coordinates: [f64; 2],
}

impl Feed {
    /// Create a feed with an unknown location
    pub fn new(name: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_name: node_name.into(),
            location_point: LocationPoint::default(),
        }
    }

    /// Parse a feed from its camelCase JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the location as `(longitude, latitude)`
    pub fn with_location(mut self, longitude: f64, latitude: f64) -> Self {
        self.location_point = LocationPoint {
            coordinates: [longitude, latitude],
        };
        self
    }

    /// Whether this feed can be addressed in storage
    ///
    /// A feed without a node name would make the poller hit
    /// `<bucket>//latest.txt`, so it is treated like no feed at all.
    pub fn is_addressable(&self) -> bool {
        !self.node_name.trim().is_empty()
    }

    /// `"<name> - <nodeName>"`
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.node_name)
    }

    /// `"<coordinates[0]>, <coordinates[1]>"`
    pub fn coordinates_label(&self) -> String {
        self.location_point.to_string()
    }
}

impl fmt::Display for LocationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.coordinates[0], self.coordinates[1])
    }
}

/// Label for an optional feed, falling back to [`NO_FEED_LABEL`]
pub fn feed_label(feed: Option<&Feed>) -> String {
    feed.map(Feed::label)
        .unwrap_or_else(|| NO_FEED_LABEL.to_string())
}
