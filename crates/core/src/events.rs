//! Festival events and the "upcoming events" listing.
//!
//! Events are maintained in a YAML file (a top-level sequence) and loaded once at startup:
//!
//! ```yaml
//! - id: visarjan-2025
//!   title: Ganesh Visarjan
//!   description: Procession to the river ghat
//!   date: 2025-09-06T16:00:00Z
//!   location: Khatav
//!   image_url: https://example.org/visarjan.jpg   # optional
//! ```

use crate::constants::DEFAULT_EVENT_IMAGE_URL;
use crate::{MandalError, MandalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Event {
    /// The event's own image, or the shared fallback picture.
    pub fn image_url_or_default(&self) -> &str {
        self.image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_EVENT_IMAGE_URL)
    }
}

/// All known events, in file order.
#[derive(Clone, Debug, Default)]
pub struct EventCalendar {
    events: Vec<Event>,
}

impl EventCalendar {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Parse events from YAML text.
    ///
    /// This uses `serde_path_to_error` so a bad field is reported with its location
    /// (e.g. `[2].date`).
    ///
    /// # Errors
    ///
    /// Returns `MandalError::YamlDeserialization` if the YAML does not match the event schema.
    pub fn parse(yaml_text: &str) -> MandalResult<Self> {
        if yaml_text.trim().is_empty() {
            return Ok(Self::default());
        }
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        match serde_path_to_error::deserialize::<_, Option<Vec<Event>>>(deserializer) {
            Ok(events) => Ok(Self::new(events.unwrap_or_default())),
            Err(err) => {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_owned()
                } else {
                    path
                };
                Err(MandalError::YamlDeserialization {
                    path,
                    source: err.into_inner(),
                })
            }
        }
    }

    /// Read and parse an events file.
    ///
    /// # Errors
    ///
    /// Returns `MandalError::FileRead` if the file cannot be read, or the errors of
    /// [`EventCalendar::parse`].
    pub fn load(path: &Path) -> MandalResult<Self> {
        let text = fs::read_to_string(path).map_err(MandalError::FileRead)?;
        let calendar = Self::parse(&text)?;
        tracing::info!(
            "loaded {} events from {}",
            calendar.events.len(),
            path.display()
        );
        Ok(calendar)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events dated at or after `now`, earliest first.
    ///
    /// An empty result is the valid "no upcoming events" state.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<&Event> {
        let mut upcoming: Vec<&Event> = self.events.iter().filter(|e| e.date >= now).collect();
        upcoming.sort_by_key(|e| e.date);
        upcoming
    }
}
