use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

/// One record from the schedule sources CSV.
///
/// Extra columns are ignored; missing columns decode as empty strings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    #[serde(default)]
    pub epg_channel_id: String,
    #[serde(default)]
    pub schedule_source: String,
}

/// Schedule source lookup keyed by `epg_channel_id`.
#[derive(Debug, Default)]
pub struct SourceTable {
    rows: HashMap<String, SourceRow>,
}

impl SourceTable {
    /// Load the source table from a CSV file with a header row.
    ///
    /// Rows without an `epg_channel_id` value are excluded, and when the file
    /// contains multiple rows for the same channel id the last one wins. Rows
    /// that fail to decode entirely are skipped, not an error.
    ///
    /// # Errors
    /// If the file cannot be opened or is not readable as CSV.
    pub fn with_path(fpath: &Path) -> Result<SourceTable> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(fpath)?;

        let mut rows: HashMap<String, SourceRow> = HashMap::default();
        for zult in reader.deserialize::<SourceRow>() {
            let row = match zult {
                Ok(row) => row,
                Err(err) => {
                    debug!("skipping unreadable source row: {err}");
                    continue;
                }
            };
            if row.epg_channel_id.is_empty() {
                continue;
            }
            rows.insert(row.epg_channel_id.clone(), row);
        }

        Ok(SourceTable { rows })
    }

    #[must_use]
    pub fn get(&self, channel_id: &str) -> Option<&SourceRow> {
        self.rows.get(channel_id)
    }

    /// The schedule URL for a channel, if the channel has a row with a
    /// non-empty `schedule_source`.
    #[must_use]
    pub fn url_for(&self, channel_id: &str) -> Option<&str> {
        self.rows
            .get(channel_id)
            .map(|row| row.schedule_source.as_str())
            .filter(|url| !url.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
