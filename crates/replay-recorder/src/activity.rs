use replay_recorder_core::{Activity, Metadata, MetadataError};

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Activity started and ended by commands.
#[derive(Debug, Clone)]
pub struct ManualActivity {
    category: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    overrun: Duration,
}

impl ManualActivity {
    /// Activity of `category` beginning at `start_date`.
    pub fn new(category: impl Into<String>, start_date: DateTime<Utc>, overrun: Duration) -> Self {
        Self {
            category: category.into(),
            start_date,
            end_date: None,
            overrun,
        }
    }

    /// Mark the activity as ended at `end_date`.
    pub fn finish(&mut self, end_date: DateTime<Utc>) {
        self.end_date = Some(end_date);
    }

    /// Category given on the start command.
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl Activity for ManualActivity {
    fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    fn overrun(&self) -> Duration {
        self.overrun
    }

    fn metadata(&self) -> Result<Metadata, MetadataError> {
        let end_date = self
            .end_date
            .ok_or_else(|| format!("{} activity has no end time", self.category))?;
        let duration = (end_date - self.start_date).num_milliseconds() as f64 / 1000.0;

        let mut metadata = Metadata::new(&self.category, duration, true);
        metadata.extra.insert(
            "start".to_string(),
            serde_json::Value::String(self.start_date.to_rfc3339()),
        );
        Ok(metadata)
    }

    fn file_name(&self) -> String {
        format!(
            "{} {}",
            self.category,
            self.start_date.format("%Y-%m-%d %H-%M-%S")
        )
    }
}
