use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::scoring::ScoreResult;
use crate::util::{mean, std_dev};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history log i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("history log is not valid csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One analyzed session as stored in the results log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: DateTime<Local>,
    pub duration_secs: u32,
    pub elapsed_secs: u32,
    pub words: u32,
    pub symbols: u32,
    pub wpm: u32,
    pub level: String,
}

impl HistoryRecord {
    pub fn new(score: &ScoreResult, duration_secs: u32, elapsed_secs: u32) -> Self {
        Self {
            date: Local::now(),
            duration_secs,
            elapsed_secs,
            words: score.word_count,
            symbols: score.symbol_count,
            wpm: score.wpm,
            level: score.level.to_string(),
        }
    }
}

/// Append-only CSV log of analyzed sessions
#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new() -> Option<Self> {
        AppDirs::history_path().map(Self::with_path)
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // a fresh or empty log gets a header row
        let needs_header = fs::metadata(&self.path).map_or(true, |meta| meta.len() == 0);

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader.deserialize().collect::<Result<Vec<HistoryRecord>, _>>()?;
        Ok(records)
    }

    pub fn summary(&self) -> Result<Option<HistorySummary>, HistoryError> {
        Ok(HistorySummary::from_records(&self.read_all()?))
    }
}

/// Aggregate view over the results log
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub sessions: usize,
    pub mean_wpm: f64,
    pub std_dev_wpm: f64,
    pub best_wpm: u32,
    pub latest_level: String,
}

impl HistorySummary {
    pub fn from_records(records: &[HistoryRecord]) -> Option<Self> {
        let wpms = records.iter().map(|r| r.wpm as f64).collect::<Vec<f64>>();
        let latest = records.iter().sorted_by_key(|r| r.date).last()?;

        Some(Self {
            sessions: records.len(),
            mean_wpm: mean(&wpms)?,
            std_dev_wpm: std_dev(&wpms)?,
            best_wpm: records.iter().map(|r| r.wpm).max()?,
            latest_level: latest.level.clone(),
        })
    }
}

impl fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sessions   {:.1} avg wpm   {:.2} sd   {} best wpm   latest: {}",
            self.sessions, self.mean_wpm, self.std_dev_wpm, self.best_wpm, self.latest_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use chrono::Duration;
    use tempfile::tempdir;

    fn score(words: u32) -> ScoreResult {
        ScoreResult::compute(
            Analysis {
                words,
                symbols: words * 5,
            },
            60,
        )
        .unwrap()
    }

    #[test]
    fn test_record_from_score() {
        let record = HistoryRecord::new(&score(42), 60, 60);

        assert_eq!(record.wpm, 42);
        assert_eq!(record.words, 42);
        assert_eq!(record.symbols, 210);
        assert_eq!(record.level, "Average (40–59 WPM)");
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("state").join("history.csv"));

        log.append(&HistoryRecord::new(&score(12), 60, 60)).unwrap();
        log.append(&HistoryRecord::new(&score(64), 60, 60)).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].wpm, 12);
        assert_eq!(records[1].level, "Proficient (60–79 WPM)");

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.matches("duration_secs").count(), 1);
    }

    #[test]
    fn test_empty_log_file_gets_header() {
        let dir = tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("history.csv"));
        fs::File::create(log.path()).unwrap();

        log.append(&HistoryRecord::new(&score(25), 60, 60)).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].wpm, 25);
        assert!(fs::read_to_string(log.path())
            .unwrap()
            .starts_with("date,"));
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempdir().unwrap();
        let log = ResultLog::with_path(dir.path().join("history.csv"));

        assert!(log.read_all().unwrap().is_empty());
        assert!(log.summary().unwrap().is_none());
    }

    #[test]
    fn test_summary() {
        let base = Local::now();
        let mut first = HistoryRecord::new(&score(30), 60, 60);
        first.date = base - Duration::minutes(5);
        let mut second = HistoryRecord::new(&score(50), 60, 60);
        second.date = base;

        let summary = HistorySummary::from_records(&[second, first]).unwrap();

        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.mean_wpm, 40.0);
        assert_eq!(summary.std_dev_wpm, 10.0);
        assert_eq!(summary.best_wpm, 50);
        assert_eq!(summary.latest_level, "Average (40–59 WPM)");
        assert!(summary.to_string().starts_with("2 sessions   40.0 avg wpm"));
    }
}
