//! # JSONL Telemetry Logger
//!
//! Writes each published record as one JSON object per line, rotating to a
//! new file after `max_records_per_file` records and keeping only the newest
//! `max_files_to_keep` files. Files left by earlier runs in the same
//! directory count toward that limit.

use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{TelemetrySink, BATTERY_TOPIC, STATUS_TOPIC};
use crate::config::TelemetryConfig;
use crate::error::{FcCommsError, Result};
use crate::msp::protocol::FlightStatus;

const FILE_PREFIX: &str = "telemetry_";
const FILE_SUFFIX: &str = ".jsonl";

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    timestamp: String,
    topic: &'a str,
    #[serde(flatten)]
    data: T,
}

#[derive(Serialize)]
struct BatteryReading {
    volts: f32,
}

/// Telemetry sink writing rotating JSONL files
pub struct JsonlSink {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files: VecDeque<PathBuf>,
    file_seq: u64,
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("log_dir", &self.log_dir)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(log_dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
            max_records_per_file,
            max_files_to_keep,
            writer: None,
            records_in_file: 0,
            files: VecDeque::new(),
            file_seq: 0,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Log files currently kept, oldest first
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Split `telemetry_<stamp>_<seq>.jsonl` into its stamp and sequence number
    fn parse_file_name(name: &str) -> Option<(String, u64)> {
        let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        let (stamp, seq) = stem.rsplit_once('_')?;
        Some((stamp.to_string(), seq.parse().ok()?))
    }

    /// Pick up log files from earlier runs, oldest first
    fn scan_existing(&mut self) -> Result<()> {
        let mut existing = Vec::new();
        for entry in fs::read_dir(&self.log_dir)? {
            let path = entry?.path();
            let parsed = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(Self::parse_file_name);
            if let Some((stamp, seq)) = parsed {
                existing.push((stamp, seq, path));
            }
        }
        existing.sort();

        self.file_seq = existing.iter().map(|(_, seq, _)| *seq).max().unwrap_or(0);
        self.files = existing.into_iter().map(|(_, _, path)| path).collect();

        if !self.files.is_empty() {
            debug!("Found {} telemetry logs from earlier runs", self.files.len());
        }
        self.enforce_retention();
        Ok(())
    }

    fn enforce_retention(&mut self) {
        while self.files.len() > self.max_files_to_keep {
            if let Some(old) = self.files.pop_front() {
                if let Err(e) = fs::remove_file(&old) {
                    warn!("Failed to remove old telemetry log {}: {}", old.display(), e);
                }
            }
        }
    }

    /// Create the next log file without touching existing ones
    fn create_next_file(&mut self) -> Result<(PathBuf, File)> {
        loop {
            self.file_seq += 1;
            let name = format!(
                "{}{}_{:04}{}",
                FILE_PREFIX,
                Utc::now().format("%Y%m%dT%H%M%S"),
                self.file_seq,
                FILE_SUFFIX
            );
            let path = self.log_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Telemetry log {} already exists, skipping", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let (path, file) = self.create_next_file()?;
        debug!("Opened telemetry log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files.push_back(path);
        self.enforce_retention();

        Ok(())
    }

    fn write_record<T: Serialize>(&mut self, topic: &str, data: T) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = Record {
            timestamp: Utc::now().to_rfc3339(),
            topic,
            data,
        };

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| FcCommsError::Telemetry("telemetry log not open".into()))?;
        serde_json::to_writer(&mut *writer, &record)
            .map_err(|e| FcCommsError::Telemetry(format!("Failed to serialize record: {}", e)))?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.records_in_file += 1;
        Ok(())
    }
}

impl TelemetrySink for JsonlSink {
    fn register(&mut self) -> Result<()> {
        fs::create_dir_all(&self.log_dir)?;
        self.scan_existing()?;
        info!(
            "Telemetry outputs {}, {} logging to {}",
            BATTERY_TOPIC,
            STATUS_TOPIC,
            self.log_dir.display()
        );
        Ok(())
    }

    fn publish_battery(&mut self, volts: f32) -> Result<()> {
        self.write_record(BATTERY_TOPIC, BatteryReading { volts })
    }

    fn publish_status(&mut self, status: &FlightStatus) -> Result<()> {
        self.write_record(STATUS_TOPIC, status)
    }
}
