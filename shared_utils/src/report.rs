//! Report Module
//!
//! Single consumer of the worker pool's outcome channel. Builds the per-file
//! report lines and the general summary, and writes them as the plain text
//! report (`name==status` lines, then the general block) or JSON.

use crate::batch::{BatchLayout, BatchResult, ConversionOutcome};
use crate::img_errors::SetupError;
use crate::size_format::human_readable_size;
use crossbeam_channel::Receiver;
use indicatif::ProgressBar;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

pub const STATUS_CONVERTED: &str = "converted successfully";
pub const STATUS_ERROR_PREFIX: &str = "error details: ";

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// The general block of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Entries that were dispatched to conversion (extension matched).
    pub file_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(rename = "total_seconds", serialize_with = "serialize_secs")]
    pub total_duration: Duration,
    #[serde(rename = "average_seconds", serialize_with = "serialize_secs")]
    pub average_duration: Duration,
    pub source_bytes: u64,
    pub dest_bytes: u64,
    #[serde(skip)]
    pub source_label: String,
    #[serde(skip)]
    pub target_label: String,
}

impl BatchSummary {
    pub fn new(
        tally: &BatchResult,
        total_duration: Duration,
        source_bytes: u64,
        dest_bytes: u64,
        layout: &BatchLayout,
    ) -> Self {
        let file_count = tally.dispatched();
        Self {
            file_count,
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            total_duration,
            average_duration: average(total_duration, file_count),
            source_bytes,
            dest_bytes,
            source_label: layout.source_label.clone(),
            target_label: layout.target_label.clone(),
        }
    }

    /// General block lines, in this order:
    /// blank, file count, total time, average time, source size, output
    /// size, succeeded, failed.
    pub fn lines(&self) -> Vec<String> {
        vec![
            String::new(),
            format!("{} Files", self.file_count),
            format!("Total Time Taken=={:?}", self.total_duration),
            format!("Average Time Per File=={:?}", self.average_duration),
            format!(
                "Total {} File Size=={}",
                self.source_label,
                human_readable_size(self.source_bytes)
            ),
            format!(
                "Total {} Folder Size=={}",
                self.target_label,
                human_readable_size(self.dest_bytes)
            ),
            format!("Succeeded=={}", self.succeeded),
            format!("Failed=={}", self.failed),
        ]
    }

    /// Succeeded share of dispatched files; 100% for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.file_count == 0 {
            100.0
        } else {
            self.succeeded as f64 / self.file_count as f64 * 100.0
        }
    }

    pub fn size_reduction_percent(&self) -> f64 {
        if self.source_bytes > 0 {
            (1.0 - self.dest_bytes as f64 / self.source_bytes as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// `total / count`, zero for an empty batch.
fn average(total: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    match u32::try_from(count) {
        Ok(n) => total / n,
        Err(_) => total.div_f64(count as f64),
    }
}

/// One block of the serialized report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportSection<'a> {
    File { name: &'a str, lines: &'a [String] },
    Summary(&'a BatchSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Source file name → report lines.
    pub files: BTreeMap<String, Vec<String>>,
    pub summary: BatchSummary,
    /// `(source name, error)` for every failed conversion, sorted by name.
    pub errors: Vec<(String, String)>,
}

impl AggregateReport {
    /// Per-file sections sorted by name, then the summary, always last.
    pub fn sections(&self) -> impl Iterator<Item = ReportSection<'_>> {
        self.files
            .iter()
            .map(|(name, lines)| ReportSection::File {
                name: name.as_str(),
                lines: lines.as_slice(),
            })
            .chain(std::iter::once(ReportSection::Summary(&self.summary)))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for section in self.sections() {
            match section {
                ReportSection::File { lines, .. } => {
                    for line in lines {
                        writeln!(w, "{}", line)?;
                    }
                }
                ReportSection::Summary(summary) => {
                    for line in summary.lines() {
                        writeln!(w, "{}", line)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), SetupError> {
        ReportWriter::create(path)?.write(self)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Report file opened before the batch starts, so an unwritable location
/// fails the run before any conversion happens.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    file: File,
}

impl ReportWriter {
    pub fn create(path: &Path) -> Result<Self, SetupError> {
        let file = File::create(path).map_err(|e| SetupError::CreateReport {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn write(self, report: &AggregateReport) -> Result<(), SetupError> {
        let mut writer = BufWriter::new(self.file);
        report
            .write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| SetupError::WriteReport {
                path: self.path,
                source: e,
            })
    }
}

/// Size on disk, 0 if the file is missing (e.g. a failed conversion).
fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Drain `outcomes` until every worker has finished and build the report.
pub fn aggregate(
    outcomes: &Receiver<ConversionOutcome>,
    layout: &BatchLayout,
    started: Instant,
    progress: Option<&ProgressBar>,
) -> AggregateReport {
    let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut tally = BatchResult::new();
    let mut source_total = 0u64;
    let mut dest_total = 0u64;

    for outcome in outcomes.iter() {
        tally.record(&outcome);

        let status = match &outcome {
            ConversionOutcome::Skipped { source_name } => {
                debug!(file = %source_name, "Skipped");
                continue;
            }
            ConversionOutcome::Converted { .. } => STATUS_CONVERTED.to_string(),
            ConversionOutcome::Failed { error, .. } => {
                format!("{}{}", STATUS_ERROR_PREFIX, error)
            }
        };

        let name = outcome.source_name();
        let dest_path = match &outcome {
            ConversionOutcome::Converted { dest_path, .. } => dest_path.clone(),
            _ => layout.destination_for(name),
        };
        let source_bytes = file_size(&layout.source_for(name));
        let dest_bytes = file_size(&dest_path);
        source_total += source_bytes;
        dest_total += dest_bytes;

        let line = format!(
            "{}=={} ({} > {} {})",
            name,
            status,
            human_readable_size(source_bytes),
            layout.display_destination(name),
            human_readable_size(dest_bytes)
        );
        files.entry(name.to_string()).or_default().push(line);

        if let Some(pb) = progress {
            pb.set_message(name.to_string());
            pb.inc(1);
        }
    }

    let summary = BatchSummary::new(&tally, started.elapsed(), source_total, dest_total, layout);
    let mut errors = tally.errors;
    errors.sort();

    AggregateReport {
        files,
        summary,
        errors,
    }
}

/// Human summary box on stdout.
pub fn print_summary_report(report: &AggregateReport, operation_name: &str) {
    let s = &report.summary;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  📊 {:<56} ║", format!("{} Summary Report", operation_name));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📁 Files Processed:    {:>10}                           ║", s.file_count);
    println!("║  ✅ Succeeded:          {:>10}                           ║", s.succeeded);
    println!("║  ❌ Failed:             {:>10}                           ║", s.failed);
    println!("║  ⏭️  Skipped:            {:>10}                           ║", s.skipped);
    println!("║  📈 Success Rate:       {:>9.1}%                           ║", s.success_rate());
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  💾 Input Size:         {:>10}                           ║",
        human_readable_size(s.source_bytes)
    );
    println!(
        "║  💾 Output Size:        {:>10}                           ║",
        human_readable_size(s.dest_bytes)
    );
    println!(
        "║  📉 Size Reduction:     {:>9.1}%                           ║",
        s.size_reduction_percent()
    );
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  ⏱️  Total Time:         {:>10}                           ║",
        format!("{:.2?}", s.total_duration)
    );
    println!(
        "║  ⏱️  Avg Time/File:      {:>10}                           ║",
        format!("{:.2?}", s.average_duration)
    );
    println!("╚══════════════════════════════════════════════════════════════╝");

    if !report.errors.is_empty() {
        println!();
        println!("❌ Errors encountered:");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for (name, error) in &report.errors {
            println!("   {} → {}", name, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BatchLayout) {
        let dir = TempDir::new().unwrap();
        let layout = BatchLayout::new(dir.path(), dir.path().join("jpegs"), "heic", "jpg");
        fs::create_dir(&layout.output_dir).unwrap();
        (dir, layout)
    }

    fn drain(layout: &BatchLayout, outcomes: Vec<ConversionOutcome>) -> AggregateReport {
        let (tx, rx) = unbounded();
        for outcome in outcomes {
            tx.send(outcome).unwrap();
        }
        drop(tx);
        aggregate(&rx, layout, Instant::now(), None)
    }

    fn converted(layout: &BatchLayout, name: &str) -> ConversionOutcome {
        ConversionOutcome::Converted {
            source_name: name.to_string(),
            dest_path: layout.destination_for(name),
        }
    }

    #[test]
    fn test_lines_and_totals() {
        let (_dir, layout) = setup();
        fs::write(layout.source_for("a.heic"), vec![0u8; 2048]).unwrap();
        fs::write(layout.destination_for("a.heic"), vec![0u8; 1536]).unwrap();
        fs::write(layout.source_for("b.heic"), vec![0u8; 12]).unwrap();

        let report = drain(
            &layout,
            vec![
                ConversionOutcome::Failed {
                    source_name: "b.heic".into(),
                    error: "decode failed: corrupt".into(),
                },
                converted(&layout, "a.heic"),
                ConversionOutcome::Skipped {
                    source_name: "c.txt".into(),
                },
            ],
        );

        let jpegs = Path::new("jpegs");
        assert_eq!(
            report.files["a.heic"],
            vec![format!(
                "a.heic==converted successfully (2.0KB > {} 1.5KB)",
                jpegs.join("a.jpg").display()
            )]
        );
        assert_eq!(
            report.files["b.heic"],
            vec![format!(
                "b.heic==error details: decode failed: corrupt (12B > {} 0B)",
                jpegs.join("b.jpg").display()
            )]
        );
        assert!(!report.files.contains_key("c.txt"));

        let s = &report.summary;
        assert_eq!(s.file_count, 2);
        assert_eq!((s.succeeded, s.failed, s.skipped), (1, 1, 1));
        assert_eq!(s.source_bytes, 2048 + 12);
        assert_eq!(s.dest_bytes, 1536);
        assert_eq!(
            report.errors,
            vec![("b.heic".to_string(), "decode failed: corrupt".to_string())]
        );
    }

    #[test]
    fn test_empty_batch_average_is_zero() {
        let (_dir, layout) = setup();
        let report = drain(
            &layout,
            vec![ConversionOutcome::Skipped {
                source_name: "notes.txt".into(),
            }],
        );
        assert_eq!(report.summary.file_count, 0);
        assert_eq!(report.summary.average_duration, Duration::ZERO);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_average_division() {
        assert_eq!(average(Duration::from_secs(10), 4), Duration::from_millis(2500));
        assert_eq!(average(Duration::from_secs(10), 0), Duration::ZERO);
    }

    #[test]
    fn test_summary_is_always_last_section() {
        let (_dir, layout) = setup();
        let report = drain(
            &layout,
            vec![
                converted(&layout, "z.heic"),
                converted(&layout, "a.heic"),
                converted(&layout, "general.heic"),
            ],
        );

        let sections: Vec<_> = report.sections().collect();
        assert_eq!(sections.len(), 4);
        assert!(matches!(sections[0], ReportSection::File { name: "a.heic", .. }));
        assert!(matches!(sections[1], ReportSection::File { name: "general.heic", .. }));
        assert!(matches!(sections[2], ReportSection::File { name: "z.heic", .. }));
        assert!(matches!(sections[3], ReportSection::Summary(_)));
    }

    #[test]
    fn test_written_report_layout() {
        let (dir, layout) = setup();
        let report = drain(
            &layout,
            vec![
                converted(&layout, "a.heic"),
                ConversionOutcome::Failed {
                    source_name: "b.heic".into(),
                    error: "boom".into(),
                },
            ],
        );

        let path = dir.path().join("jpegs").join("logs.txt");
        report.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2 + 8);
        assert!(lines[0].starts_with("a.heic==converted successfully"));
        assert!(lines[1].starts_with("b.heic==error details: boom"));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "2 Files");
        assert!(lines[4].starts_with("Total Time Taken=="));
        assert!(lines[5].starts_with("Average Time Per File=="));
        assert_eq!(lines[6], "Total HEIC File Size==0B");
        assert_eq!(lines[7], "Total JPG Folder Size==0B");
        assert_eq!(lines[8], "Succeeded==1");
        assert_eq!(lines[9], "Failed==1");
    }

    #[test]
    fn test_summary_uses_layout_labels() {
        let (_dir, layout) = setup();
        let layout = layout.with_labels("HEIC", "JPEG");
        let report = drain(&layout, vec![converted(&layout, "a.heic")]);
        let lines = report.summary.lines();
        assert_eq!(lines[4], "Total HEIC File Size==0B");
        assert_eq!(lines[5], "Total JPEG Folder Size==0B");
    }

    #[test]
    fn test_success_rate_counts_dispatched_only() {
        let (_dir, layout) = setup();
        let report = drain(
            &layout,
            vec![
                converted(&layout, "a.heic"),
                ConversionOutcome::Failed {
                    source_name: "b.heic".into(),
                    error: "boom".into(),
                },
                ConversionOutcome::Skipped {
                    source_name: "c.txt".into(),
                },
            ],
        );
        assert!((report.summary.success_rate() - 50.0).abs() < 0.01);

        let empty = drain(&layout, Vec::new());
        assert!((empty.summary.success_rate() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_save_into_missing_dir_is_setup_error() {
        let (dir, layout) = setup();
        let report = drain(&layout, Vec::new());
        let err = report
            .save(&dir.path().join("missing").join("logs.txt"))
            .unwrap_err();
        assert!(matches!(err, SetupError::CreateReport { .. }));
    }

    #[test]
    fn test_report_writer_created_up_front() {
        let (dir, layout) = setup();
        let path = dir.path().join("jpegs").join("logs.txt");
        let writer = ReportWriter::create(&path).unwrap();
        assert!(path.exists());

        let report = drain(&layout, vec![converted(&layout, "a.heic")]);
        writer.write(&report).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a.heic==converted successfully"));
        assert!(text.ends_with("Failed==0\n"));
    }

    #[test]
    fn test_json_summary() {
        let (_dir, layout) = setup();
        let report = drain(&layout, vec![converted(&layout, "a.heic")]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["summary"]["file_count"], 1);
        assert_eq!(value["summary"]["succeeded"], 1);
        assert!(value["summary"]["total_seconds"].is_number());
        assert!(value["files"]["a.heic"].is_array());
    }

    #[test]
    fn test_size_reduction() {
        let (_dir, layout) = setup();
        let mut tally = BatchResult::new();
        tally.success();
        let s = BatchSummary::new(&tally, Duration::from_secs(1), 1000, 250, &layout);
        assert!((s.size_reduction_percent() - 75.0).abs() < 0.01);
        let s = BatchSummary::new(&tally, Duration::from_secs(1), 0, 250, &layout);
        assert_eq!(s.size_reduction_percent(), 0.0);
    }

    #[test]
    fn test_print_summary_report_no_panic() {
        let (_dir, layout) = setup();
        let report = drain(
            &layout,
            vec![ConversionOutcome::Failed {
                source_name: "x.heic".into(),
                error: "nope".into(),
            }],
        );
        print_summary_report(&report, "HEIC → JPG");
    }
}
