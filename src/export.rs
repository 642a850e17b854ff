use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotate::category::DEFAULT_KEY;
use crate::annotate::{AnnotationEngine, Label};
use crate::error::{EngineError, Result};

/// Serialized form of a label, shared by JSON export and import.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub config_id: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub color: String,
}

impl From<&Label> for LabelRecord {
    fn from(label: &Label) -> Self {
        Self {
            id: label.id.0,
            config_id: label.config_id.clone(),
            start: label.start,
            end: label.end,
            text: label.text.clone(),
            color: label.color.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// `Label,Start,End` with a header row
    Csv,
    /// Tab-delimited label track, no header
    Audacity,
    /// Pretty-printed array of label records
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Audacity => "txt",
            ExportFormat::Json => "json",
        }
    }

    /// Guess an importable format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ExportFormat::Json),
            "txt" | "tsv" => Some(ExportFormat::Audacity),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// Snapshot the engine's labels in start order.
pub fn records(engine: &AnnotationEngine) -> Vec<LabelRecord> {
    engine.labels_by_start().into_iter().map(LabelRecord::from).collect()
}

pub fn write_labels(records: &[LabelRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(records)),
        ExportFormat::Audacity => Ok(to_audacity(records)),
        ExportFormat::Json => to_json(records),
    }
}

pub fn to_csv(records: &[LabelRecord]) -> String {
    let mut out = String::from("Label,Start,End\n");
    for r in records {
        let _ = writeln!(out, "\"{}\",{:.4},{:.4}", r.text.replace('"', "\"\""), r.start, r.end);
    }
    out
}

/// One label per line. Tabs and line breaks in the text are written as
/// spaces since they delimit the format.
pub fn to_audacity(records: &[LabelRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let text = r.text.replace(['\t', '\r', '\n'], " ");
        let _ = writeln!(out, "{:.6}\t{:.6}\t{}", r.start, r.end, text);
    }
    out
}

pub fn to_json(records: &[LabelRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse labels in `format`. CSV is export-only.
pub fn read_labels(content: &str, format: ExportFormat) -> Result<Vec<LabelRecord>> {
    match format {
        ExportFormat::Json => parse_json(content),
        ExportFormat::Audacity => parse_audacity(content),
        ExportFormat::Csv => Err(EngineError::Export("CSV labels cannot be imported".into())),
    }
}

pub fn parse_json(content: &str) -> Result<Vec<LabelRecord>> {
    Ok(serde_json::from_str(content)?)
}

/// Parse an Audacity label track. Spectral-selection lines (starting with
/// `\`) and blank lines are skipped.
pub fn parse_audacity(content: &str) -> Result<Vec<LabelRecord>> {
    let mut out = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('\\') {
            continue;
        }
        let mut fields = line.splitn(3, '\t');
        let mut time = |name: &str| -> Result<f64> {
            let field = fields.next().unwrap_or("").trim();
            field.parse::<f64>().map_err(|_| {
                EngineError::Export(format!("line {}: bad {} time {:?}", n + 1, name, field))
            })
        };
        let start = time("start")?;
        let end = time("end")?;
        let text = fields.next().unwrap_or("").to_string();
        out.push(LabelRecord {
            id: 0,
            config_id: String::new(),
            start,
            end,
            text,
            color: String::new(),
        });
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub discarded: usize,
}

/// Add records to the engine. Times are clamped to the loaded duration and
/// records with nothing left are discarded, as are records with blank text.
/// A record keeps its category when the key exists, otherwise it binds by
/// text like a rename would.
pub fn import_records(engine: &mut AnnotationEngine, records: &[LabelRecord]) -> ImportReport {
    let mut report = ImportReport::default();
    for record in records {
        if record.text.trim().is_empty() {
            log::warn!("Discarding imported label at {:.3}s with no text", record.start);
            report.discarded += 1;
            continue;
        }
        let key = if !record.config_id.is_empty() && engine.categories().get(&record.config_id).is_some() {
            record.config_id.clone()
        } else {
            engine
                .categories()
                .match_text(&record.text)
                .map_or_else(|| DEFAULT_KEY.to_string(), |c| c.key.clone())
        };
        match engine.add_label(record.start, record.end, &key, Some(record.text.clone())) {
            Ok(_) => report.imported += 1,
            Err(err) => {
                log::warn!("Discarding imported label {:?}: {}", record.text, err);
                report.discarded += 1;
            }
        }
    }
    log::info!("Imported {} label(s), discarded {}", report.imported, report.discarded);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Categories;

    fn record(start: f64, end: f64, text: &str) -> LabelRecord {
        LabelRecord {
            id: 1,
            config_id: "0".into(),
            start,
            end,
            text: text.into(),
            color: "#ffffff".into(),
        }
    }

    #[test]
    fn audacity_line_format() {
        assert_eq!(to_audacity(&[record(1.0, 2.5, "call")]), "1.000000\t2.500000\tcall\n");
    }

    #[test]
    fn csv_quotes_text() {
        let csv = to_csv(&[record(1.0, 2.5, "say \"hi\", twice")]);
        assert_eq!(csv, "Label,Start,End\n\"say \"\"hi\"\", twice\",1.0000,2.5000\n");
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = to_json(&[record(0.5, 1.25, "x")]).unwrap();
        assert!(json.contains("\"configId\": \"0\""));
        assert!(json.contains("\"start\": 0.5"));
        assert_eq!(parse_json(&json).unwrap(), vec![record(0.5, 1.25, "x")]);
    }

    #[test]
    fn export_is_sorted_by_start() {
        let mut engine = AnnotationEngine::new(10.0, Categories::new());
        engine.add_label(5.0, 6.0, "0", Some("b".into())).unwrap();
        engine.add_label(1.0, 2.0, "0", Some("a".into())).unwrap();
        let texts: Vec<String> = records(&engine).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn audacity_parse_skips_spectral_lines() {
        let parsed = parse_audacity("1.5\t2.0\tsong\n\\\t100\t2000\n\n3\t4\t\n").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, "song");
        assert_eq!((parsed[1].start, parsed[1].end), (3.0, 4.0));
        assert_eq!(parsed[1].text, "");
    }

    #[test]
    fn audacity_parse_reports_bad_line() {
        let err = parse_audacity("1\t2\tok\nnope\t3\tx\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn import_binds_by_text_and_clamps() {
        let mut engine = AnnotationEngine::new(10.0, Categories::with_definitions([("Call", "#00ff00")]));
        let report = import_records(
            &mut engine,
            &[
                LabelRecord { config_id: String::new(), ..record(-1.0, 2.0, "call") },
                record(8.0, 20.0, "tail"),
                record(12.0, 15.0, "past the end"),
            ],
        );
        assert_eq!(report, ImportReport { imported: 2, discarded: 1 });

        let labels = engine.labels_by_start();
        assert_eq!((labels[0].start, labels[0].config_id.as_str()), (0.0, "1"));
        assert_eq!(labels[0].color, "#00ff00");
        assert_eq!((labels[1].end, labels[1].config_id.as_str()), (10.0, "0"));
    }

    #[test]
    fn blank_imported_text_is_discarded() {
        let mut engine = AnnotationEngine::new(10.0, Categories::new());
        let parsed = parse_audacity("1\t2\t\n3\t4\t  \n5\t6\tkept\n").unwrap();
        let report = import_records(&mut engine, &parsed);
        assert_eq!(report, ImportReport { imported: 1, discarded: 2 });
        assert_eq!(engine.labels()[0].text, "kept");
    }

    #[test]
    fn audacity_text_with_delimiters_reimports() {
        let out = to_audacity(&[record(1.0, 2.0, "a\tb\nc"), record(3.0, 4.0, "d\r\ne")]);
        assert_eq!(out, "1.000000\t2.000000\ta b c\n3.000000\t4.000000\td  e\n");
        let parsed = parse_audacity(&out).unwrap();
        let texts: Vec<&str> = parsed.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a b c", "d  e"]);
        assert_eq!((parsed[1].start, parsed[1].end), (3.0, 4.0));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/labels.JSON")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("labels.txt")), Some(ExportFormat::Audacity));
        assert_eq!(ExportFormat::from_path(Path::new("labels")), None);
    }
}
