use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One row of the label table. Row order is resolution priority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelRecord {
    #[serde(rename = "VIDEO")]
    pub video: String,
    #[serde(rename = "LABEL")]
    pub label: String,
    #[serde(rename = "FOLDER_NAME", default)]
    pub folder: Option<String>,
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
}

impl LabelRecord {
    pub fn new(video: &str, label: &str) -> Self {
        Self {
            video: video.to_string(),
            label: label.to_string(),
            folder: None,
            id: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }
}

pub fn load_labels(path: &Path) -> Result<Vec<LabelRecord>, Error> {
    if !path.is_file() {
        return Err(Error::missing("Label table", path));
    }
    let records = read_labels(fs::File::open(path)?)?;
    debug!("Loaded {} label row(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Parse a label table with `VIDEO` and `LABEL` columns and optional
/// `FOLDER_NAME` and `ID`. A leading UTF-8 BOM is tolerated; blank optional
/// cells read as absent.
pub fn read_labels<R: Read>(mut reader: R) -> Result<Vec<LabelRecord>, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let text = text.trim_start_matches('\u{feff}');

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for row in rdr.deserialize::<LabelRecord>() {
        let mut record = row?;
        record.folder = record.folder.filter(|f| !f.trim().is_empty());
        record.id = record.id.filter(|i| !i.trim().is_empty());
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_labels_with_bom_and_optional_columns() {
        let csv = "\u{feff}VIDEO,LABEL,FOLDER_NAME,ID\n clip1.mp4 , Jump / Roll ,Jumps,7\nclip2.mp4,Walk,,\n";
        let records = read_labels(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            LabelRecord::new("clip1.mp4", "Jump / Roll")
                .with_folder("Jumps")
                .with_id("7")
        );
        assert_eq!(records[1], LabelRecord::new("clip2.mp4", "Walk"));
    }

    #[test]
    fn test_read_labels_without_optional_columns() {
        let csv = "LABEL,VIDEO\nRun,a.mp4\n";
        let records = read_labels(csv.as_bytes()).unwrap();
        assert_eq!(records, vec![LabelRecord::new("a.mp4", "Run")]);
    }

    #[test]
    fn test_read_labels_missing_required_column() {
        let csv = "VIDEO,ID\na.mp4,1\n";
        assert!(matches!(read_labels(csv.as_bytes()), Err(Error::Csv(_))));
    }
}
