use crate::types::{Category, CategoryMap, PostRecord, Result, SurveyError};
use csv::{ReaderBuilder, StringRecord, Writer};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const AUTHOR_COLUMN: &str = "Author";
pub const WEBPAGE_COLUMN: &str = "Webpage";

/// Header row: author, webpage, then every category label in order.
pub fn header() -> Vec<&'static str> {
    let mut columns = vec![AUTHOR_COLUMN, WEBPAGE_COLUMN];
    columns.extend(Category::ALL.iter().map(|c| c.label()));
    columns
}

/// Append-only table used by the crawl pass.
///
/// Creating it truncates the file and writes the header; each appended row
/// is flushed straight away.
pub struct ResultTable {
    path: PathBuf,
    writer: Writer<File>,
    rows_written: usize,
}

impl ResultTable {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = Writer::from_writer(File::create(&path)?);
        writer.write_record(header())?;
        writer.flush()?;

        info!("Created result table {}", path.display());
        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    pub fn append(&mut self, record: &PostRecord) -> Result<()> {
        self.writer.write_record(record.cells())?;
        self.writer.flush()?;
        self.rows_written += 1;
        debug!("Appended row for {} to {}", record.link, self.path.display());
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Read every row of a table back into records.
///
/// Columns are located by header name. Category columns that are missing
/// read as empty; `Author` and `Webpage` are required.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<PostRecord>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    // Locate columns by header name so reordered tables still load
    let author_idx = column_index(&headers, AUTHOR_COLUMN, path)?;
    let link_idx = column_index(&headers, WEBPAGE_COLUMN, path)?;
    let category_idx: Vec<(Category, Option<usize>)> = Category::ALL
        .iter()
        .map(|c| (*c, headers.iter().position(|h| h.trim() == c.label())))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).unwrap_or("").to_string();

        let mut defaults = CategoryMap::new();
        for (category, idx) in &category_idx {
            defaults.set(*category, idx.map(cell).unwrap_or_default());
        }

        records.push(PostRecord::new(cell(author_idx), cell(link_idx), defaults));
    }

    info!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Replace the table at `path` with `records`, header included.
pub fn write_records(path: impl AsRef<Path>, records: &[PostRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(header())?;
    for record in records {
        writer.write_record(record.cells())?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SurveyError::Parse(format!("{} has no '{}' column", path.display(), name)))
}
