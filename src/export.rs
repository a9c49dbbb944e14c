use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::records::Row;

/// Header row: fixed columns, then dynamic columns in first-seen order.
/// Dynamic names that collide with a fixed column are dropped so page data
/// can never overwrite an ancestor key.
pub fn header<R: Row>(records: &[R]) -> Vec<String> {
    let mut header: Vec<String> = R::FIXED.iter().map(|s| s.to_string()).collect();
    for record in records {
        if let Some(cols) = record.dynamic() {
            for name in cols.names() {
                if !header.iter().any(|h| h == name) {
                    header.push(name.to_string());
                }
            }
        }
    }
    header
}

pub fn write_csv<R: Row, W: Write>(out: W, records: &[R]) -> Result<()> {
    let header = header(records);
    let dynamic_names = &header[R::FIXED.len()..];

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&header)?;
    for record in records {
        let mut row: Vec<&str> = record.fixed();
        for name in dynamic_names {
            row.push(record.dynamic().and_then(|c| c.get(name)).unwrap_or(""));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `<dir>/<table>.csv`, replacing any previous file only once the new
/// one is complete.
pub fn write_table<R: Row>(dir: &Path, records: &[R]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}.csv", R::TABLE));
    let tmp = dir.join(format!("{}.csv.tmp", R::TABLE));

    let file = fs::File::create(&tmp).with_context(|| format!("Failed to create {}", tmp.display()))?;
    write_csv(std::io::BufWriter::new(file), records)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("Failed to move {} into place", path.display()))?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(path)
}
