use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::records::{AreaRecord, BenchmarkRecord, DatasetRecord, Row, SubtaskRecord, TaskRecord};

pub struct TableCount {
    pub table: &'static str,
    /// `None` when the file has not been written yet.
    pub rows: Option<usize>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct AreaCounts {
    pub tasks: usize,
    pub subtasks: usize,
    pub datasets: usize,
    pub benchmarks: usize,
}

pub struct Summary {
    pub tables: Vec<TableCount>,
    pub areas: BTreeMap<String, AreaCounts>,
}

/// Read back the exported tables in `dir`.
pub fn load(dir: &Path) -> Result<Summary> {
    let mut tables = Vec::new();
    let mut areas: BTreeMap<String, AreaCounts> = BTreeMap::new();

    tables.push(TableCount {
        table: AreaRecord::TABLE,
        rows: count_by_area(dir, AreaRecord::TABLE, |_| {})?,
    });
    tables.push(TableCount {
        table: TaskRecord::TABLE,
        rows: count_by_area(dir, TaskRecord::TABLE, |area| {
            areas.entry(area.to_string()).or_default().tasks += 1
        })?,
    });
    tables.push(TableCount {
        table: SubtaskRecord::TABLE,
        rows: count_by_area(dir, SubtaskRecord::TABLE, |area| {
            areas.entry(area.to_string()).or_default().subtasks += 1
        })?,
    });
    tables.push(TableCount {
        table: DatasetRecord::TABLE,
        rows: count_by_area(dir, DatasetRecord::TABLE, |area| {
            areas.entry(area.to_string()).or_default().datasets += 1
        })?,
    });
    tables.push(TableCount {
        table: BenchmarkRecord::TABLE,
        rows: count_by_area(dir, BenchmarkRecord::TABLE, |area| {
            areas.entry(area.to_string()).or_default().benchmarks += 1
        })?,
    });

    Ok(Summary { tables, areas })
}

/// Calls `f(area)` for every row; the `Area` column is always first.
fn count_by_area<F>(dir: &Path, table: &str, mut f: F) -> Result<Option<usize>>
where
    F: FnMut(&str),
{
    let path = dir.join(format!("{}.csv", table));
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut n = 0;
    for row in reader.records() {
        let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        f(row.get(0).unwrap_or(""));
        n += 1;
    }
    Ok(Some(n))
}

pub fn print(summary: &Summary) {
    for t in &summary.tables {
        match t.rows {
            Some(n) => println!("{:<11} {:>8}", t.table, n),
            None => println!("{:<11} {:>8}", t.table, "-"),
        }
    }

    if summary.areas.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<40} | {:>6} | {:>8} | {:>8} | {:>10}",
        "Area", "Tasks", "Subtasks", "Datasets", "Benchmarks"
    );
    println!("{}", "-".repeat(84));
    for (area, c) in &summary.areas {
        println!(
            "{:<40} | {:>6} | {:>8} | {:>8} | {:>10}",
            area, c.tasks, c.subtasks, c.datasets, c.benchmarks
        );
    }
}
