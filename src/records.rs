//! Row types for the five output tables.
//!
//! Child records are only built from their parent record, which is how the
//! ancestor keys (Area, Task, Subtask) travel down the crawl unchanged.

/// Ordered `column name -> cell text` pairs discovered from a page's table header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns(Vec<(String, String)>);

impl Columns {
    /// Pair headers with cells; the shorter side wins. A repeated header keeps
    /// its first position and takes the later value.
    pub fn zip<H, C>(headers: H, cells: C) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        C: IntoIterator<Item = String>,
    {
        let mut cols = Columns::default();
        for (name, value) in headers.into_iter().zip(cells) {
            cols.insert(name.as_ref(), value);
        }
        cols
    }

    fn insert(&mut self, name: &str, value: String) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

/// A record that can be written as one CSV row.
pub trait Row {
    /// File stem of the table.
    const TABLE: &'static str;
    /// Fixed leading columns, in export order.
    const FIXED: &'static [&'static str];

    fn fixed(&self) -> Vec<&str>;

    fn dynamic(&self) -> Option<&Columns> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRecord {
    pub area: String,
    pub area_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub area: String,
    pub task: String,
    pub task_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskRecord {
    pub area: String,
    pub task: String,
    pub subtask: String,
    pub subtask_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub area: String,
    pub task: String,
    pub subtask: String,
    pub benchmark_url: String,
    pub columns: Columns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRecord {
    pub area: String,
    pub task: String,
    pub subtask: String,
    pub columns: Columns,
}

impl TaskRecord {
    pub fn under(area: &AreaRecord, task: String, task_url: String) -> Self {
        TaskRecord {
            area: area.area.clone(),
            task,
            task_url,
        }
    }
}

impl SubtaskRecord {
    pub fn under(task: &TaskRecord, subtask: String, subtask_url: String) -> Self {
        SubtaskRecord {
            area: task.area.clone(),
            task: task.task.clone(),
            subtask,
            subtask_url,
        }
    }
}

impl DatasetRecord {
    pub fn under(subtask: &SubtaskRecord, benchmark_url: String, columns: Columns) -> Self {
        DatasetRecord {
            area: subtask.area.clone(),
            task: subtask.task.clone(),
            subtask: subtask.subtask.clone(),
            benchmark_url,
            columns,
        }
    }
}

impl BenchmarkRecord {
    pub fn under(dataset: &DatasetRecord, columns: Columns) -> Self {
        BenchmarkRecord {
            area: dataset.area.clone(),
            task: dataset.task.clone(),
            subtask: dataset.subtask.clone(),
            columns,
        }
    }
}

impl Row for AreaRecord {
    const TABLE: &'static str = "areas";
    const FIXED: &'static [&'static str] = &["Area", "Area_URL"];

    fn fixed(&self) -> Vec<&str> {
        vec![self.area.as_str(), self.area_url.as_str()]
    }
}

impl Row for TaskRecord {
    const TABLE: &'static str = "tasks";
    const FIXED: &'static [&'static str] = &["Area", "Task", "Task_URL"];

    fn fixed(&self) -> Vec<&str> {
        vec![self.area.as_str(), self.task.as_str(), self.task_url.as_str()]
    }
}

impl Row for SubtaskRecord {
    const TABLE: &'static str = "subtasks";
    const FIXED: &'static [&'static str] = &["Area", "Task", "Subtask", "Subtask_URL"];

    fn fixed(&self) -> Vec<&str> {
        vec![self.area.as_str(), self.task.as_str(), self.subtask.as_str(), self.subtask_url.as_str()]
    }
}

impl Row for DatasetRecord {
    const TABLE: &'static str = "datasets";
    const FIXED: &'static [&'static str] = &["Area", "Task", "Subtask", "Benchmark_URL"];

    fn fixed(&self) -> Vec<&str> {
        vec![self.area.as_str(), self.task.as_str(), self.subtask.as_str(), self.benchmark_url.as_str()]
    }

    fn dynamic(&self) -> Option<&Columns> {
        Some(&self.columns)
    }
}

impl Row for BenchmarkRecord {
    const TABLE: &'static str = "benchmarks";
    const FIXED: &'static [&'static str] = &["Area", "Task", "Subtask"];

    fn fixed(&self) -> Vec<&str> {
        vec![self.area.as_str(), self.task.as_str(), self.subtask.as_str()]
    }

    fn dynamic(&self) -> Option<&Columns> {
        Some(&self.columns)
    }
}
