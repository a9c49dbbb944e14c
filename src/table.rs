use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use crate::browser::text_of;

static THEAD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead").unwrap());
static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TBODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static A: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Column names from the first `thead`, in order.
pub fn headers(table: ElementRef<'_>) -> Vec<String> {
    match table.select(&THEAD).next() {
        Some(head) => head.select(&TH).map(text_of).collect(),
        None => Vec::new(),
    }
}

/// Rows of the first `tbody`. A table without a body has no rows.
pub fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    match table.select(&TBODY).next() {
        Some(body) => body.select(&TR).collect(),
        None => Vec::new(),
    }
}

pub fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    row.select(&TD).map(text_of).collect()
}

/// The first link inside the row's first cell.
pub fn first_cell_link(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.select(&TD).next()?.select(&A).next()
}
