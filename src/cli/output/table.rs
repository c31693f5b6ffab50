//! Column-aligned plain text tables.
//!
//! Widths are measured on the unstyled text and a row style is applied after
//! padding, so coloured rows stay aligned. Headers never contain whitespace,
//! which keeps `headerless_table` output splittable with `awk`.

use nu_ansi_term::Style;
use std::fmt::{self, Write};

use crate::color;

/// Placeholder for an absent value.
pub(crate) const NONE: &str = "-";

pub(crate) fn or_none(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => NONE.to_string(),
    }
}

pub(crate) fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };

    text.to_string()
}

pub(crate) struct Row {
    cells: Vec<String>,
    style: Option<Style>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.is_empty() || cell.contains(char::is_whitespace))
    }

    fn columns(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn styled(mut self, style: Style) -> Row {
        self.style = Some(style);
        self
    }
}

impl From<Vec<String>> for Row {
    fn from(value: Vec<String>) -> Self {
        Row {
            cells: value,
            style: None,
        }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        let value: Vec<String> = value.into_iter().map(|s| s.to_owned()).collect();

        value.into()
    }
}

pub(crate) struct Table {
    body: Vec<Row>,
    header: Row,
    print_header: bool,
}

impl Table {
    /// A table with one column per header cell.
    ///
    /// Panics if a header cell is empty or contains whitespace.
    pub(crate) fn new<R: Into<Row>>(header: R) -> Table {
        let header = header.into();

        assert!(
            header.is_awk_safe(),
            "table header cells must be non-empty and free of whitespace"
        );

        Table {
            body: Vec::new(),
            header,
            print_header: true,
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    /// Panics if the row's width differs from the header's.
    pub(crate) fn add_row<R: Into<Row>>(&mut self, row: R) {
        let row = row.into();

        assert_eq!(
            row.columns(),
            self.header.columns(),
            "row width does not match the table header"
        );

        self.body.push(row);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        let header = if self.print_header {
            Some(&self.header)
        } else {
            None
        };

        header.into_iter().chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.header.columns()];

        for row in self.visible_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            let mut line = String::new();

            for (i, cell) in row.cells.iter().enumerate() {
                if i == row.cells.len() - 1 {
                    line.push_str(cell);
                } else {
                    write!(line, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            match row.style {
                Some(style) => writeln!(f, "{}", color::paint(style, &line))?,
                None => writeln!(f, "{}", line)?,
            }
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}
