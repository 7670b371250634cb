//! Plain-text tables for list output.
//!
//! Cells may carry ANSI styling; widths are measured on the visible text.

use console::{Alignment, Style, measure_text_width, pad_str};

use floortrack_common::JobStatus;
use floortrack_common::filter::JobTag;

use crate::view::Theme;

#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = measure_text_width(cell);
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let line = |cells: &[String]| {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| pad_str(cell, widths[i], Alignment::Left, None).into_owned())
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(line(&self.headers));
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            out.push(line(row));
        }
        out.join("\n")
    }
}

fn palette(theme: Theme, base: Style) -> Style {
    match theme {
        Theme::Light => base,
        Theme::Dark => base.bright(),
    }
}

/// Status label colored by status.
pub fn status_cell(status: JobStatus, theme: Theme) -> String {
    let style = match status {
        JobStatus::Pending => Style::new().yellow(),
        JobStatus::InProgress => Style::new().cyan(),
        JobStatus::Complete => Style::new().green(),
        JobStatus::Cancelled => Style::new().dim(),
    };
    palette(theme, style).apply_to(status.label()).to_string()
}

pub fn tag_cell(tag: JobTag, theme: Theme) -> String {
    match tag {
        JobTag::Overdue => palette(theme, Style::new().red().bold())
            .apply_to(tag.to_string())
            .to_string(),
        other => palette(theme, Style::new())
            .apply_to(other.to_string())
            .to_string(),
    }
}
