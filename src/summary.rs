// src/summary.rs

//! Plain-text table of node snapshots for the end-of-run log.

use chrono::{DateTime, Local};

use crate::node::NodeSnapshot;

const HEADER: [&str; 7] = ["#", "Step", "Started At", "Finished At", "Status", "Command", "Error"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn render_table(nodes: &[NodeSnapshot]) -> String {
    let rows: Vec<[String; 7]> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            [
                (i + 1).to_string(),
                n.name.clone(),
                format_time(n.started_at),
                format_time(n.finished_at),
                n.status.to_string(),
                n.command.clone(),
                n.error.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADER.map(str::len);
    for row in rows.iter() {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &widths, HEADER.iter().copied());
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &widths, separator.iter().map(String::as_str));
    for row in rows.iter() {
        push_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out
}

fn push_row<'a>(out: &mut String, widths: &[usize; 7], cells: impl Iterator<Item = &'a str>) {
    let line = cells
        .zip(widths.iter())
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn format_time(t: Option<DateTime<Local>>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_else(|| "-".to_string())
}
