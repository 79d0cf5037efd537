use crate::recorder::{partition_realized, RealizedRecorder, Recorder, RecorderFilter};
use comfy_table::presets::NOTHING;
use comfy_table::{ColumnConstraint, ContentArrangement, Table, Width};
use std::io::{self, Write};

pub const HEADER: [&str; 3] = ["ID", "Capture Length", "Wildcard Filters"];

/// Right padding after every cell; columns are never closer than this.
pub const COLUMN_PADDING: u16 = 3;
/// Minimum column width, padding included.
pub const MIN_COLUMN_WIDTH: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSummary {
    pub recorders: usize,
    pub rows: usize,
    pub skipped: usize,
}

pub fn capture_length_display(capture_length: u64) -> String {
    if capture_length == 0 {
        "full".to_string()
    } else {
        format!("<= {capture_length}")
    }
}

fn filter_cells(filter: &RecorderFilter) -> [String; 4] {
    [
        filter.source(),
        "->".to_string(),
        filter.destination(),
        filter.protocol.clone(),
    ]
}

/// Builds the table for recorders that are already validated and ordered.
pub fn build_table(recorders: &[RealizedRecorder<'_>]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(HEADER.to_vec());

    for rec in recorders {
        let [src, arrow, dst, proto] = filter_cells(rec.first);
        table.add_row(vec![
            rec.id.to_string(),
            capture_length_display(rec.capture_length),
            src,
            arrow,
            dst,
            proto,
        ]);
        for filter in rec.rest {
            let [src, arrow, dst, proto] = filter_cells(filter);
            table.add_row(vec![String::new(), String::new(), src, arrow, dst, proto]);
        }
    }

    let min_content = MIN_COLUMN_WIDTH.saturating_sub(COLUMN_PADDING);
    for column in table.column_iter_mut() {
        column
            .set_padding((0, COLUMN_PADDING))
            .set_constraint(ColumnConstraint::LowerBoundary(Width::Fixed(min_content)));
    }
    table
}

/// Writes the recorder table to `out` and one line per unrenderable record to
/// `diagnostics`. Only I/O failures on either stream are returned.
pub fn render_recorder_list<W: Write, E: Write>(
    records: &[Recorder],
    out: &mut W,
    diagnostics: &mut E,
) -> io::Result<RenderSummary> {
    let parts = partition_realized(records);
    for err in &parts.malformed {
        writeln!(diagnostics, "{err}")?;
    }
    diagnostics.flush()?;

    let table = build_table(&parts.realized);
    for line in table.lines() {
        writeln!(out, "{}", line.trim_end())?;
    }
    out.flush()?;

    Ok(RenderSummary {
        recorders: parts.realized.len(),
        rows: parts
            .realized
            .iter()
            .map(RealizedRecorder::filter_count)
            .sum(),
        skipped: parts.malformed.len(),
    })
}
