use crate::formats::FormatRecord;
use crate::Result;
use std::io::Write;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
pub const TABLE_HEADERS: [&str; 6] = ["format_id", "ext", "resolution", "vcodec", "acodec", "size"];

/// `"1.5 MB"`-style size; empty for unknown or zero sizes.
pub fn format_bytes(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return String::new(),
    };
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit])
}

/// `hh:mm:ss`, dropping the hour segment when it is zero.
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::new();
    }
    let total = seconds.floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

pub fn table_row(record: &FormatRecord) -> [String; 6] {
    [
        record.format_id.clone().unwrap_or_default(),
        record.ext.clone().unwrap_or_default(),
        record.resolution_text().unwrap_or_default(),
        record.vcodec.clone().unwrap_or_default(),
        record.acodec.clone().unwrap_or_default(),
        format_bytes(record.filesize),
    ]
}

pub fn render_table(records: &[&FormatRecord]) -> String {
    let rows: Vec<[String; 6]> = records.iter().map(|r| table_row(r)).collect();
    let mut widths: [usize; 6] = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &TABLE_HEADERS.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String; 6], widths: &[usize; 6]) {
    let line = row
        .iter()
        .zip(widths.iter())
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn write_table_csv<W: Write>(records: &[&FormatRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(TABLE_HEADERS)?;
    for record in records {
        csv.write_record(table_row(record))?;
    }
    csv.flush()?;
    Ok(())
}
