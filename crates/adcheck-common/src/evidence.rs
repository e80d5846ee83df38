/// Spreadsheet-to-text extraction for the property evidence file.
///
/// Only the first sheet is read. Rows become lines, cells are TAB-separated, and trailing
/// blanks are trimmed so the text stays compact inside a prompt. Either the whole sheet is
/// rendered or the call fails; there is no partial result.
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;

use crate::error::ComplianceError;

pub fn extract_first_sheet(bytes: &[u8]) -> Result<String, ComplianceError> {
    if bytes.is_empty() {
        return Err(ComplianceError::Extraction("file is empty".to_string()));
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ComplianceError::Extraction(format!("failed to open workbook: {e}")))?;

    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Err(ComplianceError::Extraction(
            "workbook contains no sheets".to_string(),
        ));
    };

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ComplianceError::Extraction(format!("failed to read sheet '{first}': {e}")))?;

    // Keep the sheet's own offset so a table starting at C3 still lines up with its columns.
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut lines: Vec<String> = vec![String::new(); start_row];
    for row in range.rows() {
        let mut cells: Vec<String> = vec![String::new(); start_col];
        cells.extend(row.iter().map(render_cell));
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        lines.push(cells.join("\t"));
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return Err(ComplianceError::Extraction(format!(
            "sheet '{first}' has no populated cells"
        )));
    }

    Ok(lines.join("\n"))
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim_end().to_string(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.num_seconds_from_midnight() == 0 => {
                ndt.format("%Y-%m-%d").to_string()
            }
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("{}", dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
