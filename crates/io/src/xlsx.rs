// Excel import (first sheet) and result workbook export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

use rebate_recon::dates::from_serial;
use rebate_recon::model::RawRow;
use rebate_recon::{Cell, ResultRow, StatsSummary, Table};

use crate::error::IoError;

pub const RESULTS_SHEET: &str = "Analysis Results";
pub const SUMMARY_SHEET: &str = "Summary";

const RESULT_HEADERS: [&str; 11] = [
    "Material",
    "At price",
    "Case in Part",
    "Part Amount",
    "Extended Part",
    "Net$",
    "Quantity",
    "Unit Rebate$",
    "Rebate",
    "VAR",
    "Comment",
];

/// Import the first worksheet of an Excel/ODS file (xlsx, xls, xlsb, ods).
///
/// Row 1 is the header row. Date cells come back as `YYYY-MM-DD` text so they
/// read the same as dates typed into a CSV. Blank rows are dropped, as the
/// CSV reader does, so row positions count non-blank data rows.
pub fn import(path: &Path) -> Result<Table, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::read(path, e))?;

    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Err(IoError::parse(path, "workbook contains no sheets"));
    };
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IoError::parse(path, format!("sheet '{first}': {e}")))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|c| convert_cell(c).as_key()).collect(),
        None => return Ok(Table::default()),
    };

    let mut rows = Vec::new();
    for data_row in rows_iter {
        let cells: Vec<Cell> = data_row.iter().map(convert_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
            .collect();
        rows.push(row);
    }

    log::debug!(
        "{}: sheet '{}' has {} columns, {} data rows",
        path.display(),
        first,
        headers.len(),
        rows.len()
    );

    let headers = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(Table::new(headers, rows))
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Cell::text(format!("#{e:?}")),
        Data::DateTime(dt) => {
            // Assumes the 1900 date system
            let serial = dt.as_f64();
            match from_serial(serial) {
                Some(date) => Cell::text(date.format("%Y-%m-%d").to_string()),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => Cell::text(s.clone()),
        Data::DurationIso(s) => Cell::text(s.clone()),
    }
}

/// Write the result rows to an `Analysis Results` sheet, plus a `Summary`
/// sheet with the run statistics.
pub fn export_results(
    results: &[ResultRow],
    stats: &StatsSummary,
    path: &Path,
) -> Result<(), IoError> {
    let mut workbook = Workbook::new();

    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    let money_format = Format::new().set_num_format("#,##0.00");

    let worksheet = workbook
        .add_worksheet()
        .set_name(RESULTS_SHEET)
        .map_err(|e| IoError::write(path, e))?;
    write_results(worksheet, results, &header_format, &money_format)
        .map_err(|e| IoError::write(path, e))?;

    let summary = workbook
        .add_worksheet()
        .set_name(SUMMARY_SHEET)
        .map_err(|e| IoError::write(path, e))?;
    write_summary(summary, stats, &header_format).map_err(|e| IoError::write(path, e))?;

    workbook.save(path).map_err(|e| IoError::write(path, e))?;
    log::debug!("wrote {} result rows to {}", results.len(), path.display());
    Ok(())
}

fn write_results(
    ws: &mut Worksheet,
    results: &[ResultRow],
    header_format: &Format,
    money_format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    for (col, header) in RESULT_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *header, header_format)?;
    }

    for (i, r) in results.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &r.material)?;
        let numbers = [
            r.at_price,
            r.case_in_part,
            r.part_amount,
            r.extended_part,
            r.net,
            r.quantity,
            r.unit_rebate,
            r.rebate,
            r.var,
        ];
        for (j, value) in numbers.into_iter().enumerate() {
            ws.write_number_with_format(row, j as u16 + 1, value, money_format)?;
        }
        ws.write_string(row, 10, r.comment.as_str())?;
    }

    ws.set_column_width(0, 14)?;
    ws.set_column_width(10, 16)?;
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_summary(
    ws: &mut Worksheet,
    stats: &StatsSummary,
    header_format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    ws.write_string_with_format(0, 0, "Metric", header_format)?;
    ws.write_string_with_format(0, 1, "Value", header_format)?;

    let rows: [(&str, f64); 8] = [
        ("Total records", stats.total_records as f64),
        ("Perfect matches", stats.perfect_matches as f64),
        ("Price mismatches", stats.mismatches as f64),
        ("Missing deals", stats.missing_deals as f64),
        ("PPM only", stats.ppm_only as f64),
        ("Total variance", stats.total_variance),
        ("Absolute variance", stats.absolute_variance),
        ("Percent matched", stats.percent_matched),
    ];
    for (i, (label, value)) in rows.into_iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, label)?;
        ws.write_number(row, 1, value)?;
    }
    ws.set_column_width(0, 20)?;
    Ok(())
}
