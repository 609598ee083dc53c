use crate::error::ReconError;
use crate::model::{Cell, RawRow, Table};

/// Parse already-decoded delimited text into a [`Table`].
///
/// Every cell comes back as text (or empty); numeric coercion happens when
/// the typed records are built. Short rows are padded with empty cells.
/// Blank rows are dropped, so a row's index in the table (and later its
/// `RowId`) counts non-blank data rows only.
pub fn load_csv_table(csv_data: &str, delimiter: u8) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    let mut blank = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            blank += 1;
            continue;
        }
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), Cell::from(record.get(i).unwrap_or(""))))
            .collect();
        rows.push(row);
    }

    if blank > 0 {
        log::debug!("dropped {blank} blank rows");
    }
    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let t = load_csv_table("Material,Quantity\nA,10\nB,\n", b',').unwrap();
        assert_eq!(t.headers, vec!["Material", "Quantity"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0]["Quantity"], Cell::text("10"));
        assert_eq!(t.rows[1]["Quantity"], Cell::Empty);
    }

    #[test]
    fn keeps_trailing_space_in_header() {
        let t = load_csv_table("Material\tPosting Period \nA\t1/2/2024\n", b'\t').unwrap();
        assert!(t.has_column("Posting Period "));
    }

    #[test]
    fn skips_blank_lines_and_pads_short_rows() {
        let t = load_csv_table("\u{feff}a,b,c\n1\n,,\n2,3,4\n", b',').unwrap();
        assert_eq!(t.headers[0], "a");
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0]["c"], Cell::Empty);
    }

    #[test]
    fn blank_rows_do_not_take_a_row_position() {
        let t = load_csv_table("Material,Rebate
A,1
 , 

B,2
", b',').unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[1]["Material"], Cell::text("B"));
    }
}
