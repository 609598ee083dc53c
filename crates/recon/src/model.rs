use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One scalar spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// String form used for key comparison. Integral numbers print without a
    /// fractional part so `10042.0` and `"10042"` compare equal.
    pub fn as_key(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
        }
    }

    /// Numeric value, if the cell holds one (or text that parses as one).
    ///
    /// Text may carry a leading `$` and `,` thousands separators.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Cell::Empty => return None,
            Cell::Number(n) => *n,
            Cell::Text(s) => {
                let trimmed = s.trim();
                let (negative, body) = match trimmed.strip_prefix('-') {
                    Some(rest) => (true, rest.trim_start()),
                    None => (false, trimmed),
                };
                let body = body.strip_prefix('$').unwrap_or(body).replace(',', "");
                let parsed: f64 = body.trim().parse().ok()?;
                if negative {
                    -parsed
                } else {
                    parsed
                }
            }
        };
        n.is_finite().then_some(n)
    }

    /// Numeric value with the coerce-to-zero policy applied.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A row keyed by column header, exactly as it appears in the source.
pub type RawRow = HashMap<String, Cell>;

/// Parsed tabular source: headers in source order plus rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Which of the four inputs a table is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Billback,
    ItemRef,
    Ppm,
    States,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Billback,
        DatasetKind::ItemRef,
        DatasetKind::Ppm,
        DatasetKind::States,
    ];

    /// Header names this dataset must carry. Billback also needs one of the
    /// two date columns, which [`check_columns`] handles separately.
    pub fn required_columns(self) -> &'static [&'static str] {
        use columns::*;
        match self {
            Self::Billback => &[MATERIAL, STATE, REBATE, QUANTITY],
            Self::ItemRef => &[MATERIAL, BRAND_DESC, PACKAGE_SIZE],
            Self::Ppm => &[DIST_ITEM, DIST_NAME_2, START, UNIT_REBATE],
            Self::States => &[STATE_CODE],
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Billback => write!(f, "billback"),
            Self::ItemRef => write!(f, "item_ref"),
            Self::Ppm => write!(f, "ppm"),
            Self::States => write!(f, "states"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub mod columns {
    pub const STATE_CODE: &str = "State Code";
    pub const STATE_ABBR: &str = "State Abbr";
    pub const STATE_NAME: &str = "State Name";
    pub const CUSTOM_ABBREVIATION: &str = "Custom Abbreviation";

    pub const MATERIAL: &str = "Material";
    pub const BRAND_DESC: &str = "Supp. Brand Desc.";
    pub const PACKAGE_SIZE: &str = "Package Size";

    pub const STATE: &str = "State";
    pub const COMPLETE_DATE: &str = "Complete Date";
    /// Trailing space is part of the header in the source workbooks.
    pub const POSTING_PERIOD: &str = "Posting Period ";
    pub const AT_PRICE: &str = "At price";
    pub const CASE_IN_PART: &str = "Case in Part";
    pub const PART_AMOUNT: &str = "Part Amount";
    pub const EXTENDED_PART: &str = "Extended Part";
    pub const NET: &str = "Net$";
    pub const QUANTITY: &str = "Quantity";
    pub const REBATE: &str = "Rebate";
    pub const BRAND_PK: &str = "Brand + Pk size";

    pub const DIST_ITEM: &str = "Dist Item#";
    pub const DIST_NAME_2: &str = "Dist Name.2";
    pub const START: &str = "Start";
    pub const UNIT_REBATE: &str = "Unit Rebate$";
    pub const PPM_BRAND_PK: &str = "ppm_Brand+pk size";
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// Origin position of a row within its source table. Stable for the life of
/// the uploaded dataset, unlike positions inside a filtered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn take(row: &mut RawRow, column: &str) -> Option<Cell> {
    row.remove(column)
}

fn take_text(row: &mut RawRow, column: &str) -> Option<String> {
    take(row, column).map(|c| c.as_key())
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateRef {
    pub row_id: RowId,
    pub state_code: Option<String>,
    pub state_abbr: Option<String>,
    pub state_name: Option<String>,
    pub custom_abbreviation: Option<String>,
    pub extra: RawRow,
}

impl StateRef {
    pub fn from_raw(row_id: RowId, mut row: RawRow) -> Self {
        Self {
            row_id,
            state_code: take_text(&mut row, columns::STATE_CODE),
            state_abbr: take_text(&mut row, columns::STATE_ABBR),
            state_name: take_text(&mut row, columns::STATE_NAME),
            custom_abbreviation: take_text(&mut row, columns::CUSTOM_ABBREVIATION),
            extra: row,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRef {
    pub row_id: RowId,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub package_size: Option<String>,
    pub extra: RawRow,
}

impl ItemRef {
    pub fn from_raw(row_id: RowId, mut row: RawRow) -> Self {
        Self {
            row_id,
            material: take(&mut row, columns::MATERIAL)
                .filter(|c| !c.is_empty())
                .map(|c| c.as_key()),
            brand: take_text(&mut row, columns::BRAND_DESC),
            package_size: take_text(&mut row, columns::PACKAGE_SIZE),
            extra: row,
        }
    }

    /// `"<brand> <pack size>"`, trimmed.
    pub fn brand_pk(&self) -> String {
        join_brand_pk(self.brand.as_deref(), self.package_size.as_deref())
    }
}

pub(crate) fn join_brand_pk(brand: Option<&str>, pack: Option<&str>) -> String {
    format!("{} {}", brand.unwrap_or(""), pack.unwrap_or(""))
        .trim()
        .to_string()
}

/// One rebate claim line.
#[derive(Debug, Clone, PartialEq)]
pub struct BillbackRecord {
    pub row_id: RowId,
    pub material: Option<String>,
    pub state: Option<String>,
    pub complete_date: Option<Cell>,
    pub posting_period: Option<Cell>,
    pub at_price: Cell,
    pub case_in_part: Cell,
    pub part_amount: Cell,
    pub extended_part: Cell,
    pub net: Cell,
    pub quantity: Cell,
    pub rebate: Cell,
    /// Derived: market key copied from the matching state reference.
    pub custom_abbreviation: Option<String>,
    /// Derived: brand + pack size from the item reference.
    pub brand_pk: Option<String>,
    pub extra: RawRow,
}

impl BillbackRecord {
    pub fn from_raw(row_id: RowId, mut row: RawRow) -> Self {
        Self {
            row_id,
            material: take_text(&mut row, columns::MATERIAL),
            state: take_text(&mut row, columns::STATE),
            complete_date: take(&mut row, columns::COMPLETE_DATE),
            posting_period: take(&mut row, columns::POSTING_PERIOD),
            at_price: take(&mut row, columns::AT_PRICE).unwrap_or_default(),
            case_in_part: take(&mut row, columns::CASE_IN_PART).unwrap_or_default(),
            part_amount: take(&mut row, columns::PART_AMOUNT).unwrap_or_default(),
            extended_part: take(&mut row, columns::EXTENDED_PART).unwrap_or_default(),
            net: take(&mut row, columns::NET).unwrap_or_default(),
            quantity: take(&mut row, columns::QUANTITY).unwrap_or_default(),
            rebate: take(&mut row, columns::REBATE).unwrap_or_default(),
            custom_abbreviation: take_text(&mut row, columns::CUSTOM_ABBREVIATION),
            brand_pk: take_text(&mut row, columns::BRAND_PK),
            extra: row,
        }
    }

    /// Trimmed join key; `None` when blank.
    pub fn material_key(&self) -> Option<&str> {
        self.material.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Date used for period filtering: `Complete Date`, else `Posting Period `.
    pub fn period_cell(&self) -> Option<&Cell> {
        self.complete_date
            .as_ref()
            .filter(|c| !c.is_empty())
            .or(self.posting_period.as_ref())
    }
}

/// One rebate agreement line.
#[derive(Debug, Clone, PartialEq)]
pub struct PpmRecord {
    pub row_id: RowId,
    pub dist_item: Option<String>,
    pub market: Option<String>,
    pub start: Option<Cell>,
    pub unit_rebate: Cell,
    pub brand: Option<String>,
    pub package_size: Option<String>,
    /// Derived: brand + pack size of this agreement line.
    pub brand_pk: Option<String>,
    pub extra: RawRow,
}

impl PpmRecord {
    pub fn from_raw(row_id: RowId, mut row: RawRow) -> Self {
        Self {
            row_id,
            dist_item: take_text(&mut row, columns::DIST_ITEM),
            market: take_text(&mut row, columns::DIST_NAME_2),
            start: take(&mut row, columns::START),
            unit_rebate: take(&mut row, columns::UNIT_REBATE).unwrap_or_default(),
            brand: take_text(&mut row, columns::BRAND_DESC),
            package_size: take_text(&mut row, columns::PACKAGE_SIZE),
            brand_pk: take_text(&mut row, columns::PPM_BRAND_PK),
            extra: row,
        }
    }

    pub fn item_key(&self) -> Option<&str> {
        self.dist_item.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// The four inputs after the input-shape check, converted to typed records.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub billback: Vec<BillbackRecord>,
    pub item_ref: Vec<ItemRef>,
    pub ppm: Vec<PpmRecord>,
    pub states: Vec<StateRef>,
}

fn require(table: &Table, kind: DatasetKind, column: &str) -> Result<(), ReconError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(ReconError::MissingColumn {
            dataset: kind,
            column: column.to_string(),
        })
    }
}

/// Check the columns a dataset kind needs are present in the table headers.
pub fn check_columns(kind: DatasetKind, table: &Table) -> Result<(), ReconError> {
    use columns::{COMPLETE_DATE, POSTING_PERIOD};
    for col in kind.required_columns() {
        require(table, kind, col)?;
    }
    if kind == DatasetKind::Billback
        && !table.has_column(COMPLETE_DATE)
        && !table.has_column(POSTING_PERIOD)
    {
        return Err(ReconError::MissingColumn {
            dataset: kind,
            column: format!("{COMPLETE_DATE}' or '{POSTING_PERIOD}"),
        });
    }
    Ok(())
}

fn convert<T>(table: Table, f: impl Fn(RowId, RawRow) -> T) -> Vec<T> {
    table
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| f(RowId(i), row))
        .collect()
}

impl Datasets {
    /// Validate and convert the four raw tables.
    pub fn from_tables(
        billback: Table,
        item_ref: Table,
        ppm: Table,
        states: Table,
    ) -> Result<Self, ReconError> {
        check_columns(DatasetKind::Billback, &billback)?;
        check_columns(DatasetKind::ItemRef, &item_ref)?;
        check_columns(DatasetKind::Ppm, &ppm)?;
        check_columns(DatasetKind::States, &states)?;

        Ok(Self {
            billback: convert(billback, BillbackRecord::from_raw),
            item_ref: convert(item_ref, ItemRef::from_raw),
            ppm: convert(ppm, PpmRecord::from_raw),
            states: convert(states, StateRef::from_raw),
        })
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// Outcome category of one result row. Serializes to the exact `Comment`
/// strings the report tables expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comment {
    #[serde(rename = "")]
    PerfectMatch,
    #[serde(rename = "Price mismatch")]
    PriceMismatch,
    #[serde(rename = "Missing Deal")]
    MissingDeal,
    #[serde(rename = "PPM Only")]
    PpmOnly,
}

impl Comment {
    pub const ALL: [Comment; 4] = [
        Comment::PerfectMatch,
        Comment::PriceMismatch,
        Comment::MissingDeal,
        Comment::PpmOnly,
    ];

    /// Wire value of the `Comment` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerfectMatch => "",
            Self::PriceMismatch => "Price mismatch",
            Self::MissingDeal => "Missing Deal",
            Self::PpmOnly => "PPM Only",
        }
    }

    /// Human label for charts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PerfectMatch => "Perfect Match",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result row per material key. Field names are the interchange schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Material")]
    pub material: String,
    #[serde(rename = "At price")]
    pub at_price: f64,
    #[serde(rename = "Case in Part")]
    pub case_in_part: f64,
    #[serde(rename = "Part Amount")]
    pub part_amount: f64,
    #[serde(rename = "Extended Part")]
    pub extended_part: f64,
    #[serde(rename = "Net$")]
    pub net: f64,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
    #[serde(rename = "Unit Rebate$")]
    pub unit_rebate: f64,
    #[serde(rename = "Rebate")]
    pub rebate: f64,
    #[serde(rename = "VAR")]
    pub var: f64,
    #[serde(rename = "Comment")]
    pub comment: Comment,
    /// Billback rows folded into this result.
    #[serde(skip)]
    pub billback_rows: Vec<RowId>,
    /// PPM row whose rebate was applied, if any.
    #[serde(skip)]
    pub ppm_row: Option<RowId>,
}

impl ResultRow {
    /// Rebate the agreement implies for the claimed quantity.
    pub fn expected_rebate(&self) -> f64 {
        self.unit_rebate * self.quantity
    }
}

/// Summary statistics over one result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_records: usize,
    pub perfect_matches: usize,
    pub mismatches: usize,
    pub missing_deals: usize,
    pub ppm_only: usize,
    pub total_variance: f64,
    pub absolute_variance: f64,
    pub percent_matched: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn number_coercion() {
        assert_eq!(Cell::text("12.5").as_number(), Some(12.5));
        assert_eq!(Cell::text(" $1,234.50 ").as_number(), Some(1234.5));
        assert_eq!(Cell::text("-$3").as_number(), Some(-3.0));
        assert_eq!(Cell::text("n/a").number_or_zero(), 0.0);
        assert_eq!(Cell::text("NaN").number_or_zero(), 0.0);
        assert_eq!(Cell::Empty.number_or_zero(), 0.0);
        assert_eq!(Cell::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn integral_numbers_key_like_text() {
        assert_eq!(Cell::Number(10042.0).as_key(), "10042");
        assert_eq!(Cell::Number(1.5).as_key(), "1.5");
    }

    #[test]
    fn comment_wire_values() {
        let json = serde_json::to_string(&Comment::PerfectMatch).unwrap();
        assert_eq!(json, "\"\"");
        let json = serde_json::to_string(&Comment::PpmOnly).unwrap();
        assert_eq!(json, "\"PPM Only\"");
    }

    #[test]
    fn result_row_uses_report_field_names() {
        let r = ResultRow {
            material: "A".into(),
            at_price: 0.0,
            case_in_part: 0.0,
            part_amount: 0.0,
            extended_part: 0.0,
            net: 5.0,
            quantity: 10.0,
            unit_rebate: 5.0,
            rebate: 50.0,
            var: 0.0,
            comment: Comment::PerfectMatch,
            billback_rows: vec![RowId(0)],
            ppm_row: Some(RowId(0)),
        };
        let v = serde_json::to_value(&r).unwrap();
        let obj = v.as_object().unwrap();
        for key in [
            "Material", "At price", "Case in Part", "Part Amount", "Extended Part",
            "Net$", "Quantity", "Unit Rebate$", "Rebate", "VAR", "Comment",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 11);
    }

    #[test]
    fn billback_keeps_unknown_columns() {
        let rec = BillbackRecord::from_raw(
            RowId(4),
            row(&[
                ("Material", Cell::Number(10042.0)),
                ("Vendor", Cell::text("Acme")),
                ("Posting Period ", Cell::text("1/15/2024")),
            ]),
        );
        assert_eq!(rec.material_key(), Some("10042"));
        assert_eq!(rec.extra.get("Vendor"), Some(&Cell::text("Acme")));
        assert_eq!(rec.period_cell(), Some(&Cell::text("1/15/2024")));
    }

    #[test]
    fn missing_required_column_fails_fast() {
        let table = Table::new(
            vec!["Dist Item#".into(), "Start".into(), "Unit Rebate$".into()],
            vec![],
        );
        let err = check_columns(DatasetKind::Ppm, &table).unwrap_err();
        assert!(err.to_string().contains("Dist Name.2"));
    }

    #[test]
    fn billback_accepts_either_date_column() {
        let mut headers: Vec<String> = ["Material", "State", "Rebate", "Quantity"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let table = Table::new(headers.clone(), vec![]);
        assert!(check_columns(DatasetKind::Billback, &table).is_err());

        headers.push("Posting Period ".into());
        let table = Table::new(headers, vec![]);
        assert!(check_columns(DatasetKind::Billback, &table).is_ok());
    }
}
