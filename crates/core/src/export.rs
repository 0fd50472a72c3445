use serde_json::Value;

/// Display format of an export column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellFormat {
    /// Rendered verbatim. Forced for identifier columns so numerically valued
    /// ids keep leading zeros and never collapse to scientific notation.
    Text,
    /// Rendered with thousands separators.
    Number,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub header: String,
    pub format: CellFormat,
}

/// Which headers get which treatment when building a grid from a backend
/// dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSpec {
    pub forced_text_headers: Vec<String>,
    pub numeric_headers: Vec<String>,
}

impl ExportSpec {
    fn format_for(&self, header: &str) -> CellFormat {
        if self.forced_text_headers.iter().any(|candidate| candidate == header) {
            CellFormat::Text
        } else if self.numeric_headers.iter().any(|candidate| candidate == header) {
            CellFormat::Number
        } else {
            CellFormat::Text
        }
    }
}

/// A spreadsheet-like grid built from a 2-D array response. The first input
/// row is the header row; the grid only exists when at least one data row
/// follows it.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetGrid {
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    /// `None` for an empty or header-only dataset: callers reply with plain
    /// text instead of producing a file.
    pub fn from_rows(rows: &[Vec<Value>], spec: &ExportSpec) -> Option<Self> {
        let (header, data) = rows.split_first()?;
        if data.is_empty() {
            return None;
        }

        let columns: Vec<ColumnSpec> = header
            .iter()
            .map(|value| {
                let header = cell_text(value);
                let format = spec.format_for(&header);
                ColumnSpec { header, format }
            })
            .collect();

        let rows = data
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| make_cell(row.get(index), column.format))
                    .collect()
            })
            .collect();

        Some(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Encodes the grid as CSV bytes, applying the per-column display
    /// formats. The workbook flavor behind the download is not this model's
    /// concern; any tabular encoder slots in here.
    pub fn encode_csv(&self) -> Vec<u8> {
        let mut out = String::new();
        let headers: Vec<String> =
            self.columns.iter().map(|column| csv_escape(&column.header)).collect();
        out.push_str(&headers.join(","));
        out.push('\n');

        for row in &self.rows {
            let rendered: Vec<String> = row.iter().map(|cell| csv_escape(&render_cell(cell))).collect();
            out.push_str(&rendered.join(","));
            out.push('\n');
        }

        out.into_bytes()
    }
}

fn make_cell(value: Option<&Value>, format: CellFormat) -> Cell {
    let Some(value) = value else {
        return Cell::Text(String::new());
    };

    match format {
        CellFormat::Text => Cell::Text(cell_text(value)),
        CellFormat::Number => match value.as_i64() {
            Some(number) => Cell::Number(number),
            None => Cell::Text(cell_text(value)),
        },
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Number(number) => format_number(*number),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Locale-style thousands separators: `1234567` becomes `1,234,567`.
pub fn format_number(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{format_number, Cell, CellFormat, ExportSpec, SheetGrid};

    fn spec() -> ExportSpec {
        ExportSpec {
            forced_text_headers: vec!["Governor ID".to_owned()],
            numeric_headers: vec!["Power".to_owned(), "Kill Points".to_owned()],
        }
    }

    #[test]
    fn header_only_dataset_yields_no_grid() {
        let rows = vec![vec![json!("Governor ID"), json!("Power")]];
        assert_eq!(SheetGrid::from_rows(&rows, &spec()), None);
    }

    #[test]
    fn empty_dataset_yields_no_grid() {
        assert_eq!(SheetGrid::from_rows(&[], &spec()), None);
    }

    #[test]
    fn identifier_column_stays_text_even_when_numeric() {
        let rows = vec![
            vec![json!("Governor ID"), json!("Power")],
            vec![json!(77001122), json!(123456789)],
        ];
        let grid = SheetGrid::from_rows(&rows, &spec()).expect("grid");

        assert_eq!(grid.columns()[0].format, CellFormat::Text);
        assert_eq!(grid.rows()[0][0], Cell::Text("77001122".to_owned()));
        assert_eq!(grid.rows()[0][1], Cell::Number(123_456_789));
    }

    #[test]
    fn csv_encoding_applies_number_formatting() {
        let rows = vec![
            vec![json!("Governor ID"), json!("Name"), json!("Power")],
            vec![json!("007700"), json!("Alice, the Bold"), json!(98765432)],
        ];
        let grid = SheetGrid::from_rows(&rows, &spec()).expect("grid");
        let csv = String::from_utf8(grid.encode_csv()).expect("utf8");

        assert_eq!(
            csv,
            "Governor ID,Name,Power\n007700,\"Alice, the Bold\",\"98,765,432\"\n"
        );
    }

    #[test]
    fn short_rows_pad_with_empty_cells() {
        let rows = vec![
            vec![json!("Governor ID"), json!("Power")],
            vec![json!("123")],
        ];
        let grid = SheetGrid::from_rows(&rows, &spec()).expect("grid");
        assert_eq!(grid.rows()[0][1], Cell::Text(String::new()));
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(-45_000), "-45,000");
    }
}
