use std::path::Path;

use crate::data::{arff, ColumnKind, DataError, ParsedTable};

/// File extensions the loader understands, for the open dialog filter.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["arff", "csv", "xls", "xlsx"];

/// Load an ARFF, CSV or Excel file into a [`ParsedTable`].
///
/// CSV and Excel files carry no type declarations, so column kinds are
/// inferred: a column is numeric when all of its non-missing cells parse as
/// floats. The last column is the class label either way.
pub fn load_file(path: &Path) -> Result<ParsedTable, DataError> {
    let ext = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "arff" => arff::read_arff(path)?,
        "csv" => load_csv(path)?,
        "xls" | "xlsx" => load_excel(path)?,
        _ => return Err(DataError::UnsupportedFormat(ext)),
    };

    tracing::info!(
        "Loaded {:?}: {} columns, {} rows",
        path,
        table.columns.len(),
        table.row_count()
    );
    Ok(table)
}

fn load_csv(path: &Path) -> Result<ParsedTable, DataError> {
    let content = std::fs::read(path)?;
    let text = String::from_utf8(content.clone())
        .unwrap_or_else(|_| content.iter().map(|&b| b as char).collect());
    parse_csv(&text, relation_name(path))
}

/// Parse CSV text whose first record is the header row.
pub fn parse_csv(text: &str, relation: String) -> Result<ParsedTable, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    let mut row_lines: Vec<usize> = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|s| s.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        all_rows.push(record.iter().map(|s| s.to_string()).collect());
        row_lines.push(line);
    }

    let mut rows = all_rows.into_iter();
    let header = rows.next().ok_or_else(|| DataError::format("no header row found"))?;
    let data_rows: Vec<Vec<String>> = rows.collect();
    row_lines.remove(0);

    Ok(ParsedTable {
        relation,
        columns: infer_columns(&header, &data_rows),
        rows: data_rows,
        row_lines,
    })
}

fn load_excel(path: &Path) -> Result<ParsedTable, DataError> {
    use calamine::{open_workbook_auto, Reader, Data};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DataError::Excel(format!("Cannot open Excel file: {e}")))?;

    let sheet_name = workbook.sheet_names().first()
        .ok_or_else(|| DataError::Excel("No sheets found".to_string()))?
        .clone();

    let range = workbook.worksheet_range(&sheet_name)
        .map_err(|e| DataError::Excel(format!("Cannot read sheet: {e}")))?;

    let all_rows: Vec<Vec<String>> = range.rows().map(|row| {
        row.iter().map(|cell| {
            match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.trim().to_string(),
                Data::Float(f) => f.to_string(),
                Data::Int(i) => i.to_string(),
                Data::Bool(b) => b.to_string(),
                Data::DateTime(dt) => dt.to_string(),
                Data::DateTimeIso(s) => s.clone(),
                Data::DurationIso(s) => s.clone(),
                Data::Error(e) => format!("{e:?}"),
            }
        }).collect()
    }).collect();

    let mut rows = all_rows.into_iter().enumerate()
        .filter(|(_, row)| row.iter().any(|c| !c.is_empty()));
    let (_, header) = rows.next().ok_or_else(|| DataError::format("no header row found"))?;
    let (row_lines, data_rows): (Vec<usize>, Vec<Vec<String>>) =
        rows.map(|(i, row)| (i + 1, row)).unzip();

    Ok(ParsedTable {
        relation: relation_name(path),
        columns: infer_columns(&header, &data_rows),
        rows: data_rows,
        row_lines,
    })
}

fn relation_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

/// Name header columns and decide their kinds from the data cells.
/// The class column (last) is always categorical.
fn infer_columns(header: &[String], rows: &[Vec<String>]) -> Vec<(String, ColumnKind)> {
    let last = header.len().saturating_sub(1);
    header
        .iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let mut seen = 0usize;
            let numeric = col_idx != last
                && rows.iter().all(|row| match row.get(col_idx).map(|s| s.as_str()) {
                    None | Some("") | Some("?") => true,
                    Some(cell) => {
                        seen += 1;
                        cell.parse::<f64>().is_ok()
                    }
                });
            let kind = if numeric && seen > 0 {
                ColumnKind::Numeric
            } else {
                ColumnKind::Categorical { values: Vec::new() }
            };
            (name.clone(), kind)
        })
        .collect()
}
