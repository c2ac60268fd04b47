use std::path::Path;

use crate::data::{ColumnKind, DataError, ParsedTable};

/// Read and parse a WEKA ARFF file.
pub fn read_arff(path: &Path) -> Result<ParsedTable, DataError> {
    let content = std::fs::read(path)?;
    // Fall back to latin1 for files that are not valid UTF-8.
    let text = String::from_utf8(content.clone())
        .unwrap_or_else(|_| content.iter().map(|&b| b as char).collect());
    parse_arff(&text)
}

/// Parse ARFF text: `@RELATION`, `@ATTRIBUTE` declarations, then `@DATA` rows.
///
/// Lines starting with `%` are comments. Data rows are comma separated and may
/// quote values with single or double quotes.
pub fn parse_arff(text: &str) -> Result<ParsedTable, DataError> {
    let mut relation = String::new();
    let mut columns: Vec<(String, ColumnKind)> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row_lines: Vec<usize> = Vec::new();
    let mut in_data = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if line.starts_with('@') {
            let (keyword, rest) = split_keyword(line);
            match keyword.to_ascii_uppercase().as_str() {
                "@RELATION" if !in_data => {
                    relation = read_name(rest)
                        .map(|(name, _)| name)
                        .unwrap_or_default();
                }
                "@ATTRIBUTE" if !in_data => {
                    let (name, type_spec) = read_name(rest)
                        .ok_or_else(|| DataError::format_at(line_no, "attribute without a name"))?;
                    let kind = parse_kind(type_spec)
                        .ok_or_else(|| DataError::format_at(line_no, format!("attribute '{name}' has no type")))?;
                    columns.push((name, kind));
                }
                "@DATA" => {
                    if columns.is_empty() {
                        return Err(DataError::format_at(line_no, "@DATA before any @ATTRIBUTE"));
                    }
                    in_data = true;
                }
                other => {
                    return Err(DataError::format_at(line_no, format!("unexpected declaration {other}")));
                }
            }
            continue;
        }

        if !in_data {
            return Err(DataError::format_at(line_no, "data found before @DATA"));
        }
        if line.starts_with('{') {
            return Err(DataError::format_at(line_no, "sparse ARFF rows are not supported"));
        }

        let fields = split_row(line).map_err(|e| DataError::format_at(line_no, e.to_string()))?;
        if fields.len() != columns.len() {
            return Err(DataError::format_at(
                line_no,
                format!("expected {} fields, found {}", columns.len(), fields.len()),
            ));
        }
        rows.push(fields);
        row_lines.push(line_no);
    }

    if !in_data {
        return Err(DataError::format("missing @DATA section"));
    }

    tracing::debug!(relation = %relation, columns = columns.len(), rows = rows.len(), "parsed ARFF");

    Ok(ParsedTable {
        relation,
        columns,
        rows,
        row_lines,
    })
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim_start()),
        None => (line, ""),
    }
}

/// Read a possibly quoted name, returning it and the remainder of the line.
fn read_name(rest: &str) -> Option<(String, &str)> {
    let rest = rest.trim_start();
    let first = rest.chars().next()?;
    if first == '\'' || first == '"' {
        let body = &rest[1..];
        let end = body.find(first)?;
        Some((body[..end].to_string(), body[end + 1..].trim()))
    } else {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        Some((rest[..end].to_string(), rest[end..].trim()))
    }
}

fn parse_kind(type_spec: &str) -> Option<ColumnKind> {
    let spec = type_spec.trim();
    if spec.is_empty() {
        return None;
    }
    if let Some(inner) = spec.strip_prefix('{') {
        let inner = inner.trim_end_matches('}');
        let values = inner
            .split(',')
            .map(|v| unquote(v.trim()).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        return Some(ColumnKind::Categorical { values });
    }
    let keyword = spec.split_whitespace().next().unwrap_or_default();
    match keyword.to_ascii_uppercase().as_str() {
        "NUMERIC" | "REAL" | "INTEGER" => Some(ColumnKind::Numeric),
        _ => Some(ColumnKind::Categorical { values: Vec::new() }),
    }
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Split a data row. Fields are `"`-quoted unless one of them opens with `'`.
fn split_row(line: &str) -> Result<Vec<String>, csv::Error> {
    let single_quoted = line.split(',').any(|field| field.trim_start().starts_with('\''));
    let quote = if single_quoted { b'\'' } else { b'"' };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .quote(quote)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record.iter().map(|s| s.to_string()).collect())
    } else {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRIS: &str = "\
% tiny iris sample
@RELATION iris

@ATTRIBUTE sepallength NUMERIC
@ATTRIBUTE 'petal width' REAL
@ATTRIBUTE class {Iris-setosa, Iris-versicolor}

@DATA
5.1,0.2,Iris-setosa
7.0,1.4,Iris-versicolor
% trailing comment
6.4,?,'Iris-versicolor'
";

    #[test]
    fn test_parse_header_and_rows() {
        let table = parse_arff(IRIS).unwrap();
        assert_eq!(table.relation, "iris");
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[1].0, "petal width");
        assert!(table.columns[0].1.is_numeric());
        assert_eq!(
            table.columns[2].1,
            ColumnKind::Categorical {
                values: vec!["Iris-setosa".to_string(), "Iris-versicolor".to_string()]
            }
        );
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[2], vec!["6.4", "?", "Iris-versicolor"]);
        assert_eq!(table.line_of(0), Some(9));
    }

    #[test]
    fn test_field_count_mismatch_reports_line() {
        let text = "@relation r\n@attribute a numeric\n@attribute c {x,y}\n@data\n1,x\n2\n";
        match parse_arff(text) {
            Err(DataError::Format { line, .. }) => assert_eq!(line, Some(6)),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_data_section() {
        let text = "@relation r\n@attribute a numeric\n";
        assert!(matches!(parse_arff(text), Err(DataError::Format { .. })));
    }

    #[test]
    fn test_string_attribute_is_categorical() {
        let text = "@relation r\n@attribute name string\n@attribute c {x}\n@data\nfoo,x\n";
        let table = parse_arff(text).unwrap();
        assert_eq!(table.columns[0].1, ColumnKind::Categorical { values: Vec::new() });
    }

    #[test]
    fn test_apostrophe_inside_field() {
        let text = "@relation r\n@attribute name string\n@attribute a numeric\n@attribute c {x}\n@data\n\
                    O'Brien,1,x\n\"Hello, world\",2,x\n'a, b',3,x\n";
        let table = parse_arff(text).unwrap();
        assert_eq!(table.rows[0], vec!["O'Brien", "1", "x"]);
        assert_eq!(table.rows[1], vec!["Hello, world", "2", "x"]);
        assert_eq!(table.rows[2], vec!["a, b", "3", "x"]);
    }
}
