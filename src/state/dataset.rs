use std::cell::OnceCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{ColumnKind, DataError, ParsedTable};

/// Default fraction of the maximum subtracted below the minimum before normalizing.
pub const DEFAULT_MIN_OFFSET: f64 = 0.1;
/// Default fraction of the maximum added above the maximum before normalizing.
pub const DEFAULT_MAX_OFFSET: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn is_numeric(&self) -> bool {
        self.kind == AttributeKind::Numeric
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Numeric(f64),
    Nominal(String),
    Missing,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Nominal(s) => f.write_str(s),
            Value::Missing => f.write_str("?"),
        }
    }
}

/// One record: a value per attribute plus the trailing class label.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
    pub label: String,
}

/// A row of the active view with numeric values mapped into axis space.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Index of the source row in the full row set.
    pub source: usize,
    pub values: Vec<Value>,
    pub label: String,
}

/// How numeric attributes are mapped onto axis positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Every attribute against its own range.
    #[default]
    Local,
    /// Every attribute against the range spanning all attributes.
    Global,
}

impl ScaleMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScaleMode::Local => "Local",
            ScaleMode::Global => "Global",
        }
    }
}

/// Notification sent to dataset listeners after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    /// A new dataset replaced the previous one.
    Loaded,
    ClassFilterChanged,
    AttributeFilterChanged,
    ScaleModeChanged,
    OffsetsChanged,
    FiltersReset,
}

type DataListener = Box<dyn FnMut(&DataEvent)>;

/// Loaded relation plus its filtered, normalized views.
///
/// `active` is always derived from `rows` by class membership; the min/max and
/// normalized caches are rebuilt lazily after any setter invalidates them.
pub struct Dataset {
    relation: String,
    attributes: Vec<Attribute>,
    class_name: String,
    rows: Vec<Row>,
    active: Vec<usize>,
    classes: Vec<String>,
    active_classes: BTreeSet<String>,
    active_attributes: Vec<bool>,
    scale_mode: ScaleMode,
    min_offset: f64,
    max_offset: f64,
    min_max: OnceCell<Option<Vec<Option<(f64, f64)>>>>,
    normalized: OnceCell<Vec<NormalizedRow>>,
    revision: u64,
    listeners: Vec<DataListener>,
}

impl Dataset {
    /// Build a dataset from a parsed table. The last column becomes the class
    /// label. Fails without side effects on any malformed row.
    pub fn load(table: &ParsedTable) -> Result<Self, DataError> {
        if table.columns.len() < 2 {
            return Err(DataError::format(
                "need at least one attribute and a class column",
            ));
        }

        let class_idx = table.columns.len() - 1;
        let (class_name, class_kind) = &table.columns[class_idx];
        let attributes: Vec<Attribute> = table.columns[..class_idx]
            .iter()
            .map(|(name, kind)| Attribute {
                name: name.clone(),
                kind: if kind.is_numeric() {
                    AttributeKind::Numeric
                } else {
                    AttributeKind::Categorical
                },
            })
            .collect();

        let mut rows = Vec::with_capacity(table.row_count());
        let mut seen: Vec<String> = Vec::new();
        for (row_idx, fields) in table.rows.iter().enumerate() {
            let locate = |message: String| match table.line_of(row_idx) {
                Some(line) => DataError::format_at(line, message),
                None => DataError::format(format!("row {}: {message}", row_idx + 1)),
            };

            if fields.len() != table.columns.len() {
                return Err(locate(format!(
                    "expected {} fields, found {}",
                    table.columns.len(),
                    fields.len()
                )));
            }

            let mut values = Vec::with_capacity(attributes.len());
            for ((name, kind), field) in table.columns[..class_idx].iter().zip(fields) {
                values.push(parse_value(field, kind).map_err(|reason| {
                    locate(format!("attribute '{name}': {reason}"))
                })?);
            }

            let label = fields[class_idx].clone();
            if let ColumnKind::Categorical { values: declared } = class_kind {
                if !declared.is_empty() && !declared.contains(&label) {
                    return Err(locate(format!("undeclared class label '{label}'")));
                }
            }
            if !seen.contains(&label) {
                seen.push(label.clone());
            }
            rows.push(Row { values, label });
        }

        // Declared order wins over order of appearance.
        let classes = match class_kind {
            ColumnKind::Categorical { values } if !values.is_empty() => values
                .iter()
                .filter(|v| seen.contains(v))
                .cloned()
                .collect(),
            _ => seen,
        };

        tracing::info!(
            relation = %table.relation,
            attributes = attributes.len(),
            rows = rows.len(),
            classes = classes.len(),
            "dataset loaded"
        );

        let active = (0..rows.len()).collect();
        let active_classes = classes.iter().cloned().collect();
        let active_attributes = vec![true; attributes.len()];
        Ok(Self {
            relation: table.relation.clone(),
            attributes,
            class_name: class_name.clone(),
            rows,
            active,
            classes,
            active_classes,
            active_attributes,
            scale_mode: ScaleMode::default(),
            min_offset: DEFAULT_MIN_OFFSET,
            max_offset: DEFAULT_MAX_OFFSET,
            min_max: OnceCell::new(),
            normalized: OnceCell::new(),
            revision: 0,
            listeners: Vec::new(),
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Indices into [`Dataset::rows`] of the rows passing the class filter.
    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    pub fn active_rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.active.iter().map(move |&i| &self.rows[i])
    }

    /// Distinct class labels across all rows.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn active_classes(&self) -> &BTreeSet<String> {
        &self.active_classes
    }

    pub fn is_attribute_active(&self, idx: usize) -> bool {
        self.active_attributes.get(idx).copied().unwrap_or(false)
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn offsets(&self) -> (f64, f64) {
        (self.min_offset, self.max_offset)
    }

    /// Bumped on every mutation; consumers compare it to decide whether to rebuild.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a callback invoked after every filter or scaling change.
    pub fn on_data_changed(&mut self, listener: impl FnMut(&DataEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn set_class_filter(&mut self, include: &BTreeSet<String>) {
        self.active = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| include.contains(&row.label))
            .map(|(i, _)| i)
            .collect();
        self.active_classes = include.clone();
        self.normalized = OnceCell::new();
        tracing::debug!(active = self.active.len(), "class filter applied");
        self.notify(DataEvent::ClassFilterChanged);
    }

    /// Restrict the attributes that get axes. Unknown names are ignored.
    pub fn set_attribute_filter(&mut self, include: &BTreeSet<String>) {
        self.active_attributes = self
            .attributes
            .iter()
            .map(|a| include.contains(&a.name))
            .collect();
        self.invalidate();
        self.notify(DataEvent::AttributeFilterChanged);
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        if self.scale_mode == mode {
            return;
        }
        self.scale_mode = mode;
        self.invalidate();
        self.notify(DataEvent::ScaleModeChanged);
    }

    pub fn set_offsets(&mut self, min_offset: f64, max_offset: f64) {
        if self.min_offset == min_offset && self.max_offset == max_offset {
            return;
        }
        self.min_offset = min_offset;
        self.max_offset = max_offset;
        self.normalized = OnceCell::new();
        self.notify(DataEvent::OffsetsChanged);
    }

    /// Show every class and every attribute again.
    pub fn reset_filters(&mut self) {
        self.active = (0..self.rows.len()).collect();
        self.active_classes = self.classes.iter().cloned().collect();
        self.active_attributes = vec![true; self.attributes.len()];
        self.invalidate();
        self.notify(DataEvent::FiltersReset);
    }

    /// Per-attribute `(min, max)` over all rows. `None` entries are
    /// categorical, filtered out, or have no values.
    pub fn min_max(&self) -> Result<&[Option<(f64, f64)>], DataError> {
        self.min_max
            .get_or_init(|| self.compute_min_max())
            .as_deref()
            .ok_or(DataError::NoNumericData)
    }

    /// Normalization interval `(lo, hi)` per attribute under the current
    /// scale mode and offsets. Degenerate ranges yield `None`.
    pub fn scale_bounds(&self) -> Result<Vec<Option<(f64, f64)>>, DataError> {
        let min_max = self.min_max()?;
        let global = match self.scale_mode {
            ScaleMode::Local => None,
            ScaleMode::Global => {
                let lo = min_max.iter().flatten().map(|&(lo, _)| lo).fold(f64::INFINITY, f64::min);
                let hi = min_max.iter().flatten().map(|&(_, hi)| hi).fold(f64::NEG_INFINITY, f64::max);
                Some((lo, hi))
            }
        };

        Ok(min_max
            .iter()
            .map(|range| {
                let (min, max) = global.or(*range).filter(|_| range.is_some())?;
                let lo = min - max * self.min_offset;
                let hi = max + max * self.max_offset;
                let span = hi - lo;
                (span.is_finite() && span != 0.0).then_some((lo, hi))
            })
            .collect())
    }

    /// Active numeric attributes that can be drawn as axes, in declaration order.
    pub fn axis_attributes(&self) -> Vec<usize> {
        match self.scale_bounds() {
            Ok(bounds) => bounds
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_some())
                .map(|(i, _)| i)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Active rows with numeric values normalized into `[0, 1]`-ish axis space.
    pub fn normalized_rows(&self) -> Result<&[NormalizedRow], DataError> {
        if let Some(rows) = self.normalized.get() {
            return Ok(rows);
        }
        let rows = self.compute_normalized()?;
        Ok(self.normalized.get_or_init(|| rows))
    }

    /// Number of active rows carrying `label`.
    pub fn count_active(&self, label: &str) -> usize {
        self.active_rows().filter(|row| row.label == label).count()
    }

    fn compute_min_max(&self) -> Option<Vec<Option<(f64, f64)>>> {
        let mut ranges: Vec<Option<(f64, f64)>> = vec![None; self.attributes.len()];
        for row in &self.rows {
            for (i, value) in row.values.iter().enumerate() {
                if !self.active_attributes[i] {
                    continue;
                }
                if let Value::Numeric(v) = value {
                    let range = ranges[i].get_or_insert((*v, *v));
                    range.0 = range.0.min(*v);
                    range.1 = range.1.max(*v);
                }
            }
        }
        if ranges.iter().any(Option::is_some) {
            Some(ranges)
        } else {
            tracing::warn!(relation = %self.relation, "no numeric data to normalize");
            None
        }
    }

    fn compute_normalized(&self) -> Result<Vec<NormalizedRow>, DataError> {
        let bounds = self.scale_bounds()?;
        Ok(self
            .active
            .iter()
            .map(|&source| {
                let row = &self.rows[source];
                let values = row
                    .values
                    .iter()
                    .zip(&bounds)
                    .map(|(value, bound)| match (value, bound) {
                        (Value::Numeric(x), Some((lo, hi))) => Value::Numeric((x - lo) / (hi - lo)),
                        (Value::Numeric(_), None) => Value::Missing,
                        (other, _) => other.clone(),
                    })
                    .collect();
                NormalizedRow {
                    source,
                    values,
                    label: row.label.clone(),
                }
            })
            .collect())
    }

    fn invalidate(&mut self) {
        self.min_max = OnceCell::new();
        self.normalized = OnceCell::new();
    }

    fn notify(&mut self, event: DataEvent) {
        self.revision += 1;
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

fn parse_value(field: &str, kind: &ColumnKind) -> Result<Value, String> {
    let field = field.trim();
    if field == "?" || field.is_empty() {
        return Ok(Value::Missing);
    }
    match kind {
        ColumnKind::Numeric => match field.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Value::Numeric(v)),
            Ok(_) => Ok(Value::Missing),
            Err(_) => Err(format!("invalid numeric value '{field}'")),
        },
        ColumnKind::Categorical { values } => {
            if !values.is_empty() && !values.iter().any(|v| v == field) {
                return Err(format!("value '{field}' is not declared"));
            }
            Ok(Value::Nominal(field.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn table(columns: &[(&str, bool)], rows: &[&[&str]]) -> ParsedTable {
        ParsedTable {
            relation: "test".to_string(),
            columns: columns
                .iter()
                .map(|&(name, numeric)| {
                    let kind = if numeric {
                        ColumnKind::Numeric
                    } else {
                        ColumnKind::Categorical { values: Vec::new() }
                    };
                    (name.to_string(), kind)
                })
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            row_lines: (1..=rows.len()).collect(),
        }
    }

    fn sample() -> Dataset {
        Dataset::load(&table(
            &[("a", true), ("b", true), ("class", false)],
            &[
                &["0", "5", "x"],
                &["10", "7", "y"],
                &["4", "6", "x"],
                &["2", "9", "z"],
            ],
        ))
        .unwrap()
    }

    fn labels(set: &[&str]) -> BTreeSet<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_collects_classes_in_order() {
        let ds = sample();
        assert_eq!(ds.attributes().len(), 2);
        assert_eq!(ds.class_name(), "class");
        assert_eq!(ds.classes(), &["x", "y", "z"]);
        assert_eq!(ds.active_indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_load_rejects_field_count_mismatch() {
        let mut t = table(&[("a", true), ("class", false)], &[&["1", "x"]]);
        t.rows.push(vec!["2".to_string()]);
        t.row_lines.push(7);
        match Dataset::load(&t) {
            Err(DataError::Format { line, .. }) => assert_eq!(line, Some(7)),
            _ => panic!("expected format error"),
        }
    }

    #[test]
    fn test_load_rejects_bad_numeric() {
        let t = table(&[("a", true), ("class", false)], &[&["abc", "x"]]);
        assert!(matches!(Dataset::load(&t), Err(DataError::Format { .. })));
    }

    #[test]
    fn test_class_counts_sum_to_active_rows() {
        let mut ds = sample();
        for include in [labels(&["x", "y", "z"]), labels(&["x"]), labels(&["y", "z"]), labels(&[])] {
            ds.set_class_filter(&include);
            let total: usize = ds.classes().iter().map(|c| ds.count_active(c)).sum();
            assert_eq!(total, ds.active_indices().len());
        }
    }

    #[test]
    fn test_class_filter_is_idempotent() {
        let mut ds = sample();
        ds.set_class_filter(&labels(&["x", "z"]));
        let once = ds.active_indices().to_vec();
        ds.set_class_filter(&labels(&["x", "z"]));
        assert_eq!(ds.active_indices(), once.as_slice());
        assert_eq!(once, vec![0, 2, 3]);
    }

    #[test]
    fn test_local_normalization_matches_offsets() {
        let ds = Dataset::load(&table(
            &[("a", true), ("class", false)],
            &[&["0", "x"], &["10", "x"]],
        ))
        .unwrap();
        let rows = ds.normalized_rows().unwrap();
        let low = rows[0].values[0].as_f64().unwrap();
        let high = rows[1].values[0].as_f64().unwrap();
        assert!((low - 1.0 / 12.0).abs() < 1e-12);
        assert!((high - 11.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_global_normalization_shares_range() {
        let mut ds = sample();
        ds.set_scale_mode(ScaleMode::Global);
        // Global min 0, max 10 -> lo = -1, hi = 11 for both attributes.
        let rows = ds.normalized_rows().unwrap();
        let b = rows[0].values[1].as_f64().unwrap();
        assert!((b - 6.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_mode_invalidates_cache() {
        let mut ds = sample();
        let local = ds.normalized_rows().unwrap()[0].values[1].clone();
        ds.set_scale_mode(ScaleMode::Global);
        let global = ds.normalized_rows().unwrap()[0].values[1].clone();
        assert_ne!(local, global);
    }

    #[test]
    fn test_no_numeric_data() {
        let ds = Dataset::load(&table(
            &[("name", false), ("class", false)],
            &[&["a", "x"], &["b", "y"]],
        ))
        .unwrap();
        assert!(matches!(ds.min_max(), Err(DataError::NoNumericData)));
        assert!(matches!(ds.normalized_rows(), Err(DataError::NoNumericData)));
        assert!(ds.axis_attributes().is_empty());
    }

    #[test]
    fn test_degenerate_column_gets_no_axis() {
        let ds = Dataset::load(&table(
            &[("zero", true), ("a", true), ("class", false)],
            &[&["0", "1", "x"], &["0", "2", "y"]],
        ))
        .unwrap();
        assert_eq!(ds.axis_attributes(), vec![1]);
        assert_eq!(ds.normalized_rows().unwrap()[0].values[0], Value::Missing);
    }

    #[test]
    fn test_attribute_filter_and_reset() {
        let mut ds = sample();
        ds.set_attribute_filter(&labels(&["b"]));
        assert_eq!(ds.axis_attributes(), vec![1]);
        ds.set_class_filter(&labels(&["x"]));
        ds.reset_filters();
        assert_eq!(ds.axis_attributes(), vec![0, 1]);
        assert_eq!(ds.active_indices().len(), 4);
    }

    #[test]
    fn test_listeners_are_notified() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut ds = sample();
        ds.on_data_changed(move |e| sink.borrow_mut().push(e.clone()));
        ds.set_class_filter(&labels(&["x"]));
        ds.set_scale_mode(ScaleMode::Global);
        ds.set_scale_mode(ScaleMode::Global);
        assert_eq!(
            *events.borrow(),
            vec![DataEvent::ClassFilterChanged, DataEvent::ScaleModeChanged]
        );
        assert_eq!(ds.revision(), 2);
    }

    #[test]
    fn test_missing_values_pass_through() {
        let ds = Dataset::load(&table(
            &[("a", true), ("class", false)],
            &[&["?", "x"], &["1", "x"], &["3", "y"]],
        ))
        .unwrap();
        assert_eq!(ds.rows()[0].values[0], Value::Missing);
        assert_eq!(ds.min_max().unwrap()[0], Some((1.0, 3.0)));
    }
}
