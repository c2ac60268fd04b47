use std::collections::{BTreeSet, HashMap};

use crate::state::dataset::Dataset;

/// Default class colors (translucent, so overlapping lines stay readable).
pub const DEFAULT_PALETTE: [[u8; 4]; 8] = [
    [255, 30, 0, 100],
    [61, 28, 227, 100],
    [255, 205, 0, 100],
    [0, 232, 61, 100],
    [240, 63, 40, 100],
    [65, 45, 166, 100],
    [240, 200, 40, 100],
    [30, 179, 69, 100],
];

/// Used for labels that have no palette entry.
pub const FALLBACK_COLOR: [u8; 4] = [128, 128, 128, 100];

pub fn color_for_index(palette: &[[u8; 4]], index: usize) -> [u8; 4] {
    if palette.is_empty() {
        return FALLBACK_COLOR;
    }
    palette[index % palette.len()]
}

pub fn to_color32(c: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

/// Maps class labels to colors and forwards class visibility to the dataset.
#[derive(Debug, Clone, Default)]
pub struct PaletteBinder {
    colors: HashMap<String, [u8; 4]>,
}

impl PaletteBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping.
    pub fn set_palette(&mut self, mapping: HashMap<String, [u8; 4]>) {
        self.colors = mapping;
    }

    /// Assign `palette` colors to `classes` cyclically, in class order.
    pub fn assign_defaults(&mut self, classes: &[String], palette: &[[u8; 4]]) {
        let mapping = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), color_for_index(palette, i)))
            .collect();
        self.set_palette(mapping);
    }

    pub fn set_color(&mut self, label: &str, color: [u8; 4]) {
        self.colors.insert(label.to_string(), color);
    }

    pub fn color_for(&self, label: &str) -> [u8; 4] {
        self.colors.get(label).copied().unwrap_or(FALLBACK_COLOR)
    }

    /// Show or hide one class by updating the dataset's include-set.
    pub fn set_class_visible(&self, label: &str, visible: bool, dataset: &mut Dataset) {
        let mut include: BTreeSet<String> = dataset.active_classes().clone();
        let changed = if visible {
            include.insert(label.to_string())
        } else {
            include.remove(label)
        };
        if changed {
            tracing::debug!(label, visible, "class visibility toggled");
            dataset.set_class_filter(&include);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnKind, ParsedTable};

    fn dataset() -> Dataset {
        Dataset::load(&ParsedTable {
            relation: "r".to_string(),
            columns: vec![
                ("a".to_string(), ColumnKind::Numeric),
                ("class".to_string(), ColumnKind::Categorical { values: Vec::new() }),
            ],
            rows: vec![
                vec!["1".to_string(), "x".to_string()],
                vec!["2".to_string(), "y".to_string()],
                vec!["3".to_string(), "x".to_string()],
            ],
            row_lines: vec![1, 2, 3],
        })
        .unwrap()
    }

    #[test]
    fn test_missing_label_falls_back() {
        let mut binder = PaletteBinder::new();
        binder.assign_defaults(&["x".to_string()], &DEFAULT_PALETTE);
        assert_eq!(binder.color_for("x"), DEFAULT_PALETTE[0]);
        assert_eq!(binder.color_for("nope"), FALLBACK_COLOR);
    }

    #[test]
    fn test_defaults_cycle() {
        let classes: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let mut binder = PaletteBinder::new();
        binder.assign_defaults(&classes, &DEFAULT_PALETTE);
        assert_eq!(binder.color_for("c8"), DEFAULT_PALETTE[0]);
        assert_eq!(binder.color_for("c9"), DEFAULT_PALETTE[1]);
    }

    #[test]
    fn test_class_visibility_updates_filter() {
        let mut ds = dataset();
        let binder = PaletteBinder::new();
        binder.set_class_visible("x", false, &mut ds);
        assert_eq!(ds.active_indices(), &[1]);
        let rev = ds.revision();
        // Hiding an already hidden class does nothing.
        binder.set_class_visible("x", false, &mut ds);
        assert_eq!(ds.revision(), rev);
        binder.set_class_visible("x", true, &mut ds);
        assert_eq!(ds.active_indices(), &[0, 1, 2]);
    }
}
