use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::data::{loader, DataError, ParsedTable};
use crate::processing::selection::SelectionEvent;
use crate::render::layout::RadialLayout;
use crate::render::reorder::ReorderController;
use crate::render::star_plot::StarPlot;
use crate::settings::Settings;
use crate::state::dataset::{DataEvent, Dataset, ScaleMode};
use crate::state::palette::PaletteBinder;
use crate::state::theme::Theme;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

type DataListeners = Rc<RefCell<Vec<Box<dyn FnMut(&DataEvent)>>>>;

/// Application state shared by the panels: the installed dataset, the plot
/// built from it and the class colors.
pub struct AppState {
    pub settings: Settings,
    pub theme: Theme,
    pub dataset: Option<Dataset>,
    pub plot: StarPlot,
    pub palette: PaletteBinder,
    pub source_path: Option<PathBuf>,
    /// Last load failure, shown in the error window until dismissed.
    pub error_message: Option<String>,
    /// Why the plot is empty, if it is.
    pub plot_message: Option<String>,
    data_listeners: DataListeners,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let layout = RadialLayout::new(settings.axis_padding, settings.resize_delay());
        let reorder = ReorderController::new(settings.animation());
        Self {
            theme: settings.theme,
            settings,
            dataset: None,
            plot: StarPlot::new(layout, reorder),
            palette: PaletteBinder::new(),
            source_path: None,
            error_message: None,
            plot_message: None,
            data_listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Install a parsed table as the current dataset. On error the previous
    /// dataset stays in place.
    pub fn load_dataset(&mut self, table: &ParsedTable) -> Result<(), DataError> {
        let mut dataset = Dataset::load(table)?;
        dataset.set_offsets(self.settings.min_offset, self.settings.max_offset);

        let listeners = Rc::clone(&self.data_listeners);
        dataset.on_data_changed(move |event| {
            for listener in listeners.borrow_mut().iter_mut() {
                listener(event);
            }
        });

        self.palette.assign_defaults(dataset.classes(), &self.settings.palette);
        self.plot.clear_selection();
        self.plot.invalidate();
        self.dataset = Some(dataset);
        self.notify_data(&DataEvent::Loaded);
        self.sync_plot();
        Ok(())
    }

    /// Read and install a file, reporting failures through `error_message`.
    pub fn open_path(&mut self, path: &Path) -> bool {
        let result = loader::load_file(path).and_then(|table| self.load_dataset(&table));
        match result {
            Ok(()) => {
                self.source_path = Some(path.to_path_buf());
                self.error_message = None;
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load data file");
                self.error_message = Some(format!("Failed to load {}:\n{e}", path.display()));
                false
            }
        }
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        if let Some(dataset) = &mut self.dataset {
            dataset.set_scale_mode(mode);
        }
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.dataset.as_ref().map(|d| d.scale_mode()).unwrap_or_default()
    }

    pub fn set_class_filter(&mut self, labels: &BTreeSet<String>) {
        if let Some(dataset) = &mut self.dataset {
            dataset.set_class_filter(labels);
        }
    }

    pub fn set_class_visible(&mut self, label: &str, visible: bool) {
        if let Some(dataset) = &mut self.dataset {
            self.palette.set_class_visible(label, visible, dataset);
        }
    }

    pub fn set_palette(&mut self, mapping: HashMap<String, [u8; 4]>) {
        self.palette.set_palette(mapping);
    }

    pub fn on_selection_changed(&mut self, listener: impl FnMut(&SelectionEvent) + 'static) {
        self.plot.selection_mut().on_selection_changed(listener);
    }

    /// Listeners survive dataset reloads.
    pub fn on_data_changed(&mut self, listener: impl FnMut(&DataEvent) + 'static) {
        self.data_listeners.borrow_mut().push(Box::new(listener));
    }

    fn notify_data(&self, event: &DataEvent) {
        for listener in self.data_listeners.borrow_mut().iter_mut() {
            listener(event);
        }
    }

    /// Rebuild the plot if the dataset changed.
    pub fn sync_plot(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        match self.plot.sync_dataset(dataset) {
            Ok(true) => self.plot_message = None,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "nothing to plot");
                self.plot_message = Some(e.to_string());
            }
        }
    }

    /// `(label, color, visible, active count, selected fraction)` per class.
    pub fn class_summary(&self) -> Vec<(String, [u8; 4], bool, usize, f64)> {
        let Some(dataset) = &self.dataset else {
            return Vec::new();
        };
        dataset
            .classes()
            .iter()
            .map(|label| {
                (
                    label.clone(),
                    self.palette.color_for(label),
                    dataset.active_classes().contains(label),
                    dataset.count_active(label),
                    self.plot.selection_stats(dataset, label),
                )
            })
            .collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::arff::parse_arff;
    use glam::DVec2;
    use std::time::Instant;

    const TWO_CLASSES: &str = "\
@RELATION r
@ATTRIBUTE a NUMERIC
@ATTRIBUTE b NUMERIC
@ATTRIBUTE class {x,y}
@DATA
1,2,x
3,4,y
5,6,x
";

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.plot.set_viewport(DVec2::new(300.0, 300.0), Instant::now());
        state.load_dataset(&parse_arff(TWO_CLASSES).unwrap()).unwrap();
        state
    }

    #[test]
    fn test_load_builds_plot_and_palette() {
        let state = loaded();
        assert_eq!(state.plot.layout().len(), 2);
        assert_eq!(state.plot.projection().polylines().len(), 3);
        assert_ne!(state.palette.color_for("x"), state.palette.color_for("y"));
        let summary = state.class_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].3, 2);
    }

    #[test]
    fn test_failed_load_keeps_previous_dataset() {
        let mut state = loaded();
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.arff");
        std::fs::write(&bad, "@RELATION r\n@ATTRIBUTE a NUMERIC\n@ATTRIBUTE class {x}\n@DATA\n1,2,3\n").unwrap();
        assert!(!state.open_path(&bad));
        assert!(state.error_message.is_some());
        assert_eq!(state.dataset.as_ref().unwrap().rows().len(), 3);
    }

    #[test]
    fn test_data_listeners_survive_reload() {
        let mut state = AppState::default();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        state.on_data_changed(move |e| sink.borrow_mut().push(e.clone()));

        let table = parse_arff(TWO_CLASSES).unwrap();
        state.load_dataset(&table).unwrap();
        state.set_scale_mode(ScaleMode::Global);
        state.load_dataset(&table).unwrap();
        state.set_class_visible("y", false);

        assert_eq!(
            *events.borrow(),
            vec![
                DataEvent::Loaded,
                DataEvent::ScaleModeChanged,
                DataEvent::Loaded,
                DataEvent::ClassFilterChanged,
            ]
        );
    }

    #[test]
    fn test_filter_change_rebuilds_plot() {
        let mut state = loaded();
        state.set_class_visible("x", false);
        state.sync_plot();
        assert_eq!(state.plot.projection().polylines().len(), 1);
    }

    #[test]
    fn test_reload_clears_selection() {
        let mut state = loaded();
        state.plot.select_area(
            DVec2::new(-150.0, -150.0),
            DVec2::new(150.0, 150.0),
            crate::processing::selection::SelectionModifier::Replace,
        );
        assert_eq!(state.plot.highlighted_rows().len(), 3);
        state.load_dataset(&parse_arff(TWO_CLASSES).unwrap()).unwrap();
        assert!(state.plot.highlighted_rows().is_empty());
    }

    #[test]
    fn test_collaborator_interface() {
        let mut state = loaded();
        let selections = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&selections);
        state.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        let only_y: BTreeSet<String> = ["y".to_string()].into_iter().collect();
        state.set_class_filter(&only_y);
        state.sync_plot();
        assert_eq!(state.plot.projection().polylines().len(), 1);

        state.set_palette(HashMap::from([("y".to_string(), [1, 2, 3, 4])]));
        assert_eq!(state.palette.color_for("y"), [1, 2, 3, 4]);

        state.plot.select_area(
            DVec2::new(-150.0, -150.0),
            DVec2::new(150.0, 150.0),
            crate::processing::selection::SelectionModifier::Add,
        );
        assert_eq!(*selections.borrow(), 1);
        assert_eq!(state.class_summary()[1].4, 1.0);
    }
}
