use egui::{Color32, Visuals};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn visuals(&self) -> Visuals {
        match self {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        }
    }

    pub fn plot_bg(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(30, 30, 30),
            Theme::Light => Color32::from_rgb(220, 220, 220),
        }
    }

    pub fn axis_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(120, 120, 120),
            Theme::Light => Color32::from_rgb(150, 150, 150),
        }
    }

    pub fn band_fill(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgba_unmultiplied(100, 150, 255, 30),
            Theme::Light => Color32::from_rgba_unmultiplied(40, 90, 200, 30),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}
