pub mod app_state;
pub mod dataset;
pub mod palette;
pub mod theme;
