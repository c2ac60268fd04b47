pub mod control_panel;
pub mod plot_panel;
