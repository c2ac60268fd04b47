pub mod layout;
pub mod plot_interaction;
pub mod projection;
pub mod reorder;
pub mod star_plot;
