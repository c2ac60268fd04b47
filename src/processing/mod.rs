pub mod kd_tree;
pub mod selection;
pub mod statistics;
