//! Plain-text renderers for the terminal front end.

pub mod envelope_chart;
pub mod fuel_table;
pub mod profile_list;
pub mod station_table;
pub mod summary;
pub mod toast;
