//! Room summaries and the predicates used to filter them.

pub mod room_summary;
pub mod room_display_filter;
