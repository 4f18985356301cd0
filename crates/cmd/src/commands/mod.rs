pub mod build_get;
pub mod build_list;
pub mod build_titles;
pub mod filter;
pub mod refresh;
pub mod status;
