//! Approximate text analytics over encyclopedia text

pub mod country_names;
pub mod years;

pub use country_names::{country_names, match_country};
pub use years::{extract_years, plausible_range};
