pub mod parse;
pub mod test_utils;

pub use parse::{parse_date, parse_id, parse_time};
