pub mod parse_helpers;
