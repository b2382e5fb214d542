#![forbid(unsafe_code)]

pub mod import;
pub mod matching;
pub mod model;
pub mod time;

pub use import::{Delimiter, ImportError, ImportPreview, parse_delimited, serialize_pairs};
pub use matching::{matches, normalize};
pub use time::Clock;
