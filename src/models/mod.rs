//! Data models for IP records.

mod record;
mod row;

pub use record::{build_url, is_valid_id, BaseUrls, RecordType};
pub use row::{Row, COLUMN_SEPARATOR};
