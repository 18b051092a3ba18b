//! Identifier classification command.

use console::style;

use crate::config::Settings;
use crate::models::{is_valid_id, RecordType};

/// Print the record type and detail URL of each identifier.
pub fn cmd_classify(settings: &Settings, ids: &[String]) -> anyhow::Result<()> {
    for id in ids {
        let id = id.trim();
        let record_type = RecordType::classify(id);
        let marker = if is_valid_id(id) {
            style("→").cyan()
        } else {
            style("!").yellow()
        };
        println!(
            "{} {}\t{}\t{}",
            marker,
            id,
            record_type.as_str(),
            settings.base_urls.build_url(id, record_type)
        );
    }
    Ok(())
}
