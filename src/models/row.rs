//! Extracted output rows.

use super::RecordType;

/// Column separator for top-level fields.
pub const COLUMN_SEPARATOR: &str = "\t";

/// One extracted record: image, one value per canonical label, history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// Image URL or a placeholder token.
    pub image: String,
    /// Values in canonical label order. Missing labels are empty strings.
    pub values: Vec<String>,
    /// Serialized history sub-table.
    pub history: String,
}

impl Row {
    /// Number of tab-separated fields this row serializes to.
    pub fn field_count(&self) -> usize {
        self.values.len() + 2
    }

    /// Fields in output order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.image.as_str())
            .chain(self.values.iter().map(String::as_str))
            .chain(std::iter::once(self.history.as_str()))
    }

    /// Tab-joined fields, without a trailing newline.
    pub fn to_tsv(&self) -> String {
        self.fields().collect::<Vec<_>>().join(COLUMN_SEPARATOR)
    }

    /// Full output line for an identifier, newline-terminated.
    ///
    /// Design and trademark files carry a `Type` column right after the
    /// image.
    pub fn to_line(&self, id: &str, record_type: RecordType) -> String {
        if record_type.has_type_column() {
            let mut fields: Vec<&str> = vec![id, self.image.as_str(), record_type.as_str()];
            fields.extend(self.values.iter().map(String::as_str));
            fields.push(self.history.as_str());
            format!("{}\n", fields.join(COLUMN_SEPARATOR))
        } else {
            format!("{}\t{}\n", id, self.to_tsv())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row {
            image: "no image".to_string(),
            values: vec!["a".to_string(), String::new(), "c".to_string()],
            history: "no table data".to_string(),
        }
    }

    #[test]
    fn test_field_count_and_tsv() {
        let row = sample();
        assert_eq!(row.field_count(), 5);
        assert_eq!(row.to_tsv(), "no image\ta\t\tc\tno table data");
        assert_eq!(row.to_tsv().split('\t').count(), row.field_count());
    }

    #[test]
    fn test_to_line_with_type_column() {
        let row = sample();
        assert_eq!(
            row.to_line("4-2021-00001", RecordType::Trademark),
            "4-2021-00001\tno image\tTRADEMARKS\ta\t\tc\tno table data\n"
        );
        assert_eq!(
            row.to_line("1-2021-00001", RecordType::Patent),
            "1-2021-00001\tno image\ta\t\tc\tno table data\n"
        );
    }
}
