//! Detail-page field extraction.
//!
//! A detail page lists its fields as `.product-form-label` /
//! `.product-form-details` sibling pairs. Extraction builds a label lookup
//! once per document and then walks the canonical label list of the record
//! type, so missing labels become empty fields and never shift columns.

mod labels;
mod strategy;

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub use labels::{
    header_for, labels_for, strategy_for, DESIGN_LABELS, HISTORY_LABEL, PATENT_LABELS,
    TRADEMARK_LABELS,
};
pub use strategy::Strategy;

use crate::models::{RecordType, Row};

/// Placeholder when the page has no image.
pub const NO_IMAGE: &str = "no image";
/// Placeholder for inline `data:image/` payloads.
pub const BASE64_IMAGE: &str = "base64_image";
/// Placeholder when the history table is missing.
pub const NO_TABLE_DATA: &str = "no table data";
/// Cell separator inside serialized sub-tables.
pub const CELL_SEPARATOR: &str = "<t>";
/// Row separator inside serialized sub-tables.
pub const ROW_SEPARATOR: &str = "<lf>";

/// Errors raised while turning a fetched page into a row.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("Document is empty")]
    EmptyDocument,
}

/// Parse `html` and extract a row for `record_type`.
pub fn extract(html: &str, record_type: RecordType) -> Result<Row, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    let document = Html::parse_document(html);
    extract_document(&document, record_type)
}

/// Extract a row from an already parsed document.
pub fn extract_document(document: &Html, record_type: RecordType) -> Result<Row, ExtractError> {
    let lookup = label_lookup(document)?;

    let mut values = Vec::with_capacity(labels_for(record_type).len());
    for label in labels_for(record_type) {
        let value = match lookup.get(*label) {
            Some(node) => strategy_for(record_type, label).apply(*node)?,
            None => String::new(),
        };
        values.push(value);
    }

    Ok(Row {
        image: extract_image(document, record_type)?,
        values,
        history: extract_history(document)?,
    })
}

/// Map each label's trimmed text to the details node that follows it.
pub fn label_lookup(document: &Html) -> Result<HashMap<String, ElementRef<'_>>, ExtractError> {
    let details = selector(".product-form-details")?;
    let mut lookup = HashMap::new();

    for node in document.select(&details) {
        let Some(label) = node.prev_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        if label.value().classes().any(|c| c == "product-form-label") {
            lookup.insert(element_text(label), node);
        }
    }

    Ok(lookup)
}

/// Image URL, or a placeholder token.
pub fn extract_image(document: &Html, record_type: RecordType) -> Result<String, ExtractError> {
    let sel = match record_type {
        RecordType::Trademark => selector(".product-form-detail img")?,
        RecordType::Patent | RecordType::Design => selector("img")?,
    };

    let Some(img) = document.select(&sel).next() else {
        return Ok(NO_IMAGE.to_string());
    };

    let src = img.value().attr("src").unwrap_or_default();
    if src.starts_with("data:image/") {
        Ok(BASE64_IMAGE.to_string())
    } else {
        Ok(src.to_string())
    }
}

/// Serialize the `#accordion-3a` progress table.
///
/// Rows with three or more cells have their first two cells swapped.
pub fn extract_history(document: &Html) -> Result<String, ExtractError> {
    let body_sel = selector("#accordion-3a table tbody")?;
    let Some(body) = document.select(&body_sel).next() else {
        return Ok(NO_TABLE_DATA.to_string());
    };

    let tr = selector("tr")?;
    let td = selector("td")?;
    let rows: Vec<String> = body
        .select(&tr)
        .map(|row| {
            let mut cells: Vec<String> = row.select(&td).map(element_text).collect();
            if cells.len() >= 3 {
                cells.swap(0, 1);
            }
            cells.join(CELL_SEPARATOR)
        })
        .collect();

    Ok(rows.join(ROW_SEPARATOR))
}

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Text content with whitespace runs collapsed to single spaces.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Non-empty texts of every element matching `css` under `node`.
pub(crate) fn select_texts(node: ElementRef<'_>, css: &str) -> Result<Vec<String>, ExtractError> {
    let sel = selector(css)?;
    Ok(node
        .select(&sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(label: &str, value: &str) -> String {
        format!(
            r#"<div class="product-form-label">{}</div><div class="product-form-details">{}</div>"#,
            label, value
        )
    }

    #[test]
    fn test_row_columns_follow_header() {
        for record_type in [RecordType::Patent, RecordType::Design, RecordType::Trademark] {
            let header = header_for(record_type);
            let labels = labels_for(record_type);
            let row = Row {
                image: "/img.png".to_string(),
                values: labels.iter().map(|l| format!("v:{}", l)).collect(),
                history: "no table data".to_string(),
            };
            let line = row.to_line("4-2021-00001", record_type);
            let fields: Vec<&str> = line.trim_end_matches('\n').split('\t').collect();
            assert_eq!(fields.len(), header.len());

            let by_column: HashMap<&str, &str> = header.iter().copied().zip(fields).collect();
            assert_eq!(by_column["ID"], "4-2021-00001");
            assert_eq!(by_column["Image"], "/img.png");
            if record_type.has_type_column() {
                assert_eq!(by_column["Type"], record_type.as_str());
            }
            assert_eq!(by_column[labels[0]], format!("v:{}", labels[0]));
            assert_eq!(by_column[HISTORY_LABEL], "no table data");
        }
    }

    fn page(fields: &[String], extra: &str) -> String {
        format!(
            "<html><body><div id=\"accordion-1a\">{}</div>{}</body></html>",
            fields.join("\n"),
            extra
        )
    }

    #[test]
    fn test_missing_label_yields_empty_field() {
        let html = page(
            &[
                field("Loại đơn", "Sáng chế"),
                field("(54) Tên", "  Method   for   brewing "),
            ],
            "",
        );
        let row = extract(&html, RecordType::Patent).unwrap();
        assert_eq!(row.field_count(), 1 + PATENT_LABELS.len() + 1);
        assert_eq!(row.values[0], "Sáng chế");
        assert_eq!(row.values[1], "");
        let name_idx = PATENT_LABELS.iter().position(|l| *l == "(54) Tên").unwrap();
        assert_eq!(row.values[name_idx], "Method for brewing");
    }

    #[test]
    fn test_field_count_independent_of_content() {
        for record_type in RecordType::ALL {
            let row = extract("<html><body><p>nothing</p></body></html>", record_type).unwrap();
            assert_eq!(row.field_count(), labels_for(record_type).len() + 2);
            assert_eq!(row.to_tsv().split('\t').count(), row.field_count());
            assert_eq!(row.image, NO_IMAGE);
            assert_eq!(row.history, NO_TABLE_DATA);
        }
    }

    #[test]
    fn test_label_without_marker_class_is_ignored() {
        let html = page(
            &[r#"<div class="other">Loại đơn</div><div class="product-form-details">X</div>"#
                .to_string()],
            "",
        );
        let lookup_doc = Html::parse_document(&html);
        assert!(label_lookup(&lookup_doc).unwrap().is_empty());
    }

    #[test]
    fn test_history_swaps_first_two_columns() {
        let table = r#"
            <div id="accordion-3a"><table><tbody>
              <tr><td>01/02/2021</td><td>Nộp đơn</td><td>OK</td></tr>
              <tr><td>A</td><td>B</td></tr>
            </tbody></table></div>"#;
        let html = page(&[], table);
        let doc = Html::parse_document(&html);
        assert_eq!(
            extract_history(&doc).unwrap(),
            "Nộp đơn<t>01/02/2021<t>OK<lf>A<t>B"
        );
    }

    #[test]
    fn test_image_placeholders() {
        let inline = page(&[], r#"<img src="data:image/png;base64,AAAA">"#);
        let doc = Html::parse_document(&inline);
        assert_eq!(extract_image(&doc, RecordType::Patent).unwrap(), BASE64_IMAGE);

        let linked = page(&[], r#"<img src="/img/1.png">"#);
        let doc = Html::parse_document(&linked);
        assert_eq!(extract_image(&doc, RecordType::Design).unwrap(), "/img/1.png");
        // Trademarks only look inside the detail block.
        assert_eq!(extract_image(&doc, RecordType::Trademark).unwrap(), NO_IMAGE);

        let scoped = page(
            &[],
            r#"<div class="product-form-detail"><img src="/mark.jpg"></div>"#,
        );
        let doc = Html::parse_document(&scoped);
        assert_eq!(extract_image(&doc, RecordType::Trademark).unwrap(), "/mark.jpg");
    }

    #[test]
    fn test_trademark_nice_classes_by_label() {
        let html = page(
            &[field(
                "(511) Nhóm sản phẩm/dịch vụ",
                r#"<div class="row"><div class="col-md-2">9</div><div class="col-md-10">Software</div></div>"#,
            )],
            "",
        );
        let row = extract(&html, RecordType::Trademark).unwrap();
        let idx = TRADEMARK_LABELS
            .iter()
            .position(|l| *l == "(511) Nhóm sản phẩm/dịch vụ")
            .unwrap();
        assert_eq!(row.values[idx], "Class/Nhóm 09: Software");
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(matches!(
            extract("   ", RecordType::Design),
            Err(ExtractError::EmptyDocument)
        ));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}
