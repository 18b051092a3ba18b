//! Extraction strategies applied to a label's value node.

use scraper::ElementRef;

use super::{element_text, select_texts, selector, ExtractError, ROW_SEPARATOR};

/// How a label's value node is turned into a field.
///
/// Every strategy except [`Strategy::PriorityFlat`] falls back to the node's
/// plain text when its selector matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Whitespace-collapsed text of the whole node.
    PlainText,
    /// Text of each `.row`, joined with ` | `.
    RowsJoined,
    /// Per `.row`, texts of `cols` joined by `col_sep`; rows joined by `row_sep`.
    PublicationCols {
        cols: &'static str,
        col_sep: &'static str,
        row_sep: &'static str,
    },
    /// `.priority-table` blocks of `.col-md-6` values.
    PriorityBlocks,
    /// All `.col-md-6, .col-md-4, span` texts.
    PriorityFlat,
    /// `.priority-table` blocks as "code date | date".
    PriorityCodeDate,
    /// `ul.classification-ul li` entries.
    ClassificationList,
    /// Nice classification rows as `Class/Nhóm NN: goods`.
    NiceClasses,
}

const PIPE: &str = " | ";

impl Strategy {
    pub fn apply(&self, node: ElementRef<'_>) -> Result<String, ExtractError> {
        let value = match *self {
            Strategy::PlainText => None,
            Strategy::RowsJoined => rows_joined(node)?,
            Strategy::PublicationCols {
                cols,
                col_sep,
                row_sep,
            } => publication_cols(node, cols, col_sep, row_sep)?,
            Strategy::PriorityBlocks => Some(priority_blocks(node)?),
            Strategy::PriorityFlat => Some(priority_flat(node)?),
            Strategy::PriorityCodeDate => priority_code_date(node)?,
            Strategy::ClassificationList => {
                let items = select_texts(node, "ul.classification-ul li")?;
                (!items.is_empty()).then(|| items.join(PIPE))
            }
            Strategy::NiceClasses => nice_classes(node)?,
        };

        Ok(value.unwrap_or_else(|| element_text(node)))
    }
}

fn rows_joined(node: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
    let sel = selector(".row")?;
    let rows: Vec<ElementRef<'_>> = node.select(&sel).collect();
    if rows.is_empty() {
        return Ok(None);
    }
    let joined = rows
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(PIPE);
    Ok(Some(joined))
}

fn publication_cols(
    node: ElementRef<'_>,
    cols: &str,
    col_sep: &str,
    row_sep: &str,
) -> Result<Option<String>, ExtractError> {
    let sel = selector(".row")?;
    let rows: Vec<ElementRef<'_>> = node.select(&sel).collect();
    if rows.is_empty() {
        return Ok(None);
    }

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let line = select_texts(row, cols)?.join(col_sep);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(Some(lines.join(row_sep)))
}

fn priority_blocks(node: ElementRef<'_>) -> Result<String, ExtractError> {
    let sel = selector(".priority-table")?;
    let blocks: Vec<ElementRef<'_>> = node.select(&sel).collect();
    if blocks.is_empty() {
        return priority_flat(node);
    }

    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        out.push(select_texts(block, ".col-md-6")?.join(PIPE));
    }
    Ok(out.join(ROW_SEPARATOR))
}

fn priority_flat(node: ElementRef<'_>) -> Result<String, ExtractError> {
    Ok(select_texts(node, ".col-md-6, .col-md-4, span")?.join(PIPE))
}

fn priority_code_date(node: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
    let sel = selector(".priority-table")?;
    let blocks: Vec<ElementRef<'_>> = node.select(&sel).collect();
    if blocks.is_empty() {
        return Ok(None);
    }

    let col = selector(".col-md-6")?;
    let mut out = Vec::new();
    for block in blocks {
        let code_date = select_texts(block, ".col-md-6 span")?.join(" ");
        let date = block.select(&col).nth(1).map(element_text).unwrap_or_default();
        let entry = [code_date, date]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(PIPE);
        if !entry.is_empty() {
            out.push(entry);
        }
    }
    Ok(Some(out.join(ROW_SEPARATOR)))
}

fn nice_classes(node: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
    let rows_sel = selector(".row")?;
    let class_sel = selector(".col-md-2")?;
    let goods_sel = selector(".col-md-10")?;

    let rows: Vec<ElementRef<'_>> = node.select(&rows_sel).collect();
    if rows.is_empty() {
        return Ok(None);
    }

    let entries: Vec<String> = rows
        .into_iter()
        .map(|row| {
            let class_text = row.select(&class_sel).next().map(element_text).unwrap_or_default();
            let goods = row.select(&goods_sel).next().map(element_text).unwrap_or_default();
            format!("Class/Nhóm {}: {}", pad_class_number(&class_text), goods)
        })
        .collect();
    Ok(Some(entries.join(ROW_SEPARATOR)))
}

/// Keep only the digits and left-pad to two. Text without digits is kept.
fn pad_class_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        raw.to_string()
    } else {
        format!("{:0>2}", digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn apply_to(html: &str, strategy: Strategy) -> String {
        let doc = Html::parse_fragment(&format!("<div id=\"value\">{}</div>", html));
        let sel = scraper::Selector::parse("#value").unwrap();
        let node = doc.select(&sel).next().unwrap();
        strategy.apply(node).unwrap()
    }

    #[test]
    fn test_rows_joined() {
        let html = r#"<div class="row"> ACME  Corp </div><div class="row"></div><div class="row">Beta Ltd</div>"#;
        assert_eq!(apply_to(html, Strategy::RowsJoined), "ACME Corp | Beta Ltd");
    }

    #[test]
    fn test_rows_joined_falls_back_to_text() {
        assert_eq!(
            apply_to("  Nguyen   Van A ", Strategy::RowsJoined),
            "Nguyen Van A"
        );
    }

    #[test]
    fn test_trademark_publication() {
        let html = r#"
            <div class="row"><div class="col-md-4">4-0001</div><div class="col-md-4">25/01/2022</div></div>
            <div class="row"><div class="col-md-4">4-0002</div><div class="col-md-4">26/02/2022</div></div>"#;
        let strategy = Strategy::PublicationCols {
            cols: ".col-md-4",
            col_sep: " ",
            row_sep: " | ",
        };
        assert_eq!(
            apply_to(html, strategy),
            "4-0001 25/01/2022 | 4-0002 26/02/2022"
        );
    }

    #[test]
    fn test_patent_publication_prefix_selector() {
        let html = r#"<div class="row"><div class="col-md-3">1-0001</div><div class="col-md-9 x">A</div></div>"#;
        let strategy = Strategy::PublicationCols {
            cols: "div[class^='col-md-']",
            col_sep: " | ",
            row_sep: "<lf>",
        };
        assert_eq!(apply_to(html, strategy), "1-0001 | A");
    }

    #[test]
    fn test_priority_blocks() {
        let html = r#"
            <div class="priority-table"><div class="col-md-6">US 123</div><div class="col-md-6">01/01/2020</div></div>
            <div class="priority-table"><div class="col-md-6">JP 9</div><div class="col-md-6">02/02/2020</div></div>"#;
        assert_eq!(
            apply_to(html, Strategy::PriorityBlocks),
            "US 123 | 01/01/2020<lf>JP 9 | 02/02/2020"
        );
    }

    #[test]
    fn test_priority_blocks_fallback() {
        let html = r#"<span>US</span><div class="col-md-4">01/01/2020</div>"#;
        assert_eq!(apply_to(html, Strategy::PriorityBlocks), "US | 01/01/2020");
    }

    #[test]
    fn test_priority_code_date() {
        let html = r#"
            <div class="priority-table">
              <div class="col-md-6"><span>US</span><span>62/123</span></div>
              <div class="col-md-6">03/03/2019</div>
            </div>"#;
        assert_eq!(
            apply_to(html, Strategy::PriorityCodeDate),
            "US 62/123 | 03/03/2019"
        );
    }

    #[test]
    fn test_classification_list() {
        let html = r#"<ul class="classification-ul"><li>A61K 8/00</li><li> A61Q 19/00 </li></ul>"#;
        assert_eq!(
            apply_to(html, Strategy::ClassificationList),
            "A61K 8/00 | A61Q 19/00"
        );
    }

    #[test]
    fn test_nice_classes_pad_numbers() {
        let html = r#"
            <div class="row"><div class="col-md-2">3</div><div class="col-md-10">Cosmetics</div></div>
            <div class="row"><div class="col-md-2">Nhóm 35</div><div class="col-md-10">Advertising</div></div>"#;
        assert_eq!(
            apply_to(html, Strategy::NiceClasses),
            "Class/Nhóm 03: Cosmetics<lf>Class/Nhóm 35: Advertising"
        );
    }

    #[test]
    fn test_pad_class_number_without_digits() {
        assert_eq!(pad_class_number("n/a"), "n/a");
        assert_eq!(pad_class_number("7"), "07");
        assert_eq!(pad_class_number("45"), "45");
    }
}
