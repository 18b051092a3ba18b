//! Search result parsing for vietnamtrademark.net.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extract::collapse_whitespace;

static TSV_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\n]+").expect("TSV break pattern should compile"));

static RESULT_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.list-nhanhieu tbody tr").expect("result row selector should parse")
});
static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("cell selector should parse"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("link selector should parse"));
static IMAGES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("image selector should parse"));
static LABELS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("label").expect("label selector should parse"));
static SPANS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("span selector should parse"));
static DETAIL_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("th, td, label, div, span").expect("detail selector should parse")
});

/// Label of the representative field on detail pages, lower-cased.
const REPRESENTATIVE_LABEL: &str = "đại diện shcn";

/// Output columns after `ID`.
pub const SEARCH_COLUMNS: &[&str] = &[
    "STT",
    "MauNhanImage",
    "NhanHieu",
    "Nhom",
    "TrangThai",
    "NgayNopDon",
    "SoDon",
    "ChuDon",
    "DaiDienSHCN",
];

/// Output file header.
pub fn search_header() -> Vec<&'static str> {
    std::iter::once("ID").chain(SEARCH_COLUMNS.iter().copied()).collect()
}

/// One row of the search result table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRow {
    pub stt: String,
    pub image: String,
    pub name: String,
    pub classes: String,
    pub status: String,
    pub filing_date: String,
    pub application_number: String,
    /// Link to the application detail page, as found in the table.
    pub detail_href: String,
    pub owner: String,
    pub representative: String,
    /// Whole row text, collapsed.
    pub row_text: String,
}

impl SearchRow {
    /// A result counts as found when the row has any text or a name.
    pub fn is_found(&self) -> bool {
        !self.row_text.is_empty() || !self.name.is_empty()
    }

    /// `id` followed by the nine output columns, escaped.
    pub fn to_fields(&self, id: &str) -> Vec<String> {
        [
            id,
            self.stt.as_str(),
            self.image.as_str(),
            self.name.as_str(),
            self.classes.as_str(),
            self.status.as_str(),
            self.filing_date.as_str(),
            self.application_number.as_str(),
            self.owner.as_str(),
            self.representative.as_str(),
        ]
        .into_iter()
        .map(escape_tsv)
        .collect()
    }
}

/// Fields of a row written when nothing could be parsed.
pub fn empty_fields(id: &str) -> Vec<String> {
    std::iter::once(escape_tsv(id))
        .chain(SEARCH_COLUMNS.iter().map(|_| String::new()))
        .collect()
}

/// Replace tab and line-break runs with a space and trim.
pub fn escape_tsv(value: &str) -> String {
    TSV_BREAKS.replace_all(value, " ").trim().to_string()
}

/// Row for `id`: the one tagged with `data-so-don`, else the first whose
/// link text equals the id or whose link target contains it.
pub fn find_result_row<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let tagged = format!("table.list-nhanhieu tbody tr[data-so-don=\"{}\"]", id);
    if let Ok(selector) = Selector::parse(&tagged) {
        if let Some(row) = document.select(&selector).next() {
            return Some(row);
        }
    }

    document.select(&RESULT_ROWS).find(|row| {
        row.select(&LINKS).any(|a| {
            text_of(a).trim() == id
                || a.value().attr("href").is_some_and(|href| href.contains(id))
        })
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn collapsed(element: Option<ElementRef<'_>>) -> String {
    element
        .map(|e| collapse_whitespace(&text_of(e)))
        .unwrap_or_default()
}

/// Read the columns of a result row.
pub fn parse_row_fields(row: ElementRef<'_>) -> SearchRow {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    let cell = |i: usize| cells.get(i).copied();

    let image = cell(2)
        .and_then(|c| c.select(&IMAGES).next())
        .map(|img| {
            img.value()
                .attr("src")
                .filter(|s| !s.is_empty())
                .or_else(|| img.value().attr("data-src"))
                .unwrap_or_default()
                .to_string()
        })
        .unwrap_or_default();

    let name = cell(3)
        .map(|c| {
            let label = collapsed(c.select(&LABELS).next());
            if label.is_empty() {
                collapsed(Some(c))
            } else {
                label
            }
        })
        .unwrap_or_default();

    let classes = cell(4)
        .map(|c| {
            let spans: Vec<String> = c
                .select(&SPANS)
                .map(|s| collapse_whitespace(&text_of(s)))
                .filter(|s| !s.is_empty())
                .collect();
            if spans.is_empty() {
                collapsed(Some(c))
            } else {
                spans.join(", ")
            }
        })
        .unwrap_or_default();

    let (application_number, detail_href) = match cell(7) {
        Some(c) => match c.select(&LINKS).next() {
            Some(a) => {
                let text = collapsed(Some(a));
                let text = if text.is_empty() { collapsed(Some(c)) } else { text };
                (text, a.value().attr("href").unwrap_or_default().to_string())
            }
            None => (collapsed(Some(c)), String::new()),
        },
        None => (String::new(), String::new()),
    };

    SearchRow {
        stt: collapsed(cell(1)),
        image,
        name,
        classes,
        status: collapsed(cell(5)),
        filing_date: collapsed(cell(6)),
        application_number,
        detail_href,
        owner: collapsed(cell(8)),
        representative: collapsed(cell(9)),
        row_text: collapsed(Some(row)),
    }
}

/// Parse a search page. `None` when no row matches `id`.
pub fn parse_search_page(html: &str, id: &str) -> Option<SearchRow> {
    let document = Html::parse_document(html);
    find_result_row(&document, id).map(parse_row_fields)
}

fn mentions_representative(element: ElementRef<'_>) -> bool {
    text_of(element).to_lowercase().contains(REPRESENTATIVE_LABEL)
}

/// Representative from an application detail page.
///
/// The innermost element mentioning the label is taken; its value is the
/// next element sibling (the neighbouring cell for `th`/`td`), or its own
/// text when it has no sibling. Empty when the label is absent.
pub fn extract_representative(html: &str) -> String {
    let document = Html::parse_document(html);
    let label = document.select(&DETAIL_CANDIDATES).find(|el| {
        mentions_representative(*el)
            && !el
                .select(&DETAIL_CANDIDATES)
                .any(|inner| mentions_representative(inner))
    });

    let Some(label) = label else {
        return String::new();
    };

    match label.next_siblings().find_map(ElementRef::wrap) {
        Some(value) => collapsed(Some(value)),
        None => collapsed(Some(label)),
    }
}

/// Resolve `href` against `base`. Absolute http(s) links pass through;
/// unparseable input yields an empty string.
pub fn absolutize(href: &str, base: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<table class="list-nhanhieu"><tbody>
  <tr data-so-don="4-2020-11111"><td></td><td>1</td><td></td><td><label>OTHER</label></td></tr>
  <tr>
    <td><input type="checkbox"></td>
    <td> 2 </td>
    <td><img data-src="/img/mark.png"></td>
    <td><label>  SAO
        VÀNG </label></td>
    <td><span>05</span> <span>30</span></td>
    <td>Cấp bằng</td>
    <td>01/02/2021</td>
    <td><a href="/vn/nhan-hieu/4-2021-05678">4-2021-05678</a></td>
    <td>Công ty   ABC</td>
    <td></td>
  </tr>
</tbody></table></body></html>"#;

    #[test]
    fn test_find_row_by_link() {
        let row = parse_search_page(PAGE, "4-2021-05678").unwrap();
        assert_eq!(row.stt, "2");
        assert_eq!(row.image, "/img/mark.png");
        assert_eq!(row.name, "SAO VÀNG");
        assert_eq!(row.classes, "05, 30");
        assert_eq!(row.status, "Cấp bằng");
        assert_eq!(row.filing_date, "01/02/2021");
        assert_eq!(row.application_number, "4-2021-05678");
        assert_eq!(row.detail_href, "/vn/nhan-hieu/4-2021-05678");
        assert_eq!(row.owner, "Công ty ABC");
        assert_eq!(row.representative, "");
        assert!(row.is_found());
    }

    #[test]
    fn test_tagged_row_wins() {
        let row = parse_search_page(PAGE, "4-2020-11111").unwrap();
        assert_eq!(row.name, "OTHER");
    }

    #[test]
    fn test_missing_row() {
        assert!(parse_search_page(PAGE, "4-1999-00000").is_none());
        assert!(parse_search_page("<html></html>", "4-2021-05678").is_none());
    }

    #[test]
    fn test_fields_are_escaped() {
        let row = SearchRow {
            name: "A\tB\r\nC ".to_string(),
            ..Default::default()
        };
        let fields = row.to_fields("4-2021-05678");
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[3], "A B C");
        assert_eq!(empty_fields("x"), vec!["x", "", "", "", "", "", "", "", "", ""]);
        assert_eq!(search_header().len(), 10);
    }

    #[test]
    fn test_representative_from_table() {
        let html = r#"<table><tr><th>Đại diện SHCN</th><td> Công ty Luật
            XYZ </td></tr></table>"#;
        assert_eq!(extract_representative(html), "Công ty Luật XYZ");
    }

    #[test]
    fn test_representative_from_divs() {
        let html = r#"<div class="row"><div class="label">(740) Đại diện SHCN:</div>
            <div class="value">Văn phòng ABC</div></div>"#;
        assert_eq!(extract_representative(html), "Văn phòng ABC");
        assert_eq!(extract_representative("<p>nothing</p>"), "");
    }

    #[test]
    fn test_absolutize() {
        let base = "https://vietnamtrademark.net";
        assert_eq!(
            absolutize("/vn/nhan-hieu/1", base),
            "https://vietnamtrademark.net/vn/nhan-hieu/1"
        );
        assert_eq!(absolutize("HTTPS://x.test/a", base), "HTTPS://x.test/a");
        assert_eq!(absolutize("", base), "");
    }
}
