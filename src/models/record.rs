//! Record identifiers, record types and detail-page URLs.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Accepted identifier shape: `1-2021-04006` or `1-04006`.
static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+-(\d{4}-)?\d{4,}$").expect("identifier pattern should compile")
});

const DEFAULT_HOST: &str = "http://wipopublish.ipvietnam.gov.vn";
const DETAIL_PATH: &str = "/wopublish-search/public/ajax/detail";
const DEFAULT_COUNTRY_CODE: &str = "VN";

/// Kind of IP record. Decides the detail endpoint, output file and label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Patent,
    Design,
    Trademark,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [RecordType::Patent, RecordType::Design, RecordType::Trademark];

    /// Classify an identifier by the part before its first `-`.
    ///
    /// Unknown prefixes fall back to [`RecordType::Trademark`].
    pub fn classify(id: &str) -> Self {
        match id.split('-').next() {
            Some("1") | Some("2") => RecordType::Patent,
            Some("3") => RecordType::Design,
            _ => RecordType::Trademark,
        }
    }

    /// Upper-case plural name used in the `Type` column and tracking file.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Patent => "PATENTS",
            RecordType::Design => "DESIGNS",
            RecordType::Trademark => "TRADEMARKS",
        }
    }

    /// Path segment of the detail endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            RecordType::Patent => "patents",
            RecordType::Design => "designs",
            RecordType::Trademark => "trademarks",
        }
    }

    /// Prefix of the per-type output file (`SC_WIPO_<date>.txt`, ...).
    pub fn file_prefix(&self) -> &'static str {
        match self {
            RecordType::Patent => "SC",
            RecordType::Design => "KD",
            RecordType::Trademark => "NH",
        }
    }

    /// Whether output rows carry a `Type` column after the image.
    pub fn has_type_column(&self) -> bool {
        !matches!(self, RecordType::Patent)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check an identifier against the accepted format.
pub fn is_valid_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && ID_PATTERN.is_match(id)
}

/// Detail endpoints per record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUrls {
    pub patents: String,
    pub designs: String,
    pub trademarks: String,
    pub country_code: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self::with_host(DEFAULT_HOST)
    }
}

impl BaseUrls {
    /// Build the three detail endpoints against another host (e.g. a mirror
    /// or a local test server).
    pub fn with_host(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let endpoint =
            |t: RecordType| format!("{}{}/{}?id=", host, DETAIL_PATH, t.endpoint());
        Self {
            patents: endpoint(RecordType::Patent),
            designs: endpoint(RecordType::Design),
            trademarks: endpoint(RecordType::Trademark),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }

    pub fn for_type(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::Patent => &self.patents,
            RecordType::Design => &self.designs,
            RecordType::Trademark => &self.trademarks,
        }
    }

    /// `{base}{country}{id without hyphens}`.
    pub fn build_url(&self, id: &str, record_type: RecordType) -> String {
        format!(
            "{}{}{}",
            self.for_type(record_type),
            self.country_code,
            id.replace('-', "")
        )
    }
}

/// Build the detail URL against the public portal.
pub fn build_url(id: &str, record_type: RecordType) -> String {
    BaseUrls::default().build_url(id, record_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(RecordType::classify("1-2020-01234"), RecordType::Patent);
        assert_eq!(RecordType::classify("2-2019-00077"), RecordType::Patent);
        assert_eq!(RecordType::classify("3-2020-00123"), RecordType::Design);
        assert_eq!(RecordType::classify("4-2021-05678"), RecordType::Trademark);
    }

    #[test]
    fn test_classify_unknown_prefix_defaults_to_trademark() {
        assert_eq!(RecordType::classify("9-00001"), RecordType::Trademark);
        assert_eq!(RecordType::classify("12-2020-00001"), RecordType::Trademark);
        assert_eq!(RecordType::classify(""), RecordType::Trademark);
        assert_eq!(RecordType::classify("abc"), RecordType::Trademark);
    }

    #[test]
    fn test_build_url_strips_hyphens() {
        let url = build_url("4-2021-05678", RecordType::Trademark);
        assert_eq!(
            url,
            "http://wipopublish.ipvietnam.gov.vn/wopublish-search/public/ajax/detail/trademarks?id=VN4202105678"
        );
        assert_eq!(url, build_url("4-2021-05678", RecordType::Trademark));
    }

    #[test]
    fn test_build_url_per_type() {
        assert!(build_url("1-2020-00001", RecordType::Patent).ends_with("patents?id=VN1202000001"));
        assert!(build_url("3-00042", RecordType::Design).ends_with("designs?id=VN300042"));
    }

    #[test]
    fn test_with_host() {
        let urls = BaseUrls::with_host("http://127.0.0.1:8080/");
        assert_eq!(
            urls.build_url("3-2022-00002", RecordType::Design),
            "http://127.0.0.1:8080/wopublish-search/public/ajax/detail/designs?id=VN3202200002"
        );
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("1-2021-04006"));
        assert!(is_valid_id("1-04006"));
        assert!(is_valid_id(" 4-2021-00001 "));
        assert!(!is_valid_id("4-2021-001"));
        assert!(!is_valid_id("4-21-00001"));
        assert!(!is_valid_id("VN4202100001"));
        assert!(!is_valid_id(""));
    }

    #[test]
    fn test_type_metadata() {
        assert_eq!(RecordType::Patent.file_prefix(), "SC");
        assert_eq!(RecordType::Design.file_prefix(), "KD");
        assert_eq!(RecordType::Trademark.file_prefix(), "NH");
        assert!(!RecordType::Patent.has_type_column());
        assert!(RecordType::Design.has_type_column());
        assert_eq!(RecordType::Trademark.to_string(), "TRADEMARKS");
    }
}
