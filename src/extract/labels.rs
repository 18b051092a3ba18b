//! Canonical label lists and per-label extraction strategies.

use super::strategy::Strategy;
use crate::models::RecordType;

/// Header of the serialized history column.
pub const HISTORY_LABEL: &str = "Tiến trình";

pub const PATENT_LABELS: &[&str] = &[
    "Loại đơn",
    "Loại đơn PCT",
    "(10) Số bằng và ngày cấp",
    "Trạng thái",
    "(180) Ngày hết hạn",
    "(20) Số đơn và Ngày nộp đơn",
    "(40) Số công bố và ngày công bố",
    "(86) Số đơn và ngày nộp đơn PCT",
    "(87) Số công bố và ngày công bố đơn PCT",
    "(85) Ngày vào pha quốc gia",
    "(30) Chi tiết về dữ liệu ưu tiên",
    "(51) Phân loại IPC",
    "Phân loại CPC",
    "(71/73) Chủ đơn/Chủ bằng",
    "(72) Tác giả sáng chế",
    "(74) Đại diện SHCN",
    "(73) Địa chỉ nhận thư",
    "(54) Tên",
    "(57) Tóm tắt",
    "(58) Các tài liệu đối chứng",
];

pub const TRADEMARK_LABELS: &[&str] = &[
    "Loại đơn",
    "(100) Số bằng và ngày cấp",
    "Trạng thái",
    "(180) Ngày hết hạn",
    "(200) Số đơn và Ngày nộp đơn",
    "(400) Số công bố và ngày công bố",
    "(541) Nhãn hiệu",
    "(591) Màu sắc nhãn hiệu",
    "(300) Chi tiết về dữ liệu ưu tiên",
    "(511) Nhóm sản phẩm/dịch vụ",
    "(531) Phân loại hình",
    "(730) Chủ đơn/Chủ bằng",
    "(740) Đại diện SHCN",
    "(571) Nhãn hiệu",
    "(566) Nhãn hiệu dịch thuật",
    "(550) Kiểu của mẫu nhãn(hình/chữ/kết hợp)",
    "(526) Yếu tố loại trừ",
];

pub const DESIGN_LABELS: &[&str] = &[
    "Loại đơn",
    "(10) Số bằng và ngày cấp",
    "Trạng thái",
    "(180) Ngày hết hạn",
    "(20) Số đơn và Ngày nộp đơn",
    "(40) Số công bố và ngày công bố",
    "(30) Chi tiết về dữ liệu ưu tiên",
    "(51/52) Phân loại Locarno",
    "(71/73) Chủ đơn/Chủ bằng",
    "(72) Tác giả kiểu dáng",
    "(74) Đại diện SHCN",
    "(73) Địa chỉ nhận thư",
    "(54) Tên kiểu dáng",
    "Tóm tắt",
    "(53) Tổng số kiểu dáng",
    "(55) Bản chất của kiểu dáng",
    "(56) Yêu cầu bảo hộ kiểu dáng",
];

/// Canonical column order for a record type.
pub fn labels_for(record_type: RecordType) -> &'static [&'static str] {
    match record_type {
        RecordType::Patent => PATENT_LABELS,
        RecordType::Design => DESIGN_LABELS,
        RecordType::Trademark => TRADEMARK_LABELS,
    }
}

/// Header columns: `ID`, `Image`, `Type` (design/trademark), labels, history.
pub fn header_for(record_type: RecordType) -> Vec<&'static str> {
    let mut header = vec!["ID", "Image"];
    if record_type.has_type_column() {
        header.push("Type");
    }
    header.extend_from_slice(labels_for(record_type));
    header.push(HISTORY_LABEL);
    header
}

/// Strategy for a label. Labels without a rule use plain text.
pub fn strategy_for(record_type: RecordType, label: &str) -> Strategy {
    use RecordType::*;

    match (record_type, label) {
        (Patent, "(40) Số công bố và ngày công bố") => Strategy::PublicationCols {
            cols: "div[class^='col-md-']",
            col_sep: " | ",
            row_sep: "<lf>",
        },
        (Design, "(40) Số công bố và ngày công bố")
        | (Trademark, "(400) Số công bố và ngày công bố") => Strategy::PublicationCols {
            cols: ".col-md-4",
            col_sep: " ",
            row_sep: " | ",
        },

        (Patent, "(30) Chi tiết về dữ liệu ưu tiên") => Strategy::PriorityCodeDate,
        (Design, "(30) Chi tiết về dữ liệu ưu tiên") => Strategy::PriorityBlocks,
        (Trademark, "(300) Chi tiết về dữ liệu ưu tiên") => Strategy::PriorityFlat,

        (Patent, "(51) Phân loại IPC") => Strategy::ClassificationList,
        (Trademark, "(511) Nhóm sản phẩm/dịch vụ") => Strategy::NiceClasses,

        (Patent, "(71/73) Chủ đơn/Chủ bằng")
        | (Patent, "(72) Tác giả sáng chế")
        | (Patent, "(74) Đại diện SHCN")
        | (Design, "(51/52) Phân loại Locarno")
        | (Design, "(71/73) Chủ đơn/Chủ bằng")
        | (Design, "(72) Tác giả kiểu dáng")
        | (Design, "(74) Đại diện SHCN")
        | (Trademark, "(531) Phân loại hình") => Strategy::RowsJoined,

        _ => Strategy::PlainText,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_counts() {
        assert_eq!(PATENT_LABELS.len(), 20);
        assert_eq!(TRADEMARK_LABELS.len(), 17);
        assert_eq!(DESIGN_LABELS.len(), 17);
    }

    #[test]
    fn test_header_layout() {
        let patent = header_for(RecordType::Patent);
        assert_eq!(patent[0], "ID");
        assert_eq!(patent[1], "Image");
        assert_eq!(patent[2], "Loại đơn");
        assert_eq!(patent.len(), 2 + 20 + 1);
        assert_eq!(patent.last(), Some(&HISTORY_LABEL));

        let design = header_for(RecordType::Design);
        assert_eq!(design[2], "Type");
        assert_eq!(design.len(), 3 + 17 + 1);
    }

    #[test]
    fn test_strategy_lookup_is_type_scoped() {
        assert_eq!(
            strategy_for(RecordType::Patent, "(51) Phân loại IPC"),
            Strategy::ClassificationList
        );
        assert_eq!(
            strategy_for(RecordType::Trademark, "(51) Phân loại IPC"),
            Strategy::PlainText
        );
        assert_eq!(
            strategy_for(RecordType::Trademark, "(511) Nhóm sản phẩm/dịch vụ"),
            Strategy::NiceClasses
        );
        assert_eq!(
            strategy_for(RecordType::Design, "(74) Đại diện SHCN"),
            Strategy::RowsJoined
        );
        assert_eq!(
            strategy_for(RecordType::Trademark, "(740) Đại diện SHCN"),
            Strategy::PlainText
        );
    }
}
