//! End-to-end runs of the detail scraper against a local portal.

use std::fs;
use std::path::Path;
use std::time::Duration;

use httpmock::prelude::*;
use ipacquire::config::Settings;
use ipacquire::extract::ExtractError;
use ipacquire::models::{BaseUrls, RecordType, Row};
use ipacquire::output::RunLayout;
use ipacquire::runner::{ScrapeConfig, ScrapeEvent, ScrapeResult, ScrapeService};
use ipacquire::scrapers::{HttpClient, ValidationPolicy};
use tokio::sync::mpsc;

const DETAIL_PATH: &str = "/wopublish-search/public/ajax/detail";

fn trademark_page() -> String {
    r#"<html><body>
<div id="accordion-1a">
  <div class="product-form-detail"><img src="/images/mark-0001.png"></div>
  <div class="row">
    <div class="col-md-3 product-form-label">Loại đơn</div>
    <div class="col-md-9 product-form-details">Nhãn hiệu</div>
  </div>
  <div class="row">
    <div class="col-md-3 product-form-label">(200) Số đơn và Ngày nộp đơn</div>
    <div class="col-md-9 product-form-details">4-2021-05678   12.03.2021</div>
  </div>
  <div class="row">
    <div class="col-md-3 product-form-label">(740) Đại diện SHCN</div>
    <div class="col-md-9 product-form-details">Công ty Luật ABC</div>
  </div>
</div>
<div id="accordion-3a">
  <table><tbody>
    <tr><td>Nộp đơn</td><td>12.03.2021</td><td>Đã tiếp nhận</td></tr>
  </tbody></table>
</div>
</body></html>"#
        .to_string()
}

fn design_page() -> String {
    r#"<html><body>
<div id="accordion-1a">
  <img src="/images/design-0123.png">
  <div class="row">
    <div class="col-md-3 product-form-label">(20) Số đơn và Ngày nộp đơn</div>
    <div class="col-md-9 product-form-details">3-2020-00123 05.06.2020</div>
  </div>
  <div class="row">
    <div class="col-md-3 product-form-label">(54) Tên kiểu dáng</div>
    <div class="col-md-9 product-form-details">Chai nước</div>
  </div>
  <div class="row">
    <div class="col-md-3 product-form-label">(74) Đại diện SHCN</div>
    <div class="col-md-9 product-form-details">Công ty Luật XYZ</div>
  </div>
</div>
</body></html>"#
        .to_string()
}

fn settings_for(server: &MockServer, output_root: &Path) -> Settings {
    let mut settings = Settings::with_output_root(output_root.to_path_buf());
    settings.base_urls = BaseUrls::with_host(&server.base_url());
    settings.threads = 2;
    settings.request_delay_ms = 0;
    settings.jitter = 0.0;
    settings.request_timeout = 5;
    settings.retry_base_ms = 0;
    settings.retry_jitter_ms = 0;
    settings.pass_pause_base_ms = 0;
    settings.pass_pause_max_ms = 0;
    settings.global_tracking = false;
    settings
}

async fn run_once(settings: &Settings, input: &Path) -> (usize, ScrapeResult) {
    let layout = RunLayout::for_today(&settings.output_root);
    let service = ScrapeService::from_settings(settings, layout).unwrap();
    let prepared = service.prepare(input).await.unwrap();
    let pending = prepared.pending.len();

    let (event_tx, mut event_rx) = mpsc::channel::<ScrapeEvent>(100);
    let drain = tokio::spawn(async move { while event_rx.recv().await.is_some() {} });
    let result = service.run(prepared.pending, event_tx).await.unwrap();
    drain.await.unwrap();

    (pending, result)
}

fn data_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_two_ids_end_to_end() {
    let server = MockServer::start();
    let trademark = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/trademarks", DETAIL_PATH))
            .query_param("id", "VN4202105678");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(trademark_page());
    });
    let design = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/designs", DETAIL_PATH))
            .query_param("id", "VN3202000123");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(design_page());
    });

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ids.txt");
    fs::write(&input, "4-2021-05678\n\n3-2020-00123\n4-2021-05678\n").unwrap();

    let settings = settings_for(&server, &dir.path().join("Output"));
    let (pending, result) = run_once(&settings, &input).await;

    assert_eq!(pending, 2);
    assert_eq!(result.completed, 2);
    assert!(result.failed.is_empty());
    trademark.assert();
    design.assert();

    let layout = RunLayout::for_today(&settings.output_root);
    let nh = fs::read_to_string(layout.record_file(RecordType::Trademark)).unwrap();
    assert!(nh.starts_with("ID\tImage\tType\tLoại đơn\t"));
    let rows = data_lines(&layout.record_file(RecordType::Trademark));
    assert_eq!(rows.len(), 1);
    let fields: Vec<&str> = rows[0].split('\t').collect();
    assert_eq!(fields.len(), 1 + 2 + 17 + 1);
    assert_eq!(fields[0], "4-2021-05678");
    assert_eq!(fields[1], "/images/mark-0001.png");
    assert_eq!(fields[2], "TRADEMARKS");
    assert_eq!(fields[3], "Nhãn hiệu");
    assert_eq!(fields[4], "");
    assert_eq!(fields[7], "4-2021-05678 12.03.2021");
    assert_eq!(fields[20], "12.03.2021<t>Nộp đơn<t>Đã tiếp nhận");

    let kd = data_lines(&layout.record_file(RecordType::Design));
    assert_eq!(kd.len(), 1);
    assert!(kd[0].starts_with("3-2020-00123\t/images/design-0123.png\tDESIGNS\t"));
    assert!(kd[0].ends_with("\tno table data"));

    let sc = data_lines(&layout.record_file(RecordType::Patent));
    assert!(sc.is_empty());

    assert!(!layout.fail_ids().exists() || fs::read_to_string(layout.fail_ids()).unwrap().is_empty());
    let report = fs::read_to_string(layout.report()).unwrap();
    assert!(report.contains("- Successfully processed: 2 IDs"));
    assert!(report.contains("- Permanently failed: 0 IDs"));
    assert!(report.contains("- Success rate: 100.0%"));

    let copied = fs::read_to_string(layout.original_ids()).unwrap();
    assert_eq!(copied, fs::read_to_string(&input).unwrap());

    let log = fs::read_to_string(layout.log_file()).unwrap();
    assert!(log.contains(" | 4-2021-05678 | 200 - OK | "));

    // A second run finds everything already scraped.
    let layout = RunLayout::for_today(&settings.output_root);
    let service = ScrapeService::from_settings(&settings, layout).unwrap();
    let prepared = service.prepare(&input).await.unwrap();
    assert_eq!(prepared.already_scraped, 2);
    assert!(prepared.pending.is_empty());
}

#[tokio::test]
async fn test_unusable_page_exhausts_reattempts() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/patents", DETAIL_PATH));
        then.status(503).body("Service Temporarily Unavailable");
    });

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ids.txt");
    fs::write(&input, "1-2021-04006\n").unwrap();

    let mut settings = settings_for(&server, &dir.path().join("Output"));
    settings.max_reattempts = 2;
    settings.retry_passes = 0;

    let (_, result) = run_once(&settings, &input).await;

    assert_eq!(mock.hits(), 3);
    assert_eq!(result.completed, 0);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, "1-2021-04006");

    let layout = RunLayout::for_today(&settings.output_root);
    let sc = data_lines(&layout.record_file(RecordType::Patent));
    assert_eq!(sc, vec!["1-2021-04006\tNo data available after 0 retries".to_string()]);
    assert_eq!(fs::read_to_string(layout.fail_ids()).unwrap(), "1-2021-04006\n");
    assert_eq!(fs::read_to_string(layout.failed_ids()).unwrap(), "1-2021-04006\n");

    let report = fs::read_to_string(layout.report()).unwrap();
    assert!(report.contains("- Permanently failed: 1 IDs"));
    assert!(report.contains("- 1-2021-04006 (0 retries)"));
}

#[tokio::test]
async fn test_global_pass_refetches_queued_ids() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/trademarks", DETAIL_PATH));
        then.status(200).body("HTTP ERROR 502");
    });

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ids.txt");
    fs::write(&input, "4-2021-00001\n").unwrap();

    let mut settings = settings_for(&server, &dir.path().join("Output"));
    settings.max_reattempts = 1;
    settings.retry_passes = 2;

    let (_, result) = run_once(&settings, &input).await;

    assert_eq!(mock.hits(), 6);
    assert_eq!(result.passes, 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].retries, 2);
}

fn unparseable(_: &str, _: RecordType) -> Result<Row, ExtractError> {
    Err(ExtractError::EmptyDocument)
}

#[tokio::test]
async fn test_extraction_error_fails_without_retry() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/trademarks", DETAIL_PATH));
        then.status(200).body(trademark_page());
    });

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ids.txt");
    fs::write(&input, "4-2021-05678\n").unwrap();

    let mut settings = settings_for(&server, &dir.path().join("Output"));
    settings.validation = ValidationPolicy::ErrorStrings;
    settings.max_reattempts = 3;
    settings.retry_passes = 2;

    let mut config = ScrapeConfig::from_settings(&settings);
    config.extractor = unparseable;
    let layout = RunLayout::for_today(&settings.output_root);
    let client = HttpClient::new(Duration::from_secs(5)).unwrap();
    let service = ScrapeService::new(config, client, layout.clone()).unwrap();
    let prepared = service.prepare(&input).await.unwrap();

    let (event_tx, mut event_rx) = mpsc::channel::<ScrapeEvent>(100);
    let collect = tokio::spawn(async move {
        let mut failed = Vec::new();
        while let Some(event) = event_rx.recv().await {
            if let ScrapeEvent::Failed { id, error, .. } = event {
                failed.push((id, error));
            }
        }
        failed
    });
    let result = service.run(prepared.pending, event_tx).await.unwrap();
    let failed_events = collect.await.unwrap();

    mock.assert_hits(1);
    assert_eq!(result.passes, 0);
    assert_eq!(result.completed, 0);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(
        failed_events,
        vec![("4-2021-05678".to_string(), "Document is empty".to_string())]
    );

    let nh = data_lines(&layout.record_file(RecordType::Trademark));
    assert_eq!(nh, vec!["4-2021-05678\tNo data available after 0 retries".to_string()]);
    assert_eq!(fs::read_to_string(layout.fail_ids()).unwrap(), "4-2021-05678\n");
}
