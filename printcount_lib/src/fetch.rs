//! Per-device counter report retrieval.
//!
//! A device visit is: landing page, two status requests, then the counter
//! report itself. Only the report request can fail the visit; the others
//! are advisory and are kept for diagnostics. Every outcome, including a
//! failed login, comes back as a [`DeviceResult`] so one device never
//! aborts the rest of a run.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use remoteui_api::{expand_template, Client, ConsolePaths, Credentials, Page, Session, Timeouts};
use serde::Serialize;

use crate::availability::unavailable_marker;
use crate::config::DeviceEntry;
use crate::error::PrintCountError;
use crate::lines::{format_lines, FormatWarning};
use crate::rows::{document_title, parse_counter_rows, CounterRow};

/// Pause after the landing page, giving the console time to set up the
/// frame context the report pages depend on.
const LANDING_SETTLE: Duration = Duration::from_millis(200);

const NO_TITLE: &str = "N/A";

/// Authenticated access to one device console.
pub trait ReportTransport {
    /// Fetches `url`; any HTTP status is a page, only network failures and
    /// timeouts are errors.
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Page, remoteui_api::Error>> + Send;

    /// Resolves a console path against the device base URL.
    fn resolve(&self, path: &str) -> Result<String, remoteui_api::Error>;

    /// URL of the console landing page.
    fn landing_url(&self) -> String;
}

impl ReportTransport for Session {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Page, remoteui_api::Error> {
        Session::get(self, url, timeout).await
    }

    fn resolve(&self, path: &str) -> Result<String, remoteui_api::Error> {
        Session::resolve(self, path)
    }

    fn landing_url(&self) -> String {
        self.top_url().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The console could not be reached or rejected the credentials.
    Login,
    /// The counter report request did not complete.
    Transport,
    /// The console served an error page instead of the report.
    UnavailableDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a request whose failure is tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub url: String,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Outcome of the counter report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestStatus {
    pub url: String,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub landing: Advisory,
    pub nativetop: Advisory,
    pub jstatpri: Advisory,
    pub dcounter: RequestStatus,
    pub title: String,
}

/// Everything one device visit produced.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceResult {
    pub base: String,
    pub place: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    pub rows: Vec<CounterRow>,
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<FormatWarning>,
    pub diagnostics: Option<Diagnostics>,
    /// The counter report document as received.
    #[serde(skip)]
    pub html: Option<String>,
}

impl DeviceResult {
    fn failed(device: &DeviceEntry, kind: FailureKind, message: String) -> Self {
        Self {
            base: device.base.clone(),
            place: device.place.clone(),
            ok: false,
            failure: Some(Failure { kind, message }),
            rows: Vec::new(),
            lines: Vec::new(),
            warning: None,
            diagnostics: None,
            html: None,
        }
    }

    /// True when the report was read and yielded both canonical readings.
    pub fn has_readings(&self) -> bool {
        self.ok && self.warning.is_none()
    }
}

/// Report URLs of one visit, with cache-busting values filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub nativetop: String,
    pub jstatpri: String,
    pub dcounter: String,
}

impl ReportPaths {
    /// Expands the templates with `now_ms`, `now_ms + 1` and `now_ms + 2`.
    pub fn expand(paths: &ConsolePaths, now_ms: i64) -> Self {
        Self {
            nativetop: expand_template(&paths.nativetop_path, now_ms),
            jstatpri: expand_template(&paths.jstatpri_path, now_ms + 1),
            dcounter: expand_template(&paths.dcounter_path, now_ms + 2),
        }
    }
}

/// Runs an advisory request. Never fails; the outcome is only recorded.
pub async fn advisory<T: ReportTransport>(transport: &T, url: String, timeout: Duration) -> Advisory {
    match transport.get(&url, timeout).await {
        Ok(page) => Advisory {
            url,
            status: Some(page.status),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Advisory request {} failed: {}", url, e);
            Advisory {
                url,
                status: None,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn advisory_path<T: ReportTransport>(transport: &T, path: &str, timeout: Duration) -> Advisory {
    match transport.resolve(path) {
        Ok(url) => advisory(transport, url, timeout).await,
        Err(e) => Advisory {
            url: path.to_string(),
            status: None,
            error: Some(e.to_string()),
        },
    }
}

/// Visits one device over an authenticated transport.
pub async fn fetch_counters<T: ReportTransport>(
    transport: &T,
    device: &DeviceEntry,
    paths: &ConsolePaths,
    timeouts: Timeouts,
) -> DeviceResult {
    let landing = advisory(transport, transport.landing_url(), timeouts.nav()).await;
    tokio::time::sleep(LANDING_SETTLE).await;

    let report = ReportPaths::expand(paths, chrono::Utc::now().timestamp_millis());
    let nativetop = advisory_path(transport, &report.nativetop, timeouts.action()).await;
    let jstatpri = advisory_path(transport, &report.jstatpri, timeouts.action()).await;

    let dcounter_url = match transport.resolve(&report.dcounter) {
        Ok(url) => url,
        Err(e) => return DeviceResult::failed(device, FailureKind::Transport, e.to_string()),
    };
    let fetched = transport.get(&dcounter_url, timeouts.nav()).await;

    let mut diagnostics = Diagnostics {
        landing,
        nativetop,
        jstatpri,
        dcounter: RequestStatus {
            url: dcounter_url,
            status: None,
        },
        title: NO_TITLE.to_string(),
    };

    let page = match fetched {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("{}: counter report request failed: {}", device.place, e);
            let mut result = DeviceResult::failed(device, FailureKind::Transport, e.to_string());
            result.diagnostics = Some(diagnostics);
            return result;
        }
    };

    diagnostics.dcounter.status = Some(page.status);
    diagnostics.title = document_title(&page.body).unwrap_or_else(|| NO_TITLE.to_string());

    if let Some(marker) = unavailable_marker(&page.body) {
        tracing::warn!("{}: counter report unavailable ({})", device.place, marker);
        let mut result = DeviceResult::failed(
            device,
            FailureKind::UnavailableDocument,
            format!("counter report unavailable: {}", marker),
        );
        result.diagnostics = Some(diagnostics);
        result.html = Some(page.body);
        return result;
    }

    let rows = parse_counter_rows(&page.body);
    let formatted = format_lines(&device.place, &rows);
    if let Some(warning) = formatted.warning {
        tracing::warn!("{}: {} ({} rows)", device.place, warning, rows.len());
    }

    DeviceResult {
        base: device.base.clone(),
        place: device.place.clone(),
        ok: true,
        failure: None,
        rows,
        lines: formatted.lines,
        warning: formatted.warning,
        diagnostics: Some(diagnostics),
        html: Some(page.body),
    }
}

/// Logs in to `device` and visits it. Login problems become a failed
/// result rather than an error.
pub async fn run_device(
    device: &DeviceEntry,
    paths: &ConsolePaths,
    timeouts: Timeouts,
    credentials: &Credentials,
) -> DeviceResult {
    let session = match login(device, paths, timeouts, credentials).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("{}: login to {} failed: {}", device.place, device.base, e);
            return DeviceResult::failed(device, FailureKind::Login, e.to_string());
        }
    };
    fetch_counters(&session, device, paths, timeouts).await
}

async fn login(
    device: &DeviceEntry,
    paths: &ConsolePaths,
    timeouts: Timeouts,
    credentials: &Credentials,
) -> Result<Session, remoteui_api::Error> {
    let client = Client::new(&device.base, paths.clone(), timeouts)?;
    client.login(credentials).await
}

/// Writes the raw report document of `result` to `<dir>/<place>.html`.
///
/// When the place label has characters that cannot appear in a file name,
/// the device host is appended so that labels differing only in those
/// characters do not share a file. Returns `None` when the visit never
/// received a document.
pub fn dump_html(dir: &Path, result: &DeviceResult) -> Result<Option<PathBuf>, PrintCountError> {
    let Some(html) = &result.html else {
        return Ok(None);
    };
    let stem = file_stem(&result.place);
    if stem.is_empty() {
        return Err(PrintCountError::InvalidInput(format!(
            "cannot derive a file name from place {:?}",
            result.place
        )));
    }
    let name = if stem == result.place.trim() {
        stem
    } else {
        format!("{}-{}", stem, device_tag(&result.base))
    };
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.html", name));
    if path.exists() {
        tracing::warn!("{}: overwriting {}", result.place, path.display());
    }
    std::fs::write(&path, html)?;
    Ok(Some(path))
}

fn file_stem(place: &str) -> String {
    place
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `host` or `host_port` of a device base URL, file-name safe.
fn device_tag(base: &str) -> String {
    let authority = match url::Url::parse(base) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}_{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => base.to_string(),
        },
        Err(_) => base.to_string(),
    };
    authority
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned pages keyed by path (query string ignored).
    struct StubTransport {
        pages: HashMap<&'static str, Result<(u16, String), &'static str>>,
    }

    impl StubTransport {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
            }
        }

        fn page(mut self, path: &'static str, status: u16, body: &str) -> Self {
            self.pages.insert(path, Ok((status, body.to_string())));
            self
        }

        fn fail(mut self, path: &'static str, message: &'static str) -> Self {
            self.pages.insert(path, Err(message));
            self
        }
    }

    impl ReportTransport for StubTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<Page, remoteui_api::Error> {
            let path = url
                .trim_start_matches("http://stub")
                .split('?')
                .next()
                .unwrap_or_default();
            match self.pages.get(path) {
                Some(Ok((status, body))) => Ok(Page {
                    url: url.to_string(),
                    status: *status,
                    body: body.clone(),
                }),
                Some(Err(_)) | None => Err(remoteui_api::Error::Timeout {
                    url: url.to_string(),
                }),
            }
        }

        fn resolve(&self, path: &str) -> Result<String, remoteui_api::Error> {
            Ok(format!("http://stub{}", path))
        }

        fn landing_url(&self) -> String {
            "http://stub/rps/_top.htm".to_string()
        }
    }

    fn device() -> DeviceEntry {
        DeviceEntry {
            base: "http://stub".to_string(),
            place: "시험측정실".to_string(),
        }
    }

    const REPORT: &str = include_str!("../tests/fixtures/dcounter.html");
    const EXPIRED: &str = include_str!("../tests/fixtures/expired.html");

    async fn visit(transport: StubTransport) -> DeviceResult {
        fetch_counters(&transport, &device(), &ConsolePaths::default(), Timeouts::default()).await
    }

    #[tokio::test(start_paused = true)]
    async fn successful_visit_carries_lines_and_diagnostics() {
        let transport = StubTransport::new()
            .page("/rps/_top.htm", 200, "top")
            .page("/rps/nativetop.cgi", 200, "")
            .page("/rps/jstatpri.cgi", 200, "")
            .page("/rps/dcounter.cgi", 200, REPORT);
        let result = visit(transport).await;

        assert!(result.ok);
        assert!(result.has_readings());
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.lines, vec!["시험측정실\t흑백\t50277", "시험측정실\t컬러\t1200"]);

        let diag = result.diagnostics.unwrap();
        assert_eq!(diag.nativetop.status, Some(200));
        assert_eq!(diag.jstatpri.status, Some(200));
        assert_eq!(diag.dcounter.status, Some(200));
        assert!(diag.dcounter.url.starts_with("http://stub/rps/dcounter.cgi?CorePGTAG=14&Dummy="));
        assert_eq!(diag.title, "Remote UI : Check Counter : iR-ADV C3530");
    }

    #[tokio::test(start_paused = true)]
    async fn advisory_failures_do_not_fail_the_visit() {
        let transport = StubTransport::new()
            .fail("/rps/_top.htm", "down")
            .page("/rps/nativetop.cgi", 500, "error")
            .fail("/rps/jstatpri.cgi", "down")
            .page("/rps/dcounter.cgi", 200, REPORT);
        let result = visit(transport).await;

        assert!(result.ok);
        let diag = result.diagnostics.unwrap();
        assert_eq!(diag.landing.status, None);
        assert!(diag.landing.error.is_some());
        assert_eq!(diag.nativetop.status, Some(500));
        assert_eq!(diag.nativetop.error, None);
        assert!(diag.jstatpri.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_document_fails_without_rows() {
        let transport = StubTransport::new().page("/rps/dcounter.cgi", 200, EXPIRED);
        let result = visit(transport).await;

        assert!(!result.ok);
        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::UnavailableDocument);
        assert!(failure.message.contains("session has expired"));
        assert!(result.rows.is_empty());
        assert!(result.lines.is_empty());
        assert_eq!(result.html.as_deref(), Some(EXPIRED));
        assert_eq!(result.diagnostics.unwrap().title, "Remote UI : Error");
    }

    #[tokio::test(start_paused = true)]
    async fn report_transport_failure_keeps_diagnostics() {
        let transport = StubTransport::new()
            .page("/rps/nativetop.cgi", 200, "")
            .fail("/rps/dcounter.cgi", "timeout");
        let result = visit(transport).await;

        assert!(!result.ok);
        assert_eq!(result.failure.unwrap().kind, FailureKind::Transport);
        let diag = result.diagnostics.unwrap();
        assert_eq!(diag.nativetop.status, Some(200));
        assert_eq!(diag.dcounter.status, None);
        assert_eq!(diag.title, "N/A");
        assert!(result.html.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_layout_is_ok_with_warning() {
        let short = include_str!("../tests/fixtures/dcounter_short.html");
        let transport = StubTransport::new().page("/rps/dcounter.cgi", 200, short);
        let result = visit(transport).await;

        assert!(result.ok);
        assert!(!result.has_readings());
        assert_eq!(result.warning, Some(FormatWarning::UnexpectedRowsLength));
        assert_eq!(result.lines[0], "시험측정실\tWARN\trows length=2 (expected 4)");
        assert_eq!(result.lines.len(), 3);
    }

    #[test]
    fn report_paths_get_distinct_dummies() {
        let paths = ReportPaths::expand(&ConsolePaths::default(), 1000);
        assert!(paths.nativetop.ends_with("Dummy=1000"));
        assert!(paths.jstatpri.ends_with("Dummy=1001"));
        assert!(paths.dcounter.ends_with("Dummy=1002"));
    }

    #[test]
    fn failed_result_serializes_kind() {
        let result = DeviceResult::failed(&device(), FailureKind::Login, "refused".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["failure"]["kind"], "login");
        assert!(json.get("html").is_none());
        assert!(json["diagnostics"].is_null());
    }

    #[test]
    fn dump_writes_document_named_after_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = DeviceResult::failed(&device(), FailureKind::UnavailableDocument, "x".into());
        result.place = "관리동 1층/2".to_string();
        result.html = Some("<html></html>".to_string());

        let path = dump_html(dir.path(), &result).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "관리동_1층_2-stub.html");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html></html>");
    }

    #[test]
    fn dump_keeps_places_that_sanitize_alike_apart() {
        let dir = tempfile::tempdir().unwrap();
        let dump = |place: &str, base: &str, body: &str| {
            let mut result = DeviceResult::failed(&device(), FailureKind::Transport, "x".into());
            result.place = place.to_string();
            result.base = base.to_string();
            result.html = Some(body.to_string());
            dump_html(dir.path(), &result).unwrap().unwrap()
        };

        let slash = dump("A/B", "http://10.0.0.1:8000", "first");
        let space = dump("A B", "http://10.0.0.2:8000", "second");
        let plain = dump("설계실", "http://10.0.0.3", "third");

        assert_ne!(slash, space);
        assert_eq!(slash.file_name().unwrap(), "A_B-10.0.0.1_8000.html");
        assert_eq!(space.file_name().unwrap(), "A_B-10.0.0.2_8000.html");
        assert_eq!(plain.file_name().unwrap(), "설계실.html");
        assert_eq!(std::fs::read_to_string(slash).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(space).unwrap(), "second");
    }

    #[test]
    fn dump_skips_results_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeviceResult::failed(&device(), FailureKind::Login, "x".into());
        assert_eq!(dump_html(dir.path(), &result).unwrap(), None);
    }
}
