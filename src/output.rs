// Output sink: write retrieved records to the console (template lines or
// JSON), optionally to a file, and run the per-record side effect
// (archive the page, or open it in the browser).

use crate::api::PageFetcher;
use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::error::Result;
use crate::format::FormatSpec;
use crate::fs;
use crate::record::Record;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Pause before each browser open so tabs arrive one at a time.
pub const BROWSER_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Console,
    /// Console plus the whole result written to this file.
    File(PathBuf),
    /// Console plus each link opened in a browser tab.
    Browser,
}

impl Destination {
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            None => Destination::Console,
            Some("browser") => Destination::Browser,
            Some(path) => Destination::File(PathBuf::from(path)),
        }
    }
}

pub struct OutputSink<'a> {
    spec: &'a FormatSpec,
    json: bool,
    destination: Destination,
    archive: Option<PathBuf>,
    launcher: &'a dyn BrowserLauncher,
    browser_delay: Duration,
}

impl<'a> OutputSink<'a> {
    pub fn new(
        spec: &'a FormatSpec,
        json: bool,
        destination: Destination,
        archive: Option<PathBuf>,
    ) -> Self {
        OutputSink {
            spec,
            json,
            destination,
            archive,
            launcher: &SystemBrowser,
            browser_delay: BROWSER_DELAY,
        }
    }

    /// Replace the browser used by `Destination::Browser` and the pause
    /// taken before each open.
    pub fn with_browser(mut self, launcher: &'a dyn BrowserLauncher, delay: Duration) -> Self {
        self.launcher = launcher;
        self.browser_delay = delay;
        self
    }

    pub fn emit<W: Write>(
        &self,
        records: &[Record],
        console: &mut W,
        fetcher: &dyn PageFetcher,
    ) -> Result<()> {
        if self.json {
            write_line(console, &to_json(records)?)?;
        }
        for record in records {
            if !self.json {
                write_line(console, &self.spec.render(record))?;
            }
            if let Some(dir) = &self.archive {
                save_to_archive(dir, record, fetcher)?;
            } else if self.destination == Destination::Browser {
                self.open_in_browser(record)?;
            }
        }
        console.flush()?;

        if let Destination::File(path) = &self.destination {
            let path = fs::resolve_path(path)?;
            fs::write_to_file(&path, self.document(records)?.as_bytes())?;
        }
        Ok(())
    }

    fn open_in_browser(&self, record: &Record) -> Result<()> {
        let Some(link) = record.link.as_deref() else {
            tracing::warn!(id = ?record.id, "record has no link, not opening");
            return Ok(());
        };
        thread::sleep(self.browser_delay);
        self.launcher.open(link)
    }

    /// The full output as one string: the JSON document, or every rendered
    /// line concatenated.
    pub fn document(&self, records: &[Record]) -> Result<String> {
        if self.json {
            to_json(records)
        } else {
            Ok(records.iter().map(|record| self.spec.render(record)).collect())
        }
    }
}

/// Pretty JSON with four-space indentation and sorted keys.
pub fn to_json(records: &[Record]) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// Falls back to an ASCII-escaped rendering when the console rejects the
// text itself.
fn write_line<W: Write>(out: &mut W, line: &str) -> Result<()> {
    match out.write_all(line.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            tracing::warn!("console rejected output ({}), writing escaped text", err);
            out.write_all(ascii_escape(line).as_bytes())?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn ascii_escape(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            escaped.extend(c.escape_unicode());
        }
    }
    escaped
}

/// Saves the linked page as `<dir>/<id> - <title>.html`.
fn save_to_archive(dir: &std::path::Path, record: &Record, fetcher: &dyn PageFetcher) -> Result<()> {
    let Some(link) = record.link.as_deref() else {
        tracing::warn!(id = ?record.id, "record has no link, not archiving");
        return Ok(());
    };
    let dir = fs::resolve_path(dir)?;
    fs::ensure_dir(&dir)?;

    let id = record.id.as_deref().unwrap_or("unknown");
    let title = fs::safe_name(record.title.as_deref().unwrap_or_default());
    let path = dir.join(format!("{} - {}.html", id, title));

    let html = fetcher.fetch_page(link)?;
    fs::write_to_file(&path, &html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::time::Instant;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFetcher {
        fetched: RefCell<Vec<String>>,
    }

    impl PageFetcher for FakeFetcher {
        fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(url.to_string());
            Ok(format!("<html>{url}</html>").into_bytes())
        }
    }

    /// Records each opened link with the time it was opened.
    #[derive(Default)]
    struct RecordingLauncher {
        opened: RefCell<Vec<(String, Instant)>>,
    }

    impl RecordingLauncher {
        fn links(&self) -> Vec<String> {
            self.opened.borrow().iter().map(|(link, _)| link.clone()).collect()
        }
    }

    impl BrowserLauncher for RecordingLauncher {
        fn open(&self, url: &str) -> Result<()> {
            self.opened.borrow_mut().push((url.to_string(), Instant::now()));
            Ok(())
        }
    }

    /// Console that refuses non-ASCII bytes, like a legacy code page.
    struct AsciiConsole(Vec<u8>);

    impl Write for AsciiConsole {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !buf.is_ascii() {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "unencodable"));
            }
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn records() -> Vec<Record> {
        vec![
            Record {
                id: Some("1".into()),
                title: Some("First: a/b".into()),
                link: Some("https://one.example".into()),
                ..Default::default()
            },
            Record {
                id: Some("2".into()),
                title: Some("Second".into()),
                link: Some("https://two.example".into()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn console_gets_one_rendered_line_per_record() {
        let spec = FormatSpec::compile("{id} {link}").unwrap();
        let sink = OutputSink::new(&spec, false, Destination::Console, None);
        let mut console = Vec::new();

        sink.emit(&records(), &mut console, &FakeFetcher::default())
            .unwrap();
        assert_eq!(
            String::from_utf8(console).unwrap(),
            "1 https://one.example\n2 https://two.example\n"
        );
    }

    #[test]
    fn json_is_indented_and_key_sorted() {
        let json = to_json(&records()[..1]).unwrap();

        assert!(json.starts_with("[\n    {\n        \"domain\": null,"));
        let parsed: Vec<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, records()[..1].to_vec());

        let keys: Vec<usize> = ["domain", "excerpt", "id", "link", "tags", "time_added", "time_updated", "title"]
            .iter()
            .map(|k| json.find(&format!("\"{k}\"")).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn file_destination_receives_whole_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.txt");
        let spec = FormatSpec::compile("{title}").unwrap();
        let sink = OutputSink::new(&spec, false, Destination::File(path.clone()), None);

        let mut console = Vec::new();
        sink.emit(&records(), &mut console, &FakeFetcher::default())
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "First: a/b\nSecond\n");
        assert_eq!(console, std::fs::read(&path).unwrap());
    }

    #[test]
    fn archive_writes_one_page_per_record() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        let spec = FormatSpec::compile("{id}").unwrap();
        let sink = OutputSink::new(&spec, false, Destination::Console, Some(archive.clone()));
        let fetcher = FakeFetcher::default();

        sink.emit(&records(), &mut Vec::new(), &fetcher).unwrap();

        assert_eq!(fetcher.fetched.borrow().len(), 2);
        let first = std::fs::read_to_string(archive.join("1 - First_ a_b.html")).unwrap();
        assert_eq!(first, "<html>https://one.example</html>");
        assert!(archive.join("2 - Second.html").exists());
    }

    #[test]
    fn unencodable_console_falls_back_to_escapes() {
        let spec = FormatSpec::compile("{title}").unwrap();
        let sink = OutputSink::new(&spec, false, Destination::Console, None);
        let record = Record {
            title: Some("café".into()),
            ..Default::default()
        };
        let mut console = AsciiConsole(Vec::new());

        sink.emit(&[record], &mut console, &FakeFetcher::default())
            .unwrap();
        assert_eq!(String::from_utf8(console.0).unwrap(), "caf\\u{e9}\n");
    }

    #[test]
    fn destination_selector() {
        assert_eq!(Destination::from_selector(None), Destination::Console);
        assert_eq!(Destination::from_selector(Some("browser")), Destination::Browser);
        assert_eq!(
            Destination::from_selector(Some("~/links.txt")),
            Destination::File(PathBuf::from("~/links.txt"))
        );
    }

    #[test]
    fn fetch_failure_surfaces() {
        struct Offline;
        impl PageFetcher for Offline {
            fn fetch_page(&self, _url: &str) -> Result<Vec<u8>> {
                Err(Error::Io(io::Error::new(io::ErrorKind::NotConnected, "offline")))
            }
        }

        let temp = TempDir::new().unwrap();
        let spec = FormatSpec::compile("{id}").unwrap();
        let sink = OutputSink::new(&spec, false, Destination::Console, Some(temp.path().to_path_buf()));
        assert!(sink.emit(&records(), &mut Vec::new(), &Offline).is_err());
    }

    #[test]
    fn browser_opens_each_link_in_order_after_the_delay() {
        let spec = FormatSpec::compile("{id}").unwrap();
        let launcher = RecordingLauncher::default();
        let delay = Duration::from_millis(20);
        let sink = OutputSink::new(&spec, false, Destination::Browser, None)
            .with_browser(&launcher, delay);

        let started = Instant::now();
        let mut console = Vec::new();
        sink.emit(&records(), &mut console, &FakeFetcher::default())
            .unwrap();

        assert_eq!(launcher.links(), ["https://one.example", "https://two.example"]);
        let opened = launcher.opened.borrow();
        assert!(opened[0].1 - started >= delay);
        assert!(opened[1].1 - opened[0].1 >= delay);
        assert_eq!(String::from_utf8(console).unwrap(), "1\n2\n");
    }

    #[test]
    fn archive_wins_over_browser() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        let spec = FormatSpec::compile("{id}").unwrap();
        let launcher = RecordingLauncher::default();
        let fetcher = FakeFetcher::default();
        let sink = OutputSink::new(&spec, false, Destination::Browser, Some(archive.clone()))
            .with_browser(&launcher, Duration::ZERO);

        sink.emit(&records(), &mut Vec::new(), &fetcher).unwrap();

        assert!(launcher.links().is_empty());
        assert_eq!(fetcher.fetched.borrow().len(), 2);
        assert!(archive.join("2 - Second.html").exists());
    }

    #[test]
    fn browser_skips_records_without_a_link() {
        let spec = FormatSpec::compile("{id}").unwrap();
        let launcher = RecordingLauncher::default();
        let sink = OutputSink::new(&spec, false, Destination::Browser, None)
            .with_browser(&launcher, Duration::ZERO);
        let mut items = records();
        items[0].link = None;

        let mut console = Vec::new();
        sink.emit(&items, &mut console, &FakeFetcher::default())
            .unwrap();

        assert_eq!(launcher.links(), ["https://two.example"]);
        assert_eq!(String::from_utf8(console).unwrap(), "1\n2\n");
    }
}
