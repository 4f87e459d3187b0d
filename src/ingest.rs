// Input ingestion: read lines from the selected source and parse each one
// through the format template. All sources produce the same `Vec<Record>`.

use crate::error::{Error, Result};
use crate::format::FormatSpec;
use crate::record::Record;
use dialoguer::Input;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

/// Where input lines come from. Built once from the `--input` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Prompt on the terminal until a blank line.
    Interactive,
    /// Redirected standard input.
    Piped,
    /// A single line given on the command line.
    Literal(String),
    File(PathBuf),
}

impl InputSource {
    /// `console` and `redirect` name the terminal and stdin; anything that
    /// looks like a URL is taken literally; everything else is a path.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "console" => InputSource::Interactive,
            "redirect" => InputSource::Piped,
            s if s.starts_with("http") => InputSource::Literal(s.to_string()),
            path => InputSource::File(PathBuf::from(path)),
        }
    }

    fn origin(&self) -> String {
        match self {
            InputSource::Interactive => "console".into(),
            InputSource::Piped => "standard input".into(),
            InputSource::Literal(_) => "argument".into(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// What to do with a line that does not match the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Stop and report the offending line.
    #[default]
    Abort,
    /// Log a warning and carry on with the next line.
    Skip,
}

/// How a blank line is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankLine {
    /// End of input (interactive entry).
    Stop,
    Skip,
}

pub struct Ingestor<'a> {
    spec: &'a FormatSpec,
    policy: ParsePolicy,
}

impl<'a> Ingestor<'a> {
    pub fn new(spec: &'a FormatSpec, policy: ParsePolicy) -> Self {
        Ingestor { spec, policy }
    }

    pub fn ingest(&self, source: &InputSource) -> Result<Vec<Record>> {
        let origin = source.origin();
        let records = match source {
            InputSource::Interactive => {
                println!("Enter data: {}", self.spec.template().trim());
                self.collect(prompt_lines(), &origin, BlankLine::Stop)?
            }
            InputSource::Piped => self.collect(io::stdin().lock().lines(), &origin, BlankLine::Skip)?,
            InputSource::Literal(line) => {
                let record = self.spec.parse(line.trim()).map_err(|err| Error::InputLine {
                    origin,
                    line_no: 1,
                    source: Box::new(err),
                })?;
                vec![record]
            }
            InputSource::File(path) => {
                let file = File::open(path)?;
                self.collect(BufReader::new(file).lines(), &origin, BlankLine::Skip)?
            }
        };
        tracing::debug!(records = records.len(), "input ingested");
        Ok(records)
    }

    /// Parse trimmed lines in order, applying the blank-line rule and the
    /// parse-failure policy.
    pub fn collect<I>(&self, lines: I, origin: &str, blank: BlankLine) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let mut records = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let line = line?;
            let data = line.trim();
            if data.is_empty() {
                match blank {
                    BlankLine::Stop => break,
                    BlankLine::Skip => continue,
                }
            }

            match self.spec.parse(data) {
                Ok(record) => records.push(record),
                Err(err) => {
                    let err = Error::InputLine {
                        origin: origin.to_string(),
                        line_no: index + 1,
                        source: Box::new(err),
                    };
                    match self.policy {
                        ParsePolicy::Abort => return Err(err),
                        ParsePolicy::Skip => tracing::warn!("{}; skipping", err),
                    }
                }
            }
        }
        Ok(records)
    }
}

// One terminal line per item; end of input finishes the sequence.
fn prompt_lines() -> impl Iterator<Item = io::Result<String>> {
    std::iter::from_fn(|| {
        match Input::<String>::new()
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => Some(Ok(line)),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(err) => Some(Err(err)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lines(text: &str) -> Vec<io::Result<String>> {
        text.lines().map(|l| Ok(l.to_string())).collect()
    }

    fn spec() -> FormatSpec {
        FormatSpec::compile("{id} - {title}").unwrap()
    }

    #[test]
    fn selector_is_disambiguated_once() {
        assert_eq!(InputSource::from_selector("console"), InputSource::Interactive);
        assert_eq!(InputSource::from_selector("redirect"), InputSource::Piped);
        assert_eq!(
            InputSource::from_selector("https://example.com"),
            InputSource::Literal("https://example.com".into())
        );
        assert_eq!(
            InputSource::from_selector("links.txt"),
            InputSource::File(PathBuf::from("links.txt"))
        );
    }

    #[test]
    fn piped_input_skips_blank_lines() {
        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let records = ingestor
            .collect(lines("1 - One\n\n   \n2 - Two\n"), "stdin", BlankLine::Skip)
            .unwrap();

        let titles: Vec<_> = records.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn interactive_input_stops_at_blank_line() {
        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let records = ingestor
            .collect(lines("1 - One\n\n2 - Two"), "console", BlankLine::Stop)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn abort_policy_names_source_and_line() {
        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let err = ingestor
            .collect(lines("1 - One\n\nnot a record"), "links.txt", BlankLine::Skip)
            .unwrap_err();

        match &err {
            Error::InputLine { origin, line_no, .. } => {
                assert_eq!(origin, "links.txt");
                assert_eq!(*line_no, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("not a record"));
    }

    #[test]
    fn skip_policy_keeps_good_lines() {
        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Skip);
        let records = ingestor
            .collect(lines("garbage\n3 - Three"), "stdin", BlankLine::Skip)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Three"));
    }

    #[test]
    fn literal_argument_yields_one_record() {
        let spec = FormatSpec::compile("{link}").unwrap();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let records = ingestor
            .ingest(&InputSource::from_selector("https://example.com/post "))
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link.as_deref(), Some("https://example.com/post"));
    }

    #[test]
    fn file_input_reads_every_non_blank_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10 - Ten").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "11 - Eleven").unwrap();

        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let records = ingestor
            .ingest(&InputSource::File(file.path().to_path_buf()))
            .unwrap();

        let ids: Vec<_> = records.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["10", "11"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let spec = spec();
        let ingestor = Ingestor::new(&spec, ParsePolicy::Abort);
        let err = ingestor
            .ingest(&InputSource::File(PathBuf::from("/nonexistent/pockyt-input.txt")))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
