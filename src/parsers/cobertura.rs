/// Parser for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage>
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="...">
///             <methods>
///               <method name="...">
///                 <lines><line number="..." hits="..." .../></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"
///                     condition-coverage="50% (1/2)" />
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
use std::collections::{BTreeMap, HashMap};
use std::str;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::error::{CovdiffError, Result};
use crate::model::{CoverageReport, ReportFile, ReportLine};
use crate::parsers::Parser;

/// Pre-compiled regex for condition-coverage attributes like "75% (3/4)".
static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").unwrap());

pub struct CoberturaParser;

impl Parser for CoberturaParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageReport> {
        parse_cobertura(input)
    }
}

/// Lines collected for one filename. Several `<class>` elements may share it.
#[derive(Default)]
struct FileCounts {
    hits: BTreeMap<u32, u64>,
    /// (covered arms, total arms), from the first occurrence of the line.
    branches: HashMap<u32, (u32, u32)>,
}

impl FileCounts {
    /// Record a `<line>` element. Lines can show up under both `<method>` and
    /// `<class>`; the highest hit count wins.
    fn record(&mut self, attrs: &HashMap<String, String>) {
        let Some(line_number) = attrs.get("number").and_then(|n| n.parse::<u32>().ok()) else {
            return;
        };
        let hits = attrs
            .get("hits")
            .and_then(|h| h.parse::<u64>().ok())
            .unwrap_or(0);

        let entry = self.hits.entry(line_number).or_insert(0);
        *entry = (*entry).max(hits);

        let is_branch = attrs.get("branch").is_some_and(|v| v == "true");
        if is_branch && !self.branches.contains_key(&line_number) {
            if let Some(caps) = attrs
                .get("condition-coverage")
                .and_then(|cond| BRANCH_RE.captures(cond))
            {
                let covered: u32 = caps[1].parse().unwrap_or(0);
                let total: u32 = caps[2].parse().unwrap_or(0);
                self.branches.insert(line_number, (covered, total));
            }
        }
    }

    fn into_report_file(self, name: String) -> ReportFile {
        let mut file = ReportFile::new(name);
        for (line_number, hits) in self.hits {
            let branches = self.branches.get(&line_number).copied();
            file.insert(line_number, ReportLine::from_counts(hits, branches));
        }
        file
    }
}

fn parse_cobertura(input: &[u8]) -> Result<CoverageReport> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut files: BTreeMap<String, FileCounts> = BTreeMap::new();
    let mut buf = Vec::new();

    let mut current: Option<String> = None;

    // Source prefix from <source> elements
    let mut sources: Vec<String> = Vec::new();
    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(CovdiffError::Xml(e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"source" => {
                    // A self-closing <source/> has no text and no End event.
                    if is_start_event {
                        in_source = true;
                    }
                }
                b"class" => {
                    let attrs = attr_map(e);
                    if let Some(filename) = attrs.get("filename") {
                        let path = resolve_source_path(filename, &sources);
                        files.entry(path.clone()).or_default();
                        current = Some(path);
                    }
                }
                b"line" => {
                    if let Some(counts) = current.as_ref().and_then(|p| files.get_mut(p)) {
                        counts.record(&attr_map(e));
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_source {
                    if let Ok(text) = e.unescape() {
                        sources.push(text.to_string());
                    }
                    in_source = false;
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"source" => in_source = false,
                b"class" => current = None,
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    let mut report = CoverageReport::new();
    for (name, counts) in files {
        report.insert_file(counts.into_report_file(name));
    }
    Ok(report)
}

/// Resolve a filename against the list of `<source>` prefixes.
///
/// - If the filename is already absolute, return it as-is.
/// - Otherwise, prepend the first non-empty source prefix.
/// - If no non-empty sources exist, return the filename unchanged.
fn resolve_source_path(filename: &str, sources: &[String]) -> String {
    if filename.starts_with('/') {
        return filename.to_string();
    }
    for source in sources {
        let base = source.trim_end_matches('/');
        if !base.is_empty() {
            return format!("{base}/{filename}");
        }
    }
    filename.to_string()
}

/// Extract attributes from an XML element into a HashMap.
fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}
