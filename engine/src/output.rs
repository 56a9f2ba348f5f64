//! XML output for the downstream redaction tool.
//!
//! Every processed document gets a coordinates file listing the boxes to
//! paint. Redacted documents also get an index-values file that pairs each
//! located field with its recognised text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use thiserror::Error;

use ocrr_core::{BBox, ExtractedField, Verdict};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed redaction record: {0}")]
    Record(String),
}

pub type OutputResult<T> = Result<T, OutputError>;

const COORDINATES_SECTION: &str = "DatabaseRedactions";
const COORDINATES_RECORD: &str = "DatabaseRedaction";
const INDEX_SECTION: &str = "indexvalues";
const INDEX_RECORD: &str = "indexvalue";

static FRAMED_NAME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[0-9]+F[0-9A-Za-z_-]+")
        .map_err(|e| log::error!("[Output] invalid name pattern: {}", e))
        .ok()
});

/// Frame and document ids encoded in a document name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub frame: i64,
    pub doc: String,
}

/// Parses `<N>F<doc>-..._...` names into frame `N - 1` and `doc`; any other
/// name gives frame 0 and its first `_` segment without the last character.
pub fn parse_document_ref(document_name: &str) -> DocumentRef {
    let stem = file_stem(document_name);
    let head = stem.split('_').next().unwrap_or(stem);

    let framed = FRAMED_NAME
        .as_ref()
        .map_or(false, |re| re.is_match(document_name));
    if framed {
        let first = head.split('-').next().unwrap_or(head);
        if let Some((frame, doc)) = first.split_once('F') {
            if let Ok(frame) = frame.parse::<i64>() {
                return DocumentRef {
                    frame: frame - 1,
                    doc: doc.to_string(),
                };
            }
        }
    }

    let mut doc = head.to_string();
    doc.pop();
    DocumentRef { frame: 0, doc }
}

fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// One coordinates record.
pub fn coordinate_record(doc_ref: &DocumentRef, seq: usize, bbox: &BBox) -> String {
    format!(
        "0,0,0,,,,0,0,0,0,0,0,,vv,CVDPS,vv,{},{},0,{},{},{},{},{},0,0",
        doc_ref.frame, doc_ref.doc, seq, bbox.x1, bbox.y1, bbox.x2, bbox.y2
    )
}

/// Box of a coordinates record.
pub fn parse_coordinate_record(record: &str) -> OutputResult<BBox> {
    let cols: Vec<&str> = record.trim().split(',').collect();
    if cols.len() < 24 {
        return Err(OutputError::Record(record.to_string()));
    }
    let num = |i: usize| {
        cols[i]
            .trim()
            .parse::<i32>()
            .map_err(|_| OutputError::Record(record.to_string()))
    };
    Ok(BBox::new(num(20)?, num(21)?, num(22)?, num(23)?))
}

fn index_record(doc_ref: &DocumentRef, field: &ExtractedField) -> String {
    format!(
        "\"Title\": \"{}\", \"FrameID\": \"{}\", \"DocID\": \"{}\", \"Value\": \"{}\"",
        field.label, doc_ref.frame, doc_ref.doc, field.raw_text
    )
}

/// `<stem>.xml`
pub fn coordinates_file_name(document_name: &str) -> String {
    format!("{}.xml", file_stem(document_name))
}

/// `<prefix>-RD_<rest>.xml`, splitting at the first `_`.
pub fn index_file_name(document_name: &str) -> String {
    let (prefix, rest) = document_name
        .split_once('_')
        .unwrap_or((document_name, document_name));
    format!("{}.xml", file_stem(&format!("{}-RD_{}", prefix, rest)))
}

fn render(section: &str, record: &str, items: &[String]) -> OutputResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("DataBase")))?;

    writer.write_event(Event::Start(BytesStart::new("Count")))?;
    writer.write_event(Event::Text(BytesText::new(&items.len().to_string())))?;
    writer.write_event(Event::End(BytesEnd::new("Count")))?;

    writer.write_event(Event::Start(BytesStart::new(section)))?;
    for (i, item) in items.iter().enumerate() {
        let id = (i + 1).to_string();
        let mut start = BytesStart::new(record);
        start.push_attribute(("ID", id.as_str()));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(item))))?;
        writer.write_event(Event::End(BytesEnd::new(record)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(section)))?;

    writer.write_event(Event::End(BytesEnd::new("DataBase")))?;
    Ok(writer.into_inner())
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

/// Writes the coordinates file for `boxes`.
pub fn write_coordinates(dir: &Path, document_name: &str, boxes: &[BBox]) -> OutputResult<PathBuf> {
    let doc_ref = parse_document_ref(document_name);
    let records: Vec<String> = boxes
        .iter()
        .enumerate()
        .map(|(i, b)| coordinate_record(&doc_ref, i + 1, b))
        .collect();
    let xml = render(COORDINATES_SECTION, COORDINATES_RECORD, &records)?;
    write_file(dir, &coordinates_file_name(document_name), &xml)
}

/// Files written for a redacted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedOutput {
    pub coordinates: PathBuf,
    pub index_values: PathBuf,
    pub records: usize,
}

/// Writes the coordinates and index-values files of a redacted verdict.
///
/// Only fields that located something are listed in the index values.
pub fn write_redacted(dir: &Path, document_name: &str, verdict: &Verdict) -> OutputResult<RedactedOutput> {
    let boxes = verdict.boxes();
    let coordinates = write_coordinates(dir, document_name, &boxes)?;

    let doc_ref = parse_document_ref(document_name);
    let values: Vec<String> = verdict
        .found_fields()
        .map(|field| index_record(&doc_ref, field))
        .collect();
    let xml = render(INDEX_SECTION, INDEX_RECORD, &values)?;
    let index_values = write_file(dir, &index_file_name(document_name), &xml)?;

    log::info!(
        "[Output] {}: {} redaction record(s), {} index value(s)",
        document_name,
        boxes.len(),
        values.len()
    );
    Ok(RedactedOutput {
        coordinates,
        index_values,
        records: boxes.len(),
    })
}

/// Writes the coordinates file of a rejected document.
pub fn write_rejected(dir: &Path, document_name: &str, cover: Option<BBox>) -> OutputResult<PathBuf> {
    let boxes: Vec<BBox> = cover.into_iter().collect();
    let path = write_coordinates(dir, document_name, &boxes)?;
    log::info!("[Output] {}: rejection record written", document_name);
    Ok(path)
}

/// Boxes listed in a coordinates file, in record order.
pub fn read_coordinates(path: &Path) -> OutputResult<Vec<BBox>> {
    let xml = fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);

    let mut boxes = Vec::new();
    let mut in_record = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == COORDINATES_RECORD.as_bytes() => {
                in_record = true;
            }
            Event::End(e) if e.name().as_ref() == COORDINATES_RECORD.as_bytes() => {
                in_record = false;
            }
            Event::Text(text) if in_record => {
                boxes.push(parse_coordinate_record(&text.unescape()?)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(boxes)
}
