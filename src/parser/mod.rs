//! Free text to polygons.
//!
//! Input is tried as one record first, then line by line. A line that does
//! not parse as-is is searched for an embedded `MULTIPOLYGON` or `POLYGON`
//! keyword; when that keyword's parentheses are still open at end of line,
//! following lines are pulled in until they balance. Lines that still fail
//! are reported in [`ParseReport::skipped`] and never abort the parse.

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::domain::Shape;
use crate::error::{ParseError, ParseResult};
use crate::kernel::GeometryKernel;
use crate::ops::normalize;
use crate::wkt::{read_wkt, write_shape};

/// A line that produced no geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// 1-based
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    #[serde(serialize_with = "serialize_shapes")]
    pub shapes: Vec<Shape>,
    /// Records read successfully, before multipolygon expansion
    pub records: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Shapes that needed repair
    pub repaired: usize,
}

fn serialize_shapes<S: Serializer>(shapes: &[Shape], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(shapes.iter().map(write_shape))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    MultiPolygon,
    Polygon,
}

impl Keyword {
    /// Byte offset of the keyword in `line`, ignoring case
    fn find(self, line: &str) -> Option<usize> {
        let upper = line.to_ascii_uppercase();
        match self {
            Keyword::MultiPolygon => upper.find("MULTIPOLYGON"),
            Keyword::Polygon => upper
                .match_indices("POLYGON")
                .map(|(i, _)| i)
                .find(|&i| i < 5 || &upper.as_bytes()[i - 5..i] != b"MULTI"),
        }
    }
}

/// One way of reading a record starting at a given line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// The whole line is the record
    Direct,
    /// The record starts at a keyword somewhere inside the line
    Embedded(Keyword),
}

const STRATEGIES: [Strategy; 3] = [
    Strategy::Direct,
    Strategy::Embedded(Keyword::MultiPolygon),
    Strategy::Embedded(Keyword::Polygon),
];

/// A parsed record and how many lines after its first one it consumed
struct Attempt {
    shape: Shape,
    extra_lines: usize,
}

impl Strategy {
    fn attempt(self, lines: &[&str], at: usize) -> ParseResult<Attempt> {
        match self {
            Strategy::Direct => read_wkt(lines[at]).map(|shape| Attempt {
                shape,
                extra_lines: 0,
            }),
            Strategy::Embedded(keyword) => {
                let start = keyword.find(lines[at]).ok_or(ParseError::NoGeometry)?;
                let (text, extra_lines) = extract(lines, at, start)?;
                read_wkt(&text).map(|shape| Attempt { shape, extra_lines })
            }
        }
    }
}

enum Balance {
    /// Parentheses close at this byte offset (exclusive)
    Closed(usize),
    Open,
    NoParen,
}

fn balance(text: &str) -> Balance {
    let mut depth = 0usize;
    let mut opened = false;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' => {
                depth += 1;
                opened = true;
            }
            b')' => {
                if depth <= 1 {
                    return Balance::Closed(i + 1);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    if opened { Balance::Open } else { Balance::NoParen }
}

/// Text from the keyword at `start` through its closing parenthesis, joining
/// following lines while parentheses remain open.
fn extract(lines: &[&str], at: usize, start: usize) -> ParseResult<(String, usize)> {
    let mut text = lines[at][start..].to_string();
    let mut extra = 0;
    loop {
        match balance(&text) {
            Balance::Closed(end) => {
                text.truncate(end);
                return Ok((text, extra));
            }
            Balance::NoParen => {
                if let Some(pos) = text.to_ascii_uppercase().find("EMPTY") {
                    text.truncate(pos + "EMPTY".len());
                    return Ok((text, extra));
                }
            }
            Balance::Open => {}
        }

        let next = at + extra + 1;
        if next >= lines.len() {
            return Err(ParseError::UnexpectedEnd { expected: "')'" });
        }
        text.push(' ');
        text.push_str(lines[next].trim());
        extra += 1;
    }
}

/// A shape and the line it started on
struct Record {
    line: usize,
    shape: Shape,
}

fn read_records(text: &str) -> (Vec<Record>, Vec<SkippedRecord>) {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return (Vec::new(), Vec::new());
    }
    if let Ok(shape) = read_wkt(&collapsed) {
        debug!("input parsed as a single record");
        return (vec![Record { line: 1, shape }], Vec::new());
    }

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut at = 0;

    while at < lines.len() {
        if lines[at].is_empty() {
            at += 1;
            continue;
        }

        let mut reason = ParseError::NoGeometry;
        let mut parsed = None;
        for strategy in STRATEGIES {
            match strategy.attempt(&lines, at) {
                Ok(attempt) => {
                    debug!(line = at + 1, ?strategy, "record parsed");
                    parsed = Some(attempt);
                    break;
                }
                Err(ParseError::NoGeometry) => {}
                Err(e) => reason = e,
            }
        }

        match parsed {
            Some(Attempt { shape, extra_lines }) => {
                records.push(Record { line: at + 1, shape });
                at += extra_lines + 1;
            }
            None => {
                warn!(line = at + 1, %reason, "skipping unparseable record");
                skipped.push(SkippedRecord {
                    line: at + 1,
                    reason: reason.to_string(),
                });
                at += 1;
            }
        }
    }

    (records, skipped)
}

fn collect<K: GeometryKernel>(kernel: &K, text: &str, expand: bool) -> ParseReport {
    let (records, skipped) = read_records(text);
    let mut report = ParseReport {
        records: records.len(),
        skipped,
        ..ParseReport::default()
    };

    for record in records {
        let parts = match record.shape {
            Shape::MultiPolygon(mp) if expand => mp.0.into_iter().map(Shape::Polygon).collect(),
            shape => vec![shape],
        };
        for part in parts {
            if part.member_count() == 0 && !matches!(part, Shape::Degenerate(_)) {
                // EMPTY contributes nothing
                continue;
            }
            let normalized = normalize(kernel, &part);
            if normalized != part {
                report.repaired += 1;
            }
            if let Shape::Degenerate(_) = normalized {
                warn!(line = record.line, "polygon collapsed during repair, skipping");
                report.skipped.push(SkippedRecord {
                    line: record.line,
                    reason: ParseError::Collapsed.to_string(),
                });
                continue;
            }
            report.shapes.push(normalized);
        }
    }

    report.skipped.sort_by_key(|s| s.line);
    report
}

/// Every polygon in `text`, with multipolygons expanded into their members.
pub fn parse_polygons<K: GeometryKernel>(kernel: &K, text: &str) -> ParseReport {
    collect(kernel, text, true)
}

/// One shape per record in `text`; multipolygons stay whole.
pub fn parse_records<K: GeometryKernel>(kernel: &K, text: &str) -> ParseReport {
    collect(kernel, text, false)
}
