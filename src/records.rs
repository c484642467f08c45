//! Keypoint record source and frame filter.
//!
//! Input is delimited text with a header row: a mandatory `frame` column plus optional
//! `<name>_x`/`<name>_y` columns for every tracked keypoint. Column positions are resolved once from
//! the header; each row then becomes a [`FrameRecord`] holding one optional [`Point`] per keypoint,
//! in the same order as the configured keypoint list.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::KeypointSpec;
use crate::foundation::core::{FrameIndex, Point};
use crate::foundation::error::{PosevidError, PosevidResult};

pub const FRAME_COLUMN: &str = "frame";

/// One input row.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub frame: FrameIndex,
    points: Vec<Option<Point>>,
}

impl FrameRecord {
    /// `points` is indexed like the keypoint list the reader was built with.
    pub fn new(frame: FrameIndex, points: Vec<Option<Point>>) -> Self {
        Self { frame, points }
    }

    /// Detected position of the keypoint at `index`, if any.
    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied().flatten()
    }

    pub fn points(&self) -> &[Option<Point>] {
        &self.points
    }

    /// Number of keypoints with a usable coordinate pair.
    pub fn detected(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Coord {
    Absent,
    Present(Point),
    Malformed,
}

fn parse_coord(x: Option<&str>, y: Option<&str>) -> Coord {
    let x = x.unwrap_or("");
    let y = y.unwrap_or("");
    // A half-detected pair is not worth a marker and not worth a complaint either.
    if x.is_empty() || y.is_empty() {
        return Coord::Absent;
    }
    match (x.parse::<f64>(), y.parse::<f64>()) {
        (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => Coord::Present(Point::new(x, y)),
        _ => Coord::Malformed,
    }
}

#[derive(Clone, Debug)]
struct KeypointColumns {
    name: String,
    x: Option<usize>,
    y: Option<usize>,
}

/// Lazy, forward-only reader yielding one [`FrameRecord`] per input row, in input order.
pub struct RecordReader<R> {
    rows: csv::StringRecordsIntoIter<R>,
    frame_col: usize,
    columns: Vec<KeypointColumns>,
}

impl RecordReader<File> {
    /// Open a CSV file. Fails when the file is unreadable or has no `frame` column.
    pub fn open(path: &Path, keypoints: &[KeypointSpec]) -> PosevidResult<Self> {
        let file = File::open(path).map_err(|e| {
            PosevidError::input(format!("failed to open '{}': {e}", path.display()))
        })?;
        Self::from_reader(file, keypoints)
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(rdr: R, keypoints: &[KeypointSpec]) -> PosevidResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| PosevidError::input(format!("failed to read header row: {e}")))?
            .clone();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let frame_col = position(FRAME_COLUMN).ok_or_else(|| {
            PosevidError::input(format!(
                "header is missing the mandatory '{FRAME_COLUMN}' column"
            ))
        })?;

        let columns = keypoints
            .iter()
            .map(|kp| {
                let cols = KeypointColumns {
                    name: kp.name.clone(),
                    x: position(kp.x_column().as_str()),
                    y: position(kp.y_column().as_str()),
                };
                if cols.x.is_none() || cols.y.is_none() {
                    tracing::debug!(keypoint = %kp.name, "keypoint columns not present in input");
                }
                cols
            })
            .collect();

        Ok(Self {
            rows: reader.into_records(),
            frame_col,
            columns,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord) -> PosevidResult<FrameRecord> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let cell = row.get(self.frame_col).unwrap_or("");
        let frame = cell.parse::<i64>().map(FrameIndex).map_err(|_| {
            PosevidError::input(format!(
                "line {line}: frame '{cell}' is not an integer"
            ))
        })?;

        let points = self
            .columns
            .iter()
            .map(|cols| {
                let x = cols.x.and_then(|i| row.get(i));
                let y = cols.y.and_then(|i| row.get(i));
                match parse_coord(x, y) {
                    Coord::Present(p) => Some(p),
                    Coord::Absent => None,
                    Coord::Malformed => {
                        tracing::debug!(
                            line,
                            frame = frame.0,
                            keypoint = %cols.name,
                            "skipping malformed coordinate"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(FrameRecord { frame, points })
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = PosevidResult<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => {
                return Some(Err(PosevidError::input(format!(
                    "failed to read input row: {e}"
                ))));
            }
        };
        Some(self.parse_row(&row))
    }
}

/// Stateless `frame >= start` predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFilter {
    pub start: FrameIndex,
}

impl FrameFilter {
    pub fn new(start: FrameIndex) -> Self {
        Self { start }
    }

    pub fn accepts(&self, record: &FrameRecord) -> bool {
        record.frame >= self.start
    }
}
