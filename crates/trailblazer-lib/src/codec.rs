//! Line-oriented text records for raw points and segments
//!
//! Raw points: `lat,lon,YYYY-MM-DD HH:MM:SS[+offset],track,page`
//! Segments:   `lat1,lon1,lat2,lon2`
//!
//! Timestamps are read as UTC; anything from the first `+` on is ignored.

use crate::{Point, RawPoint, Result, Segment, TrailError};
use std::io::{BufRead, Write};
use time::{PrimitiveDateTime, UtcOffset};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Read raw point records, one per line. Blank lines are skipped.
pub fn read_point_records<R: BufRead>(reader: R) -> Result<Vec<RawPoint>> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_point_record(line, index + 1)?);
    }

    tracing::debug!("Read {} raw point records", records.len());
    Ok(records)
}

/// Write raw point records, one per line
pub fn write_point_records<W: Write>(mut writer: W, records: &[RawPoint]) -> Result<()> {
    for record in records {
        let timestamp = record
            .timestamp
            .to_offset(UtcOffset::UTC)
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(
            writer,
            "{},{},{}+00:00,{},{}",
            record.lat, record.lon, timestamp, record.track, record.page
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Read segments, one per line. Blank lines are skipped.
pub fn read_segments<R: BufRead>(reader: R) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields = split_fields(line, 4, index + 1)?;
        let start = Point::new(
            parse_f64(fields[0], "lat1", index + 1)?,
            parse_f64(fields[1], "lon1", index + 1)?,
        );
        let end = Point::new(
            parse_f64(fields[2], "lat2", index + 1)?,
            parse_f64(fields[3], "lon2", index + 1)?,
        );
        segments.push(Segment::new(start, end));
    }

    tracing::debug!("Read {} segments", segments.len());
    Ok(segments)
}

/// Write segments, one per line
pub fn write_segments<W: Write>(mut writer: W, segments: &[Segment]) -> Result<()> {
    for segment in segments {
        let (start, end) = (segment.start(), segment.end());
        writeln!(writer, "{},{},{},{}", start.lat, start.lon, end.lat, end.lon)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_point_record(line: &str, line_number: usize) -> Result<RawPoint> {
    let fields = split_fields(line, 5, line_number)?;

    let lat = parse_f64(fields[0], "lat", line_number)?;
    let lon = parse_f64(fields[1], "lon", line_number)?;

    let stamp = fields[2].split('+').next().unwrap_or_default().trim();
    let timestamp = PrimitiveDateTime::parse(stamp, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| TrailError::Parse {
            line: line_number,
            reason: format!("invalid timestamp `{}`: {}", fields[2], e),
        })?;

    let track = parse_u32(fields[3], "track", line_number)?;
    let page = parse_u32(fields[4], "page", line_number)?;

    Ok(RawPoint::new(lat, lon, timestamp, track, page))
}

fn split_fields(line: &str, expected: usize, line_number: usize) -> Result<Vec<&str>> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(TrailError::Parse {
            line: line_number,
            reason: format!("expected {} fields, found {}", expected, fields.len()),
        });
    }
    Ok(fields)
}

fn parse_f64(field: &str, name: &str, line_number: usize) -> Result<f64> {
    field.parse().map_err(|_| TrailError::Parse {
        line: line_number,
        reason: format!("invalid {name} `{field}`"),
    })
}

fn parse_u32(field: &str, name: &str, line_number: usize) -> Result<u32> {
    field.parse().map_err(|_| TrailError::Parse {
        line: line_number,
        reason: format!("invalid {name} `{field}`"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_read_point_records() {
        let input = "41.38,2.17,2023-05-01 10:00:00+00:00,0,0\n\
                     \n\
                     41.39,2.18,2023-05-01 10:00:30,1,2\n";
        let records = read_point_records(input.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lat, 41.38);
        assert_eq!(records[0].timestamp, datetime!(2023-05-01 10:00:00 UTC));
        assert_eq!(records[1].track, 1);
        assert_eq!(records[1].page, 2);
        assert_eq!(records[1].timestamp, datetime!(2023-05-01 10:00:30 UTC));
    }

    #[test]
    fn test_point_records_write_then_read() {
        let records = vec![
            RawPoint::new(41.5, 2.25, datetime!(2023-05-01 10:00:00 UTC), 3, 1),
            RawPoint::new(41.6, 2.5, datetime!(2023-05-01 10:05:00 UTC), 3, 1),
        ];

        let mut buffer = Vec::new();
        write_point_records(&mut buffer, &records).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("41.5,2.25,2023-05-01 10:00:00+00:00,3,1\n"));

        let read_back = read_point_records(buffer.as_slice()).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn test_offset_timestamps_written_as_utc() {
        let records = vec![RawPoint::new(
            41.0,
            2.0,
            datetime!(2023-05-01 12:00:00 +02:00),
            0,
            0,
        )];

        let mut buffer = Vec::new();
        write_point_records(&mut buffer, &records).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text.trim_end(), "41,2,2023-05-01 10:00:00+00:00,0,0");

        let read_back = read_point_records(buffer.as_slice()).unwrap();
        assert_eq!(read_back[0].timestamp, records[0].timestamp);
        assert_eq!(read_back[0].timestamp, datetime!(2023-05-01 10:00:00 UTC));
    }

    #[test]
    fn test_malformed_point_record() {
        let input = "41.38,2.17,2023-05-01 10:00:00,0,0\n41.38,2.17,yesterday,0,0\n";
        match read_point_records(input.as_bytes()) {
            Err(TrailError::Parse { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("timestamp"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_field_count() {
        let input = "41.38,2.17,2023-05-01 10:00:00,0\n";
        assert!(matches!(
            read_point_records(input.as_bytes()),
            Err(TrailError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_segments_write_then_read() {
        let segments = vec![
            Segment::new(Point::new(0.0, 0.001), Point::new(0.0, 0.0)),
            Segment::new(Point::new(41.0, 2.0), Point::new(41.001, 2.001)),
        ];

        let mut buffer = Vec::new();
        write_segments(&mut buffer, &segments).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text.lines().next(), Some("0,0,0,0.001"));

        let read_back = read_segments(buffer.as_slice()).unwrap();
        assert_eq!(read_back, segments);
    }

    #[test]
    fn test_malformed_segment() {
        let input = "0,0,0,0.001\n0,0,abc,0.001\n";
        assert!(matches!(
            read_segments(input.as_bytes()),
            Err(TrailError::Parse { line: 2, .. })
        ));
    }
}
