use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::Record;

/// Columns: id, surname, name, address, town, postal code.
pub const MIN_FIELDS: usize = 6;

pub fn record_from_fields(fields: &csv::StringRecord) -> Option<Record> {
    if fields.len() < MIN_FIELDS {
        return None;
    }
    let f = |i: usize| fields.get(i).unwrap_or("");
    Some(Record::new(f(0), f(2), f(1), f(4), f(5)))
}

/// Lazily parses headerless CSV rows into records, one row per `next()`.
///
/// Rows with fewer than [`MIN_FIELDS`] fields are skipped and counted; the
/// count is logged once the input is exhausted.
pub struct RecordReader<R: Read> {
    rows: StringRecordsIntoIter<R>,
    source: String,
    row: usize,
    skipped: usize,
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        let rows = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader).into_records();
        Self { rows, source: source.into(), row: 0, skipped: 0, finished: false }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        loop {
            let row = match self.rows.next() {
                Some(row) => row,
                None => {
                    if !self.finished {
                        self.finished = true;
                        if self.skipped > 0 {
                            log::warn!(
                                "{}: skipped {} rows with fewer than {} fields",
                                self.source, self.skipped, MIN_FIELDS
                            );
                        }
                    }
                    return None;
                }
            };
            self.row += 1;
            match row {
                Ok(fields) => match record_from_fields(&fields) {
                    Some(rec) => return Some(Ok(rec)),
                    None => self.skipped += 1,
                },
                Err(e) => {
                    let err = anyhow::Error::new(e).context(format!("{}: malformed CSV row {}", self.source, self.row));
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Opens `path` for streaming; nothing is read until the reader is iterated.
pub fn open_records(path: impl AsRef<Path>) -> Result<RecordReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(RecordReader::new(file, path.display().to_string()))
}

/// Whole-input convenience for small fixtures.
#[cfg(test)]
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    RecordReader::new(reader, "<memory>").collect()
}

/// Alternates one item from `a` and one from `b` until both are exhausted.
pub struct Interleave<A, B> {
    a: A,
    b: B,
    take_a: bool,
}

impl<A, B> Interleave<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b, take_a: true }
    }
}

impl<T, A: Iterator<Item = T>, B: Iterator<Item = T>> Iterator for Interleave<A, B> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let from_a = self.take_a;
        self.take_a = !self.take_a;
        let item = if from_a { self.a.next() } else { self.b.next() };
        item.or_else(|| if from_a { self.b.next() } else { self.a.next() })
    }
}

pub fn interleave<A: IntoIterator, B: IntoIterator<Item = A::Item>>(a: A, b: B) -> Interleave<A::IntoIter, B::IntoIter> {
    Interleave::new(a.into_iter(), b.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;
    use std::io::{self, Cursor};

    #[test]
    fn parses_rows_and_skips_short_ones() {
        let data = "a12_1,Smith,John,1 Main St,Springfield,1000\nb12_1,Smith,Jon\nb13,Doe,Jane,Elm,Shelbyville,2000,extra\n";
        let recs = read_records(data.as_bytes()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].surname, "Smith");
        assert_eq!(recs[0].name, "John");
        assert_eq!(recs[0].town, "Springfield");
        assert_eq!(recs[0].postal_code, "1000");
        assert_eq!(recs[0].origin, Origin::A);
        assert_eq!(recs[1].origin, Origin::B);
    }

    #[test]
    fn reader_counts_skipped_rows() {
        let data = "x\na1,S,N,A,T,1\ny,z\n";
        let mut reader = RecordReader::new(data.as_bytes(), "mem");
        assert_eq!(reader.next().unwrap().unwrap().id, "a1");
        assert!(reader.next().is_none());
        assert_eq!(reader.skipped(), 2);
        assert!(reader.next().is_none());
    }

    /// Fails if asked for more bytes than the first line.
    struct OneLineThenFail {
        inner: Cursor<Vec<u8>>,
        served: bool,
    }

    impl Read for OneLineThenFail {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::Other, "read past first row"));
            }
            self.served = true;
            self.inner.read(buf)
        }
    }

    #[test]
    fn reader_is_lazy_and_reports_read_errors() {
        let src = OneLineThenFail { inner: Cursor::new(b"a1_1,Lee,Ann,A,T,1\n".to_vec()), served: false };
        let mut reader = RecordReader::new(src, "flaky");
        // the first record is available before the source has been drained
        assert_eq!(reader.next().unwrap().unwrap().surname, "Lee");
        let err = reader.next().unwrap().unwrap_err();
        assert!(format!("{:#}", err).contains("flaky"));
    }

    #[test]
    fn missing_file_named_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_records(dir.path().join("nope.csv")).err().unwrap();
        assert!(format!("{:#}", err).contains("nope.csv"));
    }

    #[test]
    fn interleave_alternates_then_drains() {
        let v: Vec<i32> = interleave(vec![1, 3, 5, 7], vec![2, 4]).collect();
        assert_eq!(v, vec![1, 2, 3, 4, 5, 7]);
        let v: Vec<i32> = interleave(Vec::new(), vec![2, 4]).collect();
        assert_eq!(v, vec![2, 4]);
    }
}
