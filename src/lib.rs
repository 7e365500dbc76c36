use chrono::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
pub mod config;
pub mod error;
pub mod plot;
pub mod render;

pub use config::{Marker, PlotConfig};
pub use error::{Error, Result};

pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Lines of metadata at the top of the utility export.
pub const HEADER_LINES: usize = 3;
/// Minimum number of comma-separated fields of a data line.
pub const MIN_FIELDS: usize = 6;

pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub const TIME_FORMAT: &str = "%I:%M %p";
pub const TIME_OUT_FORMAT: &str = "%-I:%M %p";
pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset from the interval start to its midpoint, in minutes.
pub const MIDPOINT_MINUTES: i64 = 30;

/// kWh per year produced by the solar installation.
pub const DEFAULT_ANNUAL_PRODUCTION: f64 = 14800.;
pub const SUN_HOURS_PER_DAY: f64 = 12.;
/// Hourly consumption above which production does not offset usage, kWh.
/// Measured independently, it is not `avg_production(DEFAULT_ANNUAL_PRODUCTION)`.
pub const NET_ZERO_THRESHOLD: f64 = 8.17;

/// The raw rows of the export, as parallel columns of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub date: Vec<String>,
    pub t_start: Vec<String>,
    pub t_end: Vec<String>,
    pub consumption: Vec<String>,
}

impl Readings {
    pub fn new(capacity: usize) -> Readings {
        Readings {
            date: Vec::with_capacity(capacity),
            t_start: Vec::with_capacity(capacity),
            t_end: Vec::with_capacity(capacity),
            consumption: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }
}

/// Reads the export at `fin`, see `read_data_from`.
pub fn read_data<P: AsRef<Path>>(fin: P) -> Result<Readings> {
    let path = fin.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let readings = read_data_from(BufReader::new(file), path)?;
    info!("read {} rows from {}", readings.len(), path.display());
    Ok(readings)
}

/// Skips the header lines and takes date, interval start, interval end and
/// consumption at the 6th, 5th, 4th and 3rd field counted from the end of each line.
/// Fields are kept verbatim. `path` is only used for error reporting.
pub fn read_data_from<R: BufRead>(buf: R, path: &Path) -> Result<Readings> {
    let mut readings = Readings::new(4096);
    for (i, l) in buf.lines().enumerate().skip(HEADER_LINES) {
        let line = l.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fields: Vec<&str> = line.split(',').collect();
        let n = fields.len();
        if n < MIN_FIELDS {
            return Err(Error::MalformedRow {
                line: i + 1,
                fields: n,
            });
        }
        readings.date.push(fields[n - 6].to_string());
        readings.t_start.push(fields[n - 5].to_string());
        readings.t_end.push(fields[n - 4].to_string());
        readings.consumption.push(fields[n - 3].to_string());
    }
    Ok(readings)
}

/// The interval start moved to the middle of the hour, as `H:MM AM/PM`.
pub fn shift_to_midpoint(t_start: &str) -> Result<String> {
    let t = parse_time(t_start)?;
    let (shifted, _) = t.overflowing_add_signed(chrono::Duration::minutes(MIDPOINT_MINUTES));
    Ok(shifted.format(TIME_OUT_FORMAT).to_string())
}

/// Midpoint of the interval starting at `t_start` on `one_date`.
pub fn convert_one_date_time(one_date: &str, t_start: &str) -> Result<NaiveDateTime> {
    let d = NaiveDate::parse_from_str(one_date.trim(), DATE_FORMAT).map_err(|source| {
        Error::DateTime {
            input: one_date.to_string(),
            source,
        }
    })?;
    let t = parse_time(t_start)?;
    Ok(d.and_time(t) + chrono::Duration::minutes(MIDPOINT_MINUTES))
}

fn parse_time(t: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(t.trim(), TIME_FORMAT).map_err(|source| Error::DateTime {
        input: t.to_string(),
        source,
    })
}

/// Element-wise `convert_one_date_time`, keeps the input order.
pub fn convert_dates<S: AsRef<str>>(date: &[S], t_start: &[S]) -> Result<Vec<NaiveDateTime>> {
    if date.len() != t_start.len() {
        return Err(Error::LengthMismatch {
            left: date.len(),
            right: t_start.len(),
        });
    }
    date.iter()
        .zip(t_start.iter())
        .map(|(d, t)| convert_one_date_time(d.as_ref(), t.as_ref()))
        .collect()
}

/// Average hourly production (kWh) of an installation producing
/// `annual_production` kWh per year, assuming 12 hours of sun per day.
pub fn avg_production(annual_production: f64) -> f64 {
    let daily_production = annual_production / 365.0;
    daily_production / SUN_HOURS_PER_DAY
}

/// Normalized hourly consumption time series.
#[derive(Debug, Clone)]
pub struct TimeConsumption {
    pub time: Vec<NaiveDateTime>,
    pub consumption: Vec<f64>,
}

impl TimeConsumption {
    pub fn new(capacity: usize) -> TimeConsumption {
        TimeConsumption {
            time: Vec::with_capacity(capacity),
            consumption: Vec::with_capacity(capacity),
        }
    }

    /// Centers the readings on their hour and parses the consumption values.
    /// Fails on the first value that does not parse.
    pub fn from_readings(readings: &Readings) -> Result<TimeConsumption> {
        let time = convert_dates(&readings.date, &readings.t_start)?;
        let consumption = readings
            .consumption
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.trim().parse::<f64>().map_err(|source| Error::Consumption {
                    row: i + HEADER_LINES + 1,
                    value: c.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        debug!("normalized {} samples", time.len());
        Ok(TimeConsumption { time, consumption })
    }

    /// Reads and normalizes the export at `fin`.
    pub fn from_csv(fin: PathBuf) -> Result<TimeConsumption> {
        let readings = read_data(&fin)?;
        TimeConsumption::from_readings(&readings)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// running sum of the consumption, in input order
    pub fn cumulative(&self) -> Vec<f64> {
        self.consumption
            .iter()
            .scan(0., |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.consumption.iter().sum()
    }

    /// number of samples strictly above `threshold`
    pub fn hours_above(&self, threshold: f64) -> usize {
        self.consumption.iter().filter(|&&c| c > threshold).count()
    }

    /// writes datetime, consumption and cumulative consumption as a csv at the given path
    pub fn to_csv(&self, fout: &Path) -> Result<()> {
        let io_err = |source| Error::Io {
            path: fout.to_path_buf(),
            source,
        };
        let file = File::create(fout).map_err(io_err)?;
        let mut buf = BufWriter::new(file);
        buf.write_all(b"datetime,consumption_kwh,cumulative_kwh\n")
            .map_err(io_err)?;
        for ((t, c), s) in self
            .time
            .iter()
            .zip(self.consumption.iter())
            .zip(self.cumulative())
        {
            writeln!(buf, "{},{},{}", t.format(DT_FORMAT), c, s).map_err(io_err)?;
        }
        buf.flush().map_err(io_err)?;
        info!("wrote {} samples to {}", self.len(), fout.display());
        Ok(())
    }
}

impl std::fmt::Display for TimeConsumption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "datetime,consumption_kwh")?;
        for (t, c) in self.time.iter().zip(self.consumption.iter()) {
            writeln!(f, "{},{}", t.format(DT_FORMAT), c)?
        }
        Ok(())
    }
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Result<(T, T)> {
    let mut s_iter = s.iter();
    let (mut min, mut max) = match s_iter.next() {
        Some(v) => (*v, *v),
        None => return Err(Error::Empty),
    };
    for es in s_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Name,ACME Utility\nAccount,1234\nTYPE,DATE,START TIME,END TIME,USAGE,UNITS,NOTES\n";

    fn read_str(s: &str) -> Result<Readings> {
        read_data_from(Cursor::new(s), Path::new("inline.csv"))
    }

    #[test]
    fn fields_counted_from_the_end() {
        let csv = format!(
            "{}Electric usage,07/21/2024,1:00 AM,1:59 AM,1.25,kWh,\nextra,Electric usage,07/21/2024,2:00 AM,2:59 AM,0.80,kWh,\n",
            HEADER
        );
        let r = read_str(&csv).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.date, vec!["07/21/2024", "07/21/2024"]);
        assert_eq!(r.t_start, vec!["1:00 AM", "2:00 AM"]);
        assert_eq!(r.t_end, vec!["1:59 AM", "2:59 AM"]);
        assert_eq!(r.consumption, vec!["1.25", "0.80"]);
    }

    #[test]
    fn header_only_gives_empty_readings() {
        assert!(read_str(HEADER).unwrap().is_empty());
        assert!(read_str("").unwrap().is_empty());
    }

    #[test]
    fn short_row_is_malformed() {
        let csv = format!("{}07/21/2024,1:00 AM,1:59 AM,1.25,kWh\n", HEADER);
        match read_str(&csv) {
            Err(Error::MalformedRow { line, fields }) => {
                assert_eq!(line, 4);
                assert_eq!(fields, 5);
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn header_lines_are_not_validated() {
        let csv = "a\nb\nc\nx,07/21/2024,1:00 AM,1:59 AM,1.25,kWh,\n";
        assert_eq!(read_str(csv).unwrap().len(), 1);
    }

    #[test]
    fn midpoint_of_first_hour() {
        assert_eq!(
            convert_one_date_time("07/21/2024", "1:00 AM").unwrap(),
            NaiveDate::from_ymd(2024, 7, 21).and_hms(1, 30, 0)
        );
    }

    #[test]
    fn midpoint_afternoon() {
        assert_eq!(shift_to_midpoint("2:00 PM").unwrap(), "2:30 PM");
        assert_eq!(
            convert_one_date_time("07/21/2024", "2:00 PM").unwrap(),
            NaiveDate::from_ymd(2024, 7, 21).and_hms(14, 30, 0)
        );
    }

    #[test]
    fn midpoint_two_digit_hour() {
        assert_eq!(shift_to_midpoint("10:00 AM").unwrap(), "10:30 AM");
        assert_eq!(shift_to_midpoint("12:00 AM").unwrap(), "12:30 AM");
    }

    #[test]
    fn midpoint_is_time_arithmetic() {
        // not on the hour, so a text substitution would leave it untouched
        assert_eq!(shift_to_midpoint("1:15 AM").unwrap(), "1:45 AM");
        assert_eq!(
            convert_one_date_time("12/31/2024", "11:45 PM").unwrap(),
            NaiveDate::from_ymd(2025, 1, 1).and_hms(0, 15, 0)
        );
    }

    #[test]
    fn invalid_time_is_reported() {
        match convert_one_date_time("07/21/2024", "25:00 XM") {
            Err(Error::DateTime { input, .. }) => assert_eq!(input, "25:00 XM"),
            other => panic!("expected date/time error, got {:?}", other),
        }
        assert!(convert_one_date_time("2024-07-21", "1:00 AM").is_err());
    }

    #[test]
    fn batch_keeps_order() {
        let dates = ["07/22/2024", "07/21/2024", "07/21/2024"];
        let starts = ["3:00 PM", "1:00 AM", "12:00 PM"];
        let t = convert_dates(&dates, &starts).unwrap();
        assert_eq!(
            t,
            vec![
                NaiveDate::from_ymd(2024, 7, 22).and_hms(15, 30, 0),
                NaiveDate::from_ymd(2024, 7, 21).and_hms(1, 30, 0),
                NaiveDate::from_ymd(2024, 7, 21).and_hms(12, 30, 0),
            ]
        );
    }

    #[test]
    fn batch_rejects_unequal_lengths() {
        let dates = ["07/21/2024", "07/21/2024"];
        let starts = ["1:00 AM"];
        assert!(matches!(
            convert_dates(&dates, &starts),
            Err(Error::LengthMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn avg_production_default() {
        assert_eq!(
            avg_production(DEFAULT_ANNUAL_PRODUCTION),
            14800. / 365.0 / 12.0
        );
        assert!((avg_production(DEFAULT_ANNUAL_PRODUCTION) - 3.378).abs() < 1e-3);
    }

    #[test]
    fn cumulative_and_summary() {
        let csv = format!(
            "{}u,07/21/2024,1:00 AM,1:59 AM,1.5,kWh,\nu,07/21/2024,2:00 AM,2:59 AM, 9.0 ,kWh,\nu,07/21/2024,3:00 AM,3:59 AM,0.5,kWh,\n",
            HEADER
        );
        let tc = TimeConsumption::from_readings(&read_str(&csv).unwrap()).unwrap();
        assert_eq!(tc.consumption, vec![1.5, 9.0, 0.5]);
        assert_eq!(tc.cumulative(), vec![1.5, 10.5, 11.0]);
        assert_eq!(tc.total(), 11.0);
        assert_eq!(tc.hours_above(NET_ZERO_THRESHOLD), 1);
        assert_eq!(tc.time[2], NaiveDate::from_ymd(2024, 7, 21).and_hms(3, 30, 0));
    }

    #[test]
    fn bad_consumption_reports_row() {
        let csv = format!("{}u,07/21/2024,1:00 AM,1:59 AM,n/a,kWh,\n", HEADER);
        match TimeConsumption::from_readings(&read_str(&csv).unwrap()) {
            Err(Error::Consumption { row, value, .. }) => {
                assert_eq!(row, 4);
                assert_eq!(value, "n/a");
            }
            other => panic!("expected consumption error, got {:?}", other),
        }
    }

    #[test]
    fn display_lists_samples() {
        let tc = TimeConsumption {
            time: vec![NaiveDate::from_ymd(2024, 7, 21).and_hms(1, 30, 0)],
            consumption: vec![0.25],
        };
        assert_eq!(
            tc.to_string(),
            "datetime,consumption_kwh\n2024-07-21 01:30:00,0.25\n"
        );
    }

    #[test]
    fn min_and_max_of_slice() {
        assert_eq!(min_and_max(&[3., -1., 7.5, 2.]).unwrap(), (-1., 7.5));
        assert!(matches!(min_and_max::<f64>(&[]), Err(Error::Empty)));
    }
}
