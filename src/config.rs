use crate::{convert_one_date_time, Result, DEFAULT_ANNUAL_PRODUCTION, NET_ZERO_THRESHOLD};
use chrono::{NaiveDateTime, Weekday};
use std::path::PathBuf;

pub const DEFAULT_CSVIN: &str = "./HourlyIntervalData-20240621_20241111.csv";
pub const DEFAULT_OUTPUT: &str = "consumption.svg";

/// Dates of the vertical markers drawn by default, with their colors.
pub const DEFAULT_MARKER_DATES: [(&str, (u8, u8, u8)); 2] =
    [("07/21/2024", (0, 0, 255)), ("08/10/2024", (128, 0, 128))];

/// Interval start used to place a marker given only its date.
pub const MARKER_TIME: &str = "1:00 AM";

/// A vertical line on the chart at a given (normalized) instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub label: String,
    pub at: NaiveDateTime,
    pub color: (u8, u8, u8),
}

impl Marker {
    /// Marker at the midpoint of the first interval (1:00 AM) of the given `MM/DD/YYYY` date.
    pub fn on_date(date: &str, color: (u8, u8, u8)) -> Result<Marker> {
        let at = convert_one_date_time(date, MARKER_TIME)?;
        Ok(Marker {
            label: date.trim().to_string(),
            at,
            color,
        })
    }
}

/// Everything the plotting run needs, with the values of the utility export
/// workflow as defaults.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub csvin: PathBuf,
    pub output: PathBuf,
    /// optional export of the normalized samples
    pub csvout: Option<PathBuf>,
    /// horizontal reference line, kWh per hour
    pub threshold: f64,
    /// kWh per year, used for the production estimate
    pub annual_production: f64,
    pub markers: Vec<Marker>,
    /// weekday of the labelled (major) x ticks
    pub tick_weekday: Weekday,
    pub annotation: Vec<String>,
    pub size: (u32, u32),
}

impl PlotConfig {
    /// One marker per `(MM/DD/YYYY, color)`, failing on the first date that does not parse.
    pub fn markers_on_dates(dates: &[(&str, (u8, u8, u8))]) -> Result<Vec<Marker>> {
        dates
            .iter()
            .map(|&(date, color)| Marker::on_date(date, color))
            .collect()
    }

    /// Default markers, built from `DEFAULT_MARKER_DATES`.
    pub fn default_markers() -> Result<Vec<Marker>> {
        PlotConfig::markers_on_dates(&DEFAULT_MARKER_DATES)
    }

    pub fn default_annotation(threshold: f64, annual_production: f64) -> Vec<String> {
        vec![
            format!("net-zero threshold: {:.2} kWh", threshold),
            format!(
                "avg. production estimate: {:.2} kWh ({:.0} kWh/yr, 12 h of sun)",
                crate::avg_production(annual_production),
                annual_production
            ),
            String::from("points centered at the middle of each hour"),
        ]
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            csvin: PathBuf::from(DEFAULT_CSVIN),
            output: PathBuf::from(DEFAULT_OUTPUT),
            csvout: None,
            threshold: NET_ZERO_THRESHOLD,
            annual_production: DEFAULT_ANNUAL_PRODUCTION,
            // DEFAULT_MARKER_DATES are fixed valid dates
            markers: PlotConfig::default_markers().expect("invalid default marker date"),
            tick_weekday: Weekday::Mon,
            annotation: PlotConfig::default_annotation(
                NET_ZERO_THRESHOLD,
                DEFAULT_ANNUAL_PRODUCTION,
            ),
            size: (1600, 800),
        }
    }
}
