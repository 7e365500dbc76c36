use crate::{min_and_max, Error, PlotConfig, Result, TimeConsumption};
use chrono::prelude::*;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::path::Path;
use tracing::{debug, info, warn};

const HOURLY_COLOR: RGBColor = RGBColor(31, 119, 180);
const CUMULATIVE_COLOR: RGBColor = RGBColor(255, 127, 14);
const THRESHOLD_COLOR: RGBColor = RGBColor(220, 20, 20);

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

fn to_utc(t: &NaiveDateTime) -> DateTime<Utc> {
    TimeZone::from_utc_datetime(&Utc, t)
}

/// Midnights from `from` (included if it is a midnight) up to `to`, every `step_days`,
/// starting on the first day that is a `weekday` when one is given.
fn midnight_ticks(
    from: NaiveDateTime,
    to: NaiveDateTime,
    weekday: Option<Weekday>,
    step_days: i64,
) -> Vec<NaiveDateTime> {
    let mut day = from.date();
    if from.time() != NaiveTime::from_hms(0, 0, 0) {
        day = day + chrono::Duration::days(1);
    }
    if let Some(w) = weekday {
        let ahead = (7 + w.num_days_from_monday() as i64
            - day.weekday().num_days_from_monday() as i64)
            % 7;
        day = day + chrono::Duration::days(ahead);
    }
    let mut ticks = Vec::new();
    let mut t = day.and_hms(0, 0, 0);
    while t <= to {
        ticks.push(t);
        t += chrono::Duration::days(step_days);
    }
    ticks
}

/// major ticks: every `weekday` at midnight within the range
pub fn weekly_ticks(from: NaiveDateTime, to: NaiveDateTime, weekday: Weekday) -> Vec<NaiveDateTime> {
    midnight_ticks(from, to, Some(weekday), 7)
}

/// minor ticks: every midnight within the range
pub fn daily_ticks(from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
    midnight_ticks(from, to, None, 1)
}

impl TimeConsumption {
    /// Plots hourly consumption (line and points) and cumulative consumption
    /// (secondary axis) to `fout`, as png if the extension says so, svg otherwise.
    pub fn plot_datetime(&self, config: &PlotConfig, fout: &Path) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Empty);
        }
        let is_png = fout
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("png"));
        if is_png {
            let root = BitMapBackend::new(fout, config.size).into_drawing_area();
            self.draw(root, config)?;
        } else {
            let root = SVGBackend::new(fout, config.size).into_drawing_area();
            self.draw(root, config)?;
        }
        info!("plotted {} samples to {}", self.len(), fout.display());
        Ok(())
    }

    fn draw<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>, config: &PlotConfig) -> Result<()> {
        let cumulative = self.cumulative();

        // markers outside the data still get drawn
        let mut xs = self.time.clone();
        xs.extend(config.markers.iter().map(|m| m.at));
        let (xmindt, xmaxdt) = min_and_max(&xs[..])?;
        let xspan = xmaxdt - xmindt;
        let xmargin = if xspan > chrono::Duration::zero() {
            xspan / 50
        } else {
            chrono::Duration::hours(1)
        };
        let xmindt = xmindt - xmargin;
        let xmaxdt = xmaxdt + xmargin;

        let (_, ymax) = min_and_max(&self.consumption[..])?;
        let ymax = ymax.max(config.threshold).max(1.) * 1.1;
        let cmax = cumulative.last().copied().unwrap_or(0.).max(1.) * 1.05;
        if self.consumption.iter().any(|c| *c < 0.) {
            warn!("negative consumption values found, they are clipped by the axis");
        }

        let weekly: Vec<DateTime<Utc>> = weekly_ticks(xmindt, xmaxdt, config.tick_weekday)
            .iter()
            .map(to_utc)
            .collect();
        let daily: Vec<DateTime<Utc>> = daily_ticks(xmindt, xmaxdt).iter().map(to_utc).collect();
        debug!("{} weekly and {} daily ticks", weekly.len(), daily.len());
        let xminutc = to_utc(&xmindt);
        let xmaxutc = to_utc(&xmaxdt);

        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(120)
            .y_label_area_size(90)
            .right_y_label_area_size(110)
            .build_cartesian_2d(
                (xminutc..xmaxutc)
                    .with_key_points(weekly)
                    .with_light_points(daily),
                0f64..ymax,
            )
            .map_err(render_err)?
            .set_secondary_coord(xminutc..xmaxutc, 0f64..cmax);

        chart
            .configure_mesh()
            .bold_line_style(RGBColor(150, 150, 150).stroke_width(1))
            .light_line_style(RGBColor(230, 230, 230).stroke_width(1))
            .set_all_tick_mark_size(4)
            .label_style(("sans-serif", 20))
            .x_label_style(
                ("sans-serif", 18)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_label_formatter(&|x: &DateTime<Utc>| x.format("%Y-%m-%d").to_string())
            .y_label_formatter(&|y: &f64| format!("{:.1}", y))
            .x_desc("Date")
            .y_desc("Hourly Consumption [kWh]")
            .draw()
            .map_err(render_err)?;

        chart
            .configure_secondary_axes()
            .label_style(("sans-serif", 20))
            .y_label_formatter(&|y: &f64| format!("{:.0}", y))
            .y_desc("Cumulative Consumption [kWh]")
            .draw()
            .map_err(render_err)?;

        // reference line below the data
        let threshold = config.threshold;
        chart
            .draw_series(LineSeries::new(
                vec![(xminutc, threshold), (xmaxutc, threshold)],
                THRESHOLD_COLOR.stroke_width(3),
            ))
            .map_err(render_err)?
            .label(format!("net-zero production ({:.2} kWh)", threshold))
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], THRESHOLD_COLOR.stroke_width(3))
            });

        for marker in config.markers.iter() {
            let at = to_utc(&marker.at);
            let (r, g, b) = marker.color;
            let color = RGBColor(r, g, b);
            chart
                .draw_series(DashedLineSeries::new(
                    vec![(at, 0.), (at, ymax)],
                    10,
                    6,
                    color.stroke_width(2),
                ))
                .map_err(render_err)?
                .label(marker.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        let points: Vec<(DateTime<Utc>, f64)> = self
            .time
            .iter()
            .map(to_utc)
            .zip(self.consumption.iter().copied())
            .collect();
        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                HOURLY_COLOR.stroke_width(1),
            ))
            .map_err(render_err)?
            .label("hourly consumption")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], HOURLY_COLOR));
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, HOURLY_COLOR.filled())),
            )
            .map_err(render_err)?;

        chart
            .draw_secondary_series(LineSeries::new(
                self.time.iter().map(to_utc).zip(cumulative.iter().copied()),
                CUMULATIVE_COLOR.stroke_width(4),
            ))
            .map_err(render_err)?
            .label("cumulative consumption")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], CUMULATIVE_COLOR.stroke_width(4))
            });

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", 18))
            .draw()
            .map_err(render_err)?;

        draw_annotation(&root, &config.annotation)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

/// Framed text box in the upper part of the drawing area, one line per entry.
fn draw_annotation<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let line_height = 24;
    let (width, _) = root.dim_in_pixel();
    let w = 560;
    let h = line_height * lines.len() as i32 + 16;
    let x0 = (width as i32 - w) / 2;
    let y0 = 40;
    root.draw(&Rectangle::new(
        [(x0, y0), (x0 + w, y0 + h)],
        WHITE.mix(0.9).filled(),
    ))
    .map_err(render_err)?;
    root.draw(&Rectangle::new(
        [(x0, y0), (x0 + w, y0 + h)],
        BLACK.stroke_width(1),
    ))
    .map_err(render_err)?;
    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.as_str(),
            (x0 + 10, y0 + 8 + line_height * i as i32),
            ("sans-serif", 18),
        ))
        .map_err(render_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(y, m, d).and_hms(h, min, 0)
    }

    #[test]
    fn weekly_ticks_on_mondays() {
        // 2024-07-21 is a Sunday
        let ticks = weekly_ticks(dt(2024, 7, 21, 1, 30), dt(2024, 8, 10, 1, 30), Weekday::Mon);
        assert_eq!(
            ticks,
            vec![
                dt(2024, 7, 22, 0, 0),
                dt(2024, 7, 29, 0, 0),
                dt(2024, 8, 5, 0, 0)
            ]
        );
        assert!(ticks.iter().all(|t| t.weekday() == Weekday::Mon));
    }

    #[test]
    fn weekly_ticks_include_start_midnight() {
        let ticks = weekly_ticks(dt(2024, 7, 22, 0, 0), dt(2024, 7, 29, 0, 0), Weekday::Mon);
        assert_eq!(ticks, vec![dt(2024, 7, 22, 0, 0), dt(2024, 7, 29, 0, 0)]);
    }

    #[test]
    fn daily_ticks_every_midnight() {
        let ticks = daily_ticks(dt(2024, 7, 21, 1, 30), dt(2024, 7, 24, 0, 0));
        assert_eq!(
            ticks,
            vec![
                dt(2024, 7, 22, 0, 0),
                dt(2024, 7, 23, 0, 0),
                dt(2024, 7, 24, 0, 0)
            ]
        );
        assert!(daily_ticks(dt(2024, 7, 21, 1, 30), dt(2024, 7, 21, 23, 30)).is_empty());
    }

    #[test]
    fn empty_series_is_not_plotted() {
        let tc = TimeConsumption::new(0);
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("empty.svg");
        assert!(matches!(
            tc.plot_datetime(&PlotConfig::default(), &fout),
            Err(Error::Empty)
        ));
        assert!(!fout.exists());
    }
}
