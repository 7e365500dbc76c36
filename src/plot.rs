use super::config::{Marker, PlotConfig, DEFAULT_CSVIN, DEFAULT_OUTPUT};
use super::{avg_production, Error, Result, VERSION};
use chrono::Weekday;
use clap::{App, Arg, ArgMatches};
use std::path::PathBuf;

/// Colors cycled through for markers given on the command line.
const MARKER_COLORS: [(u8, u8, u8); 4] = [(0, 0, 255), (128, 0, 128), (0, 128, 0), (255, 140, 0)];

fn cli_app<'a, 'b>() -> App<'a, 'b> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("hourly interval export of the utility")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .default_value(DEFAULT_CSVIN);
    let arg_output = Arg::with_name("output_file")
        .help("output chart file, png if the extension is .png, svg otherwise")
        .short("o")
        .long("output")
        .takes_value(true)
        .default_value(DEFAULT_OUTPUT);
    let arg_csvout = Arg::with_name("output_csvfile")
        .help("write the normalized samples and their cumulative sum to this csv file")
        .long("csvout")
        .takes_value(true);
    let arg_threshold = Arg::with_name("threshold")
        .help("net-zero production threshold, kWh per hour")
        .long("threshold")
        .takes_value(true)
        .default_value("8.17");
    let arg_annual = Arg::with_name("annual_production")
        .help("annual solar production, kWh per year")
        .long("annual_production")
        .takes_value(true)
        .default_value("14800");
    let arg_estimate = Arg::with_name("estimate_threshold")
        .help("use the hourly average of the annual production as threshold, overrides --threshold")
        .long("estimate_threshold")
        .takes_value(false);
    let arg_marker = Arg::with_name("marker")
        .help("date (MM/DD/YYYY) of a vertical marker, replaces the default markers")
        .long("marker")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1);
    let arg_weekday = Arg::with_name("tick_weekday")
        .help("weekday of the labelled ticks")
        .long("tick_weekday")
        .takes_value(true)
        .possible_values(&["mon", "tue", "wed", "thu", "fri", "sat", "sun"])
        .default_value("mon");
    let arg_verbose = Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("consumption_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the hourly consumption against the solar production")
        .arg(arg_csvin)
        .arg(arg_output)
        .arg(arg_csvout)
        .arg(arg_threshold)
        .arg(arg_annual)
        .arg(arg_estimate)
        .arg(arg_marker)
        .arg(arg_weekday)
        .arg(arg_verbose)
}

/// Takes the CLI arguments that control the plotting, returns the config and the verbose flag.
pub fn parse_cli() -> (PlotConfig, bool) {
    let matches = cli_app().get_matches();
    match config_from_matches(&matches) {
        Ok(c) => (c, matches.is_present("verbose")),
        Err(e) => clap::Error::with_description(&e.to_string(), clap::ErrorKind::InvalidValue).exit(),
    }
}

fn parse_f64(matches: &ArgMatches, name: &str) -> Result<f64> {
    let v = matches.value_of(name).unwrap_or_default();
    v.parse::<f64>()
        .map_err(|e| Error::Config(format!("invalid value '{}' for --{}: {}", v, name, e)))
}

fn weekday(s: &str) -> Result<Weekday> {
    s.parse::<Weekday>()
        .map_err(|_| Error::Config(format!("invalid value '{}' for --tick_weekday", s)))
}

/// Builds the config from parsed arguments, defaults come from `PlotConfig::default`.
pub fn config_from_matches(matches: &ArgMatches) -> Result<PlotConfig> {
    let mut config = PlotConfig::default();
    config.csvin = PathBuf::from(matches.value_of("input_csvfile").unwrap_or(DEFAULT_CSVIN));
    config.output = PathBuf::from(matches.value_of("output_file").unwrap_or(DEFAULT_OUTPUT));
    config.csvout = matches.value_of("output_csvfile").map(PathBuf::from);
    config.annual_production = parse_f64(matches, "annual_production")?;
    config.threshold = if matches.is_present("estimate_threshold") {
        avg_production(config.annual_production)
    } else {
        parse_f64(matches, "threshold")?
    };
    config.tick_weekday = weekday(matches.value_of("tick_weekday").unwrap_or("mon"))?;
    if let Some(dates) = matches.values_of("marker") {
        config.markers = dates
            .enumerate()
            .map(|(i, d)| Marker::on_date(d, MARKER_COLORS[i % MARKER_COLORS.len()]))
            .collect::<Result<Vec<Marker>>>()?;
    }
    config.annotation = PlotConfig::default_annotation(config.threshold, config.annual_production);
    Ok(config)
}
