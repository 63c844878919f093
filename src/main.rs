use clap::{Parser, Subcommand, ValueEnum};
use crack_locator::algorithms::coordinates::project_sensors;
use crack_locator::api::formatting::formatter_for;
use crack_locator::api::input::{parse_observations, parse_speed, parse_time, split_time_assignment};
use crack_locator::core::SPEED_OF_SOUND_AIR;
use crack_locator::utils::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use crack_locator::{
    format_dms_pair, AccuracyValidator, LocateOptions, LocationEstimate, Locator, LocatorConfig,
    LocatorError, MapRenderer, Objective, Observation, OsmMapLink, OutputFormat, PlanarPosition,
    PlotRenderer, Result, SensorSet, SvgScatterPlot,
};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "crack-locator")]
#[command(about = "Locate a structural crack from sensor arrival-time differences")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn, help = "Log level (RUST_LOG overrides)")]
    log_level: LogLevel,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured sensors
    Sensors {
        #[arg(short, long, help = "Sensor configuration file (JSON)")]
        config: Option<PathBuf>,
    },

    /// Estimate the crack position from arrival times
    Locate {
        #[arg(short, long, help = "Sensor configuration file (JSON)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Propagation speed in m/s")]
        speed: Option<String>,

        #[arg(short = 't', long = "time", value_name = "ID=SECONDS", help = "Arrival-time offset for one sensor")]
        times: Vec<String>,

        #[arg(short, long, help = "Prompt for speed and times on the console")]
        interactive: bool,

        #[arg(long, value_enum, help = "Override the configured objective")]
        objective: Option<ObjectiveArg>,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        #[arg(long, help = "Include the DMS rendering of the estimate")]
        dms: bool,

        #[arg(long, value_name = "FILE.svg", help = "Write a scatter plot of sensors and crack")]
        plot: Option<PathBuf>,

        #[arg(long, help = "Print an OpenStreetMap link to the estimate")]
        map: bool,
    },

    /// Monte Carlo accuracy check for a synthetic crack position
    Simulate {
        #[arg(short, long, help = "Sensor configuration file (JSON)")]
        config: Option<PathBuf>,

        #[arg(long, allow_hyphen_values = true, help = "Crack x in meters east of the reference sensor")]
        x: f64,

        #[arg(long, allow_hyphen_values = true, help = "Crack y in meters north of the reference sensor")]
        y: f64,

        #[arg(short, long, default_value_t = SPEED_OF_SOUND_AIR, help = "Propagation speed in m/s")]
        speed: f64,

        #[arg(short, long, default_value_t = 1e-4, help = "Timing noise standard deviation in seconds")]
        noise: f64,

        #[arg(long, default_value_t = 100)]
        trials: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
    },

    /// Write the built-in sensor configuration to a file
    InitConfig {
        #[arg(help = "Output path")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    Pairwise,
    AbsoluteRange,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Pairwise => Objective::Pairwise,
            ObjectiveArg::AbsoluteRange => Objective::AbsoluteRange,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !init_logging(&LogConfig {
        level: cli.log_level,
        format: cli.log_format,
        ..Default::default()
    }) {
        eprintln!("Warning: logging was already initialized; --log-level and --log-format ignored");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Sensors { config } => list_sensors(config.as_deref()),
        Commands::Locate {
            config,
            speed,
            times,
            interactive,
            objective,
            format,
            dms,
            plot,
            map,
        } => {
            let config = load_config(config.as_deref())?;
            let sensors = config.to_sensor_set()?;

            let (speed, observations) = if interactive {
                prompt_inputs(&sensors, &mut io::stdin().lock(), &mut io::stdout())?
            } else {
                command_line_inputs(&sensors, &config, speed.as_deref(), &times)?
            };

            let mut options = LocateOptions {
                solver: config.solver,
                include_dms: dms,
            };
            if let Some(objective) = objective {
                options.solver.objective = objective.into();
            }

            let estimate = Locator::new(options).locate(&sensors, &observations, speed)?;
            println!("{}", formatter_for(format.into()).format(&estimate)?);

            if let Some(path) = plot {
                write_plot(&sensors, &estimate, &path)?;
            }
            if map {
                println!("Map: {}", OsmMapLink::default().render_map(&estimate.geodetic)?);
            }
            Ok(())
        }
        Commands::Simulate {
            config,
            x,
            y,
            speed,
            noise,
            trials,
            seed,
            format,
        } => {
            let config = load_config(config.as_deref())?;
            let sensors = config.to_sensor_set()?;
            let (_, positions) = project_sensors(&sensors);
            let emitter = PlanarPosition::new(x, y);

            let stats = AccuracyValidator::new(config.solver).simulate(&positions, &emitter, speed, noise, trials, seed)?;
            match OutputFormat::from(format) {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&stats).map_err(|e| LocatorError::Render {
                        reason: format!("JSON serialization failed: {}", e),
                    })?;
                    println!("{}", json);
                }
                OutputFormat::Text => {
                    println!("Accuracy at ({:.1}, {:.1}) m, timing noise {:e} s:", x, y, noise);
                    println!("  Samples:  {} ({} failed)", stats.samples, stats.failures);
                    println!("  Mean:     {:.3} m", stats.mean_error_m);
                    println!("  RMSE:     {:.3} m", stats.rmse_m);
                    println!("  95th pct: {:.3} m", stats.p95_error_m);
                    println!("  Max:      {:.3} m", stats.max_error_m);
                }
            }
            Ok(())
        }
        Commands::InitConfig { path } => {
            LocatorConfig::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LocatorConfig> {
    match path {
        Some(path) => LocatorConfig::load_from_file(path),
        None => {
            info!("No configuration file given, using built-in sensors");
            Ok(LocatorConfig::default())
        }
    }
}

fn list_sensors(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let sensors = config.to_sensor_set()?;
    let (_, positions) = project_sensors(&sensors);

    println!("{:<6} {:>11} {:>11}  {:<28} {:>10} {:>10}", "ID", "Latitude", "Longitude", "DMS", "East (m)", "North (m)");
    for (sensor, position) in sensors.iter().zip(&positions) {
        let (lat, lon) = format_dms_pair(&sensor.position)?;
        println!(
            "{:<6} {:>11.6} {:>11.6}  {:<28} {:>10.1} {:>10.1}",
            sensor.id,
            sensor.position.lat,
            sensor.position.lon,
            format!("{} {}", lat, lon),
            position.x,
            position.y
        );
    }
    Ok(())
}

fn command_line_inputs(
    sensors: &SensorSet,
    config: &LocatorConfig,
    speed: Option<&str>,
    times: &[String],
) -> Result<(f64, Vec<Observation>)> {
    let speed = match (speed, config.propagation_speed) {
        (None, Some(configured)) => configured,
        (raw, _) => parse_speed(raw)?,
    };

    let mut raw_times = HashMap::new();
    for assignment in times {
        let (id, value) = split_time_assignment(assignment)?;
        if raw_times.contains_key(&id) {
            return Err(LocatorError::DuplicateObservation { sensor_id: id });
        }
        raw_times.insert(id, value);
    }

    Ok((speed, parse_observations(sensors, &raw_times)?))
}

/// Read one trimmed line; end of input counts as a blank answer
fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<Option<String>> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask until the answer parses; gives up when input ends
fn ask<R, W, T, F>(input: &mut R, output: &mut W, prompt: &str, parse: F) -> Result<T>
where
    R: BufRead,
    W: Write,
    F: Fn(Option<&str>) -> Result<T>,
{
    loop {
        let answer = read_answer(input, output, prompt)?;
        match parse(answer.as_deref()) {
            Ok(value) => return Ok(value),
            Err(e) if answer.is_none() => return Err(e),
            Err(e) => writeln!(output, "  {} ({})", e.user_message(), e)?,
        }
    }
}

fn prompt_inputs<R: BufRead, W: Write>(
    sensors: &SensorSet,
    input: &mut R,
    output: &mut W,
) -> Result<(f64, Vec<Observation>)> {
    let speed = ask(input, output, "Propagation speed (m/s): ", parse_speed)?;

    let mut observations = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let prompt = format!("Time for sensor {} (s): ", sensor.id);
        observations.push(ask(input, output, &prompt, |raw| parse_time(&sensor.id, raw))?);
    }
    Ok((speed, observations))
}

fn write_plot(sensors: &SensorSet, estimate: &LocationEstimate, path: &Path) -> Result<()> {
    let svg = SvgScatterPlot::default().render_plot(sensors, estimate)?;
    std::fs::write(path, svg)?;
    println!("Plot written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sensors() -> SensorSet {
        LocatorConfig::default().to_sensor_set().unwrap()
    }

    #[test]
    fn test_prompt_reasks_on_invalid_input() {
        let mut input = Cursor::new("fast\n-3\n343\n0\nabc\n0.1\n0.2\n0.3\n0.4\n");
        let mut output = Vec::new();

        let (speed, observations) = prompt_inputs(&sensors(), &mut input, &mut output).unwrap();
        assert_eq!(speed, 343.0);
        assert_eq!(observations.len(), 5);
        assert_eq!(observations[1], Observation::new("D2", 0.1));

        let transcript = String::from_utf8(output).unwrap();
        assert_eq!(transcript.matches("Propagation speed (m/s): ").count(), 3);
        assert_eq!(transcript.matches("Time for sensor D2 (s): ").count(), 2);
    }

    #[test]
    fn test_prompt_gives_up_at_end_of_input() {
        let mut input = Cursor::new("343\n0\n");
        let mut output = Vec::new();
        assert!(matches!(
            prompt_inputs(&sensors(), &mut input, &mut output),
            Err(LocatorError::MissingObservation { .. })
        ));
    }

    #[test]
    fn test_command_line_inputs() {
        let config = LocatorConfig::default();
        let times: Vec<String> = ["D1=0", "D2=0.1", "D3=0.2", "D4=0.3", "D5=0.4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (speed, observations) = command_line_inputs(&sensors(), &config, Some("3500"), &times).unwrap();
        assert_eq!(speed, 3500.0);
        assert_eq!(observations.len(), 5);

        assert!(matches!(
            command_line_inputs(&sensors(), &config, None, &times),
            Err(LocatorError::MissingObservation { .. })
        ));

        let mut configured = config.clone();
        configured.propagation_speed = Some(343.0);
        let (speed, _) = command_line_inputs(&sensors(), &configured, None, &times).unwrap();
        assert_eq!(speed, 343.0);

        let mut duplicated = times.clone();
        duplicated.push("D1=0.5".to_string());
        assert!(matches!(
            command_line_inputs(&sensors(), &config, Some("343"), &duplicated),
            Err(LocatorError::DuplicateObservation { .. })
        ));
    }

    #[test]
    fn test_cli_parses_locate() {
        let cli = Cli::try_parse_from([
            "crack-locator",
            "locate",
            "--speed",
            "343",
            "-t",
            "D1=0",
            "-t",
            "D2=0.1",
            "--objective",
            "absolute-range",
            "--format",
            "json",
            "--map",
        ])
        .unwrap();
        match cli.command {
            Commands::Locate { times, objective, map, .. } => {
                assert_eq!(times.len(), 2);
                assert!(matches!(objective, Some(ObjectiveArg::AbsoluteRange)));
                assert!(map);
            }
            _ => panic!("expected locate"),
        }
    }
}
