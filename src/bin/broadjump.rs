//! Broadjump CLI - Command-line interface for Broadjump
//!
//! Commands:
//! - detect: Detect jumps in a recorded frame stream (batch mode)
//! - run: Detect jumps in frames streamed on stdin (streaming mode)
//! - validate: Validate pose frame schema
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{info, warn};

use broadjump::encoder::{events_to_ndjson, write_csv};
use broadjump::logging::init_logging;
use broadjump::schema::{FrameAdapter, PoseFrame, SCHEMA_VERSION};
use broadjump::{
    process_frames, ComputeError, ConfigError, JumpConfig, JumpProcessor, LoggingConfig,
    ReferencePoint, BROADJUMP_VERSION, PRODUCER_NAME,
};

/// Broadjump - Jump detection from pose-landmark streams
#[derive(Parser)]
#[command(name = "broadjump")]
#[command(author = "Broadjump Contributors")]
#[command(version = BROADJUMP_VERSION)]
#[command(about = "Detect jumps in pose-landmark frame streams", long_about = None)]
struct Cli {
    #[command(flatten)]
    detector: DetectorArgs,

    #[command(flatten)]
    logging: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DetectorArgs {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vertical hysteresis threshold in pixels
    #[arg(long, global = true)]
    y_threshold: Option<f64>,

    /// Number of samples averaged by the smoother
    #[arg(long, global = true)]
    smooth_window: Option<usize>,

    /// Landmarks defining the reference point
    #[arg(long, global = true)]
    reference: Option<ReferenceArg>,

    /// Landmarks below this visibility are treated as absent
    #[arg(long, global = true)]
    min_visibility: Option<f32>,

    /// Frame rate for frames that carry an index but no timestamp
    #[arg(long, global = true)]
    fps: Option<f64>,
}

#[derive(Args)]
struct LogArgs {
    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect jumps in a recorded frame stream (batch mode)
    Detect {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,
    },

    /// Detect jumps in frames streamed on stdin (streaming mode)
    Run {
        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: StreamFormat,

        /// Write the results CSV here at end of stream
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the session report here at end of stream
        #[arg(long)]
        report: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long)]
        flush: bool,
    },

    /// Validate pose frame schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Results CSV (nothing is written when no jump was found)
    Csv,
    /// Newline-delimited JSON (one jump per line)
    Ndjson,
    /// JSON array of jumps
    Json,
    /// Pretty-printed JSON array of jumps
    JsonPretty,
    /// Session report with summary and jumps
    Report,
}

#[derive(Clone, ValueEnum)]
enum StreamFormat {
    /// One line per completed jump
    Ndjson,
    /// One line per processed frame
    Ticks,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReferenceArg {
    Ankles,
    Heels,
    FootIndex,
    AnklesAndFeet,
}

impl From<ReferenceArg> for ReferencePoint {
    fn from(arg: ReferenceArg) -> Self {
        match arg {
            ReferenceArg::Ankles => ReferencePoint::Ankles,
            ReferenceArg::Heels => ReferencePoint::Heels,
            ReferenceArg::FootIndex => ReferencePoint::FootIndex,
            ReferenceArg::AnklesAndFeet => ReferencePoint::AnklesAndFeet,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (pose.frame.v1)
    Input,
    /// Output schema (jump events and session report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        level: cli.logging.log_level.clone(),
        json: cli.logging.log_json,
    });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BroadjumpCliError> {
    match cli.command {
        Commands::Detect {
            input,
            output,
            input_format,
            output_format,
        } => {
            let config = build_config(&cli.detector)?;
            cmd_detect(&input, &output, input_format, output_format, config)
        }

        Commands::Run {
            output_format,
            csv,
            report,
            flush,
        } => {
            let config = build_config(&cli.detector)?;
            cmd_run(output_format, csv.as_deref(), report.as_deref(), flush, config)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(&cli.detector, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &DetectorArgs) -> Result<JumpConfig, BroadjumpCliError> {
    let mut config = match &args.config {
        Some(path) => JumpConfig::from_file(path)?,
        None => JumpConfig::default(),
    };

    if let Some(y_threshold) = args.y_threshold {
        config.detector.y_threshold = y_threshold;
    }
    if let Some(smooth_window) = args.smooth_window {
        config.detector.smooth_window = smooth_window;
    }
    if let Some(reference) = args.reference {
        config.signal.reference = reference.into();
    }
    if let Some(min_visibility) = args.min_visibility {
        config.signal.min_visibility = min_visibility;
    }
    if let Some(fps) = args.fps {
        config.stream.fallback_fps = fps;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, BroadjumpCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_frames(data: &str, format: InputFormat) -> Result<Vec<PoseFrame>, BroadjumpCliError> {
    let frames = match format {
        InputFormat::Ndjson => FrameAdapter::parse_ndjson(data)?,
        InputFormat::Json => FrameAdapter::parse_array(data)?,
    };
    Ok(frames)
}

fn cmd_detect(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: JumpConfig,
) -> Result<(), BroadjumpCliError> {
    let input_data = read_input(input)?;
    let frames = parse_frames(&input_data, input_format)?;

    if frames.is_empty() {
        return Err(BroadjumpCliError::NoFrames);
    }

    let processor = process_frames(&frames, &config)?;
    let stats = processor.stats();
    info!(
        frames = stats.frames_processed,
        without_signal = stats.frames_without_signal,
        dropped = stats.frames_dropped,
        jumps = processor.events().count(),
        "detection finished"
    );

    let output_data = match output_format {
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            if !write_csv(processor.events().events(), &mut buffer)? {
                eprintln!("No jumps detected.");
                return Ok(());
            }
            String::from_utf8_lossy(&buffer).into_owned()
        }
        OutputFormat::Ndjson => events_to_ndjson(processor.events().events())?,
        OutputFormat::Json => serde_json::to_string(processor.events())?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(processor.events())?,
        OutputFormat::Report => processor.report_json()?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(
    output_format: StreamFormat,
    csv: Option<&Path>,
    report: Option<&Path>,
    flush: bool,
    config: JumpConfig,
) -> Result<(), BroadjumpCliError> {
    let mut processor = JumpProcessor::new(config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let frame = match FrameAdapter::parse_line(trimmed) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line = line_num + 1, error = %e, "skipping unparseable frame");
                continue;
            }
        };

        match frame.validate() {
            Err(e) if !e.is_recoverable() => {
                warn!(line = line_num + 1, error = %e, "skipping invalid frame");
                continue;
            }
            _ => {}
        }

        let Some(tick) = processor.process_frame(&frame) else {
            continue;
        };

        let record = match output_format {
            StreamFormat::Ticks => Some(serde_json::to_string(&tick)?),
            StreamFormat::Ndjson => match &tick.event {
                Some(event) => Some(serde_json::to_string(event)?),
                None => None,
            },
        };

        if let Some(record) = record {
            writeln!(stdout, "{}", record)?;
            if flush {
                stdout.flush()?;
            }
        }
    }
    stdout.flush()?;

    if let Some(report_path) = report {
        fs::write(report_path, processor.report_json()?)?;
    }

    let log = processor.finish();
    info!(jumps = log.count(), "stream finished");

    if let Some(csv_path) = csv {
        if log.is_empty() {
            eprintln!("No jumps detected.");
        } else {
            let mut file = io::BufWriter::new(fs::File::create(csv_path)?);
            write_csv(log.events(), &mut file)?;
        }
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), BroadjumpCliError> {
    let input_data = read_input(input)?;
    let frames = parse_frames(&input_data, input_format)?;

    let results = FrameAdapter::validate_frames(&frames);

    let report = ValidationReport {
        total_frames: frames.len(),
        valid_frames: frames.len() - results.len(),
        invalid_frames: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                frame_index: r.frame_index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let frame = err
                    .frame_index
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("  - Frame {} (index {}): {}", frame, err.index, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(BroadjumpCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_doctor(args: &DetectorArgs, json: bool) -> Result<(), BroadjumpCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "broadjump_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Broadjump version {}", BROADJUMP_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    let config_check = match (&args.config, build_config(args)) {
        (Some(path), _) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Config file {} does not exist", path.display()),
        },
        (_, Ok(config)) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "y_threshold={} smooth_window={} reference={} fallback_fps={}",
                config.detector.y_threshold,
                config.detector.smooth_window,
                config.signal.reference.as_str(),
                config.stream.fallback_fps
            ),
        },
        (_, Err(e)) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: CliError::from(e).message,
        },
    };
    checks.push(config_check);

    if args.config.is_none() {
        checks.push(DoctorCheck {
            name: "config_file".to_string(),
            status: CheckStatus::Warning,
            message: "No config file given, using defaults and flags".to_string(),
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: BROADJUMP_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Broadjump Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));

    if has_errors {
        Err(BroadjumpCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), BroadjumpCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One JSON object per frame (NDJSON or a JSON array):");
                println!();
                println!("- schema_version: \"{}\"", SCHEMA_VERSION);
                println!("- timestamp: seconds (optional if frame_index is given)");
                println!("- frame_index: frame number (time = frame_index / fps)");
                println!("- frame: {{ width, height }} in pixels");
                println!("- source: {{ model, camera_id }} (optional)");
                println!("- detection: {{ landmarks: [{{ name, x, y, z, visibility }}] }} or null");
                println!();
                println!("Landmark x/y are normalized to [0, 1] and scaled by the frame size.");
                println!("Names are the 33 MediaPipe pose landmarks in snake_case.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: jump events");
                println!();
                println!("CSV columns: count, takeoff_time, landing_time, air_time_s, jump_distance_px");
                println!();
                println!("JSON jump event:");
                println!("- sequence_number, takeoff_time, landing_time, air_time");
                println!("- horizontal_displacement (pixels, landing minus takeoff)");
                println!();
                println!("Session report:");
                println!("- report_version, producer {{ name, version, instance_id }}, computed_at_utc");
                println!("- config: effective detector configuration");
                println!("- summary: {{ jump_count, air time aggregates, frame counters, ended_airborne }}");
                println!("- jumps: array of jump events");
            }
        }
    }
    Ok(())
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "type": "object",
        "required": ["schema_version", "frame"],
        "properties": {
            "schema_version": { "const": SCHEMA_VERSION },
            "frame_index": { "type": "integer", "minimum": 0 },
            "timestamp": { "type": "number", "minimum": 0 },
            "frame": {
                "type": "object",
                "required": ["width", "height"],
                "properties": {
                    "width": { "type": "integer", "minimum": 1 },
                    "height": { "type": "integer", "minimum": 1 }
                }
            },
            "source": {
                "type": "object",
                "properties": {
                    "model": { "type": "string" },
                    "camera_id": { "type": "string" }
                }
            },
            "detection": {
                "type": ["object", "null"],
                "required": ["landmarks"],
                "properties": {
                    "landmarks": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "x", "y"],
                            "properties": {
                                "name": { "type": "string" },
                                "x": { "type": "number" },
                                "y": { "type": "number" },
                                "z": { "type": "number" },
                                "visibility": { "type": "number", "minimum": 0, "maximum": 1 }
                            }
                        }
                    }
                }
            }
        },
        "anyOf": [
            { "required": ["timestamp"] },
            { "required": ["frame_index"] }
        ]
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let jump = serde_json::json!({
        "type": "object",
        "required": [
            "sequence_number", "takeoff_time", "landing_time", "air_time",
            "horizontal_displacement"
        ],
        "properties": {
            "sequence_number": { "type": "integer", "minimum": 1 },
            "takeoff_time": { "type": "number" },
            "landing_time": { "type": "number" },
            "air_time": { "type": "number", "minimum": 0 },
            "horizontal_displacement": { "type": "number" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "broadjump report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at_utc", "config", "summary", "jumps"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string", "format": "uuid" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "config": { "type": "object" },
            "summary": {
                "type": "object",
                "properties": {
                    "jump_count": { "type": "integer" },
                    "total_air_time_s": { "type": "number" },
                    "longest_air_time_s": { "type": ["number", "null"] },
                    "mean_air_time_s": { "type": ["number", "null"] },
                    "total_displacement_px": { "type": "number" },
                    "frames_processed": { "type": "integer" },
                    "frames_with_signal": { "type": "integer" },
                    "frames_without_signal": { "type": "integer" },
                    "frames_dropped": { "type": "integer" },
                    "ended_airborne": { "type": "boolean" }
                }
            },
            "jumps": { "type": "array", "items": jump }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum BroadjumpCliError {
    Io(io::Error),
    Compute(ComputeError),
    Config(ConfigError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for BroadjumpCliError {
    fn from(e: io::Error) -> Self {
        BroadjumpCliError::Io(e)
    }
}

impl From<ComputeError> for BroadjumpCliError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::Config(e) => BroadjumpCliError::Config(e),
            ComputeError::Io(e) => BroadjumpCliError::Io(e),
            other => BroadjumpCliError::Compute(other),
        }
    }
}

impl From<ConfigError> for BroadjumpCliError {
    fn from(e: ConfigError) -> Self {
        BroadjumpCliError::Config(e)
    }
}

impl From<serde_json::Error> for BroadjumpCliError {
    fn from(e: serde_json::Error) -> Self {
        BroadjumpCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BroadjumpCliError> for CliError {
    fn from(e: BroadjumpCliError) -> Self {
        match e {
            BroadjumpCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BroadjumpCliError::Compute(ComputeError::Validation(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'broadjump validate' for details".to_string()),
            },
            BroadjumpCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            BroadjumpCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'broadjump doctor' to check the configuration".to_string()),
            },
            BroadjumpCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BroadjumpCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BroadjumpCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            BroadjumpCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    frame_index: Option<u64>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
