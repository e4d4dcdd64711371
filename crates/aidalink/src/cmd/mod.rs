use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aidalink_frame::ChannelId;
use aidalink_session::{
    InstructionPolicy, LinkConfig, RobotLink, DEFAULT_HOST, DEFAULT_PORT, HOST_ENV, PORT_ENV,
};
use aidalink_transport::{ChannelConfig, Endpoint};
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{session_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod frame;
pub mod instruct;
pub mod joystick;
pub mod probe;
pub mod sequence;
pub mod simulate;
pub mod stt;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect every channel and print the resulting states.
    Probe(ProbeArgs),
    /// Send joystick samples.
    Joystick(JoystickArgs),
    /// Send an action sequence.
    Sequence(SequenceArgs),
    /// Stop the running sequence.
    Stop(SequenceControlArgs),
    /// Pause the running sequence.
    Pause(SequenceControlArgs),
    /// Switch a robot device on or off.
    Instruct(InstructArgs),
    /// Request and print one speech-to-text transcript.
    Stt(SttArgs),
    /// Request and print video or lidar frames.
    Frame(FrameArgs),
    /// Run a simulated robot controller.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Joystick(args) => joystick::run(args, format),
        Command::Sequence(args) => sequence::run(args, format),
        Command::Stop(args) => sequence::stop(args),
        Command::Pause(args) => sequence::pause(args),
        Command::Instruct(args) => instruct::run(args, format),
        Command::Stt(args) => stt::run(args, format),
        Command::Frame(args) => frame::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the robot is and how long to wait for it.
#[derive(Args, Debug, Clone)]
pub struct RobotArgs {
    /// Robot host.
    #[arg(long, env = HOST_ENV, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Robot port.
    #[arg(long, env = PORT_ENV, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Per-channel connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// Maximum wait for any single reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub read_timeout: String,
}

impl RobotArgs {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn link_config(&self) -> CliResult<LinkConfig> {
        let connect_timeout = parse_duration(&self.connect_timeout)?;
        Ok(LinkConfig {
            connect_timeout,
            instruction_policy: InstructionPolicy::Propagate,
            channel: ChannelConfig {
                connect_timeout,
                read_timeout: Some(parse_duration(&self.read_timeout)?),
                ..ChannelConfig::default()
            },
        })
    }
}

/// Open only the channels a command needs. The first failure aborts.
pub fn connect(robot: &RobotArgs, channels: &[ChannelId]) -> CliResult<RobotLink> {
    let link = RobotLink::new(robot.link_config()?);
    let report = link.manager().connect_all(
        channels,
        &robot.endpoint(),
        link.config().connect_timeout,
    );
    for (_, result) in report.results {
        result.map_err(|err| session_error("connect failed", err))?;
    }
    Ok(link)
}

/// Flag cleared by Ctrl-C.
pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
}

#[derive(Args, Debug)]
pub struct JoystickArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
    /// Horizontal axis, -1.0 (left) to 1.0 (right).
    #[arg(allow_negative_numbers = true)]
    pub x: f32,
    /// Vertical axis, -1.0 (forward) to 1.0 (backward).
    #[arg(allow_negative_numbers = true)]
    pub y: f32,
    /// Number of samples to send.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
    /// Delay between samples (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct SequenceArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
    /// JSON action list, e.g. '[{"kind":"forwards"}]'.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON action list from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Wait for execution feedback until the sequence ends.
    #[arg(long)]
    pub wait: bool,
}

/// The robot acks stop and pause on the connection that sent the sequence,
/// so these commands only send.
#[derive(Args, Debug)]
pub struct SequenceControlArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Device {
    Camera,
    Lidar,
    Mic,
    Stt,
    Gesture,
    Pose,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct InstructArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
    /// Device to switch.
    pub device: Device,
    /// Desired state.
    pub switch: Switch,
}

#[derive(Args, Debug)]
pub struct SttArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrameSource {
    Video,
    Lidar,
}

#[derive(Args, Debug)]
pub struct FrameArgs {
    #[command(flatten)]
    pub robot: RobotArgs,
    /// Which stream to request.
    pub source: FrameSource,
    /// Exit after N frames (default: until interrupted).
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:6662")]
    pub bind: String,
    /// Time spent executing each action (e.g. 2s, 200ms).
    #[arg(long, default_value = "2s")]
    pub step_delay: String,
    /// Reply to transcript requests.
    #[arg(long, default_value = "hello aida")]
    pub transcript: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
