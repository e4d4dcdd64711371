use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use aidalink_session::{RobotSimulator, SimulatorConfig};

use crate::cmd::{install_ctrlc_handler, parse_duration, SimulateArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SimulatorConfig {
        step_delay: parse_duration(&args.step_delay)?,
        transcript: args.transcript,
        ..SimulatorConfig::default()
    };
    let simulator =
        RobotSimulator::bind(&args.bind, config).map_err(|err| io_error("bind failed", err))?;
    let events = simulator.subscribe();
    let running = install_ctrlc_handler()?;
    let mut handle = simulator
        .spawn()
        .map_err(|err| io_error("simulator failed to start", err))?;

    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => print_event(&event, format),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    handle.stop();
    Ok(SUCCESS)
}
