use std::thread;

use aidalink_frame::ChannelId;

use crate::cmd::{connect, parse_duration, JoystickArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: JoystickArgs, _format: OutputFormat) -> CliResult<i32> {
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be at least 1"));
    }
    let interval = parse_duration(&args.interval)?;
    let link = connect(&args.robot, &[ChannelId::Joystick])?;

    for sample in 0..args.repeat {
        if sample > 0 {
            thread::sleep(interval);
        }
        link.send_joystick(args.x, args.y)
            .map_err(|err| session_error("send failed", err))?;
    }
    Ok(SUCCESS)
}
