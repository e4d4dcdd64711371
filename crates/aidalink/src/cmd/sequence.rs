use std::fs;

use aidalink_frame::{ChannelId, SequenceFeedback};
use aidalink_session::{JsonSequence, RobotLink};

use crate::cmd::{connect, SequenceArgs, SequenceControlArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_feedback, OutputFormat};

pub fn run(args: SequenceArgs, format: OutputFormat) -> CliResult<i32> {
    let json = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, None) => {
            return Err(CliError::new(USAGE, "one of --json or --file is required"));
        }
    };

    let link = connect(&args.robot, &[ChannelId::Sequence])?;
    link.send_sequence(&JsonSequence::new(json))
        .map_err(|err| session_error("send failed", err))?;

    if args.wait {
        loop {
            let feedback = next_feedback(&link)?;
            print_feedback(&feedback, format);
            if !matches!(feedback, SequenceFeedback::Ack { .. }) || feedback.is_finished() {
                break;
            }
        }
    }
    Ok(SUCCESS)
}

pub fn stop(args: SequenceControlArgs) -> CliResult<i32> {
    control(args, RobotLink::send_stop_sequence)
}

pub fn pause(args: SequenceControlArgs) -> CliResult<i32> {
    control(args, RobotLink::send_pause_sequence)
}

fn control(
    args: SequenceControlArgs,
    send: fn(&RobotLink) -> aidalink_session::Result<()>,
) -> CliResult<i32> {
    let link = connect(&args.robot, &[ChannelId::Sequence])?;
    send(&link).map_err(|err| session_error("send failed", err))?;
    Ok(SUCCESS)
}

fn next_feedback(link: &RobotLink) -> CliResult<SequenceFeedback> {
    link.receive_sequence_feedback()
        .map_err(|err| session_error("receive failed", err))
}
