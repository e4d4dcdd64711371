use aidalink_frame::ChannelId;
use aidalink_session::RobotLink;
use tracing::warn;

use crate::cmd::ProbeArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_states, OutputFormat};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let link = RobotLink::new(args.robot.link_config()?);
    let report = link.connect(&args.robot.endpoint());
    for (id, err) in report.failures() {
        warn!(channel = %id, error = %err, "channel did not connect");
    }

    let states: Vec<_> = ChannelId::ALL
        .into_iter()
        .map(|id| (id, link.state_of(id)))
        .collect();
    print_states(&states, format);

    link.disconnect();
    Ok(if report.is_complete() { SUCCESS } else { FAILURE })
}
