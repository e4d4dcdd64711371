use std::sync::atomic::Ordering;

use aidalink_frame::{ChannelId, Message, MessageType};
use tracing::info;

use crate::cmd::{connect, install_ctrlc_handler, FrameArgs, FrameSource};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: FrameArgs, format: OutputFormat) -> CliResult<i32> {
    let (channel, kind) = match args.source {
        FrameSource::Video => (ChannelId::Video, MessageType::VideoFrame),
        FrameSource::Lidar => (ChannelId::Lidar, MessageType::LidarFrame),
    };
    let link = connect(&args.robot, &[channel])?;
    let running = install_ctrlc_handler()?;

    match args.source {
        FrameSource::Video => link.request_video(),
        FrameSource::Lidar => link.request_lidar(),
    }
    .map_err(|err| session_error("request failed", err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let payload = match args.source {
            FrameSource::Video => link.receive_video(),
            FrameSource::Lidar => link.receive_lidar(),
        }
        .map_err(|err| session_error("receive failed", err))?;

        print_message(channel, &Message::new(kind.id(), payload), format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }
    info!(frames = printed, "frame stream closed");
    Ok(SUCCESS)
}
