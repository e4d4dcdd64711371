use aidalink_frame::ChannelId;
use aidalink_session::RobotLink;

use crate::cmd::{connect, Device, InstructArgs, Switch};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: InstructArgs, _format: OutputFormat) -> CliResult<i32> {
    let link = connect(&args.robot, &[channel_for(args.device)])?;
    let verb = verb_for(args.device, args.switch);
    verb(&link).map_err(|err| session_error("instruction failed", err))?;
    Ok(SUCCESS)
}

fn channel_for(device: Device) -> ChannelId {
    match device {
        Device::Camera => ChannelId::Video,
        Device::Lidar => ChannelId::Lidar,
        Device::Mic | Device::Stt => ChannelId::Stt,
        Device::Gesture | Device::Pose => ChannelId::Gesture,
    }
}

type Verb = fn(&RobotLink) -> aidalink_session::Result<()>;

fn verb_for(device: Device, switch: Switch) -> Verb {
    match (device, switch) {
        (Device::Camera, Switch::On) => RobotLink::start_camera,
        (Device::Camera, Switch::Off) => RobotLink::stop_camera,
        (Device::Lidar, Switch::On) => RobotLink::start_lidar,
        (Device::Lidar, Switch::Off) => RobotLink::stop_lidar,
        (Device::Mic, Switch::On) => RobotLink::start_mic,
        (Device::Mic, Switch::Off) => RobotLink::stop_mic,
        (Device::Stt, Switch::On) => RobotLink::start_stt,
        (Device::Stt, Switch::Off) => RobotLink::stop_stt,
        (Device::Gesture, Switch::On) => RobotLink::start_gesture,
        (Device::Gesture, Switch::Off) => RobotLink::stop_gesture,
        (Device::Pose, Switch::On) => RobotLink::start_pose,
        (Device::Pose, Switch::Off) => RobotLink::stop_pose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_share_channels_with_their_pipeline() {
        assert_eq!(channel_for(Device::Camera), ChannelId::Video);
        assert_eq!(channel_for(Device::Mic), ChannelId::Stt);
        assert_eq!(channel_for(Device::Pose), ChannelId::Gesture);
    }
}
