//! Drives a simulated robot through a short sequence and prints the acks.
//!
//! Run with:
//!   cargo run --example sequence-demo

use std::time::Duration;

use aidalink::frame::{Action, ActionKind};
use aidalink::session::{RobotLink, RobotSimulator, Settings, SimulatorConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let simulator = RobotSimulator::bind(
        "127.0.0.1:0",
        SimulatorConfig {
            step_delay: Duration::from_millis(200),
            ..SimulatorConfig::default()
        },
    )?
    .spawn()?;
    let addr = simulator.local_addr();

    let link = RobotLink::default();
    let report = link.bring_up(&Settings::new(addr.ip().to_string(), addr.port()))?;
    eprintln!("[client] connected: {:?}", report.connected());

    link.start_camera()?;
    link.send_joystick(0.0, -0.5)?;

    let actions = vec![
        Action::plain(ActionKind::Forwards),
        Action::loop_start(2),
        Action::plain(ActionKind::TurnRight),
        Action::plain(ActionKind::LoopEnd),
        Action::new(ActionKind::InputVoice, "hello"),
    ];
    link.send_sequence(&actions)?;
    loop {
        let feedback = link.receive_sequence_feedback()?;
        eprintln!("[client] feedback: {feedback:?}");
        if feedback.is_finished() {
            break;
        }
    }

    link.disconnect();
    Ok(())
}
