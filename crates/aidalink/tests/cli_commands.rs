#![cfg(feature = "cli")]

use std::net::TcpListener;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use aidalink::session::{RobotSimulator, SimEvent, SimulatorConfig, SimulatorHandle};

fn start_simulator() -> (SimulatorHandle, Receiver<SimEvent>) {
    start_simulator_with(Duration::from_millis(10))
}

fn start_simulator_with(step_delay: Duration) -> (SimulatorHandle, Receiver<SimEvent>) {
    let sim = RobotSimulator::bind(
        "127.0.0.1:0",
        SimulatorConfig {
            transcript: "go forward".to_string(),
            video_interval: Duration::from_millis(10),
            step_delay,
            ..SimulatorConfig::default()
        },
    )
    .expect("simulator should bind");
    let events = sim.subscribe();
    (sim.spawn().expect("simulator should start"), events)
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    listener.local_addr().expect("local addr").port()
}

fn aidalink(port: u16, command: &str, args: &[&str]) -> Output {
    aidalink_command(port, command, args)
        .output()
        .expect("aidalink should run")
}

fn aidalink_command(port: u16, command: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_aidalink"));
    cmd
        .args(["--log-level", "error", "--format", "json", command])
        .args([
            "--host",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--connect-timeout",
            "2s",
            "--read-timeout",
            "3s",
        ])
        .args(args)
        .env_remove("AIDA_HOST")
        .env_remove("AIDA_PORT");
    cmd
}

fn stdout_json(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

fn wait_for(events: &Receiver<SimEvent>, pred: impl Fn(&SimEvent) -> bool) -> SimEvent {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(left) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(err) => panic!("expected event did not arrive: {err}"),
        }
    }
}

#[test]
fn probe_reports_every_channel_connected() {
    let (sim, _events) = start_simulator();
    let output = aidalink(sim.local_addr().port(), "probe", &[]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let rows = stdout_json(&output);
    let rows = rows[0].as_array().expect("probe prints one JSON array");
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|row| row["state"] == "connected"));
}

#[test]
fn probe_against_closed_port_fails_fast() {
    let started = Instant::now();
    let output = aidalink(closed_port(), "probe", &[]);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(output.status.code(), Some(1));

    let rows = stdout_json(&output);
    let rows = rows[0].as_array().expect("probe prints one JSON array");
    assert!(rows.iter().all(|row| row["state"] == "disconnected"));
}

#[test]
fn joystick_reaches_the_robot() {
    let (sim, events) = start_simulator();
    let output = aidalink(sim.local_addr().port(), "joystick", &["0.0", "-0.9"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let event = wait_for(&events, |event| matches!(event, SimEvent::Joystick { .. }));
    assert!(matches!(event, SimEvent::Joystick { command: 'f', .. }));
}

#[test]
fn joystick_out_of_range_is_usage_error() {
    let (sim, _events) = start_simulator();
    let output = aidalink(sim.local_addr().port(), "joystick", &["1.5", "0.0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn sequence_wait_prints_feedback_until_finished() {
    let (sim, _events) = start_simulator();
    let output = aidalink(
        sim.local_addr().port(),
        "sequence",
        &[
            "--json",
            r#"[{"kind":"forwards"},{"kind":"input_voice","payload":"hej"}]"#,
            "--wait",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let feedback = stdout_json(&output);
    let last = feedback.last().expect("feedback should be printed");
    assert_eq!(last["type"], "ack");
    assert_eq!(last["next_index"], 99);
}

#[test]
fn stop_from_another_process_aborts_sequence() {
    let (sim, events) = start_simulator_with(Duration::from_millis(500));
    let port = sim.local_addr().port();
    let runner = aidalink_command(
        port,
        "sequence",
        &[
            "--json",
            r#"[{"kind":"forwards"},{"kind":"backwards"},{"kind":"turn_left"},{"kind":"turn_right"}]"#,
            "--wait",
        ],
    )
    .stdout(Stdio::piped())
    .spawn()
    .expect("sequence command should start");

    wait_for(&events, |event| {
        matches!(event, SimEvent::ActionExecuted { index: 0, .. })
    });
    let output = aidalink(port, "stop", &[]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    wait_for(&events, |event| *event == SimEvent::SequenceStop);

    let output = runner
        .wait_with_output()
        .expect("sequence command should finish");
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let feedback = stdout_json(&output);
    assert_eq!(
        feedback.last().expect("feedback should be printed")["type"],
        "stop"
    );
}

#[test]
fn malformed_sequence_json_is_data_invalid() {
    let (sim, _events) = start_simulator();
    let output = aidalink(
        sim.local_addr().port(),
        "sequence",
        &["--json", r#"[{"kind":"fly"}]"#],
    );
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn instruct_switches_device() {
    let (sim, events) = start_simulator();
    let output = aidalink(sim.local_addr().port(), "instruct", &["lidar", "off"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    wait_for(&events, |event| {
        *event
            == SimEvent::Instruction {
                message: "lidar",
                value: 2,
            }
    });
}

#[test]
fn stt_prints_transcript() {
    let (sim, _events) = start_simulator();
    let output = aidalink(sim.local_addr().port(), "stt", &[]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(stdout_json(&output)[0]["text"], "go forward");
}

#[test]
fn frame_count_limits_output() {
    let (sim, _events) = start_simulator();
    let output = aidalink(
        sim.local_addr().port(),
        "frame",
        &["video", "--count", "2"],
    );
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let frames = stdout_json(&output);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["message_name"], "video-frame");
}

#[test]
fn command_without_robot_is_failure() {
    let output = aidalink(closed_port(), "stt", &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn version_names_binary() {
    let output = Command::new(env!("CARGO_BIN_EXE_aidalink"))
        .arg("version")
        .output()
        .expect("aidalink should run");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("aidalink "));
}
