use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use aidalink_frame::{ChannelId, Message, SequenceFeedback};
use aidalink_session::{ConnectionState, SimEvent};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StateOutput<'a> {
    channel: ChannelId,
    #[serde(flatten)]
    state: &'a ConnectionState,
}

pub fn print_states(states: &[(ChannelId, ConnectionState)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<StateOutput<'_>> = states
                .iter()
                .map(|(channel, state)| StateOutput {
                    channel: *channel,
                    state,
                })
                .collect();
            print_json(&rows);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "STATE", "ENDPOINT", "CAUSE"]);
            for (channel, state) in states {
                let (endpoint, cause) = match state {
                    ConnectionState::Disconnected => (String::new(), String::new()),
                    ConnectionState::Connecting { host, port }
                    | ConnectionState::Connected { host, port } => {
                        (format!("{host}:{port}"), String::new())
                    }
                    ConnectionState::Failed { host, port, cause } => {
                        (format!("{host}:{port}"), cause.clone())
                    }
                };
                table.add_row(vec![
                    channel.name().to_string(),
                    state.label().to_string(),
                    endpoint,
                    cause,
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (channel, state) in states {
                println!("{:<9} {state}", channel.name());
            }
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    channel: ChannelId,
    message_id: u16,
    message_name: &'a str,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_message(channel: ChannelId, message: &Message, format: OutputFormat) {
    let name = message
        .message_type()
        .map(|kind| kind.name())
        .unwrap_or("unknown");
    match format {
        OutputFormat::Json => print_json(&MessageOutput {
            channel,
            message_id: message.id,
            message_name: name,
            payload_size: message.payload.len(),
            payload: payload_preview(message.payload.as_ref()),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "MESSAGE", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    channel.name().to_string(),
                    format!("{name} ({})", message.id),
                    message.payload.len().to_string(),
                    payload_preview(message.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} message={} ({}) size={} payload={}",
                channel.name(),
                message.id,
                name,
                message.payload.len(),
                payload_preview(message.payload.as_ref())
            );
        }
        OutputFormat::Raw => print_raw(message.payload.as_ref()),
    }
}

pub fn print_feedback(feedback: &SequenceFeedback, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(feedback),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => match feedback {
            SequenceFeedback::Ack { .. } if feedback.is_finished() => {
                println!("sequence finished")
            }
            SequenceFeedback::Ack { next_index } => println!("ack: next action {next_index}"),
            SequenceFeedback::Stopped => println!("sequence stopped"),
            SequenceFeedback::Paused => println!("sequence paused"),
        },
    }
}

pub fn print_event(event: &SimEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => match event {
            SimEvent::Connected { peer } => println!("connected: {peer}"),
            SimEvent::Disconnected { peer } => println!("disconnected: {peer}"),
            SimEvent::Instruction { message, value } => println!("{message}: instruction {value}"),
            SimEvent::Request { message } => println!("request: {message}"),
            SimEvent::Text { text } => println!("text: {text}"),
            SimEvent::Joystick { x, y, command } => {
                println!("joystick: x={x:.2} y={y:.2} drive={command}")
            }
            SimEvent::Sequence { actions } => println!("sequence: {} actions", actions.len()),
            SimEvent::SequenceStop => println!("sequence: stop"),
            SimEvent::SequencePause => println!("sequence: pause"),
            SimEvent::ActionExecuted { index, kind } => println!("action {index}: {kind:?}"),
            SimEvent::Unknown { id, bytes } => println!("unknown message {id} ({bytes} bytes)"),
        },
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
