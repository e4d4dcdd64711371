//! A stand-in for the robot controller, for bench tests without hardware.
//!
//! The simulator accepts any number of connections on one port and answers
//! each message the way the controller does: instructions are logged, frame
//! requests start a stream, transcript requests get one text reply and
//! sequences are "executed" with an ack after every action.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use aidalink_frame::{
    decode_joystick, decode_sequence, encode_message, Action, ActionKind, Instruction, Message,
    MessageType, SequenceFeedback, SEQUENCE_FINISHED,
};
use aidalink_transport::io::{read_message, write_all};
use aidalink_transport::TransportError;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Joystick deflection below which the robot stands still.
pub const JOYSTICK_DEAD_ZONE: f32 = 0.2;

/// What the simulated robot sends back.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Body of every video frame.
    pub video_frame: Bytes,
    /// Body of every lidar frame.
    pub lidar_frame: Bytes,
    /// Reply to a transcript request.
    pub transcript: String,
    pub video_interval: Duration,
    pub lidar_interval: Duration,
    /// Time spent "executing" each action.
    pub step_delay: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            video_frame: Bytes::from_static(b"\xff\xd8video\xff\xd9"),
            lidar_frame: Bytes::from_static(b"\xff\xd8lidar\xff\xd9"),
            transcript: "hello aida".to_string(),
            video_interval: Duration::from_millis(33),
            lidar_interval: Duration::from_secs(1),
            step_delay: Duration::from_secs(2),
        }
    }
}

/// Something the simulated robot observed or did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Connected {
        peer: String,
    },
    Disconnected {
        peer: String,
    },
    Instruction {
        message: &'static str,
        value: u16,
    },
    Request {
        message: &'static str,
    },
    Text {
        text: String,
    },
    Joystick {
        x: f32,
        y: f32,
        command: char,
    },
    Sequence {
        actions: Vec<Action>,
    },
    SequenceStop,
    SequencePause,
    ActionExecuted {
        index: usize,
        kind: ActionKind,
    },
    Unknown {
        id: u16,
        bytes: usize,
    },
}

/// Drive command for a joystick sample, as the motor controller maps it:
/// `s` stop, `f` forward, `b` backward, `l` rotate left, `r` rotate right.
pub fn drive_command(x: f32, y: f32) -> char {
    if x.abs() < JOYSTICK_DEAD_ZONE && y.abs() < JOYSTICK_DEAD_ZONE {
        's'
    } else if y < -0.5 {
        'f'
    } else if y > 0.5 {
        'b'
    } else if x < -0.5 {
        'l'
    } else if x > 0.5 {
        'r'
    } else {
        's'
    }
}

struct Shared {
    config: SimulatorConfig,
    subscribers: Mutex<Vec<Sender<SimEvent>>>,
    stopping: AtomicBool,
    sequence: SequenceControl,
}

impl Shared {
    fn emit(&self, event: SimEvent) {
        debug!(?event, "simulator event");
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

/// A bound, not yet running simulator.
pub struct RobotSimulator {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl RobotSimulator {
    pub fn bind(addr: impl ToSocketAddrs, config: SimulatorConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                config,
                subscribers: Mutex::new(Vec::new()),
                stopping: AtomicBool::new(false),
                sequence: SequenceControl::default(),
            }),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Receive every subsequent [`SimEvent`].
    pub fn subscribe(&self) -> Receiver<SimEvent> {
        subscribe(&self.shared)
    }

    /// Accept connections until stopped, one thread per connection.
    pub fn run(&self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "simulator listening");
        for incoming in self.listener.incoming() {
            if self.shared.stopping() {
                break;
            }
            match incoming {
                Ok(stream) => {
                    let shared = Arc::clone(&self.shared);
                    thread::spawn(move || serve_client(stream, shared));
                }
                Err(err) => warn!(error = %err, "accept failed"),
            }
        }
        Ok(())
    }

    /// Run on a background thread.
    pub fn spawn(self) -> io::Result<SimulatorHandle> {
        let mut addr = self.local_addr()?;
        if addr.ip().is_unspecified() {
            addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        let shared = Arc::clone(&self.shared);
        let thread = thread::spawn(move || self.run());
        Ok(SimulatorHandle {
            addr,
            shared,
            thread: Some(thread),
        })
    }
}

/// A simulator running in the background. Dropping it stops the accept loop
/// and every frame stream.
pub struct SimulatorHandle {
    addr: SocketAddr,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl SimulatorHandle {
    /// Address clients should connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn subscribe(&self) -> Receiver<SimEvent> {
        subscribe(&self.shared)
    }

    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shared.stopping.store(true, Ordering::SeqCst);
        // Wake the blocking accept.
        let _ = TcpStream::connect_timeout(&self.addr, Duration::from_secs(1));
        if thread.join().is_err() {
            warn!("simulator thread panicked");
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn subscribe(shared: &Shared) -> Receiver<SimEvent> {
    let (tx, rx) = mpsc::channel();
    shared
        .subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(tx);
    rx
}

/// Stop/pause requests for the running sequence. Shared by every
/// connection, so a stop sent on a fresh connection still lands.
#[derive(Default)]
struct SequenceControl {
    stop: AtomicBool,
    pause: AtomicBool,
}

#[derive(Clone)]
struct Writer(Arc<Mutex<TcpStream>>);

impl Writer {
    fn send(&self, message_type: MessageType, body: &[u8]) -> Result<(), TransportError> {
        self.send_id(message_type.id(), body)
    }

    fn send_id(&self, id: u16, body: &[u8]) -> Result<(), TransportError> {
        let mut buf = BytesMut::new();
        encode_message(id, body, &mut buf)?;
        write_all(&mut *self.lock(), &buf)
    }

    fn feedback(&self, feedback: &SequenceFeedback) -> Result<(), TransportError> {
        let message = feedback.to_message()?;
        self.send_id(message.id, &message.payload)
    }

    fn lock(&self) -> MutexGuard<'_, TcpStream> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn serve_client(mut stream: TcpStream, shared: Arc<Shared>) {
    if shared.stopping() {
        return;
    }
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let writer = match stream.try_clone() {
        Ok(clone) => Writer(Arc::new(Mutex::new(clone))),
        Err(err) => {
            warn!(%peer, error = %err, "cannot clone client socket");
            return;
        }
    };
    shared.emit(SimEvent::Connected { peer: peer.clone() });

    loop {
        match read_message(&mut stream) {
            Ok(message) => {
                if let Err(err) = handle_message(message, &writer, &shared) {
                    debug!(%peer, error = %err, "reply failed");
                    break;
                }
            }
            Err(TransportError::Disconnected(_)) => break,
            Err(err) => {
                warn!(%peer, error = %err, "dropping client");
                break;
            }
        }
    }
    shared.emit(SimEvent::Disconnected { peer });
}

fn instruction_value(body: &[u8]) -> Option<u16> {
    body.get(..2).map(|raw| u16::from_be_bytes([raw[0], raw[1]]))
}

fn handle_message(
    message: Message,
    writer: &Writer,
    shared: &Arc<Shared>,
) -> Result<(), TransportError> {
    let Some(message_type) = message.message_type() else {
        shared.emit(SimEvent::Unknown {
            id: message.id,
            bytes: message.payload.len(),
        });
        return Ok(());
    };

    match message_type {
        MessageType::Camera
        | MessageType::ImageAnalysis
        | MessageType::Mic
        | MessageType::Stt
        | MessageType::Lidar => {
            if let Some(value) = instruction_value(&message.payload) {
                shared.emit(SimEvent::Instruction {
                    message: message_type.name(),
                    value,
                });
            }
        }
        MessageType::ReqVideoFeed => {
            shared.emit(SimEvent::Request {
                message: message_type.name(),
            });
            let config = &shared.config;
            stream_frames(
                writer,
                shared,
                MessageType::VideoFrame,
                &config.video_frame,
                config.video_interval,
            )?;
        }
        MessageType::ReqLidar => {
            shared.emit(SimEvent::Request {
                message: message_type.name(),
            });
            let config = &shared.config;
            stream_frames(
                writer,
                shared,
                MessageType::LidarFrame,
                &config.lidar_frame,
                config.lidar_interval,
            )?;
        }
        MessageType::ReqStt => {
            shared.emit(SimEvent::Request {
                message: message_type.name(),
            });
            writer.send(MessageType::Text, shared.config.transcript.as_bytes())?;
        }
        MessageType::Text => shared.emit(SimEvent::Text {
            text: String::from_utf8_lossy(&message.payload).into_owned(),
        }),
        MessageType::Joystick => match decode_joystick(&message.payload) {
            Ok((x, y)) => shared.emit(SimEvent::Joystick {
                x,
                y,
                command: drive_command(x, y),
            }),
            Err(err) => warn!(error = %err, "bad joystick body"),
        },
        MessageType::Sequence => handle_sequence(&message.payload, writer, shared),
        _ => shared.emit(SimEvent::Unknown {
            id: message.id,
            bytes: message.payload.len(),
        }),
    }
    Ok(())
}

/// Stream frames until the client goes away or the simulator stops. Like
/// the controller, this occupies the connection's reader.
fn stream_frames(
    writer: &Writer,
    shared: &Shared,
    message_type: MessageType,
    frame: &[u8],
    interval: Duration,
) -> Result<(), TransportError> {
    while !shared.stopping() {
        thread::sleep(interval);
        writer.send(message_type, frame)?;
    }
    Ok(())
}

fn handle_sequence(body: &[u8], writer: &Writer, shared: &Arc<Shared>) {
    let control = &shared.sequence;
    control.stop.store(false, Ordering::SeqCst);
    control.pause.store(false, Ordering::SeqCst);

    match instruction_value(body).and_then(Instruction::from_value) {
        Some(Instruction::Off) => {
            control.stop.store(true, Ordering::SeqCst);
            shared.emit(SimEvent::SequenceStop);
            return;
        }
        Some(Instruction::Pause) => {
            control.pause.store(true, Ordering::SeqCst);
            shared.emit(SimEvent::SequencePause);
            return;
        }
        _ => {}
    }

    let actions = match decode_sequence(body) {
        Ok((_, actions)) => actions,
        Err(err) => {
            warn!(error = %err, "rejecting sequence");
            return;
        }
    };
    shared.emit(SimEvent::Sequence {
        actions: actions.clone(),
    });

    let writer = writer.clone();
    let shared = Arc::clone(shared);
    thread::spawn(move || {
        if let Err(err) = execute_sequence(&actions, &writer, &shared) {
            debug!(error = %err, "sequence feedback not delivered");
        }
    });
}

/// Walk the actions, acking each executed one with the index of the next.
///
/// A loop body runs as many times as the loop start payload says (at least
/// once). Only one loop per sequence is honoured; later loop markers are
/// acked like any other action.
fn execute_sequence(
    actions: &[Action],
    writer: &Writer,
    shared: &Shared,
) -> Result<(), TransportError> {
    let control = &shared.sequence;
    let mut loop_start = None;
    let mut loop_done = false;
    let mut remaining = 0u32;
    let mut finished = false;
    let mut i = 0;

    while i < actions.len() {
        if control.stop.swap(false, Ordering::SeqCst) {
            return writer.feedback(&SequenceFeedback::Stopped);
        }
        if control.pause.swap(false, Ordering::SeqCst) {
            return writer.feedback(&SequenceFeedback::Paused);
        }

        let action = &actions[i];
        match action.kind {
            ActionKind::LoopStart if loop_start.is_none() => {
                loop_start = Some(i);
                remaining = action
                    .payload
                    .trim()
                    .parse::<u32>()
                    .unwrap_or(1)
                    .saturating_sub(1);
                i += 1;
            }
            ActionKind::LoopEnd if loop_start.is_some() && !loop_done => {
                match loop_start {
                    Some(start) if remaining > 0 => {
                        remaining -= 1;
                        i = start + 1;
                    }
                    _ => {
                        loop_done = true;
                        i += 1;
                    }
                }
            }
            kind => {
                shared.emit(SimEvent::ActionExecuted { index: i, kind });
                i += 1;
                let next_index = if i == actions.len() {
                    finished = true;
                    SEQUENCE_FINISHED
                } else {
                    i as u32
                };
                writer.feedback(&SequenceFeedback::Ack { next_index })?;
                thread::sleep(shared.config.step_delay);
            }
        }
    }

    if !finished {
        writer.feedback(&SequenceFeedback::Ack {
            next_index: SEQUENCE_FINISHED,
        })?;
    }
    Ok(())
}
