//! Tokio boundary over [`RobotLink`].
//!
//! The core stays blocking; every call here runs on the blocking pool via
//! `tokio::task::spawn_blocking`, one task per in-flight operation.

use std::sync::Arc;

use aidalink_frame::{Action, ChannelId, SequenceFeedback};
use aidalink_transport::Endpoint;
use bytes::Bytes;
use tracing::{info, warn};

use crate::error::{Result, SessionError};
use crate::link::{LinkConfig, RobotLink};
use crate::manager::BringUpReport;
use crate::settings::SettingsSource;
use crate::state::ConnectionState;

/// Cloneable async handle; clones share the same channels.
#[derive(Clone)]
pub struct AsyncRobotLink {
    inner: Arc<RobotLink>,
}

impl Default for AsyncRobotLink {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl From<RobotLink> for AsyncRobotLink {
    fn from(link: RobotLink) -> Self {
        Self {
            inner: Arc::new(link),
        }
    }
}

impl AsyncRobotLink {
    pub fn new(config: LinkConfig) -> Self {
        RobotLink::new(config).into()
    }

    /// The blocking link underneath.
    pub fn blocking(&self) -> &RobotLink {
        &self.inner
    }

    pub fn state_of(&self, id: ChannelId) -> ConnectionState {
        self.inner.state_of(id)
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&RobotLink) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let link = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&link))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))?
    }

    /// Read the robot address and connect every channel, one task each.
    pub async fn bring_up<S>(&self, source: S) -> Result<BringUpReport>
    where
        S: SettingsSource + Send + 'static,
    {
        let settings = self.run(move |_| source.settings()).await?;
        Ok(self.connect(settings.endpoint()).await)
    }

    /// Connect every channel to `endpoint` concurrently.
    pub async fn connect(&self, endpoint: Endpoint) -> BringUpReport {
        let timeout = self.inner.config().connect_timeout;
        let tasks: Vec<_> = ChannelId::ALL
            .into_iter()
            .map(|id| {
                let link = Arc::clone(&self.inner);
                let endpoint = endpoint.clone();
                let task = tokio::task::spawn_blocking(move || {
                    link.manager()
                        .connect(id, &endpoint.host, endpoint.port, timeout)
                });
                (id, task)
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (id, task) in tasks {
            let result = task
                .await
                .unwrap_or_else(|err| Err(SessionError::Task(err.to_string())));
            if let Err(err) = &result {
                warn!(channel = id.name(), %endpoint, error = %err, "channel bring-up failed");
            }
            results.push((id, result));
        }

        let report = BringUpReport { endpoint, results };
        info!(
            endpoint = %report.endpoint,
            connected = report.connected().len(),
            total = ChannelId::ALL.len(),
            "bring-up finished"
        );
        report
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.run(|link| {
            link.disconnect();
            Ok(())
        })
        .await
    }

    pub async fn start_camera(&self) -> Result<()> {
        self.run(RobotLink::start_camera).await
    }

    pub async fn stop_camera(&self) -> Result<()> {
        self.run(RobotLink::stop_camera).await
    }

    pub async fn start_lidar(&self) -> Result<()> {
        self.run(RobotLink::start_lidar).await
    }

    pub async fn stop_lidar(&self) -> Result<()> {
        self.run(RobotLink::stop_lidar).await
    }

    pub async fn start_mic(&self) -> Result<()> {
        self.run(RobotLink::start_mic).await
    }

    pub async fn stop_mic(&self) -> Result<()> {
        self.run(RobotLink::stop_mic).await
    }

    pub async fn start_stt(&self) -> Result<()> {
        self.run(RobotLink::start_stt).await
    }

    pub async fn stop_stt(&self) -> Result<()> {
        self.run(RobotLink::stop_stt).await
    }

    pub async fn start_gesture(&self) -> Result<()> {
        self.run(RobotLink::start_gesture).await
    }

    pub async fn stop_gesture(&self) -> Result<()> {
        self.run(RobotLink::stop_gesture).await
    }

    pub async fn start_pose(&self) -> Result<()> {
        self.run(RobotLink::start_pose).await
    }

    pub async fn stop_pose(&self) -> Result<()> {
        self.run(RobotLink::stop_pose).await
    }

    pub async fn send_sequence(&self, actions: Vec<Action>) -> Result<()> {
        self.run(move |link| link.send_sequence(&actions)).await
    }

    pub async fn send_stop_sequence(&self) -> Result<()> {
        self.run(RobotLink::send_stop_sequence).await
    }

    pub async fn send_pause_sequence(&self) -> Result<()> {
        self.run(RobotLink::send_pause_sequence).await
    }

    pub async fn receive_sequence_feedback(&self) -> Result<SequenceFeedback> {
        self.run(RobotLink::receive_sequence_feedback).await
    }

    pub async fn send_joystick(&self, x: f32, y: f32) -> Result<()> {
        self.run(move |link| link.send_joystick(x, y)).await
    }

    pub async fn request_video(&self) -> Result<()> {
        self.run(RobotLink::request_video).await
    }

    pub async fn receive_video(&self) -> Result<Bytes> {
        self.run(RobotLink::receive_video).await
    }

    pub async fn request_lidar(&self) -> Result<()> {
        self.run(RobotLink::request_lidar).await
    }

    pub async fn receive_lidar(&self) -> Result<Bytes> {
        self.run(RobotLink::receive_lidar).await
    }

    pub async fn request_stt(&self) -> Result<()> {
        self.run(RobotLink::request_stt).await
    }

    pub async fn receive_stt(&self) -> Result<String> {
        self.run(RobotLink::receive_stt).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    use aidalink_frame::{decode_header, decode_joystick, HEADER_SIZE};

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connect_and_send_joystick() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let server = std::thread::spawn(move || {
            let mut peers = Vec::new();
            for _ in 0..ChannelId::ALL.len() {
                peers.push(listener.accept().expect("accept").0);
            }
            let mut frames = Vec::new();
            for peer in &mut peers {
                peer.set_read_timeout(Some(Duration::from_millis(200)))
                    .expect("read timeout");
                let mut buf = [0u8; HEADER_SIZE + 8];
                if peer.read_exact(&mut buf).is_ok() {
                    frames.push(buf);
                }
            }
            frames
        });

        let link = AsyncRobotLink::new(LinkConfig {
            connect_timeout: Duration::from_secs(2),
            ..LinkConfig::default()
        });
        let report = link.connect(Endpoint::new("127.0.0.1", port)).await;
        assert!(report.is_complete(), "{report:?}");

        link.send_joystick(0.5, -1.0).await.expect("joystick sent");

        let frames = server.join().expect("server thread");
        assert_eq!(frames.len(), 1);
        let header = decode_header(&frames[0][..HEADER_SIZE]).expect("header");
        assert_eq!(header.message_id, 14);
        assert_eq!(header.payload_length, 8);
        assert_eq!(
            decode_joystick(&frames[0][HEADER_SIZE..]).expect("body"),
            (0.5, -1.0)
        );
    }

    #[tokio::test]
    async fn range_error_crosses_the_boundary() {
        let link = AsyncRobotLink::default();
        let err = link.send_joystick(0.0, -1.5).await.unwrap_err();
        assert!(matches!(err, SessionError::Frame(_)));
    }
}
