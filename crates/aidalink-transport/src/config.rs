use std::time::Duration;

/// Connect timeout used when the caller does not pick one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Socket options applied when a channel is opened.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Maximum time to wait for the TCP connect. Must be non-zero.
    pub connect_timeout: Duration,
    /// Read timeout for blocking receives.
    ///
    /// `None` means a stalled robot blocks `receive` until the channel is
    /// closed from another thread.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking sends.
    pub write_timeout: Option<Duration>,
    /// Disable Nagle so small joystick updates go out immediately.
    pub nodelay: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }
}

impl ChannelConfig {
    /// Same options with a different connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
