//! # Flight Controller Comms Module
//!
//! Connection state machine that owns the link to the flight controller.
//!
//! This module handles:
//! - Reconnecting while the link is down
//! - Waiting out asynchronous connects
//! - Running one poll cycle (STATUS, ANALOG, RC) per connected tick
//! - Publishing a telemetry snapshot after every clean poll
//! - Sending queued SET_RAW_RC overrides
//!
//! ```text
//!                connect ok
//!   Disconnected ───────────────────────────────► Connected
//!     │  ▲  ▲                                      │
//!     │  │  └──── transport / decode error ────────┘
//!     │  │ status: Disconnected / connect timeout
//!     ▼  │
//!   Connecting ───────── status: Connected ───────► Connected
//! ```

pub mod link;

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{FcCommsError, Result};
use crate::msp::decoder::*;
use crate::msp::encoder::{encode_request_frame, set_raw_rc_request};
use crate::msp::protocol::*;
use crate::telemetry::TelemetrySink;

pub use link::{ConnectAttempt, LinkDriver};

/// State of the link to the flight controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Await a link call, turning expiry into `FcCommsError::Timeout`
async fn within<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    timeout(limit, fut)
        .await
        .map_err(|_| FcCommsError::Timeout(limit.as_millis() as u64))?
}

/// Poller for one flight controller
///
/// Owns the link driver, the telemetry sink and the connection state. Every
/// operation takes `&mut self`, so at most one poll cycle is ever in flight.
pub struct FcComms<L, S> {
    link: L,
    sink: S,
    state: ConnectionState,
    link_timeout: Duration,
    /// When the pending connect started, while `Connecting`
    connecting_since: Option<Instant>,
    ident: Option<FcIdent>,
    rc_override: Option<RawRcChannels>,
    last_snapshot: Option<TelemetrySnapshot>,
}

impl<L, S> std::fmt::Debug for FcComms<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcComms")
            .field("state", &self.state)
            .field("link_timeout", &self.link_timeout)
            .field("ident", &self.ident)
            .finish_non_exhaustive()
    }
}

impl<L: LinkDriver, S: TelemetrySink> FcComms<L, S> {
    /// Create a poller in the `Disconnected` state
    ///
    /// # Arguments
    ///
    /// * `link` - Link driver to the flight controller
    /// * `sink` - Receiver of decoded telemetry
    /// * `link_timeout` - Upper bound for each connect or request/reply exchange
    pub fn new(link: L, sink: S, link_timeout: Duration) -> Self {
        Self {
            link,
            sink,
            state: ConnectionState::Disconnected,
            link_timeout,
            connecting_since: None,
            ident: None,
            rc_override: None,
            last_snapshot: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Firmware identity, once the first poll after a connect has read it
    pub fn ident(&self) -> Option<FcIdent> {
        self.ident
    }

    /// Snapshot of the last successful poll cycle
    pub fn last_snapshot(&self) -> Option<TelemetrySnapshot> {
        self.last_snapshot
    }

    /// Queue RC values sent as SET_RAW_RC after every successful poll
    pub fn set_rc_override(&mut self, values: RawRcChannels) {
        self.rc_override = Some(values);
    }

    pub fn clear_rc_override(&mut self) {
        self.rc_override = None;
    }

    /// Register telemetry outputs and bind the link
    ///
    /// # Errors
    ///
    /// Returns error if the command catalog is inconsistent, or if the sink
    /// or link cannot claim their resources.
    pub async fn init(&mut self) -> Result<()> {
        validate_catalog(&CATALOG)?;
        self.sink.register()?;
        self.link.bind().await?;

        info!("FC Comms registered telemetry outputs and bound the link");
        Ok(())
    }

    /// Tick at `tick_hz` until `shutdown` resolves, then disconnect
    ///
    /// Ticks that come due while a poll cycle is still running are dropped;
    /// the next tick fires one full period after the overrunning cycle ends.
    /// A cycle in progress when `shutdown` resolves runs to completion
    /// before the link is torn down.
    pub async fn run<F>(&mut self, tick_hz: u32, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if tick_hz == 0 {
            return Err(FcCommsError::Invariant("tick rate must be at least 1 Hz".into()));
        }

        let period = Duration::from_secs_f64(1.0 / tick_hz as f64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Starting FC poll loop at {}Hz", tick_hz);

        loop {
            tokio::select! {
                deadline = ticker.tick() => {
                    self.tick().await;
                    if deadline.elapsed() >= period {
                        debug!("Poll cycle overran the {:?} tick period, dropping missed ticks", period);
                        ticker.reset();
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Tear down the link and return to `Disconnected`
    pub async fn shutdown(&mut self) -> Result<()> {
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        self.ident = None;
        within(self.link_timeout, self.link.disconnect()).await?;
        info!("Disconnected from flight controller");
        Ok(())
    }

    /// Evaluate the state once; returns the state after the tick
    pub async fn tick(&mut self) -> ConnectionState {
        match self.state {
            ConnectionState::Disconnected => self.try_connect().await,
            ConnectionState::Connecting => self.check_connecting().await,
            ConnectionState::Connected => self.poll().await,
        }

        self.state
    }

    async fn try_connect(&mut self) {
        debug!("FC link disconnected, attempting connect");

        match within(self.link_timeout, self.link.connect()).await {
            Ok(ConnectAttempt::Connected) => {
                info!("Connected to flight controller");
                self.state = ConnectionState::Connected;
            }
            Ok(ConnectAttempt::Pending) => {
                debug!("Connect in progress");
                self.state = ConnectionState::Connecting;
                self.connecting_since = Some(Instant::now());
            }
            Err(e) => {
                warn!("Connect attempt failed: {}", e);
            }
        }
    }

    async fn check_connecting(&mut self) {
        match self.link.status() {
            ConnectionState::Connected => {
                info!("Connected to flight controller");
                self.state = ConnectionState::Connected;
                self.connecting_since = None;
            }
            ConnectionState::Disconnected => {
                warn!("Connect attempt did not complete");
                self.state = ConnectionState::Disconnected;
                self.connecting_since = None;
            }
            ConnectionState::Connecting => {
                let expired = self
                    .connecting_since
                    .map_or(true, |since| since.elapsed() >= self.link_timeout);
                if expired {
                    warn!("Connect did not complete within {:?}, abandoning it", self.link_timeout);
                    self.drop_link().await;
                }
            }
        }
    }

    async fn poll(&mut self) {
        let snapshot = match self.poll_cycle().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Poll cycle aborted, dropping link: {}", e);
                self.drop_link().await;
                return;
            }
        };

        self.last_snapshot = Some(snapshot);

        if let Err(e) = self.sink.publish_battery(snapshot.battery_volts) {
            warn!("Failed to publish battery voltage: {}", e);
        }
        if let Err(e) = self.sink.publish_status(&snapshot.status()) {
            warn!("Failed to publish flight status: {}", e);
        }
    }

    async fn drop_link(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        self.ident = None;

        if let Err(e) = within(self.link_timeout, self.link.disconnect()).await {
            debug!("Link cleanup after fault failed: {}", e);
        }
    }

    async fn poll_cycle(&mut self) -> Result<TelemetrySnapshot> {
        if self.ident.is_none() {
            let reply = self.request(MSP_IDENT).await?;
            let ident = decode_ident(reply.payload()?)?;
            info!(
                "Flight controller firmware {} (type {}, MSP {}, capability 0x{:08X})",
                ident.version, ident.multitype, ident.msp_version, ident.capability
            );
            self.ident = Some(ident);
        }

        let status = self.request(MSP_STATUS).await?;
        let armed = decode_armed_flag(status.payload()?)?;

        let analog = self.request(MSP_ANALOG).await?;
        let battery_volts = decode_voltage(analog.payload()?)?;

        let rc = self.request(MSP_RC).await?;
        let channels = decode_rc_channels(rc.payload()?)?;
        let autopilot = decode_auto_enabled(rc.payload()?)?;
        debug!("RC channels: {:?}", channels);

        if let Some(values) = self.rc_override {
            let request = set_raw_rc_request(&values)?;
            self.command(&request).await?;
        }

        Ok(TelemetrySnapshot {
            armed,
            autopilot,
            failsafe: false,
            battery_volts,
        })
    }

    /// Exchange one payload-less request for its reply
    async fn request(&mut self, descriptor: CommandDescriptor) -> Result<ResponseMessage> {
        let request = RequestMessage::empty(descriptor)?;
        let frame = encode_request_frame(&request);

        let reply = within(self.link_timeout, self.link.send_receive(&frame)).await?;
        Ok(decode_response_frame(descriptor, &reply))
    }

    /// Send a request the firmware does not answer
    async fn command(&mut self, request: &RequestMessage) -> Result<()> {
        let frame = encode_request_frame(request);
        within(self.link_timeout, self.link.send(&frame)).await
    }
}
