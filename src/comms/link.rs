//! Link driver capability used by the connection state machine

use async_trait::async_trait;

use super::ConnectionState;
use crate::error::Result;

/// Outcome of a connect call that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// The link is up and can carry requests
    Connected,

    /// The link is still coming up; completion is reported by
    /// [`LinkDriver::status`]
    Pending,
}

/// Raw byte channel to the flight controller
///
/// Every method works on complete MSP frames; framing and validation stay in
/// the codec.
#[async_trait]
pub trait LinkDriver: Send {
    /// One-time bind/subscribe step, run by `FcComms::init`
    async fn bind(&mut self) -> Result<()> {
        Ok(())
    }

    /// Bring the link up
    async fn connect(&mut self) -> Result<ConnectAttempt>;

    /// Tear the link down
    async fn disconnect(&mut self) -> Result<()>;

    /// Write a frame that gets no reply
    async fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Write a request frame and return the reply frame bytes
    async fn send_receive(&mut self, frame: &[u8]) -> Result<Vec<u8>>;

    /// Current link status, polled while a connect is pending
    fn status(&self) -> ConnectionState;
}
