//! Collaborator seams: where positions come from and who grants access.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::protocol::Position;

/// A stream of device positions at the device's own cadence.
///
/// `next_position` must be cancel-safe: the publisher polls it inside
/// `select!` and may drop the future between positions.
#[async_trait]
pub trait PositionSource: Send {
    /// The next position, or `None` when the source has ended.
    async fn next_position(&mut self) -> Option<Position>;
}

#[async_trait]
impl PositionSource for mpsc::Receiver<Position> {
    async fn next_position(&mut self) -> Option<Position> {
        self.recv().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// The device permission subsystem. `request` may wait indefinitely for
/// the user's decision.
#[async_trait]
pub trait LocationPermission: Send + Sync {
    async fn request(&self) -> PermissionStatus;
}

/// A permission that always answers the same way. Used by the CLI, where
/// positions come from a file rather than a device.
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub PermissionStatus);

#[async_trait]
impl LocationPermission for FixedPermission {
    async fn request(&self) -> PermissionStatus {
        self.0
    }
}
