//! Outstanding-request tracking for asynchronous decode/detection
//!
//! Detection responses can race: a slow response for an old drawing, or for
//! an old request against the current drawing, must never overwrite newer
//! state. Each request therefore carries a ticket tagged with the surface it
//! was issued for and a generation counter; only a ticket matching both the
//! current surface identity and the latest generation is accepted.
//! Cancellation tokens ride along as an optimization so an in-flight worker
//! can stop early, but correctness never depends on them.

use planscale_raster::SurfaceId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared with a request's worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; all clones observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle identifying one issued request.
#[derive(Debug, Clone)]
pub struct DetectionTicket {
    surface: SurfaceId,
    generation: u64,
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl DetectionTicket {
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Token for the worker servicing this request.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Why a ticket is or is not acceptable right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    /// Matches the latest request for the current surface.
    Current,
    /// A newer request was issued after this one.
    Superseded,
    /// Issued for a surface that is no longer loaded.
    WrongSurface,
    /// Past its deadline; treated as "not detected", never fatal.
    Expired,
}

/// Single-outstanding-request bookkeeping.
///
/// Issuing a new request supersedes (and cancels) the previous one.
#[derive(Debug, Default)]
pub struct DetectionTracker {
    generation: u64,
    active_token: Option<CancellationToken>,
}

impl DetectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `surface`, superseding any in-flight request.
    pub fn begin(&mut self, surface: SurfaceId) -> DetectionTicket {
        self.begin_inner(surface, None)
    }

    /// Like [`begin`](Self::begin), with a deadline after which the response
    /// is rejected as [`TicketStatus::Expired`].
    pub fn begin_with_timeout(
        &mut self,
        surface: SurfaceId,
        timeout: Duration,
    ) -> DetectionTicket {
        self.begin_inner(surface, Some(Instant::now() + timeout))
    }

    fn begin_inner(&mut self, surface: SurfaceId, deadline: Option<Instant>) -> DetectionTicket {
        if let Some(previous) = self.active_token.take() {
            previous.cancel();
        }

        self.generation += 1;
        let token = CancellationToken::new();
        self.active_token = Some(token.clone());

        DetectionTicket { surface, generation: self.generation, deadline, token }
    }

    /// Judge a returning ticket against the current state.
    pub fn status(
        &self,
        ticket: &DetectionTicket,
        current_surface: Option<SurfaceId>,
    ) -> TicketStatus {
        if ticket.generation != self.generation {
            return TicketStatus::Superseded;
        }
        if current_surface != Some(ticket.surface) {
            return TicketStatus::WrongSurface;
        }
        if matches!(ticket.deadline, Some(deadline) if Instant::now() > deadline) {
            return TicketStatus::Expired;
        }

        TicketStatus::Current
    }

    /// Mark the active request as finished.
    pub fn finish(&mut self) {
        self.active_token = None;
    }

    /// Cancel any in-flight request; called when the drawing is replaced.
    pub fn invalidate(&mut self) {
        if let Some(previous) = self.active_token.take() {
            previous.cancel();
        }
        self.generation += 1;
    }
}
