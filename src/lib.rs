//! Client-side console for a beacon tracing simulation service.
//!
//! The backend runs the simulations and stores per-round board snapshots
//! alongside aggregate statistics; this crate only consumes them. It polls
//! the REST surface once per round and paints the real and estimated boards,
//! lists stored simulations, and deletes them on request.

pub mod board;
pub mod client;
pub mod listing;
pub mod session;
pub mod stats;
pub mod terminal;

pub use board::{Agent, BeaconId, BoardKind, BoardSnapshot, Cell, CellClass};
pub use client::{ClientError, ListSort, SimulationClient, SortDirection};
pub use listing::{SimulationListing, SimulationRow, build_listing};
pub use session::{RoundSession, round_delay};
pub use stats::{DistanceStats, ObservedStats};
