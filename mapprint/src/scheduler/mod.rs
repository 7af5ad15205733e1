//! Tile fetch scheduling
//!
//! A page's tiles flow through two pull-based stages:
//!
//! ```text
//! LayerTileIterator ──pull──► TileQueueBuffer ──pull──► compositor
//!   one layer at a time        up to max_active
//!   plan + render context      tokens in flight,
//!   lazy token per tile        handed out in pull order
//! ```
//!
//! Pulling a token from the first stage starts its fetch. The buffer keeps
//! at most `max_active` tokens ahead of the compositor, which is the bound
//! on concurrent fetches. Output order is the pull order, so a page renders
//! the same whatever order the network answers in.
//!
//! Stopping is cooperative: on failure or cancellation the consumer calls
//! [`TileQueueBuffer::abort`], which stops the first stage and aborts every
//! buffered token exactly once.

mod buffer;
mod layers;

pub use buffer::TileQueueBuffer;
pub use layers::{LayerTileIterator, PendingTile};
