//! Bounded pull-ahead buffer over a tile source.

use std::collections::VecDeque;

use tracing::debug;

use super::layers::{LayerTileIterator, PendingTile};
use crate::layer::LayerError;

/// Keeps up to `max_active` tokens pulled ahead of the consumer.
///
/// Pulling a token starts its fetch, so `max_active` bounds the number of
/// fetches in flight. Tokens are handed out in the order they were pulled,
/// whatever order their fetches complete in.
pub struct TileQueueBuffer {
    source: LayerTileIterator,
    queue: VecDeque<PendingTile>,
    max_active: usize,
    exhausted: bool,
    aborted: bool,
}

impl TileQueueBuffer {
    pub fn new(source: LayerTileIterator, max_active: usize) -> Self {
        let max_active = max_active.max(1);
        Self {
            source,
            queue: VecDeque::with_capacity(max_active),
            max_active,
            exhausted: false,
            aborted: false,
        }
    }

    /// Tops the buffer up and returns the oldest pulled token.
    ///
    /// A source error is returned as is; the caller is expected to
    /// [`abort`](Self::abort) the buffer afterwards.
    pub async fn next(&mut self) -> Result<Option<PendingTile>, LayerError> {
        if self.aborted {
            return Ok(None);
        }

        while !self.exhausted && self.queue.len() < self.max_active {
            match self.source.next().await? {
                Some(tile) => self.queue.push_back(tile),
                None => self.exhausted = true,
            }
            tokio::task::yield_now().await;
        }
        Ok(self.queue.pop_front())
    }

    /// Number of tokens pulled but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    /// Stops pulling and aborts every buffered token.
    ///
    /// Returns how many tokens were aborted. Calling it again is a no-op.
    pub fn abort(&mut self) -> usize {
        if self.aborted {
            return 0;
        }
        self.aborted = true;
        self.source.stop();

        let count = self.queue.len();
        for tile in self.queue.drain(..) {
            tile.token.abort();
        }
        debug!(aborted = count, "Tile queue aborted");
        count
    }
}

impl Drop for TileQueueBuffer {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLng;
    use crate::job::{Page, PrintOptions, PrintSize, ZoomSelection};
    use crate::layer::{LayerKind, TileInfo};
    use crate::scheduler::tests::StubRaster;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn source(layers: Vec<LayerKind>) -> LayerTileIterator {
        let page = Page::from_center(LatLng::new(10.0, 10.0), PrintSize::new(50.0, 50.0), 500.0, "1")
            .unwrap();
        LayerTileIterator::new(
            layers,
            PrintOptions::for_page(&page, 0, 1, 100.0, 500.0),
            ZoomSelection::new(14, 16),
            CancellationToken::new(),
        )
    }

    fn tile_id(info: TileInfo) -> f64 {
        match info {
            TileInfo::Raster(raster) => raster.tile_pos.x,
            other => panic!("unexpected tile {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_yields_in_pull_order_not_completion_order() {
        // later tiles finish first
        let layer = StubRaster::new("M", 6).with_delays(vec![60, 50, 40, 30, 20, 10]);
        let mut buffer = TileQueueBuffer::new(source(vec![LayerKind::raster(layer)]), 3);

        let mut ids = Vec::new();
        while let Some(tile) = buffer.next().await.unwrap() {
            ids.push(tile_id(tile.token.settle().await.unwrap()));
        }
        assert_eq!(ids, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_pull_ahead_is_bounded() {
        let layer = StubRaster::new("M", 10).pending();
        let started = layer.started();
        let mut buffer = TileQueueBuffer::new(source(vec![LayerKind::raster(layer)]), 4);

        let first = buffer.next().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(started.load(Ordering::SeqCst), 4);
        assert_eq!(buffer.buffered(), 3);
        drop(first);
    }

    #[tokio::test]
    async fn test_abort_reaches_every_buffered_token_once() {
        let layer = StubRaster::new("M", 10).pending();
        let aborts = layer.aborts();
        let mut buffer = TileQueueBuffer::new(source(vec![LayerKind::raster(layer)]), 4);

        let first = buffer.next().await.unwrap().unwrap();
        assert_eq!(buffer.abort(), 3);
        assert_eq!(aborts.load(Ordering::SeqCst), 3);

        assert_eq!(buffer.abort(), 0);
        assert!(buffer.next().await.unwrap().is_none());
        drop(buffer);
        assert_eq!(aborts.load(Ordering::SeqCst), 3);

        first.token.abort();
        assert_eq!(aborts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_settled_tokens_are_not_aborted() {
        let layer = StubRaster::new("M", 2);
        let aborts = layer.aborts();
        let mut buffer = TileQueueBuffer::new(source(vec![LayerKind::raster(layer)]), 20);

        while let Some(tile) = buffer.next().await.unwrap() {
            tile.token.settle().await.unwrap();
        }
        drop(buffer);
        assert_eq!(aborts.load(Ordering::SeqCst), 0);
    }
}
