//! Slot scanning.
//!
//! Builds a [`SlotMap`] by reading every position of a range once. A
//! position that cannot be read is recorded as unknown and the scan moves
//! on; only fatal errors (an expired session) abort it.

use std::ops::RangeInclusive;

use outpost_types::{Slot, SlotMap, SlotPosition};
use tracing::{debug, info, warn};

use crate::client::GameClient;
use crate::error::CoreError;
use crate::fetch::PageFetcher;
use crate::progress::{ProgressEvent, ProgressSink};

/// Scan every position in `range`, in ascending order.
pub async fn scan<F: PageFetcher>(
    client: &GameClient<F>,
    range: RangeInclusive<u32>,
    progress: &mut dyn ProgressSink,
) -> Result<SlotMap, CoreError> {
    let (first, last) = (*range.start(), *range.end());
    progress.emit(ProgressEvent::ScanStarted { first, last });

    let mut slots = SlotMap::new(range.clone());
    for raw in range {
        let position = SlotPosition(raw);
        let slot = match client.slot(position).await {
            Ok(page) => page.slot,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(%position, error = %err, "slot unreadable, recording as unknown");
                Slot::unknown(position)
            }
        };
        debug!(
            %position,
            occupancy = ?slot.occupancy,
            name = slot.name.as_deref().unwrap_or(""),
            level = slot.level,
            "slot scanned"
        );
        slots.record(slot.clone());
        progress.emit(ProgressEvent::SlotScanned(slot));
    }

    let (empty, occupied, unknown) = slots.tally();
    info!(first, last, empty, occupied, unknown, "scan finished");
    progress.emit(ProgressEvent::ScanFinished {
        empty,
        occupied,
        unknown,
    });
    Ok(slots)
}
