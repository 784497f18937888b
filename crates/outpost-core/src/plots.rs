//! Empty plot discovery.

use outpost_types::{Coordinate, MapGeometry, PositionId};
use tracing::{debug, info, warn};

use crate::client::GameClient;
use crate::error::CoreError;
use crate::fetch::{PageFetcher, Submission};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::spiral::Spiral;

/// Probes between two progress reports.
const REPORT_EVERY: usize = 20;

/// A free map tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plot {
    /// Planar coordinate.
    pub coordinate: Coordinate,
    /// Tile id.
    pub id: PositionId,
    /// Settle action offered by the tile page.
    pub settle: Option<Submission>,
}

/// Bounds of one plot search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSearch {
    /// Search center, never itself a candidate.
    pub center: Coordinate,
    /// Largest ring probed.
    pub radius: u32,
    /// Stop after this many plots.
    pub max_spots: usize,
    /// Stop after probing this many tiles.
    pub max_candidates: usize,
}

/// Outcome of a plot search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotSearchResult {
    /// Plots found, in spiral order.
    pub plots: Vec<Plot>,
    /// Tiles probed.
    pub probed: usize,
}

/// Probe tiles in spiral order around `search.center` until enough empty
/// plots are found or the search space is exhausted.
///
/// Unreadable tiles count as occupied.
pub async fn find_empty_plots<F: PageFetcher>(
    client: &GameClient<F>,
    geometry: MapGeometry,
    search: PlotSearch,
    progress: &mut dyn ProgressSink,
) -> Result<PlotSearchResult, CoreError> {
    let mut plots = Vec::new();
    let mut probed: usize = 0;

    let candidates = Spiral::new(search.center, search.radius, usize::MAX)
        .within(geometry)
        .filter(|c| *c != search.center)
        .take(search.max_candidates);

    for coordinate in candidates {
        if plots.len() >= search.max_spots {
            break;
        }
        let id = geometry.from_coordinate(coordinate);
        let tile = client.map_tile(id).await;
        probed = probed.saturating_add(1);

        match tile {
            Ok(page) if page.empty => {
                info!(%coordinate, %id, "empty plot found");
                progress.emit(ProgressEvent::PlotFound(coordinate));
                plots.push(Plot {
                    coordinate,
                    id,
                    settle: page.settle,
                });
            }
            Ok(_) => debug!(%coordinate, "tile occupied"),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => warn!(%coordinate, error = %err, "tile unreadable, skipping"),
        }

        if probed % REPORT_EVERY == 0 {
            progress.emit(ProgressEvent::PlotSearch {
                probed,
                found: plots.len(),
            });
        }
    }

    info!(
        center = %search.center,
        probed,
        found = plots.len(),
        "plot search finished"
    );
    Ok(PlotSearchResult { plots, probed })
}
