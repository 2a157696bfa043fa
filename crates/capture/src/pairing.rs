//! WorldView pairing and near-duplicate suppression.
//!
//! Raw WorldView catalogs return many near-simultaneous, redundant,
//! and differently-processed images of the same ground location. This
//! module pairs each vis-multi image with its closest panchromatic
//! counterpart and then keeps at most one capture per time window,
//! biased toward the highest-quality source.

use chrono::Duration;
use tracing::debug;

use catalog_client::worldview::{Instrument, Representation, WorldViewRecord, MISSION_PREFERENCE};
use imagery_common::{CaptureRecord, Constellation, ProcessingLevel};

/// A vis-multi record with its resolved panchromatic partner, before
/// dedup binning.
#[derive(Debug, Clone)]
struct PairedImage {
    record: WorldViewRecord,
    pan_uri: Option<String>,
}

/// Reconstruct sharpenable captures from raw WorldView records.
///
/// `pan_window` bounds the timestamp distance between a vis-multi image
/// and its panchromatic match; `dedup_window` is the ± range inside
/// which lower-preference captures are suppressed. With `require_pan`,
/// captures that found no panchromatic partner are dropped.
pub fn pair_worldview(
    records: Vec<WorldViewRecord>,
    pan_window: Duration,
    dedup_window: Duration,
    require_pan: bool,
) -> Vec<CaptureRecord> {
    // Only unprocessed, uncompressed encodings are usable.
    let mut usable: Vec<WorldViewRecord> = records
        .into_iter()
        .filter(WorldViewRecord::is_uncompressed)
        .collect();
    usable.sort_by_key(|r| r.timestamp);

    let pans: Vec<&WorldViewRecord> = usable
        .iter()
        .filter(|r| r.instrument == Instrument::Panchromatic)
        .collect();

    let mut paired: Vec<PairedImage> = Vec::new();
    for record in usable.iter().filter(|r| r.instrument == Instrument::VisMulti) {
        let pan_uri = nearest_pan(&pans, record, pan_window).map(|p| p.uri.clone());
        if require_pan && pan_uri.is_none() {
            continue;
        }
        paired.push(PairedImage {
            record: record.clone(),
            pan_uri,
        });
    }

    let mut winners = bin_by_quality(&paired, dedup_window);
    winners.sort_by_key(|c| c.timestamp);

    debug!(
        paired = paired.len(),
        winners = winners.len(),
        "WorldView pairing complete"
    );
    winners
}

/// Find the panchromatic image closest in time to `target`, within
/// `window` on either side. When both neighbors qualify the temporally
/// closer one wins.
fn nearest_pan<'a>(
    pans: &[&'a WorldViewRecord],
    target: &WorldViewRecord,
    window: Duration,
) -> Option<&'a WorldViewRecord> {
    // `pans` is sorted by timestamp; split at the target time.
    let split = pans.partition_point(|p| p.timestamp < target.timestamp);

    let left = split
        .checked_sub(1)
        .and_then(|i| pans.get(i))
        .filter(|p| (target.timestamp - p.timestamp).abs() <= window);
    let right = pans
        .get(split)
        .filter(|p| (p.timestamp - target.timestamp).abs() <= window);

    match (left, right) {
        (Some(l), Some(r)) => {
            let dl = (target.timestamp - l.timestamp).abs();
            let dr = (r.timestamp - target.timestamp).abs();
            Some(if dl <= dr { l } else { r })
        }
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (None, None) => None,
    }
}

/// Deterministic quality binning.
///
/// Iterates the preference order representation × has-pan × mission
/// (most preferred first). Each capture claimed as a winner suppresses
/// every other unclaimed capture within ±`dedup_window` of its
/// timestamp, so at most one capture survives per window.
fn bin_by_quality(paired: &[PairedImage], dedup_window: Duration) -> Vec<CaptureRecord> {
    let mut claimed = vec![false; paired.len()];
    let mut suppressed = vec![false; paired.len()];
    let mut winners: Vec<CaptureRecord> = Vec::new();

    for representation in [Representation::Rgb, Representation::Multi] {
        for has_pan in [true, false] {
            for mission in MISSION_PREFERENCE {
                for i in 0..paired.len() {
                    if claimed[i] || suppressed[i] {
                        continue;
                    }
                    let candidate = &paired[i];
                    if candidate.record.representation != representation
                        || candidate.pan_uri.is_some() != has_pan
                        || candidate.record.mission != mission
                    {
                        continue;
                    }

                    claimed[i] = true;
                    for (j, other) in paired.iter().enumerate() {
                        if j != i
                            && !claimed[j]
                            && (other.record.timestamp - candidate.record.timestamp).abs()
                                <= dedup_window
                        {
                            suppressed[j] = true;
                        }
                    }
                    winners.push(to_capture(candidate));
                }
            }
        }
    }

    winners
}

fn to_capture(paired: &PairedImage) -> CaptureRecord {
    let record = &paired.record;
    CaptureRecord {
        constellation: Constellation::WorldView,
        timestamp: record.timestamp,
        bbox: record.bbox,
        uri: record.uri.clone(),
        pan_uri: paired.pan_uri.clone(),
        bits_per_pixel: record.bits_per_pixel,
        cloud_cover: record.cloud_cover,
        collection: "worldview-nitf".to_string(),
        level: Some(ProcessingLevel::L1),
        spectrum: None,
        tileable: record.uri.ends_with(".tif") || record.uri.ends_with(".tiff"),
    }
}
