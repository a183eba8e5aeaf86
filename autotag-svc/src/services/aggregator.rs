//! Tag aggregation
//!
//! Turns raw per-classifier candidates into the committed tag set for one
//! image. Pure function of its inputs and the threshold:
//!
//! - candidates whose confidence (as a percent) is strictly below the
//!   minimum are dropped; the boundary itself is inclusive
//! - within a category the highest-confidence survivor wins, first-seen on
//!   an exact tie (stable, never random)
//! - `roomtype/*` only survives when `scene/indoor` won the scene category
//! - output order is the vocabulary's fixed category order, so identical
//!   inputs always produce identical tag sets

use crate::classifiers::ClassifierResult;
use crate::vocab::{Category, Tag, TagSet};

/// Aggregate classifier candidates into the final tag set for one image.
pub fn aggregate(results: &[ClassifierResult], min_confidence_percent: f64) -> TagSet {
    let mut tags = TagSet::new();

    let scene_winner = select_winner(results, Category::Scene, min_confidence_percent);
    let indoor = matches!(&scene_winner, Some(t) if t.value() == "indoor");

    for category in Category::ALL {
        // Room type is conditional on an indoor scene, regardless of its
        // own confidence
        if category == Category::RoomType && !indoor {
            continue;
        }

        let winner = if category == Category::Scene {
            scene_winner.clone()
        } else {
            select_winner(results, category, min_confidence_percent)
        };

        if let Some(tag) = winner {
            tags.push(tag);
        }
    }

    tags
}

/// Pick the surviving candidate for one category.
///
/// Candidates outside the vocabulary are discarded; a strictly greater
/// confidence is required to displace an earlier candidate, which makes the
/// tie-break deterministic.
fn select_winner(
    results: &[ClassifierResult],
    category: Category,
    min_confidence_percent: f64,
) -> Option<Tag> {
    let mut best: Option<&ClassifierResult> = None;

    for result in results.iter().filter(|r| r.category == category) {
        if result.confidence * 100.0 < min_confidence_percent {
            continue;
        }
        if !category.permits(&result.value) {
            tracing::warn!(
                category = %category,
                value = %result.value,
                "Discarding candidate outside tag vocabulary"
            );
            continue;
        }

        match best {
            Some(current) if result.confidence <= current.confidence => {}
            _ => best = Some(result),
        }
    }

    best.and_then(|r| Tag::new(category, &r.value))
}
