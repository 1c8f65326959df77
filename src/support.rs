//! Stützflächenprüfung für Kandidatenpositionen.
//!
//! Berechnet, welcher Anteil der Grundfläche eines Items auf Oberseiten bereits
//! platzierter Items (oder dem Boden) aufliegt.

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::overlap_area;
use crate::model::{PlacedItem, Supporter};
use crate::types::{
    BoundingBox, EPSILON_GENERAL, SUPPORT_HEIGHT_TOLERANCE, SUPPORT_RATIO_EPSILON, Vec3,
};

/// Ergebnis einer Stützflächenprüfung.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SupportCheck {
    pub valid: bool,
    pub ratio: f64,
    pub supporters: Vec<Supporter>,
}

impl SupportCheck {
    fn floor() -> Self {
        Self {
            valid: true,
            ratio: 1.0,
            supporters: vec![Supporter::Floor],
        }
    }
}

/// Prüft, ob ein Item an `position` ausreichend unterstützt wird.
///
/// * Auf dem Boden (z = 0) ist jede Position gültig, Ratio 1.0.
/// * Sonst zählen alle Items, deren Oberseite innerhalb von
///   `SUPPORT_HEIGHT_TOLERANCE` auf Höhe z liegt; ihre Überlappungsflächen
///   mit der Grundfläche werden aufsummiert.
/// * Gültig, wenn `ratio >= min_ratio - SUPPORT_RATIO_EPSILON`.
///
/// # Parameter
/// * `dims` - Abmessungen des Items
/// * `position` - Kandidaten-Ecke (min x, y, z)
/// * `placed` - Bereits platzierte Items
/// * `min_ratio` - Geforderte Mindestunterstützung (0.0 bis 1.0)
pub fn evaluate_support(
    dims: Vec3,
    position: Vec3,
    placed: &[PlacedItem],
    min_ratio: f64,
) -> SupportCheck {
    if position.z.abs() < EPSILON_GENERAL {
        return SupportCheck::floor();
    }

    let footprint = BoundingBox::from_position_and_dims(position, dims).footprint();
    let mut supported_area = 0.0;
    let mut supporters = Vec::new();

    for p in placed {
        if (p.top_z() - position.z).abs() >= SUPPORT_HEIGHT_TOLERANCE {
            continue;
        }
        let area = overlap_area(&footprint, &p.bounding_box().footprint());
        if area > 0.0 {
            supported_area += area;
            supporters.push(Supporter::Item(p.item.id));
        }
    }

    let base_area = footprint.area();
    let ratio = if base_area > 0.0 {
        supported_area / base_area
    } else {
        0.0
    };

    SupportCheck {
        valid: ratio >= min_ratio - SUPPORT_RATIO_EPSILON,
        ratio,
        supporters,
    }
}
