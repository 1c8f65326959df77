//! Platzierungslogik: ein Item pro Schritt in den passenden freien Raum.
//!
//! Dieses Modul implementiert die Zustandsmaschine eines Packlaufs:
//! - Vorab-Sortierung der wartenden Items (Strategie)
//! - Auswahl des freien Raums (niedrigster, dann kleinster zuerst)
//! - Stützflächenprüfung und Aufteilung der freien Räume
//!
//! Jeder Schritt liefert einen neuen `PackingState`; übergebene Zustände werden
//! nie verändert.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{ValidationError, validate_dimensions_3d, validate_ratio};
use crate::model::{Item, PlacedItem, Supporter};
use crate::space::{Space, SpaceIdSequence, create_container, split_spaces};
use crate::support::evaluate_support;
use crate::types::{BoundingBox, Dimensional, Dimensions, Vec3};

/// Vorab-Sortierung der wartenden Items.
///
/// Die Strategie bestimmt nur die Reihenfolge, nicht die Platzierung selbst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Eingabereihenfolge.
    #[default]
    FirstFit,
    /// Absteigend nach Volumen.
    FirstFitDecreasing,
    /// Absteigend nach Höhe.
    FirstFitHeight,
    /// Wählbar, verhält sich derzeit wie `FirstFit`.
    ConflictGraph,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::FirstFit,
        Strategy::FirstFitDecreasing,
        Strategy::FirstFitHeight,
        Strategy::ConflictGraph,
    ];

    /// Anzeigename der Strategie.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::FirstFit => "First Fit",
            Strategy::FirstFitDecreasing => "First Fit Decreasing",
            Strategy::FirstFitHeight => "First Fit Height",
            Strategy::ConflictGraph => "Conflict Graph / Parallel",
        }
    }

    /// Sortiert die Items stabil gemäß Strategie.
    pub fn order(&self, items: &mut [Item]) {
        match self {
            Strategy::FirstFit | Strategy::ConflictGraph => {}
            Strategy::FirstFitDecreasing => items.sort_by(|a, b| {
                b.volume()
                    .partial_cmp(&a.volume())
                    .unwrap_or(Ordering::Equal)
            }),
            Strategy::FirstFitHeight => items.sort_by(|a, b| {
                b.height()
                    .partial_cmp(&a.height())
                    .unwrap_or(Ordering::Equal)
            }),
        }
    }
}

/// Reihenfolge, in der freie Räume für ein Item geprüft werden.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpaceHeuristic {
    /// Niedrigste Bodenhöhe, dann kleinstes Volumen.
    #[default]
    LowestSmallest,
    /// Niedrigste Bodenhöhe, dann kleinstes Y, dann kleinstes X.
    BottomLeftBack,
    /// Kleinstes Volumen, dann niedrigste Bodenhöhe.
    SmallestVolume,
}

impl SpaceHeuristic {
    /// Vergleicht zwei Räume; Restgleichstand wird über die Id aufgelöst.
    pub fn compare(&self, a: &Space, b: &Space) -> Ordering {
        let by_z = || compare_f64(a.bounds.min.z, b.bounds.min.z);
        let by_volume = || compare_f64(a.volume, b.volume);
        let primary = match self {
            SpaceHeuristic::LowestSmallest => by_z().then_with(by_volume),
            SpaceHeuristic::BottomLeftBack => by_z()
                .then_with(|| compare_f64(a.bounds.min.y, b.bounds.min.y))
                .then_with(|| compare_f64(a.bounds.min.x, b.bounds.min.x)),
            SpaceHeuristic::SmallestVolume => by_volume().then_with(by_z),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Konfiguration für einen Packlauf.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingConfig {
    /// Minimaler Anteil der Grundfläche, der unterstützt sein muss (0.0 bis 1.0)
    pub support_ratio: f64,
    /// Reihenfolge der Raumauswahl
    pub heuristic: SpaceHeuristic,
}

impl PackingConfig {
    pub const DEFAULT_SUPPORT_RATIO: f64 = 0.6;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }

    /// Prüft die Grenzwerte.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_ratio(self.support_ratio, "Support ratio")
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            support_ratio: Self::DEFAULT_SUPPORT_RATIO,
            heuristic: SpaceHeuristic::default(),
        }
    }
}

/// Builder-Pattern für PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Setzt die minimale Unterstützungsrate.
    pub fn support_ratio(mut self, ratio: f64) -> Self {
        self.config.support_ratio = ratio;
        self
    }

    /// Setzt die Heuristik der Raumauswahl.
    pub fn heuristic(mut self, heuristic: SpaceHeuristic) -> Self {
        self.config.heuristic = heuristic;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Vollständiger Zustand eines Packlaufs.
///
/// # Felder
/// * `container` - Containerabmessungen
/// * `active` - Aktuell freie maximale Räume
/// * `history` - Append-only Protokoll aller Raumzustände
/// * `packed` - Platzierte Items in Platzierungsreihenfolge
/// * `pending` - Noch zu verarbeitende Items (vorne = nächstes)
/// * `unpacked` - Items ohne passenden Raum
/// * `is_complete` - Lauf beendet
/// * `step` - Anzahl erfolgreicher Platzierungen
/// * `ordered` - Strategie-Sortierung wurde bereits angewandt
/// * `space_ids` - Id-Quelle für neue Räume dieses Laufs (Pflichtfeld, sonst
///   würden bereits vergebene Ids erneut ausgegeben)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingState {
    pub container: Dimensions,
    pub active: Vec<Space>,
    pub history: Vec<Space>,
    pub packed: Vec<PlacedItem>,
    pub pending: Vec<Item>,
    pub unpacked: Vec<Item>,
    pub is_complete: bool,
    pub step: usize,
    #[serde(default)]
    pub ordered: bool,
    pub space_ids: SpaceIdSequence,
}

impl PackingState {
    /// Startzustand: ein freier Raum in Containergröße, alle Items wartend.
    pub fn new(container: Dimensions, items: Vec<Item>) -> Self {
        let mut space_ids = SpaceIdSequence::new();
        let root = create_container(container, &mut space_ids);
        Self {
            container,
            active: vec![root.clone()],
            history: vec![root],
            packed: Vec::new(),
            pending: items,
            unpacked: Vec::new(),
            is_complete: false,
            step: 0,
            ordered: false,
            space_ids,
        }
    }

    /// Summe der Volumina aller platzierten Items.
    pub fn packed_volume(&self) -> f64 {
        self.packed.iter().map(|p| p.volume()).sum()
    }

    /// Volumen des Containers.
    pub fn container_volume(&self) -> f64 {
        self.container.volume()
    }

    /// Auslastung als Anteil (0.0 bis 1.0).
    pub fn utilization(&self) -> f64 {
        let total = self.container_volume();
        if total <= 0.0 {
            return 0.0;
        }
        self.packed_volume() / total
    }

    /// Auslastung in Prozent.
    pub fn utilization_percent(&self) -> f64 {
        self.utilization() * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Prüft einen von außen gelieferten Zustand (z. B. deserialisiert).
    ///
    /// * Containerabmessungen müssen positiv sein
    /// * Wartende und platzierte Items werden mit `Item::validated` neu geprüft
    /// * `space_ids` muss jede bereits vergebene Raum-Id übersteigen
    pub fn validated(self) -> Result<Self, ValidationError> {
        validate_dimensions_3d(self.container.as_tuple(), "Container")?;

        let max_id = self
            .active
            .iter()
            .chain(&self.history)
            .map(|space| space.id)
            .max();
        if let Some(max_id) = max_id {
            if self.space_ids.issued() <= max_id {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "space id sequence is at {} but id {} is already in use",
                    self.space_ids.issued(),
                    max_id
                )));
            }
        }

        let pending = self
            .pending
            .into_iter()
            .map(Item::validated)
            .collect::<Result<Vec<_>, _>>()?;
        let packed = self
            .packed
            .into_iter()
            .map(|placed| {
                Ok(PlacedItem {
                    item: placed.item.validated()?,
                    ..placed
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            pending,
            packed,
            ..self
        })
    }
}

/// Ereignisse eines Packlaufs, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Ein Item wurde platziert.
    ItemPlaced {
        step: usize,
        id: usize,
        pos: Vec3,
        dims: Vec3,
        rotation: u8,
        support_ratio: f64,
        supporters: Vec<Supporter>,
        active_spaces: usize,
    },
    /// Ein Item passte in keinen freien Raum.
    ItemRejected { id: usize, dims: Vec3 },
    /// Lauf abgeschlossen.
    Finished {
        packed: usize,
        unpacked: usize,
        utilization_percent: f64,
    },
}

/// Ergebnis eines einzelnen Schritts.
enum StepOutcome {
    Placed,
    Rejected,
    Finished,
    Idle,
}

/// Führt einen Platzierungsversuch aus und liefert den Folgezustand.
///
/// Ein bereits abgeschlossener Zustand wird unverändert zurückgegeben.
///
/// # Parameter
/// * `state` - Aktueller Zustand (bleibt unverändert)
/// * `strategy` - Vorab-Sortierung, greift nur beim ersten Schritt
/// * `support_threshold` - Mindestunterstützung (0.0 bis 1.0)
/// * `heuristic` - Raumauswahl, Standard `LowestSmallest`
pub fn step(
    state: &PackingState,
    strategy: Strategy,
    support_threshold: f64,
    heuristic: Option<SpaceHeuristic>,
) -> PackingState {
    let mut next = state.clone();
    advance(
        &mut next,
        strategy,
        support_threshold,
        heuristic.unwrap_or_default(),
    );
    next
}

/// Packt alle Items bis zum Abschluss.
pub fn run_to_completion(
    strategy: Strategy,
    items: Vec<Item>,
    container: Dimensions,
    support_threshold: f64,
    heuristic: Option<SpaceHeuristic>,
) -> PackingState {
    run_to_completion_with_progress(
        strategy,
        items,
        container,
        support_threshold,
        heuristic,
        |_| ControlFlow::Continue(()),
    )
}

/// Wie `run_to_completion`, ruft aber für jeden Schritt ein Callback auf
/// (geeignet für SSE).
///
/// Liefert das Callback `ControlFlow::Break`, endet der Lauf sofort; der bis
/// dahin erreichte Zustand wird unvollständig zurückgegeben und kein
/// `Finished`-Ereignis gesendet.
pub fn run_to_completion_with_progress(
    strategy: Strategy,
    items: Vec<Item>,
    container: Dimensions,
    support_threshold: f64,
    heuristic: Option<SpaceHeuristic>,
    mut on_event: impl FnMut(&PackEvent) -> ControlFlow<()>,
) -> PackingState {
    let heuristic = heuristic.unwrap_or_default();
    let mut state = PackingState::new(container, items);

    loop {
        let flow = match advance(&mut state, strategy, support_threshold, heuristic) {
            StepOutcome::Placed => match state.packed.last() {
                Some(placed) => on_event(&PackEvent::ItemPlaced {
                    step: state.step,
                    id: placed.item.id,
                    pos: placed.position,
                    dims: placed.item.dims,
                    rotation: placed.item.rotation.index(),
                    support_ratio: placed.support_ratio,
                    supporters: placed.supporters.clone(),
                    active_spaces: state.active.len(),
                }),
                None => ControlFlow::Continue(()),
            },
            StepOutcome::Rejected => match state.unpacked.last() {
                Some(item) => on_event(&PackEvent::ItemRejected {
                    id: item.id,
                    dims: item.dims,
                }),
                None => ControlFlow::Continue(()),
            },
            StepOutcome::Finished | StepOutcome::Idle => break,
        };
        if flow.is_break() {
            debug!(
                packed = state.packed.len(),
                pending = state.pending.len(),
                "packing run stopped by caller"
            );
            return state;
        }
    }

    debug!(
        strategy = strategy.label(),
        packed = state.packed.len(),
        unpacked = state.unpacked.len(),
        utilization_percent = state.utilization_percent(),
        "packing run finished"
    );
    let _ = on_event(&PackEvent::Finished {
        packed: state.packed.len(),
        unpacked: state.unpacked.len(),
        utilization_percent: state.utilization_percent(),
    });
    state
}

/// Verarbeitet das nächste wartende Item in einem eigenen Zustand.
fn advance(
    state: &mut PackingState,
    strategy: Strategy,
    support_threshold: f64,
    heuristic: SpaceHeuristic,
) -> StepOutcome {
    if state.is_complete {
        return StepOutcome::Idle;
    }
    if !state.ordered {
        strategy.order(&mut state.pending);
        state.ordered = true;
    }
    if state.pending.is_empty() {
        state.is_complete = true;
        return StepOutcome::Finished;
    }

    let item = state.pending.remove(0);

    let mut candidates: Vec<&Space> = state.active.iter().collect();
    candidates.sort_by(|a, b| heuristic.compare(a, b));

    let placement = candidates.into_iter().find_map(|space| {
        if !item.fits_in(&space.dimensions()) {
            return None;
        }
        let position = space.min_corner();
        let check = evaluate_support(item.dims, position, &state.packed, support_threshold);
        check.valid.then_some((position, check))
    });

    match placement {
        Some((position, check)) => {
            debug!(
                id = item.id,
                x = position.x,
                y = position.y,
                z = position.z,
                ratio = check.ratio,
                "item placed"
            );
            let item_box = BoundingBox::from_position_and_dims(position, item.dims);
            state.step += 1;
            let outcome = split_spaces(&state.active, &item_box, state.step, &mut state.space_ids);
            state.active = outcome.active;
            state.history.extend(outcome.history);
            state.packed.push(PlacedItem {
                item,
                position,
                supporters: check.supporters,
                support_ratio: check.ratio,
            });
            StepOutcome::Placed
        }
        None => {
            debug!(id = item.id, "no space fits item");
            state.unpacked.push(item);
            StepOutcome::Rejected
        }
    }
}
