//! Board snapshots and the per-cell classification rule.
//!
//! The wire format encodes agents as bare strings (`"B_id_7"`, `"O_id_12"`);
//! they are decoded into [`Agent`] variants once at ingestion so that no
//! renderer re-parses identifier strings.

use std::fmt;

use serde::Deserialize;

/// Leading marker character tagging a beacon agent on the wire.
pub const BEACON_MARKER: char = 'B';
/// Byte offset of the numeric id suffix in a beacon identifier (`B_id_<n>`).
pub const BEACON_ID_OFFSET: usize = 5;

/// Numeric identifier of a beacon, kept in its wire spelling.
///
/// The spelling is preserved (`"07"` stays `"07"`) because the beacon of
/// interest is matched by string equality, but ordering is numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconId(String);

impl BeaconId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it parses as one.
    pub fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An agent occupying a board cell, decoded from its wire identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Agent {
    Beacon(BeaconId),
    Observer,
}

impl Agent {
    /// Decode a wire identifier. Anything not tagged with the beacon marker
    /// is an observer.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(BEACON_MARKER) {
            let id = raw.get(BEACON_ID_OFFSET..).unwrap_or("");
            Agent::Beacon(BeaconId::new(id))
        } else {
            Agent::Observer
        }
    }

    pub fn beacon_id(&self) -> Option<&BeaconId> {
        match self {
            Agent::Beacon(id) => Some(id),
            Agent::Observer => None,
        }
    }
}

/// Which of the two per-round snapshot variants to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    Real,
    Estimated,
}

impl BoardKind {
    pub fn is_real(self) -> bool {
        matches!(self, BoardKind::Real)
    }

    pub fn label(self) -> &'static str {
        match self {
            BoardKind::Real => "Real board",
            BoardKind::Estimated => "Estimated board",
        }
    }
}

/// Display class of a cell. The variants are listed in priority order;
/// classification takes the first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Empty,
    WantedBeacon,
    Beacon,
    ObserversOnly,
}

/// One board position holding an ordered list of agents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    agents: Vec<Agent>,
}

impl Cell {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Ids of the beacons in this cell, sorted ascending by numeric value.
    /// Ids that do not parse as numbers sort after the ones that do.
    pub fn beacon_ids(&self) -> Vec<&BeaconId> {
        let mut ids: Vec<&BeaconId> = self
            .agents
            .iter()
            .filter_map(Agent::beacon_id)
            .collect();
        ids.sort_by(|a, b| match (a.numeric(), b.numeric()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.as_str().cmp(b.as_str()),
        });
        ids
    }

    /// Comma-joined sorted beacon ids, shown as the cell's label.
    pub fn label(&self) -> String {
        self.beacon_ids()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Classify the cell against the selected beacon of interest.
    ///
    /// First match wins: empty, contains the wanted beacon, contains any
    /// beacon, observers only. An empty selection never matches.
    pub fn classify(&self, wanted: Option<&str>) -> CellClass {
        if self.agents.is_empty() {
            return CellClass::Empty;
        }
        let beacon_ids = self.beacon_ids();
        let wanted_here = wanted
            .filter(|w| !w.is_empty())
            .is_some_and(|w| beacon_ids.iter().any(|id| id.as_str() == w));
        if wanted_here {
            return CellClass::WantedBeacon;
        }
        if !beacon_ids.is_empty() {
            return CellClass::Beacon;
        }
        CellClass::ObserversOnly
    }
}

#[derive(Debug, Deserialize)]
struct BoardStateDto {
    array: Vec<Vec<Vec<String>>>,
}

/// Full grid of per-cell agent lists for one round, in one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BoardStateDto")]
pub struct BoardSnapshot {
    rows: Vec<Vec<Cell>>,
}

impl From<BoardStateDto> for BoardSnapshot {
    fn from(dto: BoardStateDto) -> Self {
        let rows = dto
            .array
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|ids| Cell::new(ids.iter().map(|raw| Agent::parse(raw)).collect()))
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

impl BoardSnapshot {
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}
