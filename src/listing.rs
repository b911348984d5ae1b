//! Tabular view over the stored-simulations mapping.
//!
//! Column order is taken from the first record as received on the wire;
//! `serde_json`'s order-preserving map makes that an explicit property of the
//! decoded data rather than an accident of map iteration.

use serde_json::{Map, Value};
use url::Url;

/// Page that plays back a simulation, reached with the metadata serialized
/// as a query string.
pub const VISUALIZATION_PAGE: &str = "simulation_visualization.html";

/// One listed simulation: its id, the visualization deep link, and the
/// metadata values in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRow {
    pub id: String,
    pub visualize_url: String,
    pub values: Vec<String>,
}

/// Header plus one row per stored simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationListing {
    pub header: Vec<String>,
    pub rows: Vec<SimulationRow>,
}

/// Build the listing table. An empty mapping yields nothing: no header, no
/// rows.
pub fn build_listing(base: &Url, simulations: &Map<String, Value>) -> Option<SimulationListing> {
    let first = simulations.values().next()?;
    let header: Vec<String> = first
        .as_object()
        .map(|meta| meta.keys().cloned().collect())
        .unwrap_or_default();

    let rows = simulations
        .iter()
        .map(|(id, meta)| {
            let record = meta.as_object();
            let values = header
                .iter()
                .map(|field| {
                    record
                        .and_then(|m| m.get(field))
                        .map(scalar_to_string)
                        .unwrap_or_default()
                })
                .collect();
            SimulationRow {
                id: id.clone(),
                visualize_url: visualize_url(base, id, meta),
                values,
            }
        })
        .collect();

    Some(SimulationListing { header, rows })
}

/// Deep link to the visualization view: the metadata copied field by field,
/// the id attached, everything serialized as a query string.
pub fn visualize_url(base: &Url, id: &str, metadata: &Value) -> String {
    // `SimulationClient::new` only accepts http(s) bases, so a relative page
    // path always joins.
    let mut url = base
        .join(VISUALIZATION_PAGE)
        .expect("relative page path joins onto an http base");
    {
        let mut query = url.query_pairs_mut();
        if let Some(record) = metadata.as_object() {
            for (field, value) in record {
                query.append_pair(field, &scalar_to_string(value));
            }
        }
        query.append_pair("id", id);
    }
    url.into()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8080").expect("base url")
    }

    fn simulations(payload: &str) -> Map<String, Value> {
        serde_json::from_str(payload).expect("listing payload")
    }

    #[test]
    fn empty_mapping_renders_nothing() {
        assert!(build_listing(&base(), &Map::new()).is_none());
    }

    #[test]
    fn header_comes_from_first_record_in_wire_order() {
        let sims = simulations(
            r#"{
                "sim-1": {"description": "a", "roundsNum": 10, "rowsNum": 3},
                "sim-2": {"description": "b", "roundsNum": 20, "rowsNum": 4}
            }"#,
        );
        let listing = build_listing(&base(), &sims).expect("listing");
        assert_eq!(listing.header, vec!["description", "roundsNum", "rowsNum"]);
        assert_eq!(listing.rows.len(), 2);
        assert_eq!(listing.rows[0].values, vec!["a", "10", "3"]);
        assert_eq!(listing.rows[1].id, "sim-2");
    }

    #[test]
    fn rows_follow_the_header_even_when_records_disagree() {
        let sims = simulations(
            r#"{
                "sim-1": {"description": "a", "roundsNum": 10},
                "sim-2": {"roundsNum": 20}
            }"#,
        );
        let listing = build_listing(&base(), &sims).expect("listing");
        assert_eq!(listing.rows[1].values, vec!["", "20"]);
    }

    #[test]
    fn visualize_link_carries_metadata_and_id() {
        let sims = simulations(r#"{"sim-1": {"description": "run one", "roundsNum": 10}}"#);
        let listing = build_listing(&base(), &sims).expect("listing");
        let url = &listing.rows[0].visualize_url;
        assert!(url.starts_with("http://127.0.0.1:8080/simulation_visualization.html?"));
        assert!(url.contains("description=run+one"));
        assert!(url.contains("roundsNum=10"));
        assert!(url.contains("id=sim-1"));
    }
}
