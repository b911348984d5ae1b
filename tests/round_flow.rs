//! Cross-module playback flow: decode board payloads, classify every grid
//! position, and drive a session to completion.

use tracesim::board::{BoardSnapshot, CellClass};
use tracesim::session::{RoundSession, round_delay};
use tracesim::stats::{DistanceStats, ObservedStats, format_optional};

fn board_payload(round: u32) -> String {
    // A 3x3 grid whose contents shift with the round index.
    let beacon = format!("B_id_{round}");
    format!(
        r#"{{"array": [
            [["{beacon}"], [], ["O_id_1"]],
            [[], ["B_id_07", "B_id_3", "O_id_2"], []],
            [["O_id_4", "O_id_5"], [], []]
        ]}}"#
    )
}

#[test]
fn every_grid_position_yields_exactly_one_cell() {
    let snapshot: BoardSnapshot =
        serde_json::from_str(&board_payload(0)).expect("board payload decodes");
    assert_eq!(snapshot.row_count(), 3);
    assert_eq!(snapshot.col_count(), 3);
    let rendered: usize = snapshot
        .rows()
        .iter()
        .map(|row| row.iter().map(|cell| cell.classify(None)).count())
        .sum();
    assert_eq!(rendered, 9);
}

#[test]
fn playback_fetches_each_round_once_then_stops() {
    let rounds_total = 4;
    let mut session = RoundSession::new(rounds_total);
    let mut fetched_rounds = Vec::new();

    while session.should_schedule() {
        let round = session.current_round();
        let snapshot: BoardSnapshot =
            serde_json::from_str(&board_payload(round)).expect("board payload decodes");
        assert_eq!(snapshot.rows()[0][0].label(), round.to_string());
        fetched_rounds.push(round);
        session.advance();
    }

    assert_eq!(fetched_rounds, vec![0, 1, 2, 3]);
    assert!(session.is_finished());
    assert!(round_delay(2.0).is_some());
}

#[test]
fn classification_matches_the_priority_rule_across_a_board() {
    let snapshot: BoardSnapshot =
        serde_json::from_str(&board_payload(9)).expect("board payload decodes");
    let rows = snapshot.rows();

    assert_eq!(rows[0][0].classify(Some("9")), CellClass::WantedBeacon);
    assert_eq!(rows[0][1].classify(Some("9")), CellClass::Empty);
    assert_eq!(rows[0][2].classify(Some("9")), CellClass::ObserversOnly);
    assert_eq!(rows[1][1].classify(Some("9")), CellClass::Beacon);
    assert_eq!(rows[1][1].label(), "3,07");
}

#[test]
fn finished_simulation_statistics_render_as_tables() {
    let distance: DistanceStats =
        serde_json::from_str(r#"{"a": 1.23456, "b": 2}"#).expect("distance stats");
    let values: Vec<String> = distance.values().collect();
    assert_eq!(values, vec!["1.235", "2.000"]);

    let observed = ObservedStats::parse(
        r#"{"rowMap": {"3": {"min": 0.25, "score": NaN}, "07": {"min": 1.5, "score": 2.0}}}"#,
    )
    .expect("observed stats parse after sanitization");
    assert_eq!(observed.properties(), vec!["min", "score"]);
    let rendered: Vec<Vec<String>> = observed
        .rows()
        .iter()
        .map(|row| row.values.iter().map(|(_, v)| format_optional(*v)).collect())
        .collect();
    assert_eq!(rendered[0], vec!["0.250", "-"]);
    assert_eq!(rendered[1], vec!["1.500", "2.000"]);
}
