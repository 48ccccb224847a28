//! Property-based tests for lifecycle rules and operator input parsing

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;

use specimen_shipping::shipments::{
    parse_inventory_ids, DomainViolation, Shipment, ShipmentAction, ShipmentState,
};
use specimen_shipping::workflows::{Progress, StepStatus};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap()
}

fn packed_shipment(time_packed: DateTime<Utc>) -> Shipment {
    serde_json::from_value(json!({
        "id": "SHP-P",
        "version": 1,
        "timeAdded": "2020-01-01T08:00:00Z",
        "state": "packed",
        "courierName": "FedEx",
        "trackingNumber": "TN-1",
        "fromLocationInfo": {"locationId": "A", "name": "A"},
        "toLocationInfo": {"locationId": "B", "name": "B"},
        "timePacked": time_packed
    }))
    .unwrap()
}

fn state_strategy() -> impl Strategy<Value = ShipmentState> {
    prop::sample::select(ShipmentState::ALL.to_vec())
}

fn inventory_id_strategy() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9-]{0,11}"
}

fn separator_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(",".to_string()),
        Just(", ".to_string()),
        Just(" ,".to_string()),
        Just(" ".to_string()),
        Just("\t".to_string()),
        Just(",\n".to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_send_time_must_not_precede_packed(offset_minutes in -10_000i64..10_000) {
        let shipment = packed_shipment(base_time());
        let time_sent = base_time() + Duration::minutes(offset_minutes);

        let result = shipment.check_time_order(ShipmentAction::Send, time_sent);
        if offset_minutes < 0 {
            prop_assert_eq!(result, Err(DomainViolation::TimeSentBeforePacked));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn prop_inventory_ids_survive_any_separator(
        ids in prop::collection::vec(inventory_id_strategy(), 1..12),
        separators in prop::collection::vec(separator_strategy(), 12),
        padding in "[ ,]{0,3}",
    ) {
        let mut input = padding.clone();
        for (id, separator) in ids.iter().zip(separators.iter()) {
            input.push_str(id);
            input.push_str(separator);
        }
        input.push_str(&padding);

        prop_assert_eq!(parse_inventory_ids(&input), ids);
    }

    #[test]
    fn prop_terminal_states_offer_no_actions(state in state_strategy()) {
        let actions = state.available_actions();
        prop_assert_eq!(actions.is_empty(), state.is_terminal());
        for action in actions {
            prop_assert!(action.is_allowed_from(state));
        }
    }

    #[test]
    fn prop_progress_has_at_most_one_current_step(state in state_strategy()) {
        let progress = Progress::for_state(state);
        prop_assert_eq!(progress.steps.len(), 6);
        prop_assert!(progress.count(StepStatus::Current) <= 1);
        prop_assert_eq!(progress.lost, state == ShipmentState::Lost);

        // done steps always form a prefix
        let first_not_done = progress
            .steps
            .iter()
            .position(|step| step.status != StepStatus::Done)
            .unwrap_or(progress.steps.len());
        prop_assert!(progress.steps[first_not_done..]
            .iter()
            .all(|step| step.status != StepStatus::Done));
    }
}
