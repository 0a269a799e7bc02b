//! End-to-end voice turns against scripted oracle responses
//!
//! Covers the reference scenarios: a plain replace, a new row appended to a
//! repeating section, an append onto existing text, an all-unknown response
//! and a malformed response.

mod helpers;

use serde_json::json;

use helpers::{engine, ScriptedClient};
use voice_fill::{
    FieldPath, FocusedField, FormStore, FormTree, SharedForm, TurnOutcome, VoiceError,
};

#[tokio::test]
async fn set_client_name_on_empty_form() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {"clientDetails.clientName": "John Doe"},
        "summary": "Set the client name to John Doe"
    }));
    let mut engine = engine(client.clone());
    let mut form = FormTree::new();

    engine
        .start_recording(
            Some(FocusedField::new(
                "clientDetails.clientName",
                "text",
                "Client name",
            )),
            &form,
        )
        .unwrap();
    let outcome = engine
        .submit_transcript("set client name to John Doe", &mut form)
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Applied { report, summary, .. } => {
            assert_eq!(summary, "Set the client name to John Doe");
            assert_eq!(
                report.applied,
                vec![FieldPath::scalar("clientDetails", "clientName")]
            );
            assert!(report.rows_added.is_empty());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(form.as_value()["clientDetails"]["clientName"], "John Doe");
    assert_eq!(client.calls(), 1);
    assert!(engine.state().is_idle());
}

#[tokio::test]
async fn add_item_grows_section_before_writing() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {"items.1.rate": "5000"},
        "summary": "Added an item at 5000"
    }));
    let mut engine = engine(client);
    let mut form = FormTree::from_value(json!({
        "items": [{"description": "Design", "quantity": 1, "rate": "1200"}]
    }));

    engine
        .start_recording(Some(FocusedField::new("items.0.rate", "number", "Rate")), &form)
        .unwrap();
    let outcome = engine
        .submit_transcript("add another item, rate five thousand", &mut form)
        .await
        .unwrap();

    let TurnOutcome::Applied { report, .. } = outcome else {
        panic!("expected the item to be applied");
    };
    assert_eq!(report.rows_added.get("items"), Some(&1));
    assert_eq!(form.length("items").unwrap(), 2);
    assert_eq!(
        form.as_value()["items"][1],
        json!({"description": "", "quantity": 0, "rate": "5000"})
    );
    assert_eq!(form.as_value()["items"][0]["rate"], "1200");
}

#[tokio::test]
async fn append_to_introduction_joins_with_space() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {
            "scopeOfWork.introduction": {"value": "We also do mobile-first design.", "append": true}
        },
        "summary": "Mentioned mobile-first design"
    }));
    let mut engine = engine(client);
    let mut form = FormTree::from_value(json!({
        "scopeOfWork": {"introduction": "We build web apps."}
    }));

    engine
        .start_recording(
            Some(FocusedField::new(
                "scopeOfWork.introduction",
                "textarea",
                "Introduction",
            )),
            &form,
        )
        .unwrap();
    engine
        .submit_transcript("also mention we do mobile-first design", &mut form)
        .await
        .unwrap();

    assert_eq!(
        form.as_value()["scopeOfWork"]["introduction"],
        "We build web apps. We also do mobile-first design."
    );
}

#[tokio::test]
async fn unknown_paths_only_yield_no_actionable_data() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {"items.2.unknownAttr": "x"},
        "summary": "Updated something"
    }));
    let mut engine = engine(client);
    let mut form = FormTree::from_value(json!({"items": [{}]}));
    let before = form.clone();

    engine.start_recording(None, &form).unwrap();
    let outcome = engine
        .submit_transcript("set the colour of item three to blue", &mut form)
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::NoActionableData { .. }));
    assert_eq!(form, before);
    assert!(engine.state().is_idle());
}

#[tokio::test]
async fn malformed_oracle_response_fails_turn_and_leaves_form() {
    let client = ScriptedClient::new().reply_raw("Sure, I've set the client name for you!");
    let mut engine = engine(client.clone());
    let mut form = FormTree::from_value(json!({"clientDetails": {"clientName": "Old"}}));
    let before = form.clone();

    engine.start_recording(None, &form).unwrap();
    let err = engine
        .submit_transcript("set client name to John", &mut form)
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceError::InterpretationFailure(_)));
    assert_eq!(form, before);
    assert!(engine.state().is_idle());
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn oracle_transport_error_is_interpretation_failure() {
    let client = ScriptedClient::new().fail("503 Service Unavailable");
    let mut engine = engine(client);
    let mut form = FormTree::new();

    engine.start_recording(None, &form).unwrap();
    let err = engine
        .submit_transcript("set due date to next friday", &mut form)
        .await
        .unwrap_err();

    match err {
        VoiceError::InterpretationFailure(reason) => assert!(reason.contains("503")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(engine.state().is_idle());
}

#[tokio::test]
async fn mixed_response_keeps_valid_updates() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {
            "documentDetails.currency": "EUR",
            "documentDetails.colour": "blue",
            "scopeOfWork.timeline.0.phase": "Discovery",
            "scopeOfWork.timeline.0.duration": "2 weeks"
        },
        "summary": "Set currency and first phase"
    }));
    let mut engine = engine(client);
    let mut form = FormTree::new();

    engine
        .start_recording(
            Some(FocusedField::new(
                "documentDetails.currency",
                "text",
                "Currency",
            )),
            &form,
        )
        .unwrap();
    let outcome = engine
        .submit_transcript("currency euro, first phase discovery for two weeks", &mut form)
        .await
        .unwrap();

    let TurnOutcome::Applied { report, .. } = outcome else {
        panic!("expected applied outcome");
    };
    assert_eq!(report.count, 3);
    assert_eq!(form.as_value()["documentDetails"]["currency"], "EUR");
    assert_eq!(
        form.as_value()["scopeOfWork"]["timeline"][0],
        json!({"phase": "Discovery", "duration": "2 weeks", "description": ""})
    );
}

#[tokio::test]
async fn snapshot_shows_focus_and_lengths_to_oracle() {
    let client = ScriptedClient::new().reply(json!({"updates": {}, "summary": ""}));
    let mut engine = engine(client.clone());
    let mut form = FormTree::from_value(json!({
        "items": [{"description": "A"}, {"description": "B"}],
        "unrelated": {"secret": "not for the oracle"}
    }));

    engine
        .start_recording(
            Some(FocusedField::new(
                "clientDetails.email",
                "email",
                "Client email",
            )),
            &form,
        )
        .unwrap();
    engine
        .submit_transcript("john at example dot com", &mut form)
        .await
        .unwrap();

    let prompt = client.last_user_prompt().unwrap();
    assert!(prompt.contains("\"items\": 2"));
    assert!(prompt.contains("Client email"));
    assert!(!prompt.contains("not for the oracle"));
}

#[tokio::test]
async fn shared_form_is_updated_through_handle() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {"taxes.0.name": "VAT", "taxes.0.rate": 20},
        "summary": "Added VAT"
    }));
    let mut engine = engine(client);
    let shared = SharedForm::new(FormTree::new());
    let mut handle = shared.clone();

    engine
        .start_recording(Some(FocusedField::new("taxes.0.name", "text", "Tax name")), &handle)
        .unwrap();
    engine
        .submit_transcript("add VAT at twenty percent", &mut handle)
        .await
        .unwrap();

    let taxes = shared
        .read(|tree| tree.as_value()["taxes"].clone())
        .unwrap();
    assert_eq!(taxes, json!([{"name": "VAT", "rate": "20"}]));
}

#[tokio::test]
async fn oversized_row_indices_are_rejected_without_growth() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {
            "items.18446744073709551615.rate": "1",
            "items.500000000.rate": "2"
        },
        "summary": "Set two rates"
    }));
    let mut engine = engine(client);
    let mut form = FormTree::from_value(json!({"items": [{"description": "A"}]}));
    let before = form.clone();

    engine
        .start_recording(Some(FocusedField::new("items.0.rate", "number", "Rate")), &form)
        .unwrap();
    let outcome = engine
        .submit_transcript("rate is one, and two for item five hundred million", &mut form)
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::NoActionableData { .. }));
    assert_eq!(form, before);
    assert!(engine.state().is_idle());
}

#[tokio::test]
async fn snapshot_is_taken_when_recording_starts() {
    let client = ScriptedClient::new().reply(json!({
        "updates": {"items.0.rate": "900"},
        "summary": "Set the first rate"
    }));
    let mut engine = engine(client.clone());
    let mut form = FormTree::new();

    engine.start_recording(None, &form).unwrap();
    let row = engine.registry().default_row("items").unwrap();
    form.append_default_row("items", row).unwrap();

    let outcome = engine
        .submit_transcript("first item rate nine hundred", &mut form)
        .await
        .unwrap();

    assert!(client.last_user_prompt().unwrap().contains("\"items\": 0"));
    let TurnOutcome::AwaitingConfirmation(pending) = outcome else {
        panic!("bulk turns must wait for review");
    };
    assert_eq!(pending.update_set.growth.rows_to_add("items"), 1);

    engine.confirm(&mut form).unwrap();
    assert_eq!(form.length("items").unwrap(), 1);
    assert_eq!(form.as_value()["items"][0]["rate"], "900");
}
