//! Reply behaviour between agents sharing a channel.

mod common;

use common::*;

use agora_core::{Message, AUTO_RESPONSE_KEY};

#[tokio::test]
async fn test_single_round_trip_between_two_agents() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    let bob = add_agent(&registry, "bob").await;
    alice.subscribe_to_channel(general.clone());
    bob.subscribe_to_channel(general.clone());
    let mut observer = general.attach();

    assert!(alice.send_message("general", "hi").unwrap());

    let first = next(&mut observer).await;
    assert_eq!(first.sender_id, "alice");
    assert_eq!(first.message.content(), "hi");
    assert!(!first.message.is_auto_response());

    let reply = next(&mut observer).await;
    assert_eq!(reply.sender_id, "bob");
    assert_eq!(reply.sender_name, "Bob");
    assert!(reply.message.is_auto_response());
    assert_eq!(reply.message.metadata()[AUTO_RESPONSE_KEY], serde_json::json!(true));
    assert!(reply.offset > first.offset);

    // Alice hears the auto-response but does not answer it.
    assert_quiet(&mut observer).await;
    wait_until("alice to record the reply", || alice.history("general").len() == 2).await;
    assert_eq!(completion.calls(), 1);

    let reply_text = reply.message.content().to_string();
    assert_eq!(contents(&alice, "general"), vec!["hi".to_string(), reply_text.clone()]);
    assert_eq!(contents(&bob, "general"), vec!["hi".to_string(), reply_text]);
    assert_eq!(bob.history("general")[1].sender_id, "bob");
}

#[tokio::test]
async fn test_prompt_carries_agent_channel_and_sender() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    let bob = add_agent(&registry, "bob").await;
    alice.subscribe_to_channel(general.clone());
    bob.subscribe_to_channel(general.clone());

    alice.send_message("general", "what about entropy?").unwrap();
    wait_until("bob to reply", || completion.calls() == 1).await;

    let prompt = &completion.prompts()[0];
    assert!(prompt.starts_with("You are bob."));
    assert!(prompt.contains("[Bob / Researcher in #general]"));
    assert!(prompt.ends_with("Alice: what about entropy?"));
}

#[tokio::test]
async fn test_auto_response_from_outside_is_recorded_not_answered() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let bob = add_agent(&registry, "bob").await;
    bob.subscribe_to_channel(general.clone());

    general
        .publish("carol", "Carol", Message::auto_response("already a reply"))
        .unwrap();

    wait_until("bob to record", || bob.history("general").len() == 1).await;
    assert_eq!(bob.last_seen_offset("general"), Some(0));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_agent_never_processes_its_own_messages() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    alice.subscribe_to_channel(general.clone());

    alice.send_message("general", "one").unwrap();
    alice.send_message("general", "two").unwrap();
    wait_until("alice's task to pass both", || alice.last_seen_offset("general") == Some(1)).await;

    // Only the send path recorded them; the delivery task skipped both.
    assert_eq!(contents(&alice, "general"), vec!["one", "two"]);
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_send_to_unsubscribed_channel_is_silent_noop() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    let mut observer = general.attach();

    assert!(!alice.send_message("general", "anyone?").unwrap());
    assert!(!alice.send_message("does-not-exist", "anyone?").unwrap());

    assert_quiet(&mut observer).await;
    assert!(alice.history("general").is_empty());
}

#[tokio::test]
async fn test_failed_completion_drops_only_that_reply() {
    let completion = ScriptedCompletion::failing_on("boom");
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    let bob = add_agent(&registry, "bob").await;
    alice.subscribe_to_channel(general.clone());
    bob.subscribe_to_channel(general.clone());
    let mut observer = general.attach();

    alice.send_message("general", "boom").unwrap();
    alice.send_message("general", "fine").unwrap();

    assert_eq!(next(&mut observer).await.message.content(), "boom");
    assert_eq!(next(&mut observer).await.message.content(), "fine");
    let reply = next(&mut observer).await;
    assert_eq!(reply.sender_id, "bob");
    assert!(reply.message.content().contains("Alice: fine"));
    assert_quiet(&mut observer).await;

    assert_eq!(completion.calls(), 2);
    let bob_history = contents(&bob, "general");
    assert_eq!(bob_history.len(), 3);
    assert_eq!(bob_history[0], "boom");
    assert_eq!(bob_history[1], "fine");
}

#[tokio::test]
async fn test_updated_system_prompt_used_for_later_replies() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let alice = add_agent(&registry, "alice").await;
    let bob = add_agent(&registry, "bob").await;
    alice.subscribe_to_channel(general.clone());
    bob.subscribe_to_channel(general.clone());

    alice.send_message("general", "first").unwrap();
    wait_until("first reply", || completion.calls() == 1).await;

    bob.update_system_prompt("You are terse.");
    alice.send_message("general", "second").unwrap();
    wait_until("second reply", || completion.calls() == 2).await;

    let prompts = completion.prompts();
    assert!(prompts[0].starts_with("You are bob."));
    assert!(prompts[1].starts_with("You are terse."));
}

#[tokio::test]
async fn test_prompt_history_is_bounded_to_window() {
    let completion = ScriptedCompletion::new();
    let registry = registry_with(completion.clone()).await;
    let general = add_channel(&registry, "general").await;
    let bob = add_agent(&registry, "bob").await;
    bob.subscribe_to_channel(general.clone());

    for i in 0..12 {
        general
            .publish("carol", "Carol", Message::auto_response(format!("note {}", i)))
            .unwrap();
    }
    general.publish("carol", "Carol", Message::new("question")).unwrap();
    wait_until("bob to reply", || completion.calls() == 1).await;

    let prompt = &completion.prompts()[0];
    // Window of ten: notes 3..=11 plus the question itself.
    assert!(!prompt.contains("note 2\n"));
    assert!(prompt.contains("Carol: note 3\n"));
    assert!(prompt.contains("Carol: note 11\n"));
    wait_until("bob to record his reply", || bob.history("general").len() == 14).await;
}
