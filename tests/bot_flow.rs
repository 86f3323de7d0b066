//! End-to-end flows through the bot against an on-disk event document.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use secret_santa::bot::{AdminGate, Bot, BotDeps};
use secret_santa::channels::testing::RecordingChannel;
use secret_santa::channels::{IncomingMessage, OutgoingResponse};
use secret_santa::config::{DEFAULT_DRAW_SCHEDULE, GiftRules, ScheduleConfig};
use secret_santa::draw::{
    DrawEngine, DrawScheduler, NotificationDispatcher, ScheduledRun, is_single_cycle,
};
use secret_santa::error::Error;
use secret_santa::registration::ConversationEngine;
use secret_santa::store::{EventStore, JsonFileStore};
use tempfile::TempDir;

const ADMIN: &str = "1";

fn draw_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()
}

struct Harness {
    bot: Bot,
    store: Arc<EventStore>,
    channel: Arc<RecordingChannel>,
    draws: Arc<DrawEngine>,
    dispatcher: Arc<NotificationDispatcher>,
}

async fn harness(path: &Path) -> Harness {
    let backend = Arc::new(JsonFileStore::new(path));
    let store = Arc::new(EventStore::open(backend).await.unwrap());
    let channel = Arc::new(RecordingChannel::new());
    let conversation = Arc::new(ConversationEngine::new(store.clone(), draw_date()));
    let draws = Arc::new(DrawEngine::with_seed(store.clone(), 5));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        channel.clone(),
        GiftRules::default(),
    ));
    let deps = BotDeps {
        store: store.clone(),
        conversation,
        draws: draws.clone(),
        dispatcher: dispatcher.clone(),
        gate: AdminGate::new([ADMIN.to_string()]),
    };
    Harness {
        bot: Bot::new(deps, channel.clone()),
        store,
        channel,
        draws,
        dispatcher,
    }
}

impl Harness {
    async fn say(&self, user: &str, text: &str) -> OutgoingResponse {
        let msg = IncomingMessage::new("test", user, text).with_handle(format!("user{user}"));
        self.bot.handle_message(&msg).await.unwrap().unwrap()
    }

    async fn press(&self, user: &str, data: &str) -> OutgoingResponse {
        let msg = IncomingMessage::callback("test", user, data);
        self.bot.handle_message(&msg).await.unwrap().unwrap()
    }

    async fn register(&self, user: &str, name: &str, course: &str) -> OutgoingResponse {
        self.say(user, "/start").await;
        self.say(user, name).await;
        self.say(user, course).await;
        self.say(user, "G1").await;
        self.say(user, "bikes").await
    }
}

#[tokio::test]
async fn register_draw_and_send_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("event.json");
    let h = harness(&path).await;

    let first = h.say("101", "/start").await;
    assert!(first.content.contains("enter your name"));

    let done = h.register("101", "Ann", "2").await;
    assert!(done.content.contains("Registration complete"));
    assert!(done.content.contains("25.12.2025"));
    assert_eq!(done.buttons.len(), 2);
    h.register("102", "Bo", "1").await;

    let stats = h.say("101", "/stats").await;
    assert!(stats.content.contains("Total participants: 2"));
    assert!(stats.content.contains("Course 1: 1"));

    let drawn = h.say(ADMIN, "/draw").await;
    assert!(drawn.content.contains("Participants: 2"), "{}", drawn.content);

    let sent = h.say(ADMIN, "/send_results").await;
    assert!(sent.content.contains("Delivered: 2"), "{}", sent.content);
    assert!(
        h.channel
            .replies()
            .iter()
            .any(|(to, r)| to == ADMIN && r.content == "Starting to send results...")
    );

    let direct = h.channel.direct_messages();
    assert_eq!(direct.len(), 2);
    let to_ann = direct.iter().find(|(to, _)| to == "101").unwrap();
    assert!(to_ann.1.content.contains("👤 Bo"));

    // Everything survives a restart.
    drop(h);
    let reopened = harness(&path).await;
    let state = reopened.store.snapshot().await;
    assert_eq!(state.profiles.len(), 2);
    assert_eq!(state.profiles["101"].handle.as_deref(), Some("user101"));
    assert!(is_single_cycle(&state.assignments));
    assert_eq!(state.ledger.epoch, 1);
    assert!(state.ledger.notified_at.is_some());
}

#[tokio::test]
async fn admin_commands_refused_for_participants() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;
    h.register("101", "Ann", "2").await;
    h.register("102", "Bo", "2").await;

    for command in ["/draw", "/send_results", "/clear_all"] {
        let msg = IncomingMessage::new("test", "101", command);
        let result = h.bot.handle_message(&msg).await;
        assert!(matches!(result, Err(Error::Access(_))), "{command}");
    }
    assert!(h.store.read(|s| s.assignments.is_empty()).await);
    assert_eq!(h.store.read(|s| s.profiles.len()).await, 2);
}

#[tokio::test]
async fn manual_draw_with_one_participant() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;
    h.register("101", "Ann", "2").await;

    let reply = h.say(ADMIN, "/draw").await;
    assert!(reply.content.contains("Not enough participants"));
    assert!(h.store.read(|s| s.assignments.is_empty()).await);

    let results = h.say(ADMIN, "/send_results").await;
    assert!(results.content.contains("/draw first"));
    assert!(h.channel.direct_messages().is_empty());
}

#[tokio::test]
async fn edit_through_buttons_changes_one_field() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;
    h.register("101", "Ann", "2").await;
    let before = h.store.read(|s| s.profiles["101"].clone()).await;

    let menu = h.press("101", "change_data").await;
    assert_eq!(menu.buttons.len(), 4);
    assert!(menu.buttons.iter().any(|b| b.data == "edit_wishes"));

    let prompt = h.press("101", "edit_wishes").await;
    assert!(prompt.content.contains("new wishes"));
    let saved = h.say("101", "books").await;
    assert!(saved.content.contains("Changes saved"));

    let after = h.store.read(|s| s.profiles["101"].clone()).await;
    assert_eq!(after.wishes, "books");
    assert_eq!(after.name, before.name);
    assert_eq!(after.course, before.course);
    assert_eq!(after.group, before.group);
    assert_eq!(after.registered_at, before.registered_at);

    let card = h.press("101", "view_data").await;
    assert!(card.content.contains("Wishes: books"));
}

#[tokio::test]
async fn unregistered_participant_is_pointed_at_start() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;

    let err = h
        .bot
        .handle_message(&IncomingMessage::new("test", "9", "/profile"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conversation(_)));

    let hint = h.say("9", "hello there").await;
    assert!(hint.content.contains("/start"));

    let nothing = h.say("9", "/delete_profile").await;
    assert!(nothing.content.contains("nothing to delete"));

    let help = h.say("9", "/unknown").await;
    assert!(help.content.contains("/start"));
}

#[tokio::test]
async fn delete_after_draw_prunes_assignments() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;
    h.register("101", "Ann", "1").await;
    h.register("102", "Bo", "1").await;
    h.register("103", "Cy", "1").await;
    h.say(ADMIN, "/draw").await;

    let before = h.store.read(|s| s.assignments.clone()).await;
    let giver_to_103 = before
        .iter()
        .find(|(_, r)| r.as_str() == "103")
        .map(|(g, _)| g.clone())
        .unwrap();

    let reply = h.say("103", "/delete_profile").await;
    assert!(reply.content.contains("deleted"));

    let after = h.store.read(|s| s.assignments.clone()).await;
    assert!(!after.contains_key("103"));
    assert!(!after.contains_key(&giver_to_103));
    assert_eq!(after.len(), 1);

    // The remaining pair still gets its message; the dangling one is gone.
    let report = h.dispatcher.dispatch_current().await.unwrap();
    assert_eq!(report.delivered, 1);
}

#[tokio::test]
async fn clear_all_keeps_scheduled_guard() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir.path().join("event.json")).await;
    h.register("101", "Ann", "1").await;
    h.register("102", "Bo", "1").await;

    let scheduler = DrawScheduler::new(
        ScheduleConfig::new(draw_date(), DEFAULT_DRAW_SCHEDULE, 3).unwrap(),
        h.store.clone(),
        h.draws.clone(),
        h.dispatcher.clone(),
    );
    assert!(matches!(
        scheduler.check(draw_date()).await.unwrap(),
        ScheduledRun::Completed(_)
    ));

    let cleared = h.say(ADMIN, "/clear_all").await;
    assert!(cleared.content.contains("cleared"));
    let state = h.store.snapshot().await;
    assert!(state.profiles.is_empty());
    assert!(state.assignments.is_empty());
    assert_eq!(state.ledger.scheduled_for, Some(draw_date()));

    assert_eq!(
        scheduler.check(draw_date()).await.unwrap(),
        ScheduledRun::AlreadyCompleted
    );
}

#[tokio::test]
async fn registration_resumes_after_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("event.json");

    let h = harness(&path).await;
    h.say("101", "/start").await;
    h.say("101", "Ann").await;
    drop(h);

    let h = harness(&path).await;
    let prompt = h.say("101", "2").await;
    assert!(prompt.content.contains("group"));
    h.say("101", "G1").await;
    let done = h.say("101", "bikes").await;
    assert!(done.content.contains("Name: Ann"));
    assert!(done.content.contains("Course: 2"));
}
