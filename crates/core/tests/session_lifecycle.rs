use anyhow::Result;
use chipcheck_core::{
    clock::ManualClock,
    store::{keys, load_json},
    ActiveSession, FileStore, KeyValueStore, MemoryStore, SessionArchive, SessionConfig,
    SessionController,
};
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

fn clock() -> ManualClock {
    ManualClock::new(
        Utc.with_ymd_and_hms(2024, 7, 5, 20, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

fn play_friday<S: KeyValueStore>(controller: &mut SessionController<S, &ManualClock>) {
    let mut config = SessionConfig::new("Friday", 1000.0);
    config.location = "Rahul's place".to_string();
    let _ = controller.start_session(config).expect("valid config");
    for name in ["rahul", "Amit", "sneha"] {
        let _ = controller.add_buy_in(name, None).expect("valid buy-in");
    }
    let _ = controller.add_buy_in("AMIT", None).expect("valid top-up");
    let _ = controller.set_cash_out("Rahul", 2500.0).expect("valid cash-out");
    let _ = controller.set_cash_out("Sneha", 1500.0).expect("valid cash-out");
    let _ = controller.mark_left("amit", 0.0).expect("valid cash-out");
}

#[test]
fn full_session_settles_archives_and_updates_registry() -> Result<()> {
    let clock = clock();
    let store = MemoryStore::new();
    let mut controller = SessionController::load(store.clone(), &clock);

    play_friday(&mut controller);
    let roster: Vec<String> = controller
        .ledger()
        .map(|ledger| ledger.active_roster().iter().map(|p| p.name.to_string()).collect())
        .unwrap_or_default();
    assert_eq!(roster, vec!["Rahul", "Sneha"]);

    clock.advance(Duration::minutes(150));
    let outcome = controller.end_session()?;
    assert!(outcome.is_saved());
    let summary = outcome.into_value();

    assert_eq!(summary.settlements, vec!["Amit → Rahul ₹1500", "Amit → Sneha ₹500"]);
    assert_eq!(summary.shark.as_ref().map(|s| s.name.as_str()), Some("Rahul"));
    assert_eq!(summary.atm.as_ref().map(|s| s.amount), Some(-2000.0));
    let insights = summary.insights.as_ref().expect("fresh session has insights");
    assert_eq!(insights.duration_label(), "2h 30m");
    assert_eq!(insights.most_rebuys_label(), "Amit (2)");
    assert!(!summary.is_unbalanced());

    assert!(controller.active().is_none());
    assert_eq!(store.raw(keys::ACTIVE_SESSION), None);

    let archive: SessionArchive = load_json(&store, keys::HISTORY)?.expect("history stored");
    let record = &archive.records()[0];
    assert_eq!(record.title(), "Friday");
    assert_eq!(record.total_pot, 4000.0);
    assert_eq!(record.shark.as_ref().map(|s| s.as_str()), Some("Rahul"));

    let amit = controller.registry().get("amit").expect("amit registered");
    assert_eq!(amit.sessions, 1);
    assert_eq!(amit.total_rebuys, 1);
    assert_eq!(amit.biggest_loss, -2000.0);

    let reopened = controller.view_history(0).expect("record stored");
    assert_eq!(reopened.settlements, summary.settlements);
    assert_eq!(reopened.results, summary.results);
    Ok(())
}

#[test]
fn active_session_survives_restart() -> Result<()> {
    let dir = tempdir()?;
    let clock = clock();

    {
        let mut controller = SessionController::load(FileStore::new(dir.path()), &clock);
        play_friday(&mut controller);
    }

    let restored = SessionController::load(FileStore::new(dir.path()), &clock);
    let active: &ActiveSession = restored.active().expect("session restored");
    assert_eq!(active.config.name, "Friday");
    assert_eq!(active.ledger.total_buy_in(), 4000.0);
    assert!(active.ledger.get("Amit").map(|p| p.is_left).unwrap_or(false));
    Ok(())
}

#[test]
fn running_balance_settles_against_history() -> Result<()> {
    let clock = clock();
    let mut controller = SessionController::load(MemoryStore::new(), &clock);

    let mut config = SessionConfig::new("Week 1", 500.0);
    config.running_balance = true;
    let _ = controller.start_session(config.clone())?;
    let _ = controller.add_buy_in("A", None)?;
    let _ = controller.add_buy_in("B", None)?;
    let _ = controller.set_cash_out("A", 700.0)?;
    let _ = controller.set_cash_out("B", 300.0)?;
    let week_one = controller.end_session()?.into_value();
    assert_eq!(week_one.settlements, vec!["B → A ₹200"]);

    config.name = "Week 2".to_string();
    let _ = controller.start_session(config)?;
    let _ = controller.add_buy_in("a", None)?;
    let _ = controller.add_buy_in("b", None)?;
    let _ = controller.set_cash_out("a", 300.0)?;
    let _ = controller.set_cash_out("b", 700.0)?;
    let week_two = controller.end_session()?.into_value();
    assert_eq!(week_two.settlements, vec!["All settled!"]);
    assert_eq!(controller.archive().len(), 2);
    Ok(())
}

#[test]
fn running_balance_flags_imbalance_carried_from_history() -> Result<()> {
    let clock = clock();
    let mut controller = SessionController::load(MemoryStore::new(), &clock);

    // B never entered a cash-out, so week one is 200 short.
    let mut config = SessionConfig::new("Week 1", 500.0);
    config.running_balance = true;
    let _ = controller.start_session(config.clone())?;
    let _ = controller.add_buy_in("A", None)?;
    let _ = controller.add_buy_in("B", None)?;
    let _ = controller.set_cash_out("A", 800.0)?;
    let week_one = controller.end_session()?.into_value();
    assert!(week_one.is_unbalanced());
    assert_eq!(week_one.imbalance, -200.0);

    config.name = "Week 2".to_string();
    let _ = controller.start_session(config)?;
    let _ = controller.add_buy_in("A", None)?;
    let _ = controller.add_buy_in("B", None)?;
    let _ = controller.set_cash_out("A", 400.0)?;
    let _ = controller.set_cash_out("B", 600.0)?;
    let week_two = controller.end_session()?.into_value();

    assert_eq!(week_two.results.iter().map(|r| r.net).sum::<f64>(), 0.0);
    assert_eq!(week_two.settlements, vec!["B → A ₹200"]);
    assert!(week_two.is_unbalanced());
    assert_eq!(week_two.imbalance, -200.0);

    let reopened = controller.view_history(0).expect("week two archived");
    assert!(reopened.is_unbalanced());
    assert_eq!(reopened.imbalance, -200.0);
    Ok(())
}

#[test]
fn failed_writes_keep_in_memory_state() -> Result<()> {
    let clock = clock();
    let store = MemoryStore::new();
    let mut controller = SessionController::load(store.clone(), &clock);
    let _ = controller.start_session(SessionConfig::new("Quota", 500.0))?;

    store.set_quota(Some(8));
    let outcome = controller.add_buy_in("Vikram", None)?;
    assert!(!outcome.is_saved());
    assert_eq!(outcome.failures[0].key, keys::ACTIVE_SESSION);
    assert_eq!(
        controller.ledger().and_then(|l| l.get("Vikram")).map(|p| p.buy_in),
        Some(500.0)
    );

    let summary = controller.end_session()?;
    assert!(!summary.is_saved());
    assert_eq!(controller.archive().len(), 1);
    assert_eq!(controller.registry().len(), 1);

    store.set_quota(None);
    let _ = controller.clear_history();
    assert!(controller.archive().is_empty());
    assert_eq!(controller.registry().len(), 1);
    Ok(())
}

#[test]
fn corrupt_store_starts_empty() -> Result<()> {
    let store = MemoryStore::new();
    store.set(keys::ACTIVE_SESSION, "{\"config\": 42}")?;
    store.set(keys::HISTORY, "not json")?;
    store.set(keys::TEMPLATES, "[]")?;

    let clock = clock();
    let controller = SessionController::load(store, &clock);
    assert!(controller.active().is_none());
    assert!(controller.archive().is_empty());
    assert!(controller.templates().is_empty());
    Ok(())
}
