mod common;

use rpgmaster::error::RpgError;
use rpgmaster::storage::NewSheet;

async fn aria_at_full(store: &rpgmaster::storage::CampaignStore) -> i64 {
    let mut sheet = NewSheet::new("Aria", "Mage");
    sheet.abilities.constitution = 14;
    store.create_sheet("p1", "s1", sheet).await.unwrap()
}

#[tokio::test]
async fn overkill_damage_floors_at_zero() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;

    let change = store.apply_damage("p1", "s1", id, 20).await.unwrap();
    assert_eq!((change.before, change.after, change.max_hp), (12, 0, 12));
    assert!(change.is_down());
    assert_eq!(store.get_sheet("p1", "s1", id).await.unwrap().unwrap().current_hp, 0);
}

#[tokio::test]
async fn healing_caps_at_max() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;

    store.apply_damage("p1", "s1", id, 5).await.unwrap();
    let change = store.apply_healing("p1", "s1", id, 3).await.unwrap();
    assert_eq!((change.before, change.after), (7, 10));

    let change = store.apply_healing("p1", "s1", id, 50).await.unwrap();
    assert_eq!(change.after, 12);
    assert_eq!(change.applied(), 2);
}

#[tokio::test]
async fn hp_stays_in_bounds_over_a_sequence() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;
    let steps: [(bool, i32); 8] = [
        (true, 4),
        (true, 0),
        (false, 1),
        (true, 30),
        (false, 0),
        (false, 6),
        (false, 100),
        (true, 11),
    ];
    let mut expected = 12;
    for (is_damage, amount) in steps {
        let change = if is_damage {
            expected = (expected - amount).max(0);
            store.apply_damage("p1", "s1", id, amount).await.unwrap()
        } else {
            expected = (expected + amount).min(12);
            store.apply_healing("p1", "s1", id, amount).await.unwrap()
        };
        assert_eq!(change.after, expected);
        assert!((0..=12).contains(&change.after));
    }
}

#[tokio::test]
async fn negative_amounts_are_rejected() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;
    assert!(matches!(
        store.apply_damage("p1", "s1", id, -3).await,
        Err(RpgError::InvalidInput(_))
    ));
    assert!(matches!(
        store.apply_healing("p1", "s1", id, -3).await,
        Err(RpgError::InvalidInput(_))
    ));
    assert_eq!(store.get_sheet("p1", "s1", id).await.unwrap().unwrap().current_hp, 12);
}

#[tokio::test]
async fn foreign_or_missing_sheet_is_not_found() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;
    assert!(matches!(
        store.apply_damage("p2", "s1", id, 1).await,
        Err(RpgError::NotFound { id: found }) if found == id
    ));
    assert!(matches!(
        store.apply_healing("p1", "s1", id + 100, 1).await,
        Err(RpgError::NotFound { .. })
    ));
}

#[tokio::test]
async fn concurrent_damage_is_not_lost() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.apply_damage("p1", "s1", id, 1).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(store.get_sheet("p1", "s1", id).await.unwrap().unwrap().current_hp, 2);
}

#[tokio::test]
async fn hp_change_moves_updated_at() {
    let (_tmp, store) = common::temp_store().await;
    let id = aria_at_full(&store).await;
    let before = store.get_sheet("p1", "s1", id).await.unwrap().unwrap();
    store.apply_damage("p1", "s1", id, 1).await.unwrap();
    let after = store.get_sheet("p1", "s1", id).await.unwrap().unwrap();
    assert!(after.updated_at > before.updated_at);
}
