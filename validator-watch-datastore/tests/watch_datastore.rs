use validator_watch_datastore::watch_datastore::BatchOp;
use validator_watch_datastore::{BondStatus, Model, Subscription, ValidatorSnapshot, WatchDatastore};

fn snapshot(address: &str, rank: u32) -> ValidatorSnapshot {
    ValidatorSnapshot {
        operator_address: address.to_string(),
        rank,
        hex_address: "0x01".to_string(),
        jailed: false,
        bond_status: BondStatus::Bonded,
        uptime: 100.0,
        commission: 5.0,
        moniker: "moniker".to_string(),
        voting_power_percent: 0.5,
        avatar: Some("https://example.org/a.png".to_string()),
        tokens: 1_000,
        cumulative_share: 1.0,
        validator_id: 1,
        last_seen_at: 10,
    }
}

#[tokio::test]
async fn test_watch_datastore() {
    let datastore = WatchDatastore::create_in_memory().unwrap();

    datastore.put("/test/key1", b"value1").await.unwrap();
    let value = datastore.get_data_by_key("/test/key1").await.unwrap().unwrap();
    assert_eq!(value, b"value1");

    let string_value = datastore.get_string("/test/key1").await.unwrap().unwrap();
    assert_eq!(string_value, "value1");

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct TestStruct {
        field: String,
    }
    let test_struct = TestStruct { field: "test".to_string() };
    datastore.put_json("/test/json", &test_struct).await.unwrap();
    let retrieved: TestStruct = datastore.get_json("/test/json").await.unwrap().unwrap();
    assert_eq!(retrieved, test_struct);

    datastore.delete("/test/key1").await.unwrap();
    assert!(datastore.get_data_by_key("/test/key1").await.unwrap().is_none());

    datastore.put("/pages/1", b"").await.unwrap();
    datastore.put("/pages/2", b"").await.unwrap();
    datastore.put("/pages0", b"").await.unwrap();
    datastore.put("/pagesx/3", b"").await.unwrap();
    assert_eq!(datastore.iterator("/pages").count(), 2);
    assert_eq!(datastore.child_keys("/pages").await.unwrap(), vec!["1", "2"]);
}

#[tokio::test]
async fn test_write_batch_applies_all_ops() {
    let datastore = WatchDatastore::create_in_memory().unwrap();
    datastore.put("/a/old", b"x").await.unwrap();

    datastore
        .write_batch(vec![
            BatchOp::Delete("/a/old".to_string()),
            BatchOp::Put("/a/new".to_string(), b"y".to_vec()),
        ])
        .await
        .unwrap();

    assert!(datastore.get_data_by_key("/a/old").await.unwrap().is_none());
    assert_eq!(datastore.get_string("/a/new").await.unwrap().as_deref(), Some("y"));
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("watch_db");

    {
        let datastore = WatchDatastore::new(&path).unwrap();
        snapshot("storyvaloper1one", 3).save(&datastore).await.unwrap();
        Subscription::new("77", "storyvaloper1one", 5)
            .save_replacing(&datastore, None)
            .await
            .unwrap();
    }

    let datastore = WatchDatastore::new(&path).unwrap();
    let found = ValidatorSnapshot::find_by_operator_address(&datastore, "storyvaloper1one")
        .await
        .unwrap();
    assert_eq!(found, Some(snapshot("storyvaloper1one", 3)));
    assert_eq!(
        Subscription::find_observers_of(&datastore, "storyvaloper1one").await.unwrap(),
        vec!["77"]
    );
}

#[tokio::test]
async fn test_find_all_snapshots() {
    let datastore = WatchDatastore::create_in_memory().unwrap();
    snapshot("storyvaloper1a", 1).save(&datastore).await.unwrap();
    snapshot("storyvaloper1b", 2).save(&datastore).await.unwrap();
    Subscription::new("1", "storyvaloper1a", 0)
        .save_replacing(&datastore, None)
        .await
        .unwrap();

    let all = ValidatorSnapshot::find_all(&datastore).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].operator_address, "storyvaloper1a");
    assert_eq!(all[1].rank, 2);
}
