use sql_model::prelude::*;
use sql_model::test_utils::MemoryConnector;

sql_model::model! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct User in "user" {
        pub id: i64 => "id" as USER_ID,
        pub name: String => "name" as USER_NAME,
        pub age: i32 => "age" as USER_AGE,
    }
}

fn db(driver: DriverKind) -> (Db<MemoryConnector>, MemoryConnector) {
    let conn = MemoryConnector::new();
    (Db::new(conn.clone(), DbOptions::new(driver)), conn)
}

fn row(id: i64, name: &str) -> Vec<RowValues> {
    vec![RowValues::Int(id), RowValues::from(name)]
}

#[test]
fn update_statement_is_prepared_once() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Sqlite);
    let alice = User {
        id: 1,
        name: "alice".into(),
        age: 30,
    };

    for _ in 0..3 {
        db.update(&alice, User::FIELDS_ALL, User::USER_ID)?;
    }

    assert_eq!(conn.prepared(), vec!["UPDATE user SET id=?,name=?,age=? WHERE id=?"]);
    let executed = conn.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(
        executed[0].1,
        vec![
            RowValues::Int(1),
            RowValues::from("alice"),
            RowValues::Int(30),
            RowValues::Int(1)
        ]
    );
    Ok(())
}

#[test]
fn distinct_field_sets_get_distinct_statements() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Sqlite);
    let u = User::default();
    db.update(&u, User::USER_NAME, User::USER_ID)?;
    db.update(&u, User::USER_AGE, User::USER_ID)?;
    db.update(&u, User::USER_NAME, User::USER_ID)?;
    db.delete(&u, User::USER_ID)?;
    assert_eq!(
        conn.prepared(),
        vec![
            "UPDATE user SET name=? WHERE id=?",
            "UPDATE user SET age=? WHERE id=?",
            "DELETE FROM user WHERE id=?",
        ]
    );
    Ok(())
}

#[test]
fn postgres_dialect_numbers_placeholders_and_orders_paging() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Postgres);
    conn.push_rows(vec![row(3, "c"), row(4, "d")]);

    let mut page = PairStore::<i64, String>::new();
    let adults = User {
        age: 18,
        ..User::default()
    };
    let n = db.limit(&mut page, &adults, User::USER_ID | User::USER_NAME, User::USER_AGE, 2, 2)?;
    assert_eq!(n, 2);
    assert_eq!(page.keys, vec![3, 4]);

    let (sql, params) = conn.executed().remove(0);
    assert_eq!(sql, "SELECT id,name FROM user WHERE age=$1 LIMIT $2 OFFSET $3");
    assert_eq!(params, vec![RowValues::Int(18), RowValues::Int(2), RowValues::Int(2)]);
    Ok(())
}

#[test]
fn limit_never_reads_past_count() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Sqlite);
    conn.push_rows((1..=5).map(|id| row(id, "x")).collect());

    let mut ids = PairStore::<i64, String>::new();
    let n = db.limit(&mut ids, &User::default(), User::USER_ID | User::USER_NAME, 0, 0, 2)?;
    assert_eq!(n, 2);
    assert_eq!(conn.fetched(), 2);
    assert_eq!(conn.open_result_sets(), 0);
    Ok(())
}

#[test]
fn result_sets_are_released_on_error() {
    let (db, conn) = db(DriverKind::Sqlite);
    conn.push_rows(vec![vec![RowValues::from("not a number")]]);

    let mut u = User::default();
    let err = db.one(&mut u, User::USER_AGE, User::USER_ID).unwrap_err();
    assert!(matches!(err, SqlModelError::ConversionError(_)));
    assert_eq!(conn.open_result_sets(), 0);

    let err = db.one(&mut u, User::USER_AGE, User::USER_ID).unwrap_err();
    assert!(err.is_no_rows());
    assert_eq!(conn.open_result_sets(), 0);
}

#[test]
fn failed_prepare_is_retried() {
    let (db, conn) = db(DriverKind::Sqlite);
    conn.fail_prepare("no such table: user");
    let err = db.count(&User::default(), 0).unwrap_err();
    assert!(err.to_string().contains("no such table"));

    conn.clear_failure();
    conn.push_rows(vec![vec![RowValues::Int(9)]]);
    assert_eq!(db.count(&User::default(), 0).unwrap(), 9);
    assert_eq!(conn.prepare_count(), 1);
}

#[test]
fn transaction_reuses_sql_without_statement_cache() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Sqlite);
    let u = User::default();

    db.transaction(|tx| {
        tx.update(&u, User::USER_NAME, User::USER_ID)?;
        tx.update(&u, User::USER_NAME, User::USER_ID)?;
        Ok(())
    })?;
    assert_eq!(conn.prepare_count(), 0);
    assert_eq!(conn.executed().len(), 2);
    assert_eq!(conn.tx_log(), vec!["begin", "commit"]);

    // the Db path prepares the same text once
    db.update(&u, User::USER_NAME, User::USER_ID)?;
    assert_eq!(conn.prepared(), vec!["UPDATE user SET name=? WHERE id=?"]);
    Ok(())
}

#[test]
fn transaction_outcomes_are_logged() -> Result<(), Box<dyn std::error::Error>> {
    let (db, conn) = db(DriverKind::Sqlite);

    let failed: Result<(), _> = db.transaction(|_| Err(SqlModelError::Other("boom".into())));
    assert!(failed.is_err());

    drop(db.begin()?);

    let tx = db.begin()?;
    tx.rollback()?;

    assert_eq!(
        conn.tx_log(),
        vec!["begin", "rollback", "begin", "rollback", "begin", "rollback"]
    );
    Ok(())
}

#[test]
fn all_uses_configured_initial_capacity() -> Result<(), Box<dyn std::error::Error>> {
    let conn = MemoryConnector::new();
    let options = DbOptionsBuilder::new().driver(DriverKind::Sqlite).initial_models(3).finish();
    let db = Db::new(conn.clone(), options);
    conn.push_rows((1..=4).map(|id| row(id, "x")).collect());

    let mut store = ModelStore::<User>::new(User::USER_ID | User::USER_NAME);
    db.all(&mut store, &User::default(), User::USER_ID | User::USER_NAME, 0)?;
    assert_eq!(store.models.len(), 4);
    assert_eq!(store.models[3].id, 4);
    assert_eq!(store.models[3].age, 0);
    Ok(())
}
