#![cfg(feature = "sqlite")]
use sql_model::prelude::*;

sql_model::model! {
    #[derive(Debug, Default, Clone)]
    pub struct Account in "account" {
        pub id: i64 => "id" as ACCOUNT_ID,
        pub owner: String => "owner" as ACCOUNT_OWNER,
        pub balance: i64 => "balance" as ACCOUNT_BALANCE,
    }
}

fn open() -> Result<Db<SqliteConnector>, SqlModelError> {
    let db = Db::sqlite_builder(":memory:".into()).build()?;
    db.connector().execute_batch(
        "CREATE TABLE account (id INTEGER PRIMARY KEY, owner TEXT NOT NULL, balance INTEGER NOT NULL);
         INSERT INTO account (id, owner, balance) VALUES (1, 'ann', 100), (2, 'ben', 50);",
    )?;
    Ok(db)
}

fn balance(db: &Db<SqliteConnector>, id: i64) -> Result<i64, SqlModelError> {
    let mut account = Account { id, ..Account::default() };
    db.one(&mut account, Account::ACCOUNT_BALANCE, Account::ACCOUNT_ID)?;
    Ok(account.balance)
}

fn transfer<E: Executor>(exec: &E, from: i64, to: i64, amount: i64) -> Result<(), SqlModelError> {
    let from = Account { id: from, ..Account::default() };
    let to = Account { id: to, ..Account::default() };
    let args = |id: i64| [RowValues::Int(amount), RowValues::Int(id)];
    exec.exec_update("UPDATE account SET balance = balance - ? WHERE id = ?", &args(from.id))?;
    exec.args_incr_by(&to, Account::ACCOUNT_BALANCE, Account::ACCOUNT_ID, &args(to.id))?;
    Ok(())
}

#[test]
fn transaction_commits_on_ok() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;
    db.transaction(|tx| transfer(tx, 1, 2, 30))?;
    assert_eq!(balance(&db, 1)?, 70);
    assert_eq!(balance(&db, 2)?, 80);
    Ok(())
}

#[test]
fn transaction_rolls_back_on_err() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;
    let err = db
        .transaction(|tx| {
            transfer(tx, 1, 2, 30)?;
            let mut missing = Account { id: 42, ..Account::default() };
            tx.one(&mut missing, Account::ACCOUNT_OWNER, Account::ACCOUNT_ID)
        })
        .unwrap_err();
    assert!(err.is_no_rows());
    assert_eq!(balance(&db, 1)?, 100);
    assert_eq!(balance(&db, 2)?, 50);
    Ok(())
}

#[test]
fn close_follows_success_flag() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;

    let tx = db.begin()?;
    let mut account = Account { id: 1, ..Account::default() };
    tx.one(&mut account, Account::ACCOUNT_OWNER | Account::ACCOUNT_BALANCE, Account::ACCOUNT_ID)?;
    assert_eq!(account.owner, "ann");
    account.balance = 5;
    tx.update(&account, Account::ACCOUNT_BALANCE, Account::ACCOUNT_ID)?;
    assert!(!tx.is_success());
    tx.close()?;
    assert_eq!(balance(&db, 1)?, 100);

    let mut tx = db.begin()?;
    tx.update(&account, Account::ACCOUNT_BALANCE, Account::ACCOUNT_ID)?;
    tx.success(true);
    tx.close()?;
    assert_eq!(balance(&db, 1)?, 5);
    Ok(())
}

#[test]
fn dropped_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;
    {
        let tx = db.begin()?;
        let account = Account {
            id: 3,
            owner: "cat".into(),
            balance: 1,
        };
        tx.insert(&account, Account::FIELDS_ALL, ResultType::Nothing)?;
    }
    assert_eq!(db.count(&Account::default(), 0)?, 2);

    // the connection is usable again and the cached statements still work
    let tx = db.begin()?;
    let mut owners = ValueStore::<String>::new();
    tx.all(&mut owners, &Account::default(), Account::ACCOUNT_OWNER, 0)?;
    tx.commit()?;
    assert_eq!(owners.values, vec!["ann", "ben"]);
    Ok(())
}

#[test]
fn registered_sql_inside_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;
    let total = db.register_sql(|_| "SELECT SUM(balance) FROM account".to_string());

    let sum = db.transaction(|tx| {
        tx.exec("DELETE FROM account WHERE id = ?", ResultType::Nothing, &[RowValues::Int(2)])?;
        tx.query_by_id(total, &[], |scanner| {
            let mut sum = 0i64;
            scanner.one(&mut [&mut sum])?;
            Ok(sum)
        })
    })?;
    assert_eq!(sum, 100);
    assert!(!db.exists(&Account { id: 2, ..Account::default() }, Account::ACCOUNT_ID)?);
    Ok(())
}

#[test]
fn db_calls_on_the_transaction_thread_fail_fast() -> Result<(), Box<dyn std::error::Error>> {
    let db = open()?;

    let tx = db.begin()?;
    tx.delete(&Account { id: 2, ..Account::default() }, Account::ACCOUNT_ID)?;

    let err = db.count(&Account::default(), 0).unwrap_err();
    assert!(matches!(err, SqlModelError::TransactionError(_)));
    assert!(matches!(db.begin().unwrap_err(), SqlModelError::TransactionError(_)));

    // other threads wait for the transaction instead
    let count = std::thread::scope(|s| {
        let waiter = s.spawn(|| db.count(&Account::default(), 0));
        tx.commit()?;
        waiter.join().map_err(|_| SqlModelError::Other("count thread panicked".into()))?
    })?;
    assert_eq!(count, 1);
    assert_eq!(db.count(&Account::default(), 0)?, 1);
    Ok(())
}
