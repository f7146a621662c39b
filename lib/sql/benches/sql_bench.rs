use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shiptrack_sql::{SQLExecutor, SQLStore, SqliteStore, Value};

fn bench_exec_insert(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .exec(
            "CREATE TABLE bench (id INTEGER PRIMARY KEY AUTOINCREMENT, data TEXT, code TEXT)",
            &[],
        )
        .unwrap();

    c.bench_function("sqlite_insert", |b| {
        b.iter(|| {
            store
                .exec(
                    "INSERT INTO bench (data, code) VALUES (?1, ?2)",
                    &[
                        Value::Text("{\"senderName\":\"bench\"}".to_string()),
                        Value::Text("ABCDEF".to_string()),
                    ],
                )
                .unwrap();
        });
    });
}

fn bench_query_by_code(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .exec(
            "CREATE TABLE bench (id INTEGER PRIMARY KEY, data TEXT, code TEXT UNIQUE)",
            &[],
        )
        .unwrap();

    for i in 0..10000 {
        store
            .exec(
                "INSERT INTO bench (id, data, code) VALUES (?1, ?2, ?3)",
                &[
                    Value::Integer(i),
                    Value::Text(format!("{{\"n\":{}}}", i)),
                    Value::Text(format!("CODE{:04}", i)),
                ],
            )
            .unwrap();
    }

    let mut i = 0i64;
    c.bench_function("sqlite_query_by_code", |b| {
        b.iter(|| {
            let rows = store
                .query(
                    "SELECT id, data FROM bench WHERE code = ?1",
                    &[Value::Text(format!("CODE{:04}", black_box(i % 10000)))],
                )
                .unwrap();
            assert_eq!(rows.len(), 1);
            i += 1;
        });
    });
}

fn bench_transaction_write(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .exec(
            "CREATE TABLE bench (id INTEGER PRIMARY KEY AUTOINCREMENT, data TEXT)",
            &[],
        )
        .unwrap();

    c.bench_function("sqlite_tx_three_writes", |b| {
        b.iter(|| {
            store
                .transaction(&mut |ex| {
                    for _ in 0..3 {
                        ex.exec(
                            "INSERT INTO bench (data) VALUES (?1)",
                            &[Value::Text("{}".to_string())],
                        )?;
                    }
                    Ok(())
                })
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_exec_insert,
    bench_query_by_code,
    bench_transaction_write
);
criterion_main!(benches);
