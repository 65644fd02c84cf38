use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use room_sync_core::protocol::Role;
use room_sync_core::registry::RoomRegistry;
use std::hint::black_box;
use uuid::Uuid;

fn bench_registry_join(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("registry_join_cold_room", |b| {
        b.to_async(&rt).iter(|| async {
            let registry = RoomRegistry::new();
            let room_id = format!("BENCH{}", Uuid::new_v4().simple());
            let host_id = Uuid::new_v4();
            registry
                .join(
                    &room_id,
                    host_id,
                    Uuid::new_v4(),
                    host_id,
                    Role::Host,
                    Utc::now(),
                )
                .await;
        });
    });

    c.bench_function("registry_with_room_contended", |b| {
        let registry = RoomRegistry::new();
        let room_id = "BENCHROOM".to_string();
        let host_id = Uuid::new_v4();
        rt.block_on(async {
            registry
                .join(
                    &room_id,
                    host_id,
                    Uuid::new_v4(),
                    host_id,
                    Role::Host,
                    Utc::now(),
                )
                .await;
        });

        b.to_async(&rt).iter(|| async {
            let position = registry
                .with_room(&room_id, |room| {
                    room.current_position_sec += 1.0;
                    room.current_position_sec
                })
                .await;
            black_box(position);
        });
    });
}

criterion_group!(registry_hot_path, bench_registry_join);
criterion_main!(registry_hot_path);
