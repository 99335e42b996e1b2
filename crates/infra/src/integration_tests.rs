//! Integration tests for the lifecycle engine over the in-memory store.
//!
//! Tests: Engine → LockTable → DocumentStore → document
//!
//! Verifies:
//! - The reception/product lifecycle end to end
//! - Concurrent writers on one point are serialized and re-checked
//! - Interval listing returns exactly the overlapping points

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use pvz_core::{Aggregate, AggregateRoot, PickupPointId, Precondition, ProductId, ReceptionId};
    use pvz_pickup::{
        AddProduct, Catalog, CloseReception, OpenReception, PickupPoint, ReceptionCommand,
    };

    use crate::document_store::{DocumentStore, InMemoryDocumentStore, Pagination, TimeWindow};
    use crate::lifecycle::{LifecycleEngine, LifecycleError, now};

    type Engine = LifecycleEngine<Arc<InMemoryDocumentStore>>;

    fn setup() -> Arc<Engine> {
        Arc::new(LifecycleEngine::new(
            Arc::new(InMemoryDocumentStore::new()),
            Catalog::default(),
        ))
    }

    fn precondition_of<T: std::fmt::Debug>(result: Result<T, LifecycleError>) -> Precondition {
        match result {
            Err(LifecycleError::PreconditionFailed(p)) => p,
            other => panic!("expected precondition failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn moscow_scenario() {
        let engine = setup();
        let point = engine.register_pickup_point("Москва").await.unwrap();
        let id = point.id_typed();
        assert!(point.receptions().is_empty());

        let r1 = engine.open_reception(id).await.unwrap();
        assert!(r1.is_open());

        let p1 = engine.add_product(id, "электроника").await.unwrap();
        assert_eq!(p1.reception_id(), r1.id_typed());
        let p2 = engine.add_product(id, "одежда").await.unwrap();

        let stored = engine.pickup_point(id).await.unwrap();
        assert_eq!(stored.open_reception().unwrap().products(), [p1.clone(), p2.clone()].as_slice());

        let removed = engine.remove_last_product(id).await.unwrap();
        assert_eq!(removed, p2);

        let closed = engine.close_reception(id, now()).await.unwrap();
        assert_eq!(closed.id_typed(), r1.id_typed());
        assert!(!closed.is_open());
        assert_eq!(closed.products(), [p1].as_slice());

        let err = engine.add_product(id, "одежда").await;
        assert_eq!(precondition_of(err), Precondition::NoOpenReception);

        let stored = engine.pickup_point(id).await.unwrap();
        assert_eq!(stored.receptions(), [closed].as_slice());
        assert_eq!(stored.version(), 5);
    }

    #[tokio::test]
    async fn second_reception_can_open_after_close() {
        let engine = setup();
        let id = engine.register_pickup_point("Казань").await.unwrap().id_typed();

        engine.open_reception(id).await.unwrap();
        let err = engine.open_reception(id).await;
        assert_eq!(precondition_of(err), Precondition::ReceptionAlreadyOpen);

        engine.close_reception(id, now()).await.unwrap();
        let second = engine.open_reception(id).await.unwrap();

        let stored = engine.pickup_point(id).await.unwrap();
        assert_eq!(stored.receptions().len(), 2);
        assert_eq!(stored.open_reception().map(|r| r.id_typed()), Some(second.id_typed()));
    }

    #[tokio::test]
    async fn remove_on_empty_reception_fails() {
        let engine = setup();
        let id = engine.register_pickup_point("Казань").await.unwrap().id_typed();

        assert_eq!(
            precondition_of(engine.remove_last_product(id).await),
            Precondition::NoOpenReception
        );
        engine.open_reception(id).await.unwrap();
        assert_eq!(
            precondition_of(engine.remove_last_product(id).await),
            Precondition::EmptyProductStack
        );
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_write() {
        let engine = setup();
        assert!(matches!(
            engine.register_pickup_point("Новосибирск").await,
            Err(LifecycleError::InvalidInput(_))
        ));

        let id = engine.register_pickup_point("Санкт-Петербург").await.unwrap().id_typed();
        engine.open_reception(id).await.unwrap();
        let before = engine.pickup_point(id).await.unwrap();

        assert!(matches!(
            engine.add_product(id, "мебель").await,
            Err(LifecycleError::InvalidInput(_))
        ));
        assert_eq!(engine.pickup_point(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_point_is_not_found() {
        let engine = setup();
        let id = PickupPointId::new();
        assert!(matches!(engine.pickup_point(id).await, Err(LifecycleError::NotFound(_))));
        assert!(matches!(engine.open_reception(id).await, Err(LifecycleError::NotFound(_))));
    }

    #[tokio::test]
    async fn corrupt_document_surfaces_and_is_left_alone() {
        let engine = setup();
        let id = engine.register_pickup_point("Москва").await.unwrap().id_typed();
        engine.open_reception(id).await.unwrap();

        let mut document = engine.pickup_point(id).await.unwrap().to_json().unwrap();
        let mut second = document["receptions"][0].clone();
        second["id"] = serde_json::json!(ReceptionId::new());
        document["receptions"].as_array_mut().unwrap().push(second);
        engine.store().put_raw_document(id, document).unwrap();

        assert!(matches!(
            engine.pickup_point(id).await,
            Err(LifecycleError::CorruptAggregate(_))
        ));
        assert!(matches!(
            engine.close_reception(id, now()).await,
            Err(LifecycleError::CorruptAggregate(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_open_has_exactly_one_winner() {
        let engine = setup();
        let id = engine.register_pickup_point("Москва").await.unwrap().id_typed();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.open_reception(id).await }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert_eq!(err.precondition(), Some(Precondition::ReceptionAlreadyOpen)),
            }
        }

        assert_eq!(winners, 1);
        let stored = engine.pickup_point(id).await.unwrap();
        assert_eq!(stored.receptions().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_not_lost() {
        let engine = setup();
        let id = engine.register_pickup_point("Казань").await.unwrap().id_typed();
        engine.open_reception(id).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let engine = engine.clone();
            let product_type = ["электроника", "одежда", "обувь"][i % 3];
            handles.push(tokio::spawn(async move { engine.add_product(id, product_type).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = engine.pickup_point(id).await.unwrap();
        assert_eq!(stored.open_reception().unwrap().products().len(), 32);
        assert_eq!(stored.version(), 33);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_close_and_add_never_touch_closed_reception() {
        let engine = setup();
        let id = engine.register_pickup_point("Москва").await.unwrap().id_typed();
        engine.open_reception(id).await.unwrap();

        let closer = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.close_reception(id, now()).await })
        };
        let mut adders = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            adders.push(tokio::spawn(async move { engine.add_product(id, "обувь").await }));
        }

        let closed = closer.await.unwrap().unwrap();
        let mut added = 0;
        for adder in adders {
            match adder.await.unwrap() {
                Ok(_) => added += 1,
                Err(err) => assert_eq!(err.precondition(), Some(Precondition::NoOpenReception)),
            }
        }

        let stored = engine.pickup_point(id).await.unwrap();
        let reception = stored.reception(closed.id_typed()).unwrap();
        assert!(!reception.is_open());
        assert_eq!(reception.products().len(), added);
        assert_eq!(reception.products(), closed.products());
    }

    #[tokio::test]
    async fn listing_uses_engine_timestamps() {
        let engine = setup();
        let busy = engine.register_pickup_point("Москва").await.unwrap().id_typed();
        let idle = engine.register_pickup_point("Казань").await.unwrap().id_typed();
        engine.open_reception(busy).await.unwrap();

        let window = TimeWindow::trailing_day(now() + Duration::seconds(1));
        let listed = engine.list_in_interval(window, Pagination::default()).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|p| p.id_typed()).collect();
        assert_eq!(ids, vec![busy]);
        assert!(!ids.contains(&idle));
    }

    mod interval_property {
        use super::*;
        use proptest::prelude::*;

        fn base() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
        }

        fn at(hours: i64) -> DateTime<Utc> {
            base() + Duration::hours(hours)
        }

        /// One reception: (opened_at offset, optional duration until close).
        fn reception_bounds() -> impl Strategy<Value = (i64, Option<i64>)> {
            (0i64..100, prop::option::of(0i64..30))
        }

        /// Build a point whose receptions follow `specs`, sequentially; only the
        /// last reception may stay open.
        fn build_point(registered: i64, specs: &[(i64, Option<i64>)]) -> PickupPoint {
            let city = Catalog::default().city("Москва").unwrap();
            let mut point = PickupPoint::register(PickupPointId::new(), city, at(registered));
            let last = specs.len().saturating_sub(1);
            let mut cursor = 0i64;

            for (idx, (gap, duration)) in specs.iter().enumerate() {
                let opened = cursor + gap;
                let open = ReceptionCommand::OpenReception(OpenReception {
                    pickup_point_id: point.id_typed(),
                    reception_id: ReceptionId::new(),
                    opened_at: at(opened),
                });
                let event = point.handle(&open).unwrap();
                point.transition(&event).unwrap();

                let add = ReceptionCommand::AddProduct(AddProduct {
                    pickup_point_id: point.id_typed(),
                    product_id: ProductId::new(),
                    product_type: Catalog::default().product_type("обувь").unwrap(),
                    added_at: at(opened),
                });
                let event = point.handle(&add).unwrap();
                point.transition(&event).unwrap();

                let duration = if idx == last { *duration } else { Some(duration.unwrap_or(1)) };
                match duration {
                    Some(d) => {
                        let close = ReceptionCommand::CloseReception(CloseReception {
                            pickup_point_id: point.id_typed(),
                            closed_at: at(opened + d),
                        });
                        let event = point.handle(&close).unwrap();
                        point.transition(&event).unwrap();
                        cursor = opened + d;
                    }
                    None => cursor = opened,
                }
            }
            point
        }

        fn overlaps(point: &PickupPoint, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
            point
                .receptions()
                .iter()
                .any(|r| r.opened_at() <= end && r.closed_at().map_or(true, |c| c >= start))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: a point is listed iff one of its receptions has
            /// opened_at <= end and (no close time or closed_at >= start).
            #[test]
            fn listed_iff_reception_overlaps(
                points in prop::collection::vec(
                    (0i64..50, prop::collection::vec(reception_bounds(), 0..4)),
                    1..8,
                ),
                start in 0i64..200,
                span in 0i64..100,
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                let store = InMemoryDocumentStore::new();
                let built: Vec<PickupPoint> = points
                    .iter()
                    .map(|(registered, specs)| build_point(*registered, specs))
                    .collect();

                let (window_start, window_end) = (at(start), at(start + span));
                let window = TimeWindow::new(window_start, window_end).unwrap();
                let pagination = Pagination::new(Some(1000), None);

                let listed = runtime.block_on(async {
                    for point in &built {
                        store.insert(point).await.unwrap();
                    }
                    store.list_in_interval(window, pagination).await.unwrap()
                });

                let mut expected: Vec<&PickupPoint> = built
                    .iter()
                    .filter(|p| overlaps(p, window_start, window_end))
                    .collect();
                expected.sort_by_key(|p| (p.registered_at(), p.id_typed()));

                let listed_ids: Vec<_> = listed.iter().map(|p| p.id_typed()).collect();
                let expected_ids: Vec<_> = expected.iter().map(|p| p.id_typed()).collect();
                prop_assert_eq!(listed_ids, expected_ids);
            }
        }
    }
}
