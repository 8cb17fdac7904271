//! MarketBook behaviour through the public API.

use std::sync::Arc;

use kingmaker::domain::{MarketBook, PriceUpdate, Rejection};
use kingmaker::testkit::domain::{asset, election_registry, price, update};
use rust_decimal_macros::dec;

fn book() -> MarketBook {
    MarketBook::new(Arc::new(election_registry()))
}

fn shuffled(updates: &[PriceUpdate]) -> Vec<PriceUpdate> {
    let mut reordered = updates.to_vec();
    reordered.reverse();
    reordered.swap(0, 2);
    reordered
}

#[test]
fn out_of_order_application_converges() {
    let updates = vec![
        update("dn-alice", "0.28", "0.30", 1),
        update("dn-alice", "0.29", "0.31", 2),
        update("dn-alice", "0.30", "0.32", 3),
        update("dn-alice", "0.31", "0.33", 4),
        update("dn-bob", "0.10", "0.12", 1),
        update("dn-bob", "0.11", "0.13", 2),
    ];

    let in_order = book();
    for u in &updates {
        let _ = in_order.apply(u);
    }
    let out_of_order = book();
    for u in &shuffled(&updates) {
        let _ = out_of_order.apply(u);
    }

    assert_eq!(in_order.snapshot(), out_of_order.snapshot());
    let alice = out_of_order.get(&asset("dn-alice")).unwrap();
    assert_eq!(alice.sequence, 4);
    assert_eq!(alice.mid_price, Some(dec!(0.32)));
}

#[test]
fn crossed_book_is_rejected_and_entry_kept() {
    let book = book();
    book.apply(&update("w-alice", "0.50", "0.52", 1)).unwrap();

    let crossed = update("w-alice", "0.60", "0.55", 2);
    let err = book.apply(&crossed).unwrap_err();

    assert!(matches!(err, Rejection::InvariantViolation { .. }));
    let entry = book.get(&asset("w-alice")).unwrap();
    assert_eq!(entry.best_bid, Some(price("0.50")));
    assert_eq!(entry.sequence, 1);
    assert_eq!(book.rejections().invariant_violation, 1);
}

#[test]
fn lower_sequence_is_rejected_and_entry_kept() {
    let book = book();
    book.apply(&update("p-dem", "0.49", "0.51", 10)).unwrap();

    let err = book.apply(&update("p-dem", "0.30", "0.32", 9)).unwrap_err();
    assert_eq!(
        err,
        Rejection::StaleOrDuplicate {
            asset_id: asset("p-dem"),
            incoming: 9,
            stored: 10,
        }
    );
    assert!(book.apply(&update("p-dem", "0.30", "0.32", 10)).is_err());

    assert_eq!(book.get(&asset("p-dem")).unwrap().mid_price, Some(dec!(0.50)));
    assert_eq!(book.rejections().stale_or_duplicate, 2);
}

#[test]
fn unknown_assets_never_enter_the_book() {
    let book = book();
    let err = book.apply(&update("not-registered", "0.1", "0.2", 1)).unwrap_err();

    assert_eq!(err.kind(), "unknown_asset");
    assert!(book.is_empty());
    assert_eq!(book.rejections().total(), 1);
}

#[test]
fn one_sided_quote_has_no_mid() {
    let book = book();
    let bid_only = PriceUpdate::new(
        asset("rn-carol"),
        Some(dec!(0.40)),
        None,
        1,
        kingmaker::testkit::domain::epoch(),
    );
    book.apply(&bid_only).unwrap();

    let entry = book.get(&asset("rn-carol")).unwrap();
    assert_eq!(entry.best_ask, None);
    assert_eq!(entry.mid_price, None);
}

#[test]
fn concurrent_writers_keep_the_highest_sequence() {
    let book = Arc::new(book());
    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let book = Arc::clone(&book);
            std::thread::spawn(move || {
                for step in 0..50u64 {
                    let sequence = step * 4 + worker + 1;
                    let _ = book.apply(&update("w-bob", "0.20", "0.22", sequence));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(book.get(&asset("w-bob")).unwrap().sequence, 200);
}
