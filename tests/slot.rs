#![cfg(feature = "loom")]

use lite_rendezvous::slot::{channel, SlotClosed};
use loom::future::block_on;
use loom::thread;

#[test]
fn loom_slot_resolve() {
    loom::model(|| {
        let (resolver, slot) = channel::<usize>();

        thread::spawn(move || {
            resolver.resolve(42);
        });

        block_on(async move {
            assert_eq!(slot.await, Ok(42));
        });
    });
}

#[test]
fn loom_slot_drop_resolver() {
    loom::model(|| {
        let (resolver, slot) = channel::<usize>();

        thread::spawn(move || {
            drop(resolver);
        });

        block_on(async move {
            assert_eq!(slot.await, Err(SlotClosed));
        });
    });
}

#[test]
fn loom_slot_drop_waiter() {
    loom::model(|| {
        let (resolver, slot) = channel::<String>();

        let handle = thread::spawn(move || {
            resolver.resolve("unclaimed".to_string());
        });

        // The value is dropped by whichever side releases the cell last
        drop(slot);
        handle.join().unwrap();
    });
}
