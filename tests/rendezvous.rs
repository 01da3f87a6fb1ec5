#![cfg(feature = "loom")]

use lite_rendezvous::{channel, ChannelError, State};
use loom::future::block_on;
use loom::thread;

#[test]
fn loom_rendezvous_single_round() {
    loom::model(|| {
        let (a, b) = channel::<usize>();

        thread::spawn(move || {
            let received = block_on(a.recv());
            assert_eq!(received, Ok(Some(1)));
            // Dropping the end closes the channel
        });

        let reply = block_on(async {
            b.wait().await?;
            b.send(1).await
        });
        assert_eq!(reply, Err(ChannelError::Closed));
    });
}

#[test]
fn loom_rendezvous_close_race() {
    loom::model(|| {
        let (a, b) = channel::<usize>();

        let handle = thread::spawn(move || {
            a.close();
            a
        });

        assert_eq!(block_on(b.recv()), Err(ChannelError::Closed));
        let a = handle.join().unwrap();
        assert_eq!(a.state(), State::Closed);
    });
}
