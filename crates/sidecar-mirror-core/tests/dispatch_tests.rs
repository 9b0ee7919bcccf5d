mod common;

use common::{fixture, touch};
use sidecar_mirror_core::watcher::dispatch;
use sidecar_mirror_core::FsEvent;
use std::fs;
use tokio::sync::{mpsc, oneshot};

#[tokio::test]
async fn test_dispatch_keeps_going_after_a_failed_handler() {
    let fx = fixture();
    fs::write(fx.archive.join("blocked"), "a file, not a directory").unwrap();
    let blocked = fx.source.join("blocked").join("clip.mp4");
    let fine = fx.source.join("fine.mp4");
    touch(&blocked);
    touch(&fine);

    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(FsEvent::Created {
        path: blocked,
        is_dir: false,
    })
    .unwrap();
    tx.send(FsEvent::Created {
        path: fine,
        is_dir: false,
    })
    .unwrap();
    drop(tx);

    let handled = dispatch(&fx.sync, &mut rx, std::future::pending()).await;

    assert_eq!(handled, 2);
    assert!(fx.archive.join("fine.txt").is_file());
    assert_eq!(fx.reporter.notices().len(), 1);
}

#[tokio::test]
async fn test_dispatch_stops_on_shutdown() {
    let fx = fixture();
    let (_tx, mut rx) = mpsc::unbounded_channel::<FsEvent>();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    stop_tx.send(()).unwrap();

    let handled = dispatch(&fx.sync, &mut rx, async {
        let _ = stop_rx.await;
    })
    .await;

    assert_eq!(handled, 0);
}
