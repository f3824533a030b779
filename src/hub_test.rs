use super::*;

fn frame(text: &str) -> Arc<str> {
    Arc::from(text)
}

#[test]
fn broadcast_reaches_every_client() {
    let mut hub = Hub::new();
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(4);
    hub.join(Uuid::new_v4(), tx_a);
    hub.join(Uuid::new_v4(), tx_b);

    assert_eq!(hub.broadcast(&frame("{\"type\":\"state\"}")), 2);
    assert_eq!(rx_a.try_recv().unwrap().as_ref(), "{\"type\":\"state\"}");
    assert_eq!(rx_b.try_recv().unwrap().as_ref(), "{\"type\":\"state\"}");
}

#[test]
fn closed_clients_are_pruned() {
    let mut hub = Hub::new();
    let (tx, rx) = mpsc::channel(4);
    hub.join(Uuid::new_v4(), tx);
    drop(rx);

    assert_eq!(hub.broadcast(&frame("x")), 0);
    assert!(hub.is_empty());
}

#[test]
fn full_client_is_skipped_but_kept() {
    let mut hub = Hub::new();
    let (tx, mut rx) = mpsc::channel(1);
    hub.join(Uuid::new_v4(), tx);

    assert_eq!(hub.broadcast(&frame("a")), 1);
    assert_eq!(hub.broadcast(&frame("b")), 0);
    assert_eq!(hub.len(), 1);
    assert_eq!(rx.try_recv().unwrap().as_ref(), "a");
    assert!(rx.try_recv().is_err());
}

#[test]
fn send_to_targets_one_client() {
    let mut hub = Hub::new();
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(4);
    let a = Uuid::new_v4();
    hub.join(a, tx_a);
    hub.join(Uuid::new_v4(), tx_b);

    assert!(hub.send_to(a, frame("hello")));
    assert_eq!(rx_a.try_recv().unwrap().as_ref(), "hello");
    assert!(rx_b.try_recv().is_err());
    assert!(!hub.send_to(Uuid::new_v4(), frame("nobody")));
}

#[test]
fn part_removes_client() {
    let mut hub = Hub::new();
    let id = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(1);
    hub.join(id, tx);
    assert!(hub.part(id));
    assert!(!hub.part(id));
}
