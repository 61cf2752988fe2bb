//! End-to-end tests over real loopback sockets.
//!
//! Every listener binds port 0 so tests can run in parallel. Datagram counts
//! stay well under the default socket receive buffer, so loopback delivery is
//! exact wherever a test compares counts for equality.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use saturate_app::{
    Emitter, EmitterConfig, Error, Listener, ListenerConfig, RateBasis, Reporter, ReporterConfig,
    Shutdown,
};
use saturate_common::{PacketCounter, PAYLOAD};
use tokio::net::UdpSocket;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn bind_listener(counter: &Arc<PacketCounter>) -> Listener {
    let config = ListenerConfig::new(Ipv4Addr::LOCALHOST.into(), 0);
    Listener::bind(config, Arc::clone(counter))
        .await
        .expect("bind listener")
}

async fn send_n(dest: SocketAddr, n: usize, len: usize) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind sender");
    let payload = vec![0xAB; len];
    for _ in 0..n {
        socket.send_to(&payload, dest).await.expect("send");
    }
}

async fn wait_for_count(counter: &PacketCounter, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.get() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("counter stuck at {} of {}", counter.get(), expected));
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listener_counts_every_datagram() {
    let counter = Arc::new(PacketCounter::new());
    let listener = bind_listener(&counter).await;
    let addr = listener.local_addr();
    assert_ne!(addr.port(), 0);

    let shutdown = Shutdown::new();
    let task = tokio::spawn(listener.run(shutdown.clone()));

    send_n(addr, 100, PAYLOAD.len()).await;
    wait_for_count(&counter, 100).await;

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("listener did not stop")
        .expect("listener panicked")
        .expect("listener failed");
    assert_eq!(counter.get(), 100);
}

#[tokio::test]
async fn listener_ignores_payload_length() {
    let counter = Arc::new(PacketCounter::new());
    let listener = bind_listener(&counter).await;
    let addr = listener.local_addr();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(listener.run(shutdown.clone()));

    send_n(addr, 3, 0).await;
    send_n(addr, 3, 1).await;
    send_n(addr, 3, 1400).await;
    wait_for_count(&counter, 9).await;

    shutdown.trigger();
    task.await.unwrap().unwrap();
    assert_eq!(counter.get(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listeners_sharing_a_counter_lose_nothing() {
    let counter = Arc::new(PacketCounter::new());
    let shutdown = Shutdown::new();

    let mut addrs = Vec::new();
    let mut tasks = Vec::new();
    for _ in 0..3 {
        let listener = bind_listener(&counter).await;
        addrs.push(listener.local_addr());
        tasks.push(tokio::spawn(listener.run(shutdown.clone())));
    }

    let senders: Vec<_> = addrs
        .iter()
        .map(|&addr| tokio::spawn(send_n(addr, 80, 1)))
        .collect();
    for s in senders {
        s.await.unwrap();
    }

    wait_for_count(&counter, 240).await;
    shutdown.trigger();
    for t in tasks {
        t.await.unwrap().unwrap();
    }
    assert_eq!(counter.get(), 240);
}

#[tokio::test]
async fn binding_a_taken_port_is_a_config_error() {
    let counter = Arc::new(PacketCounter::new());
    let first = bind_listener(&counter).await;

    let taken = ListenerConfig::new(Ipv4Addr::LOCALHOST.into(), first.local_addr().port());
    let err = Listener::bind(taken, counter)
        .await
        .expect_err("second bind must fail");
    assert!(err.is_config());
}

// ---------------------------------------------------------------------------
// Reporter over a live listener
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reporter_prints_rate_of_delivered_datagrams() {
    let counter = Arc::new(PacketCounter::new());
    let listener = bind_listener(&counter).await;
    let addr = listener.local_addr();
    let shutdown = Shutdown::new();
    let listen_task = tokio::spawn(listener.run(shutdown.clone()));

    let mut reporter = Reporter::new(
        Arc::clone(&counter),
        ReporterConfig {
            period: Duration::from_secs(1),
            basis: RateBasis::Nominal,
        },
    );
    let stop = shutdown.clone();
    let report_task = tokio::spawn(async move {
        let mut out = Vec::new();
        let res = reporter.run(&mut out, stop).await;
        res.map(|_| out)
    });

    send_n(addr, 20, 1).await;
    wait_for_count(&counter, 20).await;

    // First wake at 1s counts the batch. Later wakes, however many a slow
    // runner fits in, see idle periods.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    shutdown.trigger();

    listen_task.await.unwrap().unwrap();
    let out = report_task.await.unwrap().unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("20.0 packets per second"));
    assert!(lines.all(|l| l == "0.0 packets per second"), "{}", text);
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn emitter_saturates_listener() {
    let counter = Arc::new(PacketCounter::new());
    let listener = bind_listener(&counter).await;
    let addr = listener.local_addr();
    let shutdown = Shutdown::new();
    let listen_task = tokio::spawn(listener.run(shutdown.clone()));

    let config = EmitterConfig::new("127.0.0.1", addr.port());
    let emitter = Emitter::resolve(&config).await.expect("resolve loopback");
    assert_eq!(emitter.dest(), addr);
    let emit_task = tokio::spawn(emitter.run(shutdown.clone()));

    wait_for_count(&counter, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.trigger();

    let sent = tokio::time::timeout(Duration::from_secs(5), emit_task)
        .await
        .expect("emitter did not stop")
        .unwrap()
        .expect("emitter failed");
    listen_task.await.unwrap().unwrap();

    let received = counter.get();
    assert!(received > 0);
    assert!(
        received <= sent,
        "received {} but only {} were sent",
        received,
        sent
    );
}

#[tokio::test]
async fn emitter_with_bad_host_never_starts() {
    let config = EmitterConfig::new("no such host.invalid", 35610);
    let err = Emitter::resolve(&config)
        .await
        .expect_err("unresolvable host must fail");
    assert!(err.is_config());
    assert_eq!(err.exit_code(), 2);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn emitter_send_failure_is_fatal() {
    // Broadcast without SO_BROADCAST is refused by the kernel on the first send.
    let emitter = Emitter::new("255.255.255.255:9".parse().unwrap());
    let err = emitter
        .run(Shutdown::new())
        .await
        .expect_err("send must fail");
    assert!(matches!(err, Error::Send { .. }), "unexpected error: {}", err);
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn emitter_stopped_before_start_sends_nothing() {
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let emitter = Emitter::new("127.0.0.1:9".parse().unwrap());
    let sent = emitter.run(shutdown).await.expect("run");
    assert_eq!(sent, 0);
}
