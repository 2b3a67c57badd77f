//! Data path: ordering, demand accounting, underrun reporting.

use std::{
    io::{Read, Write},
    net::TcpListener,
    sync::Arc,
    thread,
    time::Duration,
};

use kithara_icecast::testing::RecordingTransport;
use kithara_sink::{
    ConnectParams, IcecastOptions, Sink, SinkConfig, SinkError, SinkEvent, WorkerState,
};
use rstest::rstest;

const WAIT: Duration = Duration::from_secs(2);

fn drain(rx: &kanal::Receiver<SinkEvent>) -> Vec<SinkEvent> {
    std::iter::from_fn(|| rx.try_recv().ok().flatten()).collect()
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn buffered_payloads_sent_in_order_with_one_demand_each() {
    let (transport, handle) = RecordingTransport::new();
    let (tx, rx) = kanal::unbounded::<SinkEvent>();
    let sink = Sink::create(SinkConfig::default(), transport, tx).unwrap();

    for n in 0..8u8 {
        sink.write(vec![n; 100]).unwrap();
    }
    assert_eq!(sink.write(vec![8u8; 100]), Err(SinkError::Overrun));
    assert_eq!(sink.available(), 8);

    sink.start().unwrap();
    assert!(handle.wait_for_sent(8, WAIT));
    sink.stop().unwrap();

    let expected: Vec<Vec<u8>> = (0..8u8).map(|n| vec![n; 100]).collect();
    assert_eq!(handle.sent(), expected);
    assert_eq!(sink.available(), 0);

    let demands: Vec<_> = drain(&rx)
        .into_iter()
        .filter(|e| matches!(e, SinkEvent::Demand(_)))
        .collect();
    assert_eq!(demands, vec![SinkEvent::Demand(1); 8]);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn writes_while_running_keep_fifo_order() {
    let (transport, handle) = RecordingTransport::new();
    let (tx, _rx) = kanal::unbounded::<SinkEvent>();
    let sink = Sink::create(SinkConfig::default().with_capacity(2), transport, tx).unwrap();
    sink.start().unwrap();

    for n in 0..50u8 {
        while sink.write(vec![n]) == Err(SinkError::Overrun) {
            thread::yield_now();
        }
    }
    assert!(handle.wait_for_sent(50, WAIT));
    sink.stop().unwrap();

    let sent: Vec<u8> = handle.sent().into_iter().flatten().collect();
    assert_eq!(sent, (0..50u8).collect::<Vec<_>>());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn underrun_reported_before_next_send() {
    let (transport, handle) = RecordingTransport::new();
    let (tx, rx) = kanal::unbounded::<SinkEvent>();
    let sink = Sink::create(SinkConfig::default(), transport, tx).unwrap();

    sink.start().unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), SinkEvent::Demand(8));
    thread::sleep(Duration::from_millis(80));

    sink.write(vec![0u8; 10]).unwrap();
    assert!(handle.wait_for_sent(1, WAIT));

    match rx.recv_timeout(WAIT).unwrap() {
        SinkEvent::Underrun(duration) => assert!(duration >= Duration::from_millis(50)),
        other => panic!("expected underrun, got {other:?}"),
    }
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), SinkEvent::Demand(1));
    sink.stop().unwrap();
}

#[rstest]
#[timeout(Duration::from_secs(5))]
fn stop_during_underrun_reports_it() {
    let (transport, _handle) = RecordingTransport::new();
    let (tx, rx) = kanal::unbounded::<SinkEvent>();
    let sink = Sink::create(SinkConfig::default(), transport, tx).unwrap();

    sink.start().unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), SinkEvent::Demand(8));
    thread::sleep(Duration::from_millis(60));
    sink.stop().unwrap();

    let events = drain(&rx);
    assert_eq!(events.len(), 1, "{events:?}");
    assert!(matches!(events[0], SinkEvent::Underrun(d) if d >= Duration::from_millis(40)));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn producer_wakeups_are_never_lost() {
    let (transport, handle) = RecordingTransport::new();
    let (tx, _rx) = kanal::unbounded::<SinkEvent>();
    let sink = Arc::new(Sink::create(SinkConfig::default().with_capacity(1), transport, tx).unwrap());
    sink.start().unwrap();

    let producer = {
        let sink = Arc::clone(&sink);
        thread::spawn(move || {
            for n in 0..2_000u32 {
                let payload = n.to_le_bytes().to_vec();
                while sink.write(payload.clone()) == Err(SinkError::Overrun) {
                    thread::yield_now();
                }
                if n % 97 == 0 {
                    thread::sleep(Duration::from_micros(200));
                }
            }
        })
    };
    producer.join().unwrap();

    assert!(handle.wait_for_sent(2_000, Duration::from_secs(5)));
    sink.stop().unwrap();
    let last = handle.sent().last().cloned();
    assert_eq!(last, Some(1_999u32.to_le_bytes().to_vec()));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn repeated_start_stop_cycles() {
    let (transport, handle) = RecordingTransport::new();
    let (tx, _rx) = kanal::unbounded::<SinkEvent>();
    let sink = Sink::create(SinkConfig::default(), transport, tx).unwrap();

    for cycle in 0..50u8 {
        sink.start().unwrap();
        sink.write(vec![cycle]).unwrap();
        sink.stop().unwrap();
        assert_eq!(sink.state(), WorkerState::Idle);
        assert_eq!(sink.available(), 0);
    }
    assert_eq!(handle.opens(), 50);
    assert_eq!(handle.closes(), 50);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn icecast_sink_streams_to_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            assert_eq!(socket.read(&mut byte).unwrap(), 1);
            head.push(byte[0]);
        }
        socket.write_all(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        let mut body = Vec::new();
        socket.read_to_end(&mut body).unwrap();
        body
    });

    let (tx, rx) = kanal::unbounded::<SinkEvent>();
    let params = ConnectParams::new("127.0.0.1", port, "hackme", "/live.mp3");
    let options = IcecastOptions::default().with_bitrate_kbps(0);
    let sink = Sink::icecast(SinkConfig::new(params), options, tx).unwrap();

    sink.write(&b"abc"[..]).unwrap();
    sink.write(&b"def"[..]).unwrap();
    sink.start().unwrap();

    let mut demanded = 0;
    while demanded < 2 {
        if let SinkEvent::Demand(1) = rx.recv_timeout(WAIT).unwrap() {
            demanded += 1;
        }
    }
    sink.stop().unwrap();

    assert_eq!(server.join().unwrap(), b"abcdef");
}
