//! Full path tests: link bytes in, responses and frames out.

use tcd1304_core::{
    AcquisitionState, CommandProcessor, IntegrationTimer, Link, ReadoutOutcome,
    ReadoutPublisher, TransportState, TransportStats, CMD_BUFFER_SIZE, PIXEL_COUNT,
};
use tcd1304_proto::{find_frame, FrameSearch, FRAME_SIZE};

/// Records everything it accepts; the tests signal completion by hand.
#[derive(Default)]
struct HostLink {
    received: Vec<u8>,
    refuse: bool,
}

impl Link for HostLink {
    fn transmit(&mut self, bytes: &[u8]) -> bool {
        if self.refuse {
            return false;
        }
        self.received.extend_from_slice(bytes);
        true
    }
}

#[derive(Default)]
struct TickLog {
    periods: Vec<u32>,
}

impl IntegrationTimer for TickLog {
    fn reconfigure(&mut self, period_ticks: u32, _pulse_ticks: u32) {
        self.periods.push(period_ticks);
    }

    fn restart(&mut self) {}
}

/// Feed `input`, run the polled loop until output drains, return the output.
macro_rules! exchange {
    ($rx:expr, $done:expr, $transport:expr, $processor:expr, $input:expr) => {{
        $rx.receive_from_link($input);
        $processor.poll(&mut $transport);
        while $transport.process() > 0 {
            $done.on_link_send_complete();
        }
        core::mem::take(&mut $transport.link_mut().received)
    }};
}

#[test]
fn ready_then_commands() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, done, mut transport) = state.split(HostLink::default());
    let mut processor = CommandProcessor::new(TickLog::default());

    processor.send_ready(&mut transport);
    let out = exchange!(rx, done, transport, processor, b"START\r\nSTOP\n");
    assert_eq!(out, b"TCD1304_READY\nOK:STARTED\nOK:STOPPED\n");
    assert_eq!(transport.available(), 0);
}

#[test]
fn read_line_splits_mixed_terminators() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, _done, mut transport) = state.split(HostLink::default());
    let mut line = [0u8; CMD_BUFFER_SIZE];

    rx.receive_from_link(b"START\r\n");
    rx.receive_from_link(b"STOP\n");
    assert_eq!(transport.read_line(&mut line), Ok(Some(5)));
    assert_eq!(&line[..5], b"START");
    assert_eq!(transport.read_line(&mut line), Ok(Some(4)));
    assert_eq!(&line[..4], b"STOP");
    assert_eq!(transport.read_line(&mut line), Ok(None));
    assert_eq!(transport.available(), 0);
}

#[test]
fn integration_time_depends_on_state() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, done, mut transport) = state.split(HostLink::default());
    let mut processor = CommandProcessor::new(TickLog::default());

    let out = exchange!(rx, done, transport, processor, b"SET_INT_TIME:50000\n");
    assert_eq!(out, b"OK:INT_TIME_SET:50000\n");
    assert_eq!(processor.integration_time_us(), 50_000);
    assert_eq!(processor.timer().periods.last(), Some(&4_199_999));

    let out = exchange!(rx, done, transport, processor, b"START\nSET_INT_TIME:100\n");
    assert_eq!(out, b"OK:STARTED\nERROR:MUST_STOP_FIRST\n");
    assert_eq!(processor.integration_time_us(), 50_000);

    let out = exchange!(rx, done, transport, processor, b"STOP\nSET_INT_TIME:5\nSTATUS\n");
    assert_eq!(
        out,
        b"OK:STOPPED\nERROR:RANGE_10_TO_100000\nSTATUS:IDLE,INT_TIME:50000\n"
    );
}

#[test]
fn too_long_command_recovers() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, done, mut transport) = state.split(HostLink::default());
    let mut processor = CommandProcessor::new(TickLog::default());

    let junk = [b'Z'; CMD_BUFFER_SIZE];
    let out = exchange!(rx, done, transport, processor, &junk);
    assert_eq!(out, b"ERROR:CMD_TOO_LONG\n");

    let out = exchange!(rx, done, transport, processor, b"\nSTATUS\n");
    assert_eq!(out, b"STATUS:IDLE,INT_TIME:20\n");
}

#[test]
fn busy_link_keeps_response_order() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, done, mut transport) = state.split(HostLink {
        refuse: true,
        ..HostLink::default()
    });
    let mut processor = CommandProcessor::new(TickLog::default());

    rx.receive_from_link(b"START\n");
    processor.poll(&mut transport);
    for _ in 0..3 {
        assert_eq!(transport.process(), 0);
    }
    rx.receive_from_link(b"STATUS\n");
    processor.poll(&mut transport);

    transport.link_mut().refuse = false;
    while transport.process() > 0 {
        done.on_link_send_complete();
    }
    assert_eq!(
        transport.link().received,
        b"OK:STARTED\nSTATUS:RUNNING,INT_TIME:20\n"
    );
}

#[test]
fn frames_interleave_with_responses() {
    let mut state: TransportState = TransportState::new();
    let (mut rx, done, mut transport) = state.split(HostLink::default());
    let mut processor = CommandProcessor::new(TickLog::default());
    let mut publisher = ReadoutPublisher::new();
    let samples: Vec<u16> = (0..PIXEL_COUNT).map(|i| (i % 4096) as u16).collect();

    // idle readouts are numbered but not sent
    let outcome = publisher.publish(&samples, processor.state(), &mut transport);
    assert_eq!(outcome, Ok(ReadoutOutcome::Skipped { counter: 0 }));

    let out = exchange!(rx, done, transport, processor, b"START\n");
    assert_eq!(out, b"OK:STARTED\n");
    assert_eq!(processor.state(), AcquisitionState::Running);

    let outcome = publisher.publish(&samples, processor.state(), &mut transport);
    assert_eq!(outcome, Ok(ReadoutOutcome::Sent { counter: 1 }));

    // response waits until the frame transfer completes
    rx.receive_from_link(b"STOP\n");
    processor.poll(&mut transport);
    assert_eq!(transport.process(), 0);
    done.on_link_send_complete();
    assert_eq!(transport.process(), 11);
    done.on_link_send_complete();

    let stream = &transport.link().received;
    assert_eq!(stream.len(), FRAME_SIZE + 11);
    match find_frame(stream) {
        FrameSearch::Found { offset, frame } => {
            assert_eq!(offset, 0);
            assert_eq!(frame.counter(), 1);
            assert_eq!(frame.sample(PIXEL_COUNT - 1), Some(3693));
        }
        other => panic!("expected a frame, got {other:?}"),
    }
    assert_eq!(&stream[FRAME_SIZE..], b"OK:STOPPED\n");
}

#[test]
fn stats_track_traffic_and_reset() {
    let mut state = TransportState::<16, 16>::new();
    let (mut rx, done, mut transport) = state.split(HostLink::default());
    let mut processor = CommandProcessor::new(TickLog::default());

    rx.receive_from_link(b"STATUS\nSTATUS\nSTATUS\n");
    processor.poll(&mut transport);
    while transport.process() > 0 {
        done.on_link_send_complete();
    }

    let stats = transport.stats();
    assert_eq!(stats, transport.stats());
    assert_eq!(stats.rx_bytes, 15);
    assert_eq!(stats.rx_overflows, 1);
    assert_eq!(stats.tx_bytes, 15);
    assert_eq!(stats.tx_overflows, 2);

    transport.reset_stats();
    assert_eq!(transport.stats(), TransportStats::default());
}
