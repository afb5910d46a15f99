use super::protocol::{self, ResponseBuffer};
use super::{ElectricalConductivity, Measurement, StatusCode, Temperature, VolumetricWaterContent};

/// Duration of one receive window in milliseconds.
pub const RECEIVE_TIMEOUT_MILLIS: u32 = 500;

/// Upper bound on CHECK_MEASURE transmissions per measurement.
pub const MAX_COMPLETION_POLLS: usize = 5;

/// Byte index carrying the done flag in a CHECK_MEASURE reply.
const COMPLETION_FLAG_INDEX: usize = 3;

/// Byte-oriented half-duplex link to the sensor.
///
/// Transmit failures are not surfaced here; a frame that never reaches the
/// sensor manifests as [`StatusCode::NoResponse`] on the following receive
/// window, which is the only failure distinction the protocol makes.
pub trait Transport {
    /// Transmit a command frame verbatim.
    fn send(&mut self, frame: &[u8]);

    /// Fetch one inbound byte if any is ready, without blocking.
    fn recv(&mut self) -> Option<u8>;
}

/// Monotonic millisecond clock for timeout measurement.
///
/// The counter may wrap; elapsed time is computed with wrapping arithmetic.
pub trait MonotonicClock {
    fn now_millis(&self) -> u32;
}

/// What a receive window is expected to deliver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Exchange {
    /// An acknowledgement whose content is irrelevant; the window only
    /// drains it.
    Ack,
    /// A CHECK_MEASURE reply carrying the done flag.
    Completion,
    /// A READ_RESULT reply to be decoded into the measurement record.
    Payload,
}

/// Driver for one SLT5006 sensor on a dedicated serial link.
///
/// Owns the transport, the clock and the most recent measurement record.
/// All operations are blocking; a receive window busy-polls the transport
/// until the reply is complete or the timeout elapses.
pub struct Slt5006<T, C> {
    transport: T,
    clock: C,
    measurement: Measurement,
    status: StatusCode,
}

impl<T, C> Slt5006<T, C>
where
    T: Transport,
    C: MonotonicClock,
{
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            measurement: Measurement::default(),
            status: StatusCode::Success,
        }
    }

    /// Query the firmware version once and discard the reply.
    ///
    /// The returned status is informational; a [`StatusCode::NoResponse`]
    /// hints at a disconnected sensor.
    pub fn init(&mut self) -> StatusCode {
        self.transport.send(&protocol::VERSION_CHECK);
        let status = self.receive(Exchange::Ack);
        log::debug!("version check: {}", status);
        status
    }

    /// Run one full measurement sequence: start a cycle, poll for
    /// completion with a bounded number of retries, then fetch and decode
    /// the result.
    ///
    /// Returns `true` iff the final READ_RESULT exchange succeeded; only
    /// then does the measurement record hold fresh values. An exhausted
    /// poll budget does not abort the sequence, the result is read anyway
    /// and may reflect a stale or incomplete cycle.
    pub fn read_measurement(&mut self) -> bool {
        self.transport.send(&protocol::START_MEASURE);
        self.receive(Exchange::Ack);

        for poll in 0..MAX_COMPLETION_POLLS {
            self.transport.send(&protocol::CHECK_MEASURE);
            if self.receive(Exchange::Completion) != StatusCode::MeasurementNotComplete {
                break;
            }
            if poll + 1 == MAX_COMPLETION_POLLS {
                log::debug!("measurement still pending after {} polls", MAX_COMPLETION_POLLS);
            }
        }

        self.transport.send(&protocol::READ_RESULT);
        self.receive(Exchange::Payload) == StatusCode::Success
    }

    /// One timed receive window: accumulate reply bytes until the timeout
    /// elapses or the buffer is full, then classify the outcome.
    fn receive(&mut self, exchange: Exchange) -> StatusCode {
        let mut buf = ResponseBuffer::new();
        let started = self.clock.now_millis();
        while self.clock.now_millis().wrapping_sub(started) < RECEIVE_TIMEOUT_MILLIS
            && !buf.is_full()
        {
            if let Some(byte) = self.transport.recv() {
                buf.push(byte);
            }
        }
        log::trace!("rx {} bytes: {:02x?}", buf.len(), buf.as_bytes());

        let mut status = match exchange {
            Exchange::Completion => {
                if buf.len() > COMPLETION_FLAG_INDEX
                    && buf.as_bytes()[COMPLETION_FLAG_INDEX] == 1
                {
                    StatusCode::Success
                } else {
                    StatusCode::MeasurementNotComplete
                }
            }
            Exchange::Ack | Exchange::Payload => StatusCode::Success,
        };

        if buf.is_empty() {
            // an empty window trumps the completion check
            status = StatusCode::NoResponse;
        } else if exchange == Exchange::Payload {
            self.measurement = protocol::decode_measurement(buf.raw());
        }

        if status != StatusCode::Success {
            log::debug!("receive window ended: {}", status);
        }
        self.status = status;
        status
    }

    /// The most recent measurement record.
    pub fn measurement(&self) -> Measurement {
        self.measurement
    }

    /// Outcome of the most recent receive window.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn temperature(&self) -> Temperature {
        self.measurement.temperature
    }

    pub fn bulk_ec(&self) -> ElectricalConductivity {
        self.measurement.bulk_ec
    }

    pub fn rockwool_water_content(&self) -> VolumetricWaterContent {
        self.measurement.rockwool_water_content
    }

    pub fn water_content(&self) -> VolumetricWaterContent {
        self.measurement.water_content
    }

    pub fn coco_water_content(&self) -> VolumetricWaterContent {
        self.measurement.coco_water_content
    }

    pub fn pore_ec(&self) -> ElectricalConductivity {
        self.measurement.pore_ec
    }

    /// Consume the driver and hand back the transport and the clock.
    pub fn release(self) -> (T, C) {
        (self.transport, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, TickClock};

    fn driver(transport: MockTransport) -> Slt5006<MockTransport, TickClock> {
        Slt5006::new(transport, TickClock::new(1))
    }

    fn result_reply() -> [u8; 17] {
        let mut reply = [0u8; 17];
        // temperature 0x0190 * 0.0625 = 25.0 °C
        reply[4] = 0x01;
        reply[3] = 0x90;
        // VWC 505 * 0.1 = 50.5 %
        reply[10] = 0x01;
        reply[9] = 0xf9;
        reply
    }

    #[test]
    fn silent_sensor_yields_no_response() {
        let mut dev = driver(MockTransport::new());
        assert!(!dev.read_measurement());
        assert_eq!(StatusCode::NoResponse, dev.status());

        // the first silent completion poll already breaks the loop
        let (transport, _) = dev.release();
        assert_eq!(
            vec![
                protocol::START_MEASURE.to_vec(),
                protocol::CHECK_MEASURE.to_vec(),
                protocol::READ_RESULT.to_vec(),
            ],
            transport.sent_frames().to_vec()
        );
    }

    #[test]
    fn completion_flag_classification() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x01]);
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x00]);
        transport.expect_reply(&[0x01, 0x08]);
        transport.expect_silence();
        let mut dev = driver(transport);

        dev.transport.send(&protocol::CHECK_MEASURE);
        assert_eq!(StatusCode::Success, dev.receive(Exchange::Completion));

        dev.transport.send(&protocol::CHECK_MEASURE);
        assert_eq!(
            StatusCode::MeasurementNotComplete,
            dev.receive(Exchange::Completion)
        );

        // shorter than the flag index, but not empty
        dev.transport.send(&protocol::CHECK_MEASURE);
        assert_eq!(
            StatusCode::MeasurementNotComplete,
            dev.receive(Exchange::Completion)
        );

        // zero bytes always win over the completion check
        dev.transport.send(&protocol::CHECK_MEASURE);
        assert_eq!(StatusCode::NoResponse, dev.receive(Exchange::Completion));
    }

    #[test]
    fn ack_content_is_irrelevant() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0xde, 0xad]);
        transport.expect_silence();
        let mut dev = driver(transport);

        dev.transport.send(&protocol::START_MEASURE);
        assert_eq!(StatusCode::Success, dev.receive(Exchange::Ack));

        dev.transport.send(&protocol::START_MEASURE);
        assert_eq!(StatusCode::NoResponse, dev.receive(Exchange::Ack));
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn measurement_sequence_completes_on_first_poll() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x02, 0x07, 0x01]); // start ack
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x01]); // done
        transport.expect_reply(&result_reply());
        let mut dev = driver(transport);

        assert!(dev.read_measurement());
        assert_eq!(StatusCode::Success, dev.status());
        assert_eq!(25.0, dev.temperature().to_degree_celsius());
        assert_eq!(50.5, dev.water_content().to_percent());
        assert_eq!(0.0, dev.bulk_ec().to_decisiemens_per_meter());

        let (transport, _) = dev.release();
        assert_eq!(3, transport.sent_frames().len());
    }

    #[test]
    fn poll_budget_is_bounded() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x02]); // start ack
        for _ in 0..MAX_COMPLETION_POLLS {
            transport.expect_reply(&[0x01, 0x08, 0x01, 0x00]); // never done
        }
        transport.expect_reply(&result_reply());
        let mut dev = driver(transport);

        // the exhausted poll budget does not abort the read
        assert!(dev.read_measurement());
        assert_eq!(StatusCode::Success, dev.status());

        let (transport, _) = dev.release();
        let polls = transport
            .sent_frames()
            .iter()
            .filter(|frame| frame.as_slice() == &protocol::CHECK_MEASURE[..])
            .count();
        assert_eq!(MAX_COMPLETION_POLLS, polls);
        assert_eq!(
            Some(&protocol::READ_RESULT.to_vec()),
            transport.sent_frames().last()
        );
    }

    #[test]
    fn poll_loop_stops_early() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x02]); // start ack
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x00]);
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x01]); // done on 2nd poll
        transport.expect_reply(&result_reply());
        let mut dev = driver(transport);

        assert!(dev.read_measurement());

        let (transport, _) = dev.release();
        let polls = transport
            .sent_frames()
            .iter()
            .filter(|frame| frame.as_slice() == &protocol::CHECK_MEASURE[..])
            .count();
        assert_eq!(2, polls);
    }

    #[test]
    fn decode_happens_only_on_the_final_receive() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x02]); // start ack
        // a poll reply that would decode to nonsense
        transport.expect_reply(&[0xff, 0xff, 0xff, 0x01, 0xff, 0xff, 0xff]);
        transport.expect_reply(&[0x01, 0x13, 0x10]); // well-formed but all-zero payload
        let mut dev = driver(transport);

        assert!(dev.read_measurement());
        assert_eq!(Measurement::default(), dev.measurement());
    }

    #[test]
    fn identical_replies_produce_identical_records() {
        let script = |transport: &mut MockTransport| {
            transport.expect_reply(&[0x02]);
            transport.expect_reply(&[0x01, 0x08, 0x01, 0x01]);
            transport.expect_reply(&result_reply());
        };

        let mut transport = MockTransport::new();
        script(&mut transport);
        script(&mut transport);
        let mut dev = driver(transport);

        assert!(dev.read_measurement());
        let first = dev.measurement();
        assert!(dev.read_measurement());
        assert_eq!(first, dev.measurement());
    }

    #[test]
    fn failed_final_read_keeps_previous_record() {
        let mut transport = MockTransport::new();
        transport.expect_reply(&[0x02]);
        transport.expect_reply(&[0x01, 0x08, 0x01, 0x01]);
        transport.expect_reply(&result_reply());
        // second round: sensor goes silent
        let mut dev = driver(transport);

        assert!(dev.read_measurement());
        let first = dev.measurement();

        assert!(!dev.read_measurement());
        assert_eq!(StatusCode::NoResponse, dev.status());
        assert_eq!(first, dev.measurement());
    }

    #[test]
    fn receive_window_terminates_without_input() {
        let mut dev = driver(MockTransport::new());
        assert_eq!(StatusCode::NoResponse, dev.receive(Exchange::Ack));
        assert_eq!(StatusCode::NoResponse, dev.status());
    }
}
