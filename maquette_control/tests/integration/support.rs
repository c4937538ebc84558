//! Shared test station: simulated rig + control loop + loopback peer.

use maquette_common::store::MemoryConfigStore;
use maquette_control::cycle::ControlLoop;
use maquette_control::dispatch::Dispatcher;
use maquette_control::motion::{MotionEngine, MotionParts, MotionSettings};
use maquette_control::protocol::crc16;
use maquette_control::safety::EmergencyStop;
use maquette_control::transport::{
    MemoryClient, MemoryConnector, MemoryListener, NetworkTransport, TransportSettings,
};
use maquette_hal::{SimulatedRig, SimulationConfig};
use std::time::{Duration, Instant};

/// Virtual cycle period.
pub const DT: Duration = Duration::from_millis(5);

pub struct Station {
    pub rig: SimulatedRig,
    pub control: ControlLoop<MemoryListener>,
    pub connector: MemoryConnector,
    pub now: Instant,
}

impl Station {
    /// Rig with 36000 counts per pan revolution and 100 counts per degree,
    /// so the home flag at 9000 counts sits at 90°.
    pub fn new() -> Self {
        Self::with_transport(TransportSettings::default(), Duration::from_secs(30))
    }

    pub fn with_transport(settings: TransportSettings, relisten: Duration) -> Self {
        let rig = SimulatedRig::new(SimulationConfig {
            ready_delay_ms: 20,
            ..SimulationConfig::default()
        });
        let handles = rig.handles();
        let engine = MotionEngine::new(
            MotionParts {
                axes: handles.axes,
                pan_home: handles.pan_home,
                limits: handles.limits,
                tilt: handles.tilt,
            },
            MotionSettings {
                pan_counts_per_degree: 100.0,
                ..MotionSettings::default()
            },
        );
        let interlock = EmergencyStop::new(handles.estop, true);
        let now = Instant::now();
        let mut dispatcher = Dispatcher::new(
            engine,
            interlock,
            handles.rangefinder,
            Box::new(MemoryConfigStore::new()),
        );
        dispatcher.init(now);

        let listener = MemoryListener::new();
        let connector = listener.connector();
        let transport = NetworkTransport::new(listener, settings);
        Self {
            rig,
            control: ControlLoop::new(transport, dispatcher, relisten),
            connector,
            now,
        }
    }

    /// Open a client and let the transport accept it.
    pub fn connect(&mut self) -> MemoryClient {
        let client = self.connector.connect();
        self.cycle();
        assert!(self.control.transport().is_connected());
        client
    }

    pub fn cycle(&mut self) {
        self.rig.advance(DT);
        self.now += DT;
        self.control.run_cycle(self.now);
    }

    pub fn cycles(&mut self, n: usize) {
        for _ in 0..n {
            self.cycle();
        }
    }

    /// Send one line and return the lines received after one cycle.
    pub fn request(&mut self, client: &MemoryClient, line: &str) -> Vec<String> {
        client.send_line(line);
        self.cycle();
        client.take_lines()
    }

    /// Send one line and return its single reply.
    pub fn ask(&mut self, client: &MemoryClient, line: &str) -> String {
        let mut lines = self.request(client, line);
        assert_eq!(lines.len(), 1, "replies to {line}: {lines:?}");
        lines.remove(0)
    }

    /// Cycle until a line starting with `prefix` arrives. Returns every
    /// line received up to and including it.
    pub fn run_until(&mut self, client: &MemoryClient, prefix: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for _ in 0..50_000 {
            self.cycle();
            for line in client.take_lines() {
                let done = line.starts_with(prefix);
                seen.push(line);
                if done {
                    return seen;
                }
            }
        }
        panic!("no {prefix} line, saw {seen:?}");
    }

    pub fn enable_all(&mut self, client: &MemoryClient) {
        assert_eq!(self.ask(client, "ENABLE:ALL"), "OK:ENABLING");
        self.run_until(client, "INFO:ENABLE_COMPLETE");
    }
}

/// `line` with its CRC-16 checksum appended.
pub fn with_crc(line: &str) -> String {
    format!("{line};{:04X}", crc16(line.as_bytes()))
}
