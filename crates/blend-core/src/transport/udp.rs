//! UDP beacon transport.
//!
//! Emulates the radio on a LAN so the protocol can run between ordinary
//! processes. Advertising broadcasts a JSON beacon at a fixed interval;
//! scanning listens for beacons and reports each peer at most once per scan
//! phase. Uses SO_REUSEPORT so several nodes can share a host.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::advertisement::{classify, RawDiscovery};
use super::service::{ServiceFilter, ServiceId};
use super::{EventSink, RadioState, RadioTransport};
use crate::error::TransportError;
use crate::types::Platform;

/// Default UDP beacon port
pub const BEACON_PORT: u16 = 3535;

/// Default advertising interval
pub const DEFAULT_BEACON_INTERVAL: Duration = Duration::from_millis(250);

/// Pause after a receive error before polling the socket again
const RECEIVE_BACKOFF: Duration = Duration::from_millis(100);

/// Length of the random token an Android node advertises
const ANDROID_TOKEN_LEN: usize = 8;

/// How this node presents itself in its beacons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub peripheral_id: String,
    pub service_data: Vec<u8>,
}

impl LocalIdentity {
    /// Generate a fresh identity in the style of the given platform.
    pub fn generate(platform: Platform) -> Self {
        let id = Uuid::new_v4();
        let service_data = match platform {
            Platform::Apple => Vec::new(),
            Platform::Android => id.as_bytes()[..ANDROID_TOKEN_LEN].to_vec(),
        };

        Self {
            peripheral_id: id.hyphenated().to_string().to_uppercase(),
            service_data,
        }
    }

    /// The beacon this identity sends when advertising `service`.
    pub fn beacon(&self, service: ServiceId) -> RawDiscovery {
        RawDiscovery {
            service: service.uuid().to_string(),
            peripheral_id: self.peripheral_id.clone(),
            service_data: self.service_data.clone(),
        }
    }

    /// The node id peers will record for this identity.
    pub fn node_id(&self, service: ServiceId) -> Option<String> {
        classify(&self.beacon(service)).map(|d| d.node_id)
    }
}

/// Options for [`UdpBeaconTransport`].
#[derive(Debug, Clone)]
pub struct UdpBeaconOptions {
    /// Port the transport listens on
    pub port: u16,
    pub broadcast_addr: Ipv4Addr,
    /// Destination port for outgoing beacons
    pub broadcast_port: u16,
    pub beacon_interval: Duration,
    pub identity: LocalIdentity,
}

impl UdpBeaconOptions {
    pub fn new(identity: LocalIdentity) -> Self {
        Self {
            port: BEACON_PORT,
            broadcast_addr: Ipv4Addr::BROADCAST,
            broadcast_port: BEACON_PORT,
            beacon_interval: DEFAULT_BEACON_INTERVAL,
            identity,
        }
    }
}

/// Create a UDP socket with SO_REUSEPORT and broadcast enabled.
pub fn create_beacon_socket(port: u16) -> Result<std::net::UdpSocket, std::io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;

    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    socket.set_broadcast(true)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

pub fn encode_beacon(beacon: &RawDiscovery) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(beacon)
}

pub fn parse_beacon(data: &[u8]) -> Result<RawDiscovery, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Radio emulation over UDP broadcast.
pub struct UdpBeaconTransport {
    socket: Arc<UdpSocket>,
    options: UdpBeaconOptions,
    sink: EventSink,
    scan_task: Option<JoinHandle<()>>,
    advertise_task: Option<JoinHandle<()>>,
}

impl UdpBeaconTransport {
    /// Bind the beacon socket. Must be called within a tokio runtime.
    pub fn bind(options: UdpBeaconOptions, sink: EventSink) -> Result<Self, TransportError> {
        let std_socket = create_beacon_socket(options.port)?;
        let socket = UdpSocket::from_std(std_socket)?;
        info!(port = options.port, "UDP beacon transport listening");

        sink.state_changed(RadioState::PoweredOn);

        Ok(Self {
            socket: Arc::new(socket),
            options,
            sink,
            scan_task: None,
            advertise_task: None,
        })
    }

    /// Discard datagrams that arrived while we were not scanning.
    fn drain_stale(&self) {
        let mut buf = [0u8; 2048];
        let mut dropped = 0usize;
        while self.socket.try_recv_from(&mut buf).is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            trace!(dropped, "Discarded beacons received outside scan phase");
        }
    }
}

impl RadioTransport for UdpBeaconTransport {
    fn start_scan(&mut self, filter: &ServiceFilter) -> Result<(), TransportError> {
        if self.scan_task.is_some() {
            return Ok(());
        }

        self.drain_stale();

        let socket = self.socket.clone();
        let filter = filter.clone();
        let own_id = self.options.identity.peripheral_id.clone();
        let sink = self.sink.clone();

        self.scan_task = Some(tokio::spawn(scan_loop(socket, filter, own_id, sink)));
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn start_advertise(&mut self, service: ServiceId) -> Result<(), TransportError> {
        if self.advertise_task.is_some() {
            return Ok(());
        }

        let payload = encode_beacon(&self.options.identity.beacon(service))?;
        let socket = self.socket.clone();
        let target = SocketAddr::from((self.options.broadcast_addr, self.options.broadcast_port));
        let interval = self.options.beacon_interval;

        self.advertise_task = Some(tokio::spawn(advertise_loop(
            socket, payload, target, interval,
        )));
        Ok(())
    }

    fn stop_advertise(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.advertise_task.take() {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for UdpBeaconTransport {
    fn drop(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        if let Some(task) = self.advertise_task.take() {
            task.abort();
        }
    }
}

/// Per-scan-phase duplicate suppression: one report per peer per phase.
#[derive(Debug, Default)]
struct SeenPeers {
    seen: HashSet<(String, String)>,
}

impl SeenPeers {
    fn first_sighting(&mut self, beacon: &RawDiscovery) -> bool {
        self.seen
            .insert((beacon.service.to_ascii_lowercase(), beacon.peripheral_id.clone()))
    }
}

/// Decide whether a received beacon should be reported.
fn accept_beacon(
    beacon: &RawDiscovery,
    filter: &ServiceFilter,
    own_id: &str,
    seen: &mut SeenPeers,
) -> bool {
    if beacon.peripheral_id == own_id {
        return false;
    }

    match ServiceId::from_uuid(&beacon.service) {
        Some(service) if filter.matches(service) => seen.first_sighting(beacon),
        _ => false,
    }
}

async fn scan_loop(socket: Arc<UdpSocket>, filter: ServiceFilter, own_id: String, sink: EventSink) {
    let mut buf = vec![0u8; 2048];
    let mut seen = SeenPeers::default();

    debug!("Beacon scan started");

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, addr)) => {
                let beacon = match parse_beacon(&buf[..len]) {
                    Ok(beacon) => beacon,
                    Err(e) => {
                        trace!(%addr, error = %e, "Ignoring non-beacon datagram");
                        continue;
                    }
                };

                if accept_beacon(&beacon, &filter, &own_id, &mut seen) {
                    trace!(%addr, peripheral = %beacon.peripheral_id, "Beacon received");
                    sink.raw_discovery(&beacon);
                }
            }
            Err(e) => {
                warn!(error = %e, "Beacon receive error");
                tokio::time::sleep(RECEIVE_BACKOFF).await;
            }
        }
    }
}

async fn advertise_loop(
    socket: Arc<UdpSocket>,
    payload: Vec<u8>,
    target: SocketAddr,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        if let Err(e) = socket.send_to(&payload, target).await {
            warn!(%target, error = %e, "Beacon send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{event_channel, EventStream, TransportEvent};

    fn spare_ports() -> (u16, u16) {
        let a = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let b = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        (a.local_addr().unwrap().port(), b.local_addr().unwrap().port())
    }

    fn loopback_options(identity: LocalIdentity, port: u16, peer_port: u16) -> UdpBeaconOptions {
        let mut options = UdpBeaconOptions::new(identity);
        options.port = port;
        options.broadcast_addr = Ipv4Addr::LOCALHOST;
        options.broadcast_port = peer_port;
        options.beacon_interval = Duration::from_millis(20);
        options
    }

    fn discovered_ids(events: &mut EventStream) -> Vec<String> {
        let mut ids = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let TransportEvent::Discovered(discovery) = event {
                ids.push(discovery.node_id);
            }
        }
        ids
    }

    #[tokio::test]
    async fn test_beacons_reported_once_per_scan_phase() {
        let (port_a, port_b) = spare_ports();
        let identity_a = LocalIdentity::generate(Platform::Apple);
        let node_a = identity_a.node_id(ServiceId::Apple).unwrap();

        let (sink_a, _events_a) = event_channel();
        let (sink_b, mut events_b) = event_channel();
        let mut a = UdpBeaconTransport::bind(loopback_options(identity_a, port_a, port_b), sink_a)
            .unwrap();
        let mut b = UdpBeaconTransport::bind(
            loopback_options(LocalIdentity::generate(Platform::Apple), port_b, port_a),
            sink_b,
        )
        .unwrap();

        b.start_scan(&ServiceFilter::default()).unwrap();
        a.start_advertise(ServiceId::Apple).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(discovered_ids(&mut events_b), vec![node_a.clone()]);

        // Beacons queued while not scanning are discarded on the next scan start
        b.stop_scan().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        a.stop_advertise().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        b.start_scan(&ServiceFilter::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(discovered_ids(&mut events_b).is_empty());

        // A fresh scan phase reports the same peer again
        a.start_advertise(ServiceId::Apple).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(discovered_ids(&mut events_b), vec![node_a]);

        a.stop_advertise().unwrap();
        b.stop_scan().unwrap();
    }

    #[test]
    fn test_generated_identities() {
        let apple = LocalIdentity::generate(Platform::Apple);
        assert!(apple.service_data.is_empty());
        assert_eq!(
            apple.node_id(ServiceId::Apple).as_deref(),
            Some(apple.peripheral_id.as_str())
        );

        let android = LocalIdentity::generate(Platform::Android);
        assert_eq!(android.service_data.len(), ANDROID_TOKEN_LEN);
        assert_eq!(android.node_id(ServiceId::Android).map(|id| id.len()), Some(16));
    }

    #[test]
    fn test_beacon_wire_format() {
        let identity = LocalIdentity {
            peripheral_id: "5D0C1F6A-9B2E-4C1D-8F3A-2B7E6C9D0A11".to_string(),
            service_data: vec![1, 2],
        };
        let bytes = encode_beacon(&identity.beacon(ServiceId::Android)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["service"], ServiceId::Android.uuid());
        assert_eq!(json["peripheralId"], identity.peripheral_id.as_str());
        assert_eq!(json["serviceData"], serde_json::json!([1, 2]));

        assert_eq!(parse_beacon(&bytes).unwrap(), identity.beacon(ServiceId::Android));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_beacon(b"not a beacon").is_err());
        assert!(parse_beacon(br#"{"service":"85CF"}"#).is_err());
    }

    #[test]
    fn test_accept_filters_self_and_duplicates() {
        let filter = ServiceFilter::default();
        let mut seen = SeenPeers::default();
        let peer = LocalIdentity::generate(Platform::Apple).beacon(ServiceId::Apple);

        assert!(!accept_beacon(&peer, &filter, &peer.peripheral_id, &mut seen));
        assert!(accept_beacon(&peer, &filter, "me", &mut seen));
        assert!(!accept_beacon(&peer, &filter, "me", &mut seen));
    }

    #[test]
    fn test_accept_respects_service_filter() {
        let filter = ServiceFilter::new([ServiceId::Apple]);
        let mut seen = SeenPeers::default();
        let android = LocalIdentity::generate(Platform::Android).beacon(ServiceId::Android);

        assert!(!accept_beacon(&android, &filter, "me", &mut seen));
    }
}
