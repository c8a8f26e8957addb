use crate::core::support::simulation_time::SimulationTime;
use crate::network::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A packet enters the network and needs a route.
    Arrival,
    /// A routed packet finished its transmission.
    Departure,
}

/// Something that happens to a packet at a point in simulated time.
///
/// Events are immutable once created. Ordering for scheduling purposes is the job of
/// [`EventQueue`](super::event_queue::EventQueue), not of the event itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    time: SimulationTime,
    kind: EventKind,
    source: NodeId,
    destination: NodeId,
    packet_size_bytes: u32,
    path: Option<Vec<NodeId>>,
}

impl Event {
    pub fn new(
        time: SimulationTime,
        kind: EventKind,
        source: NodeId,
        destination: NodeId,
        packet_size_bytes: u32,
    ) -> Self {
        Self {
            time,
            kind,
            source,
            destination,
            packet_size_bytes,
            path: None,
        }
    }

    pub fn arrival(
        time: SimulationTime,
        source: NodeId,
        destination: NodeId,
        packet_size_bytes: u32,
    ) -> Self {
        Self::new(
            time,
            EventKind::Arrival,
            source,
            destination,
            packet_size_bytes,
        )
    }

    /// The departure of the packet from `arrival` after it travelled along `path`. Returns `None`
    /// if `latency` does not give a valid time.
    pub fn departure(arrival: &Event, latency: f64, path: Vec<NodeId>) -> Option<Self> {
        let time = arrival.time.checked_add(latency)?;
        Some(Self {
            path: Some(path),
            ..Self::new(
                time,
                EventKind::Departure,
                arrival.source,
                arrival.destination,
                arrival.packet_size_bytes,
            )
        })
    }

    pub fn time(&self) -> SimulationTime {
        self.time
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn packet_size_bytes(&self) -> u32 {
        self.packet_size_bytes
    }

    /// The route taken by the packet, if it has been routed.
    pub fn path(&self) -> Option<&[NodeId]> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_departure() {
        let t = SimulationTime::new(3.0).unwrap();
        let (a, b) = (NodeId::new(0), NodeId::new(2));
        let arrival = Event::arrival(t, a, b, 512);
        assert_eq!(arrival.kind(), EventKind::Arrival);
        assert_eq!(arrival.path(), None);

        let path = vec![a, NodeId::new(1), b];
        let departure = Event::departure(&arrival, 4.0, path.clone()).unwrap();
        assert_eq!(departure.kind(), EventKind::Departure);
        assert_eq!(departure.time(), SimulationTime::new(7.0).unwrap());
        assert_eq!(departure.source(), a);
        assert_eq!(departure.destination(), b);
        assert_eq!(departure.packet_size_bytes(), 512);
        assert_eq!(departure.path(), Some(path.as_slice()));

        assert!(Event::departure(&arrival, f64::NAN, vec![]).is_none());
    }
}
