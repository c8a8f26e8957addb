pub mod arrivals;
pub mod event;
pub mod event_queue;
