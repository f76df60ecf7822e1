pub mod controller;
pub mod live;
pub mod observer;
pub mod transport;

pub use controller::SessionController;
pub use live::LiveTransport;
pub use observer::{NullObserver, SessionObserver};
pub use transport::{
    ServerMessage, SessionSetup, Transport, TransportEvent, TransportSession,
};
