//! irreceive: infrared remote events for Rust applications
//!
//! Button reports come from a long-running producer process (LIRC's `irw`
//! by default) printing one line per press or hold-repeat:
//!
//! ```text
//! 0000000000f40bf0 00 KEY_UP my_remote
//! ```
//!
//! Any number of [`IrReceiver`]s can register listeners. They share a
//! single producer, spawned with the first listener anywhere and killed
//! when the last one is removed. Each event is matched against every live
//! listener's key/remote filter and throttle, then handed to its callback.
//!
//! ```no_run
//! use irreceive::{IrReceiver, Registration};
//!
//! let receiver = IrReceiver::new();
//! let id = receiver
//!     .add(Registration::new(|event| println!("{} pressed", event.key))
//!         .key("KEY_OK")
//!         .throttle_ms(0))
//!     .expect("producer should start");
//! // ...
//! receiver.remove_listener(id);
//! ```

mod dispatch;
mod error;
mod events;
mod producer;
mod registry;

#[cfg(test)]
mod testing;

pub use error::{ArgumentError, IrError};
pub use events::{parse_line, IrEvent, ParseError};
pub use producer::{
    current, ensure_started, force_kill, live_listeners, reset_spawn_strategy,
    set_spawn_strategy, CommandProducer, Producer, ProducerHandle, SpawnStrategy,
    DEFAULT_PRODUCER,
};
pub use registry::{
    classify, Callback, Filter, IrReceiver, ListenerArg, ListenerId, ListenerInfo,
    Registration, Throttle,
};
