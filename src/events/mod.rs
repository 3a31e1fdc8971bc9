//! # Events Module
//!
//! Event-driven progress reporting for any calling surface.
//!
//! ## Design
//! Every core operation takes an explicit [`EventSender`] and reports
//! exclusively through it. The caller decides how to render the stream
//! (terminal, log file, GUI queue).
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::WantedDecision(msg) => println!("keep: {}", msg),
//!             Event::Stats(stats) => println!("{:?}", stats),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! TriagePipeline::new(config).run(&sender, &CancellationToken::new())?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
