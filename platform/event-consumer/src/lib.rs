//! # Event Consumer
//!
//! Consumer-side half of the broker abstraction.
//!
//! - [`Consumer`]: a typed handler that declares exactly one event type
//! - [`ConsumerRegistry`]: the set of consumers a service runs
//! - [`Dispatcher`]: subscribes every registration to its exact subject,
//!   delivers messages concurrently, retries retryable failures a bounded
//!   number of times and publishes a [`event_bus::Fault`] once a message is
//!   given up on
//!
//! ```rust,no_run
//! use event_consumer::{Dispatcher, DispatcherConfig, ConsumerRegistry};
//! use event_bus::{EventBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//! let registry = ConsumerRegistry::new("search");
//! // registry.register(MyConsumer::new(...))?;
//! let handle = Dispatcher::start(bus, registry, DispatcherConfig::default()).await?;
//! handle.shutdown();
//! # Ok(())
//! # }
//! ```

mod context;
mod dispatcher;
mod error;
mod registry;

pub use context::ConsumeContext;
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle};
pub use error::{ConsumerError, RegistryError};
pub use registry::{Consumer, ConsumerRegistry, Registration};
