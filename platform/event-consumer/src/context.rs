use event_bus::EventEnvelope;

/// What a consumer sees for one delivery attempt
#[derive(Debug, Clone)]
pub struct ConsumeContext<T> {
    pub envelope: EventEnvelope<T>,
    /// Subject the message arrived on
    pub subject: String,
    /// 1-based delivery attempt for this consumer
    pub attempt: u32,
}

impl<T> ConsumeContext<T> {
    pub fn message(&self) -> &T {
        &self.envelope.payload
    }
}
