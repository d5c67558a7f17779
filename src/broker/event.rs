/// An event raised by a broker adapter, delivered to its session in the
/// order the broker produced it.
#[derive(Debug)]
pub enum BrokerEvent {
    /// The broker accepted the connection.
    Connected,

    /// A message arrived on a subscribed topic.
    Message { topic: String, payload: String },

    /// The broker granted an earlier subscribe request.
    SubscribeAcked { topic: String },

    /// The broker rejected an earlier subscribe request.
    SubscribeFailed { topic: String, reason: String },

    /// A non-fatal failure, e.g. one refused connection attempt.
    Error { reason: String },

    /// The connection is gone, deliberately or not.
    Disconnected { reason: String },
}
