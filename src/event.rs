#[derive(Debug, Clone, PartialEq)]
pub enum WsConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

/// Out-of-band notifications from the live feed task.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    WsStatus(WsConnectionStatus),
    LogMessage(String),
}
