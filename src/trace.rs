//! Span constructors used behind the `tracing` feature.
//!
//! Callers enter these around store and feed work; with no subscriber
//! installed they collapse to no-ops.

use tracing::Span;

/// Span covering a single store query. The SQL is recorded as a field.
pub fn query_span(query: &str) -> Span {
    tracing::debug_span!("stockroom.query", sql = %query)
}

/// Span covering connection establishment.
pub fn connect_span() -> Span {
    tracing::info_span!("stockroom.connect")
}

/// Span covering one change-feed polling pass.
pub fn feed_poll_span() -> Span {
    tracing::debug_span!("stockroom.feed_poll")
}

/// Span covering a status-edit commit round trip.
pub fn commit_span() -> Span {
    tracing::debug_span!("stockroom.commit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_construct_without_subscriber() {
        let _ = query_span("SELECT 1");
        let _ = connect_span();
        let _ = feed_poll_span();
        let _ = commit_span();
    }
}
