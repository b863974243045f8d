//! Request timing as observed by the HTTP client.
//!
//! `standard` mode records when response headers arrive and when the body
//! is complete. `precise` mode additionally streams the body chunk by chunk
//! and records time to first byte, chunk count and byte totals.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How much detail to record per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    #[default]
    Standard,
    Precise,
}

impl TimingMode {
    /// Parse mode from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "precise" => Some(Self::Precise),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingMode::Standard => write!(f, "standard"),
            TimingMode::Precise => write!(f, "precise"),
        }
    }
}

/// Byte and chunk counters from a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub chunks: u32,
}

/// Phase durations for one request, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestTimings {
    pub mode: TimingMode,
    /// Reading and base64-encoding the image
    pub encode_ms: f64,
    /// Request dispatch until response headers arrived
    pub request_ms: f64,
    /// Request dispatch until the first body byte (precise mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_byte_ms: Option<f64>,
    /// Response headers until the body was fully received
    pub response_transfer_ms: f64,
    /// Request dispatch until the body was fully received
    pub total_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferStats>,
}

impl RequestTimings {
    /// Named phase values, in the order used by reports and CSV export.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("encode_ms", self.encode_ms),
            ("request_ms", self.request_ms),
            (
                "time_to_first_byte_ms",
                self.time_to_first_byte_ms.unwrap_or(0.0),
            ),
            ("response_transfer_ms", self.response_transfer_ms),
            ("total_ms", self.total_ms),
        ]
    }

    /// Human-readable timing breakdown.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("Request timing ({}):", self.mode)];
        lines.push(format!("  Image encode:         {:>9.1} ms", self.encode_ms));
        lines.push(format!("  Request -> headers:   {:>9.1} ms", self.request_ms));
        if let Some(ttfb) = self.time_to_first_byte_ms {
            lines.push(format!("  Time to first byte:   {:>9.1} ms", ttfb));
        }
        lines.push(format!(
            "  Response transfer:    {:>9.1} ms",
            self.response_transfer_ms
        ));
        lines.push(format!("  Total:                {:>9.1} ms", self.total_ms));
        if self.total_ms > 0.0 {
            lines.push(format!(
                "  Waiting on server:    {:>9.1} %",
                self.request_ms / self.total_ms * 100.0
            ));
        }
        if let Some(ref t) = self.transfer {
            lines.push(format!(
                "  Transfer:             {} B sent, {} B received in {} chunk(s)",
                t.bytes_sent, t.bytes_received, t.chunks
            ));
        }
        lines.join("\n")
    }
}

/// Records timestamps over the life of one HTTP request.
#[derive(Debug)]
pub struct RequestTimer {
    mode: TimingMode,
    start: Instant,
    headers: Option<Instant>,
    first_chunk: Option<Instant>,
    bytes_sent: u64,
    bytes_received: u64,
    chunks: u32,
}

impl RequestTimer {
    /// Start timing a request whose body is `bytes_sent` long.
    pub fn start(mode: TimingMode, bytes_sent: u64) -> Self {
        Self {
            mode,
            start: Instant::now(),
            headers: None,
            first_chunk: None,
            bytes_sent,
            bytes_received: 0,
            chunks: 0,
        }
    }

    pub fn headers_received(&mut self) {
        self.headers.get_or_insert_with(Instant::now);
    }

    pub fn chunk(&mut self, len: usize) {
        self.first_chunk.get_or_insert_with(Instant::now);
        self.chunks += 1;
        self.bytes_received += len as u64;
    }

    /// Stop the clock. `encode_ms` is filled in by the caller.
    pub fn finish(self) -> RequestTimings {
        let end = Instant::now();
        let headers = self.headers.unwrap_or(end);
        let ms = |from: Instant, to: Instant| to.saturating_duration_since(from).as_secs_f64() * 1000.0;

        let precise = self.mode == TimingMode::Precise;
        RequestTimings {
            mode: self.mode,
            encode_ms: 0.0,
            request_ms: ms(self.start, headers),
            time_to_first_byte_ms: if precise {
                self.first_chunk.map(|t| ms(self.start, t))
            } else {
                None
            },
            response_transfer_ms: ms(headers, end),
            total_ms: ms(self.start, end),
            transfer: precise.then(|| TransferStats {
                bytes_sent: self.bytes_sent,
                bytes_received: self.bytes_received,
                chunks: self.chunks,
            }),
        }
    }
}

/// Read a response body, streaming it chunk by chunk in precise mode.
pub async fn read_body(
    resp: reqwest::Response,
    timer: &mut RequestTimer,
) -> Result<Vec<u8>, reqwest::Error> {
    timer.headers_received();
    match timer.mode {
        TimingMode::Standard => {
            let bytes = resp.bytes().await?;
            timer.chunk(bytes.len());
            Ok(bytes.to_vec())
        }
        TimingMode::Precise => {
            let mut body = Vec::new();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                timer.chunk(chunk.len());
                body.extend_from_slice(&chunk);
            }
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_mode_parse() {
        assert_eq!(TimingMode::parse("standard"), Some(TimingMode::Standard));
        assert_eq!(TimingMode::parse("PRECISE"), Some(TimingMode::Precise));
        assert_eq!(TimingMode::parse("exact"), None);
    }

    #[test]
    fn test_standard_timer_omits_transfer_stats() {
        let mut timer = RequestTimer::start(TimingMode::Standard, 100);
        timer.headers_received();
        timer.chunk(42);
        let timings = timer.finish();
        assert!(timings.transfer.is_none());
        assert!(timings.time_to_first_byte_ms.is_none());
        assert!(timings.total_ms >= timings.request_ms);
    }

    #[test]
    fn test_precise_timer_counts_chunks() {
        let mut timer = RequestTimer::start(TimingMode::Precise, 100);
        timer.headers_received();
        timer.chunk(10);
        timer.chunk(15);
        let timings = timer.finish();
        let transfer = timings.transfer.unwrap();
        assert_eq!(transfer.bytes_sent, 100);
        assert_eq!(transfer.bytes_received, 25);
        assert_eq!(transfer.chunks, 2);
        assert!(timings.time_to_first_byte_ms.is_some());
    }

    #[test]
    fn test_render_mentions_phases() {
        let timings = RequestTimings {
            mode: TimingMode::Standard,
            encode_ms: 1.0,
            request_ms: 80.0,
            time_to_first_byte_ms: None,
            response_transfer_ms: 20.0,
            total_ms: 100.0,
            transfer: None,
        };
        let text = timings.render();
        assert!(text.contains("Request timing (standard)"));
        assert!(text.contains("80.0 %"));
        assert!(!text.contains("Time to first byte"));
    }

    #[test]
    fn test_fields_order() {
        let names: Vec<_> = RequestTimings::default()
            .fields()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            names,
            vec![
                "encode_ms",
                "request_ms",
                "time_to_first_byte_ms",
                "response_transfer_ms",
                "total_ms"
            ]
        );
    }
}
