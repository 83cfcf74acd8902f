//! Extraction of payload bytes from raw response streams.
//!
//! A response carries its payload between inline markers, and the image
//! payload may additionally carry the end-of-image sentinel. Markers are only
//! recognised as complete sequences, and a marker split across two chunks is
//! recognised as well: bytes that may still begin a marker are held back until
//! the next byte decides.

use heapless::Vec;

use super::page::{ByteSink, Placement};
use crate::config::{FramingConfig, MAX_MARKER_LEN};
use crate::domain::ports::{FramingAnomaly, HttpEvent, TransferError};

/// Terminal signal of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The response closed normally and the page still has room.
    Success,
    /// The page boundary was reached.
    PageComplete,
    /// The end-of-image sentinel was found.
    ImageComplete,
    Failed(TransferError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingStart,
    InPayload,
    /// The payload ended or the sink refused a byte; the rest of the
    /// response is discarded.
    Draining,
}

/// Per-request framing state machine.
pub struct Framer {
    config: FramingConfig,
    detect_end_of_image: bool,
    state: State,
    window: Vec<u8, MAX_MARKER_LEN>,
    payload_seen: bool,
    forwarded: u32,
    terminated: bool,
}

impl Framer {
    /// Framer for the metadata response (no end-of-image detection).
    pub fn for_metadata(config: FramingConfig) -> Self {
        Self::new(config, false)
    }

    /// Framer for an image range response.
    pub fn for_image(config: FramingConfig) -> Self {
        Self::new(config, true)
    }

    fn new(config: FramingConfig, detect_end_of_image: bool) -> Self {
        Self {
            config,
            detect_end_of_image,
            state: State::SeekingStart,
            window: Vec::new(),
            payload_seen: false,
            forwarded: 0,
            terminated: false,
        }
    }

    /// Payload bytes accepted by the sink so far.
    pub fn forwarded(&self) -> u32 {
        self.forwarded
    }

    /// Whether the terminal signal was already emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Process one transport event.
    ///
    /// Returns the terminal signal of the request the first time one is
    /// reached, and `None` otherwise. Events after that are ignored.
    pub fn on_event(
        &mut self,
        event: HttpEvent<'_>,
        sink: &mut impl ByteSink,
    ) -> Option<RequestOutcome> {
        if self.terminated {
            return None;
        }

        let outcome = match event {
            HttpEvent::Data(chunk) => self.consume(chunk, sink),
            HttpEvent::Closed => Some(self.close(sink)),
            failure => failure
                .failure()
                .map(|failure| RequestOutcome::Failed(failure.into())),
        };

        if outcome.is_some() {
            self.terminated = true;
        }
        outcome
    }

    fn consume(&mut self, chunk: &[u8], sink: &mut impl ByteSink) -> Option<RequestOutcome> {
        for &byte in chunk {
            match self.state {
                State::Draining => break,
                State::SeekingStart => self.seek_start(byte),
                State::InPayload => match self.feed_payload(byte, sink) {
                    Step::Continue => {}
                    Step::EndOfImage => return Some(RequestOutcome::ImageComplete),
                    Step::PayloadEnd | Step::PageFull => break,
                },
            }
        }
        None
    }

    fn close(&mut self, sink: &mut impl ByteSink) -> RequestOutcome {
        if self.state == State::InPayload {
            // Held bytes never completed a marker.
            let mut held = core::mem::take(&mut self.window).into_iter();
            for byte in held.by_ref() {
                if sink.push(byte) == Placement::PageFull {
                    break;
                }
                self.forwarded += 1;
            }
        }

        if !self.payload_seen {
            RequestOutcome::Failed(FramingAnomaly::MissingPayloadStart.into())
        } else if sink.is_full() {
            RequestOutcome::PageComplete
        } else if self.forwarded == 0 {
            RequestOutcome::Failed(FramingAnomaly::EmptyResponse.into())
        } else {
            RequestOutcome::Success
        }
    }

    fn seek_start(&mut self, byte: u8) {
        let marker = self.config.payload_start;
        if self.window.len() >= marker.len() {
            self.window.remove(0);
        }
        // Cannot overflow: the window is trimmed to the marker length above.
        let _ = self.window.push(byte);
        if self.window.as_slice() == marker {
            self.window.clear();
            self.state = State::InPayload;
            self.payload_seen = true;
        }
    }

    fn feed_payload(&mut self, byte: u8, sink: &mut impl ByteSink) -> Step {
        // Cannot overflow: a held sequence is always shorter than a marker.
        let _ = self.window.push(byte);

        loop {
            let held = self.window.as_slice();
            if self.detect_end_of_image && held == self.config.end_of_image {
                self.window.clear();
                return Step::EndOfImage;
            }
            if held == self.config.payload_end {
                self.window.clear();
                self.state = State::Draining;
                return Step::PayloadEnd;
            }
            let eof_prefix =
                self.detect_end_of_image && self.config.end_of_image.starts_with(held);
            if eof_prefix || self.config.payload_end.starts_with(held) {
                return Step::Continue;
            }

            // The oldest held byte cannot begin a marker: it is data.
            let data = self.window.remove(0);
            if sink.push(data) == Placement::PageFull {
                self.window.clear();
                self.state = State::Draining;
                return Step::PageFull;
            }
            self.forwarded += 1;
            if self.window.is_empty() {
                return Step::Continue;
            }
        }
    }
}

enum Step {
    Continue,
    EndOfImage,
    PayloadEnd,
    PageFull,
}
