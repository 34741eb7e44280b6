//! Core type definitions for the shields decision engine
//!
//! These types describe a request as the network pipeline hands it to us and
//! the decision we hand back.

// =============================================================================
// Request Types (bit mask for the caller's resource classification)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;  // iframe/frame
        const MAIN_FRAME = 1 << 6;   // main document
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const FAVICON = 1 << 12;
        const PREFETCH = 1 << 13;

        /// Document types (main_frame + sub_frame)
        const DOCUMENT = Self::MAIN_FRAME.bits() | Self::SUBDOCUMENT.bits();
    }
}

impl RequestType {
    /// Parse from browser request type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::MAIN_FRAME,
            "sub_frame" | "subdocument" => Self::SUBDOCUMENT,
            "stylesheet" | "css" => Self::STYLESHEET,
            "script" | "js" => Self::SCRIPT,
            "image" | "img" => Self::IMAGE,
            "font" => Self::FONT,
            "object" => Self::OBJECT,
            "xmlhttprequest" | "xhr" => Self::XMLHTTPREQUEST,
            "ping" => Self::PING,
            "media" => Self::MEDIA,
            "websocket" => Self::WEBSOCKET,
            "favicon" => Self::FAVICON,
            "prefetch" => Self::PREFETCH,
            _ => Self::OTHER,
        }
    }
}

// =============================================================================
// Resource Option (what the ad-block engine understands)
// =============================================================================

/// Per-resource-type narrowing passed to the ad-block engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceOption {
    /// No per-type narrowing
    #[default]
    None,
    Stylesheet,
    Image,
    Script,
}

impl From<RequestType> for ResourceOption {
    fn from(request_type: RequestType) -> Self {
        if request_type == RequestType::STYLESHEET {
            Self::Stylesheet
        } else if request_type == RequestType::IMAGE {
            Self::Image
        } else if request_type == RequestType::SCRIPT {
            Self::Script
        } else {
            Self::None
        }
    }
}

// =============================================================================
// Request / Decision
// =============================================================================

/// A request as seen by the network pipeline.
#[derive(Debug, Clone)]
pub struct RequestInfo<'a> {
    /// Top-level navigation host the request is made from
    pub base_host: &'a str,
    /// Full request URL
    pub url: &'a str,
    /// Request hostname
    pub host: &'a str,
    /// Caller's resource classification
    pub request_type: RequestType,
}

/// Why a request was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Ad,
    Tracker,
}

/// Final decision for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDecision {
    /// Request proceeds untouched
    Allow,
    /// Request is cancelled
    Block(BlockReason),
    /// Request proceeds against an HTTPS-upgraded URL
    Upgrade(String),
}
