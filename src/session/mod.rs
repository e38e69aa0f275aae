//! Scanner session: one mode, one source, one result per cycle.
//!
//! ```text
//!          start(mode)                 result
//!   Idle ──────────────▶ Scanning(mode) ──────▶ Result
//!    ▲                    │   ▲     │              │
//!    │   acquisition fail │   └─────┘              │
//!    └────────────────────┘  switch_mode           │
//!                             ▲                    │
//!                             └────────────────────┘
//!                                 scan_again
//! ```

mod scanner;
mod state;

pub use scanner::ScannerSession;
pub use state::{FallbackPolicy, ScanEvent, ScanMode, SessionError, SessionState, SessionUpdate};
