//! # Event Fabric Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/           # Publish fan-out and history benchmarks
//! └── src/integration/
//!     ├── fixtures.rs    # Shared registry, rights and service builders
//!     ├── bus.rs         # Fan-out, propagation, multiplexer routing
//!     ├── frontend.rs    # Stream start, redaction, storage disabled
//!     └── websocket.rs   # The same over a real socket
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fabric-tests
//! cargo bench -p fabric-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

pub mod integration;
