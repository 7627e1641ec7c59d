//! sqldrill Protocol
//!
//! Client-server communication over HTTP.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                     sqldrill HTTP API                       |
//! +-------------------------------------------------------------+
//! |  POST /api/login        open a session                      |
//! |  POST /api/execute      run SQL on the session              |
//! |  POST /api/logout       close the session                   |
//! |  GET  /api/session/:t   session info                        |
//! |  GET  /api/questions    catalog listing / detail            |
//! |  GET  /health           pool + session telemetry            |
//! +-------------------------------------------------------------+
//! |  Envelope: { success, data?, error? }                       |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Module Structure
//!
//! - `rest` - router, DTOs, error mapping and handlers

pub mod rest;
