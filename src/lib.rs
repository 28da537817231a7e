//! # focusroom-gateway
//!
//! WebSocket signaling and room-membership gateway for FocusRoom video
//! sessions. The gateway authenticates each incoming connection, runs
//! host-approved admission control, tracks live membership per session,
//! and relays signaling envelopes (offers/answers/ICE, media state,
//! chat) between exactly the right peers. Media itself flows
//! peer-to-peer once signaling completes; the gateway never touches
//! media bytes.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)                Platform backend (HTTP)
//!     │                                  │
//!     ├── WS Handler (ws/)               ├── /internal/notifications (api/)
//!     │     ├── Identity Resolver (auth/)│
//!     │     ├── Admission Controller     │
//!     │     └── Signaling Router         │
//!     │                                  │
//!     ├── RoomRegistry (room/)  ◄────────┤
//!     ├── Notifier (room/)      ◄────────┘
//!     │
//!     └── SessionStore (store/, read-only PostgreSQL)
//! ```
//!
//! Live membership is in-memory only; peers reconnect and resynchronize
//! after a restart.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod room;
pub mod store;
pub mod ws;
