//! # mx-td
//!
//! Authenticated user streams on top of the `mx-core` session engine.
//!
//! The futures session logs in with an HMAC-SHA256 signed request right after
//! the socket opens; personal channels (orders, assets, positions, ADL level,
//! position mode, risk limit) are then routed locally. The spot session is
//! authorized by a listen key in the URL and subscribes account streams like
//! any spot stream.
//!
//! - [`auth`]: request signing
//! - [`user`]: `FuturesUser` protocol, personal streams and their enums
//! - [`spot_user`]: `SpotUser` protocol, account update, deal and order streams

pub mod auth;
pub mod spot_user;
pub mod user;

pub use spot_user::SpotUser;
pub use user::FuturesUser;
