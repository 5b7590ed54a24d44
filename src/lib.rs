// src/lib.rs

//! Hotel PMS connector library
//!
//! Pulls configuration, reservations, inventory and revenue for each hotel
//! from the Host PMS API, stores the raw responses, transforms them into the
//! canonical documents, registers those downstream and queues one processing
//! trigger per hotel.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod storage;
pub mod transform;
pub mod utils;
