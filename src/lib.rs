//! Server-side simulation of articulated construction rigs: an excavator, a
//! dump truck and a snow plow built from rigid segments joined by motorized
//! hinges, driven by held keys and streamed to browser clients.

pub mod config;
pub mod debris;
pub mod debug_builders;
pub mod error;
pub mod input;
pub mod logging;
pub mod net;
pub mod physics;
pub mod rig;
pub mod rig_servo;
pub mod site;
pub mod spawn;
pub mod state;
pub mod terrain;
pub mod vehicle;
