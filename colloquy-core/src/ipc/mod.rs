//! Types crossing the controller → UI boundary.

pub mod events;
