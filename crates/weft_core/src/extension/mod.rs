//! Extension/override chain dispatch mechanism.
//!
//! This module lets framework consumers override or wrap the behavior of
//! extensible framework objects without subclassing. Registered extensions
//! are materialized per owner instance into an ordered hook list ending in
//! the owner's own base behavior, and every extensible operation walks that
//! list as an interception chain.

pub mod chain;
pub mod instances;
pub mod owner;
pub mod registry;
