//! API surface of the prize wheel service.

pub mod rest;
