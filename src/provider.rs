//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering HTTPS-only
//! endpoints and provider quirks (query-string requests, lenient token responses,
//! scope delimiter). `strategy` defines [`ProviderStrategy`], an HTTP-client-agnostic
//! hook used by the OAuth client to augment token requests and map provider errors
//! into the crate error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
