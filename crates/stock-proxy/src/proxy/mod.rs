//! Backend forwarding: the request forwarder and the response normalizer.

pub mod correlation;
pub mod forward;
pub mod normalize;
