//! Server-side plumbing for TreeFS.
//!
//! Two front ends share the same engine: [`dispatcher`] serves requests
//! arriving on a Unix datagram socket, and [`script`] replays a command file
//! through a bounded queue. Both are driven by the `treefsd` and
//! `treefs-batch` binaries.

pub mod dispatcher;
pub mod script;
