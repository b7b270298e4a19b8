//! One function per §4.5 command, each taking the pieces of engine state it
//! actually needs rather than the whole `Engine`, so they stay testable in
//! isolation the way the teacher's own rule implementations do.

mod algebra;
mod ingress;

pub use algebra::*;
pub use ingress::*;
