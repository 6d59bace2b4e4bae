pub mod act;
pub mod error;
pub mod graph;
pub mod loss;
mod ops;
pub mod optim;
pub mod shape;

pub use act::Act;
pub use error::{NetErr, Result};
pub use graph::{GraphBuilder, NetworkGraph, NodeId};
pub use shape::{Padding, Shape, Value};
