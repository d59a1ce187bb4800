pub mod generation;
pub mod inpaint;
pub mod mask;
pub mod pipeline;
pub mod request;

pub use generation::*;
pub use inpaint::*;
pub use mask::*;
pub use pipeline::*;
pub use request::*;
