pub use sml_core::error::{SmlError, SmlResult};
