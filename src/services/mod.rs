pub mod bundle;
pub mod pdf;
pub mod reference;
pub mod resolver;
