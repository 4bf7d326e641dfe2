pub mod check;
pub mod publish;
pub mod push;
pub mod settings;
pub mod status;
pub mod summary;
pub mod sync;
pub mod validate;
