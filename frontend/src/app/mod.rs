pub mod catalog;
pub mod console;
pub mod dates;
pub mod discovery;
pub mod download;
pub mod selection;
pub mod session;
pub mod settings;
