pub mod company;
pub mod persona;
pub mod profile;
pub mod prompt;
pub mod record;
