pub mod extract;
pub mod profile;
pub mod tailor;
