pub mod composer;
pub mod display;
pub mod finger;
pub mod geometry;
pub mod layout;
pub mod registry;
pub mod resolver;
