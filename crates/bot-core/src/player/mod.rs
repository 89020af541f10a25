pub mod auth_input;
pub mod movement;
