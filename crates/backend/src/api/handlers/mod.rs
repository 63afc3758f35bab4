pub mod bilty;
pub mod initial_setup;
pub mod users;
