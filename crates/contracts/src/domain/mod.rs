pub mod bilty;
pub mod company;
pub mod initial_setup;
pub mod user;
