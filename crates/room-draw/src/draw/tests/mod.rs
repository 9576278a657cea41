mod common;
mod roster;
mod routing;
mod service;
