mod common;
mod driver_loop;
mod state;
mod suggest_observe;
