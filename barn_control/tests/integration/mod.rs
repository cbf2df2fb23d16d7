mod binary_actor;
mod common;
mod interlocks;
mod positional_actor;
mod supervisor;
