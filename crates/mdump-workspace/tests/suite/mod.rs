mod common;
mod dump;
mod refresh;
