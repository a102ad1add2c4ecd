mod common;
mod concurrency;
mod end_to_end;
mod persistence;
mod rebuild;
mod scope;
