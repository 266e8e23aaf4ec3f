mod allowance;
mod common;
mod statistics;
